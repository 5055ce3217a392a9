//! Configuration-time helpers for naming and placing models.

use super::{error::ModelError, kind::param, record::Model};

/// Parses the integer suffix of a name built as `model_type + index`.
#[must_use]
pub fn parse_unique_index(model_type: &str, name: &str) -> Option<u32> {
    let suffix = name.strip_prefix(model_type)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Returns `model_type` followed by one more than the largest index already
/// used for that type among `models` and their children.
#[must_use]
pub fn generate_unique_name(model_type: &str, models: &[Model]) -> String {
    let next = max_index(model_type, models).map_or(1, |max| max.saturating_add(1));
    format!("{model_type}{next}")
}

fn max_index(model_type: &str, models: &[Model]) -> Option<u32> {
    models
        .iter()
        .flat_map(|model| {
            let own = parse_unique_index(model_type, &model.name);
            let nested = max_index(model_type, &model.child_models);
            own.into_iter().chain(nested)
        })
        .max()
}

/// Gives `model` a unique name among `models` and suffixes its parameter
/// names with the same index (`diameter` becomes `diameter3`).
pub fn assign_unique_name(model: &mut Model, models: &[Model]) {
    let name = generate_unique_name(&model.model_type, models);
    let suffix = &name[model.model_type.len()..];
    for parameter in &mut model.parameters {
        parameter.name = format!("{}{suffix}", parameter.param_type);
    }
    model.name = name;
}

/// Re-expresses every position relative to the first model, which is then
/// pinned at the origin with fixed coordinates.
///
/// # Errors
///
/// Returns [`ModelError::MissingParameter`] if a model has no own `x` or
/// `y` parameter; the models are left untouched in that case.
pub fn relocate_models(models: &mut [Model]) -> Result<(), ModelError> {
    for model in models.iter() {
        for param_type in [param::X, param::Y] {
            if !model.parameters.iter().any(|p| p.param_type == param_type) {
                return Err(ModelError::MissingParameter {
                    model: model.name.clone(),
                    parameter: param_type.to_string(),
                });
            }
        }
    }

    let Some((first, rest)) = models.split_first_mut() else {
        return Ok(());
    };
    let origin = position(first);
    for model in rest {
        let (x, y) = position(model);
        model.set_value(param::X, x - origin.0);
        model.set_value(param::Y, y - origin.1);
    }
    for param_type in [param::X, param::Y] {
        if let Some(parameter) = first.parameter_mut(param_type) {
            parameter.value = 0.0;
            parameter.has_fixed_value = true;
        }
    }
    Ok(())
}

fn position(model: &Model) -> (f64, f64) {
    let own = |param_type: &str| {
        model
            .parameters
            .iter()
            .find(|p| p.param_type == param_type)
            .map_or(0.0, |p| p.value)
    };
    (own(param::X), own(param::Y))
}

#[cfg(test)]
mod tests {
    use super::*;

    use super::super::registry::ModelRegistry;

    #[test]
    fn parses_suffixes() {
        assert_eq!(parse_unique_index("disk", "disk12"), Some(12));
        assert_eq!(parse_unique_index("disk", "disk"), None);
        assert_eq!(parse_unique_index("disk", "disk+1"), None);
        assert_eq!(parse_unique_index("disk", "elong_disk1"), None);
        assert_eq!(parse_unique_index("ring", "ring_x"), None);
    }

    #[test]
    fn next_name_follows_largest_index() {
        let registry = ModelRegistry::new();
        let named = |model_type: &str, name: &str| {
            let mut model = registry.create(model_type).unwrap();
            model.name = name.into();
            model
        };
        let mut models = vec![
            named("disk", "disk1"),
            named("disk", "disk4"),
            named("ring", "ring7"),
        ];
        assert_eq!(generate_unique_name("disk", &models), "disk5");
        assert_eq!(generate_unique_name("ring", &models), "ring8");
        assert_eq!(generate_unique_name("gaussian", &models), "gaussian1");

        models[0].child_models.push(named("disk", "disk9"));
        assert_eq!(generate_unique_name("disk", &models), "disk10");
    }

    #[test]
    fn assigned_names_suffix_parameters() {
        let registry = ModelRegistry::new();
        let existing = vec![{
            let mut model = registry.create("ring").unwrap();
            model.name = "ring2".into();
            model
        }];
        let mut ring = registry.create("ring").unwrap();
        assign_unique_name(&mut ring, &existing);

        assert_eq!(ring.name, "ring3");
        let names: Vec<_> = ring.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["flux_weight3", "x3", "y3", "diameter3", "width3"]);
    }

    #[test]
    fn relocation_pins_the_first_model() {
        let registry = ModelRegistry::new();
        let at = |x: f64, y: f64| {
            registry
                .create("punct")
                .unwrap()
                .with_value(param::X, x)
                .with_value(param::Y, y)
        };
        let mut models = vec![at(1.0, -2.0), at(4.0, 0.5), at(0.0, 0.0)];
        relocate_models(&mut models).unwrap();

        let positions: Vec<_> = models.iter().map(position).collect();
        assert_eq!(positions, [(0.0, 0.0), (3.0, 2.5), (-1.0, 2.0)]);
        assert!(models[0].parameter(param::X).unwrap().has_fixed_value);
        assert!(models[0].parameter(param::Y).unwrap().has_fixed_value);
        assert!(!models[1].parameter(param::X).unwrap().has_fixed_value);
    }

    #[test]
    fn relocation_requires_positions() {
        let mut models = vec![Model::new("punct", "punct1")];
        assert!(matches!(
            relocate_models(&mut models),
            Err(ModelError::MissingParameter { .. })
        ));
        relocate_models(&mut []).unwrap();
    }
}
