//! Plain model and parameter records.
//!
//! These are owned by the configuration layer. The engine reads them for
//! the duration of a call and only mutates them through the explicit
//! helpers (`reset_parameter`, `relocate_models`).

use super::{error::Bound, kind::ParamSpec};

/// A named, possibly bounded model parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter type (e.g. `"diameter"`), shared by every model of a kind.
    pub param_type: String,

    /// Parameter name, unique within a target (e.g. `"diameter2"`).
    pub name: String,

    pub value: f64,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,

    /// Typical magnitude of the parameter, used by fitting front ends.
    pub scale: Option<f64>,

    pub units: String,

    /// Excluded from fitting; still used for evaluation.
    pub has_fixed_value: bool,
}

impl Parameter {
    /// Creates an unbounded parameter named after its type.
    #[must_use]
    pub fn new(param_type: impl Into<String>, value: f64) -> Self {
        let param_type = param_type.into();
        Self {
            name: param_type.clone(),
            param_type,
            value,
            min_value: None,
            max_value: None,
            scale: None,
            units: String::new(),
            has_fixed_value: false,
        }
    }

    pub(super) fn from_spec(spec: &ParamSpec) -> Self {
        Self {
            param_type: spec.param_type.to_string(),
            name: spec.param_type.to_string(),
            value: spec.default,
            min_value: spec.min,
            max_value: spec.max,
            scale: None,
            units: spec.units.to_string(),
            has_fixed_value: false,
        }
    }

    /// Returns the first bound the value violates, if any.
    ///
    /// A `NaN` value violates any bound that is present.
    #[must_use]
    pub fn violated_bound(&self) -> Option<Bound> {
        if let Some(min) = self.min_value {
            if !(self.value >= min) {
                return Some(Bound::Min(min));
            }
        }
        if let Some(max) = self.max_value {
            if !(self.value <= max) {
                return Some(Bound::Max(max));
            }
        }
        None
    }
}

/// Reference to a parameter shared between several models.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterLink {
    /// Parameter type this link supplies for the model.
    pub param_type: String,

    /// The shared parameter.
    pub shared: Parameter,
}

/// A source model: a kind selector plus its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Registered model type (e.g. `"elong_disk"`).
    pub model_type: String,

    /// Unique name within a target (e.g. `"elong_disk1"`).
    pub name: String,

    /// Parameters in declaration order.
    pub parameters: Vec<Parameter>,

    /// Shared parameters, at most one per parameter type.
    pub parameter_links: Vec<ParameterLink>,

    /// Nested models. Composite models are not supported; validation
    /// rejects a non-empty list.
    pub child_models: Vec<Model>,
}

impl Model {
    /// Creates a model with no parameters.
    #[must_use]
    pub fn new(model_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            model_type: model_type.into(),
            name: name.into(),
            parameters: Vec::new(),
            parameter_links: Vec::new(),
            child_models: Vec::new(),
        }
    }

    /// Looks up a parameter by type, falling back to the shared links.
    #[must_use]
    pub fn parameter(&self, param_type: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.param_type == param_type)
            .or_else(|| {
                self.parameter_links
                    .iter()
                    .find(|link| link.param_type == param_type)
                    .map(|link| &link.shared)
            })
    }

    /// Looks up one of the model's own parameters by type.
    pub fn parameter_mut(&mut self, param_type: &str) -> Option<&mut Parameter> {
        self.parameters
            .iter_mut()
            .find(|p| p.param_type == param_type)
    }

    #[must_use]
    pub fn value(&self, param_type: &str) -> Option<f64> {
        self.parameter(param_type).map(|p| p.value)
    }

    /// Sets the value of one of the model's own parameters.
    ///
    /// Returns `false` if the model has no such parameter.
    pub fn set_value(&mut self, param_type: &str, value: f64) -> bool {
        match self.parameter_mut(param_type) {
            Some(parameter) => {
                parameter.value = value;
                true
            }
            None => false,
        }
    }

    /// Builder-style [`Model::set_value`]; unknown types are ignored.
    #[must_use]
    pub fn with_value(mut self, param_type: &str, value: f64) -> Self {
        self.set_value(param_type, value);
        self
    }

    /// Adds a shared-parameter link, replacing any link of the same type.
    pub fn link(&mut self, link: ParameterLink) {
        self.parameter_links
            .retain(|existing| existing.param_type != link.param_type);
        self.parameter_links.push(link);
    }
}
