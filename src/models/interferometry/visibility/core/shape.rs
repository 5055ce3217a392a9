use num_complex::Complex64;

use crate::support::{
    constraint::{Constrained, NonNegative},
    geometry::{Anamorphosis, shift},
};

use super::{
    error::ModelError,
    function,
    kind::{ModelKind, param},
    record::Model,
};

type Size = Constrained<f64, NonNegative>;

/// Radial brightness profile with its sizes resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Profile {
    Point,
    Disk { diameter: Size },
    Circle { diameter: Size },
    Ring { diameter: Size, width: Size },
    Gaussian { fwhm: Size },
    LimbQuadratic { diameter: Size, a1: f64, a2: f64 },
}

impl Profile {
    fn evaluate(self, radius: f64) -> f64 {
        match self {
            Self::Point => function::punct(),
            Self::Disk { diameter } => function::disk(radius, *diameter),
            Self::Circle { diameter } => function::circle(radius, *diameter),
            Self::Ring { diameter, width } => function::ring(radius, *diameter, *width),
            Self::Gaussian { fwhm } => function::gaussian(radius, *fwhm),
            Self::LimbQuadratic { diameter, a1, a2 } => {
                function::limb_quadratic(radius, *diameter, a1, a2)
            }
        }
    }
}

/// A model resolved into an evaluator.
///
/// Parameter lookups, size constraints and the position-angle trigonometry
/// are done once here instead of once per frequency sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    kind: ModelKind,
    flux_weight: f64,
    x: f64,
    y: f64,
    profile: Profile,
    anamorphosis: Option<Anamorphosis>,
}

impl Shape {
    /// Resolves `model`'s parameters for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingParameter`] if a parameter the kind needs
    /// is absent, or [`ModelError::Constraint`] if a size is negative or `NaN`.
    pub fn new(kind: ModelKind, model: &Model) -> Result<Self, ModelError> {
        let get = |param_type: &str| {
            model
                .value(param_type)
                .ok_or_else(|| ModelError::MissingParameter {
                    model: model.name.clone(),
                    parameter: param_type.to_string(),
                })
        };
        let size = |param_type: &str| {
            NonNegative::new(get(param_type)?).map_err(|source| ModelError::Constraint {
                model: model.name.clone(),
                source,
            })
        };
        let elongated = || -> Result<_, ModelError> {
            Ok(Some(Anamorphosis::elongated(
                get(param::ELONG_RATIO)?,
                get(param::MAJOR_AXIS_POS_ANGLE)?,
            )))
        };
        let flattened = || -> Result<_, ModelError> {
            Ok(Some(Anamorphosis::flattened(
                get(param::FLATTEN_RATIO)?,
                get(param::MINOR_AXIS_POS_ANGLE)?,
            )))
        };

        let (profile, anamorphosis) = match kind {
            ModelKind::Punct => (Profile::Point, None),
            ModelKind::Disk => (
                Profile::Disk {
                    diameter: size(param::DIAMETER)?,
                },
                None,
            ),
            ModelKind::ElongDisk => (
                Profile::Disk {
                    diameter: size(param::MINOR_AXIS_DIAMETER)?,
                },
                elongated()?,
            ),
            ModelKind::FlattenDisk => (
                Profile::Disk {
                    diameter: size(param::MAJOR_AXIS_DIAMETER)?,
                },
                flattened()?,
            ),
            ModelKind::Circle => (
                Profile::Circle {
                    diameter: size(param::DIAMETER)?,
                },
                None,
            ),
            ModelKind::Ring => (
                Profile::Ring {
                    diameter: size(param::DIAMETER)?,
                    width: size(param::WIDTH)?,
                },
                None,
            ),
            ModelKind::ElongRing => (
                Profile::Ring {
                    diameter: size(param::MINOR_INTERNAL_DIAMETER)?,
                    width: size(param::WIDTH)?,
                },
                elongated()?,
            ),
            ModelKind::FlattenRing => (
                Profile::Ring {
                    diameter: size(param::MAJOR_INTERNAL_DIAMETER)?,
                    width: size(param::WIDTH)?,
                },
                flattened()?,
            ),
            ModelKind::Gaussian => (
                Profile::Gaussian {
                    fwhm: size(param::FWHM)?,
                },
                None,
            ),
            ModelKind::ElongGaussian => (
                Profile::Gaussian {
                    fwhm: size(param::MINOR_AXIS_FWHM)?,
                },
                elongated()?,
            ),
            ModelKind::FlattenGaussian => (
                Profile::Gaussian {
                    fwhm: size(param::MAJOR_AXIS_FWHM)?,
                },
                flattened()?,
            ),
            ModelKind::LimbQuadratic => (
                Profile::LimbQuadratic {
                    diameter: size(param::DIAMETER)?,
                    a1: get(param::A1_COEFF)?,
                    a2: get(param::A2_COEFF)?,
                },
                None,
            ),
        };

        Ok(Self {
            kind,
            flux_weight: get(param::FLUX_WEIGHT)?,
            x: get(param::X)?,
            y: get(param::Y)?,
            profile,
            anamorphosis,
        })
    }

    #[must_use]
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Real visibility at `(u, v)` before the position shift.
    ///
    /// Equals the flux weight exactly at zero frequency.
    #[must_use]
    pub fn amplitude(&self, u: f64, v: f64) -> f64 {
        let radius = match &self.anamorphosis {
            Some(transform) => transform.radius(u, v),
            None => u.hypot(v),
        };
        self.flux_weight * self.profile.evaluate(radius)
    }

    /// Complex visibility at `(u, v)`, shifted to the model's position.
    #[must_use]
    pub fn visibility(&self, u: f64, v: f64) -> Complex64 {
        shift(u, v, self.x, self.y, self.amplitude(u, v))
    }
}

/// A list of resolved models evaluated as one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSet {
    shapes: Vec<Shape>,
}

impl ModelSet {
    #[must_use]
    pub fn new(shapes: Vec<Shape>) -> Self {
        Self { shapes }
    }

    #[must_use]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Sum of the models' visibilities at `(u, v)`, in list order.
    #[must_use]
    pub fn visibility(&self, u: f64, v: f64) -> Complex64 {
        self.shapes
            .iter()
            .fold(Complex64::new(0.0, 0.0), |acc, shape| acc + shape.visibility(u, v))
    }

    /// Amplitude of the total visibility at zero frequency.
    #[must_use]
    pub fn total_flux(&self) -> f64 {
        self.visibility(0.0, 0.0).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use super::super::record::Parameter;

    fn model(kind: ModelKind) -> Model {
        let mut model = Model::new(kind.type_name(), kind.type_name());
        model.parameters = kind
            .parameters()
            .iter()
            .map(Parameter::from_spec)
            .collect();
        model
    }

    /// A model of every kind with non-trivial sizes.
    fn sized(kind: ModelKind) -> Model {
        let mut model = model(kind);
        for parameter in &mut model.parameters {
            let is_position = [param::X, param::Y].contains(&parameter.param_type.as_str());
            if parameter.units == "mas" && !is_position {
                parameter.value = 3.0;
            }
        }
        model
    }

    #[test]
    fn zero_frequency_returns_flux_weight() {
        for kind in ModelKind::ALL {
            for model in [model(kind), sized(kind)] {
                let model = model
                    .with_value(param::FLUX_WEIGHT, 0.37)
                    .with_value(param::X, 2.0)
                    .with_value(param::ELONG_RATIO, 1.5)
                    .with_value(param::FLATTEN_RATIO, 2.5)
                    .with_value(param::A1_COEFF, 0.4);
                let shape = Shape::new(kind, &model).unwrap();
                assert_eq!(shape.amplitude(0.0, 0.0), 0.37, "{kind}");
                assert_eq!(shape.visibility(0.0, 0.0), Complex64::new(0.37, 0.0), "{kind}");
            }
        }
    }

    #[test]
    fn elongation_acts_along_the_major_axis() {
        let elong = model(ModelKind::ElongDisk)
            .with_value(param::MINOR_AXIS_DIAMETER, 2.0)
            .with_value(param::ELONG_RATIO, 2.0);
        let shape = Shape::new(ModelKind::ElongDisk, &elong).unwrap();

        let r = 1.5e8;
        assert_relative_eq!(
            shape.amplitude(r, 0.0),
            function::disk(r, 2.0),
            max_relative = 1e-12
        );
        assert_relative_eq!(
            shape.amplitude(0.0, r),
            function::disk(r, 4.0),
            max_relative = 1e-9
        );
    }

    #[test]
    fn flattening_acts_along_the_minor_axis() {
        let flat = model(ModelKind::FlattenGaussian)
            .with_value(param::MAJOR_AXIS_FWHM, 4.0)
            .with_value(param::FLATTEN_RATIO, 2.0)
            .with_value(param::MINOR_AXIS_POS_ANGLE, 90.0);
        let shape = Shape::new(ModelKind::FlattenGaussian, &flat).unwrap();

        let r = 5e7;
        assert_relative_eq!(
            shape.amplitude(r, 0.0),
            function::gaussian(r, 2.0),
            max_relative = 1e-12
        );
        assert_relative_eq!(
            shape.amplitude(0.0, r),
            function::gaussian(r, 4.0),
            max_relative = 1e-12
        );
    }

    #[test]
    fn missing_parameter() {
        let mut disk = model(ModelKind::Disk);
        disk.parameters.retain(|p| p.param_type != param::DIAMETER);
        let err = Shape::new(ModelKind::Disk, &disk).unwrap_err();
        assert!(matches!(
            err,
            ModelError::MissingParameter { ref parameter, .. } if parameter == param::DIAMETER
        ));
    }

    #[test]
    fn negative_size_is_rejected_without_bounds() {
        let mut ring = model(ModelKind::Ring).with_value(param::WIDTH, -1.0);
        for parameter in &mut ring.parameters {
            parameter.min_value = None;
        }
        let err = Shape::new(ModelKind::Ring, &ring).unwrap_err();
        assert!(matches!(err, ModelError::Constraint { .. }));
    }

    #[test]
    fn set_sums_in_order() {
        let a = Shape::new(ModelKind::Punct, &model(ModelKind::Punct)).unwrap();
        let b = Shape::new(
            ModelKind::Punct,
            &model(ModelKind::Punct).with_value(param::X, 1.0),
        )
        .unwrap();
        let set = ModelSet::new(vec![a, b]);
        let (u, v) = (3e7, -2e7);
        assert_eq!(
            set.visibility(u, v),
            Complex64::new(0.0, 0.0) + a.visibility(u, v) + b.visibility(u, v)
        );
        assert_relative_eq!(set.total_flux(), 2.0);
        assert_eq!(ModelSet::default().visibility(u, v), Complex64::new(0.0, 0.0));
    }
}
