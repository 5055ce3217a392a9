//! Spatial frequency at which a model list becomes resolved.
//!
//! The normalised amplitude is followed outward along a position angle
//! until it first drops to a target level. A geometric scan brackets the
//! crossing and bisection refines it.

mod config;
mod error;
mod problem;

pub use config::ResolutionConfig;
pub use error::ResolutionError;

use log::debug;
use twine_solvers::equation::bisection;

use crate::support::units::deg_to_rad;

use super::{record::Model, registry::ModelRegistry};

use problem::{LevelCrossing, RadialCut};

/// Where the amplitude crosses the requested level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedFrequency {
    /// Radial spatial frequency, in rad⁻¹.
    pub frequency: f64,

    /// Normalised amplitude at `frequency`.
    pub amplitude: f64,

    /// Bisection iterations performed.
    pub iters: usize,
}

/// Finds the first radial frequency, along `position_angle` degrees East of
/// North, at which the amplitude of `models` normalised by their total flux
/// drops to `config.level`.
///
/// A level of 1 or more is reached at zero frequency.
///
/// # Errors
///
/// Returns [`ResolutionError`] if the scan range is invalid, a model is
/// invalid, the list has no flux, the amplitude stays above the level over
/// the whole scan, or the solver fails to converge.
pub fn resolving_frequency(
    registry: &ModelRegistry,
    models: &[Model],
    position_angle: f64,
    config: &ResolutionConfig,
) -> Result<ResolvedFrequency, ResolutionError> {
    config.check_scan()?;
    let set = registry.prepare_all(models)?;
    let flux = set.total_flux();
    if !(flux > 0.0) {
        return Err(ResolutionError::ZeroFlux);
    }
    if config.level >= 1.0 {
        return Ok(ResolvedFrequency {
            frequency: 0.0,
            amplitude: 1.0,
            iters: 0,
        });
    }

    let cut = RadialCut::new(&set, deg_to_rad(position_angle), flux);
    let bracket = scan(&cut, config)?;
    debug!("amplitude crosses {} within {bracket:?} rad⁻¹", config.level);

    let solution = bisection::solve(
        &cut,
        &LevelCrossing::new(config.level),
        bracket,
        &config.bisection(),
        |_: &bisection::Event<'_, _, _>| None,
    )?;

    if solution.status != bisection::Status::Converged {
        return Err(ResolutionError::MaxIters {
            residual: solution.residual,
            iters: solution.iters,
        });
    }

    let sample = solution.snapshot.output;
    Ok(ResolvedFrequency {
        frequency: sample.frequency,
        amplitude: sample.amplitude,
        iters: solution.iters,
    })
}

/// Brackets the first crossing between zero and the first scanned
/// frequency whose amplitude is at or below the level.
fn scan(cut: &RadialCut<'_>, config: &ResolutionConfig) -> Result<[f64; 2], ResolutionError> {
    let steps = config.scan_steps.max(2);
    let ratio = config.max_frequency / config.min_frequency;
    let mut previous = 0.0;
    for i in 0..steps {
        #[allow(clippy::cast_precision_loss)]
        let frequency = config.min_frequency * ratio.powf(i as f64 / (steps - 1) as f64);
        if cut.amplitude(frequency) <= config.level {
            return Ok([previous, frequency]);
        }
        previous = frequency;
    }
    Err(ResolutionError::NotBracketed {
        level: config.level,
        max_frequency: config.max_frequency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::f64::consts::{LN_2, PI};

    use approx::assert_relative_eq;

    use crate::support::units::MAS_TO_RAD;

    use super::super::{error::ModelError, kind::param};

    fn half_width(fwhm: f64) -> f64 {
        2.0 * LN_2 / (PI * MAS_TO_RAD * fwhm)
    }

    #[test]
    fn gaussian_half_amplitude() {
        let registry = ModelRegistry::new();
        let models = vec![
            registry
                .create("gaussian")
                .unwrap()
                .with_value(param::FWHM, 3.0)
                .with_value(param::X, 5.0)
                .with_value(param::FLUX_WEIGHT, 2.0),
        ];
        let resolved =
            resolving_frequency(&registry, &models, 0.0, &ResolutionConfig::default()).unwrap();
        assert_relative_eq!(resolved.frequency, half_width(3.0), max_relative = 1e-9);
        assert_relative_eq!(resolved.amplitude, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn elongation_depends_on_direction() {
        let registry = ModelRegistry::new();
        let models = vec![
            registry
                .create("elong_gaussian")
                .unwrap()
                .with_value(param::MINOR_AXIS_FWHM, 2.0)
                .with_value(param::ELONG_RATIO, 2.0)
                .with_value(param::MAJOR_AXIS_POS_ANGLE, 30.0),
        ];
        let config = ResolutionConfig::default();

        let along_major = resolving_frequency(&registry, &models, 30.0, &config).unwrap();
        let along_minor = resolving_frequency(&registry, &models, 120.0, &config).unwrap();
        assert_relative_eq!(along_major.frequency, half_width(4.0), max_relative = 1e-8);
        assert_relative_eq!(along_minor.frequency, half_width(2.0), max_relative = 1e-8);
    }

    #[test]
    fn disk_reaches_level() {
        let registry = ModelRegistry::new();
        let models = vec![
            registry
                .create("disk")
                .unwrap()
                .with_value(param::DIAMETER, 1.0),
        ];
        let config = ResolutionConfig {
            level: 0.2,
            ..ResolutionConfig::default()
        };
        let resolved = resolving_frequency(&registry, &models, 45.0, &config).unwrap();
        assert_relative_eq!(resolved.amplitude, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn point_source_is_never_resolved() {
        let registry = ModelRegistry::new();
        let models = vec![registry.create("punct").unwrap()];
        let err = resolving_frequency(&registry, &models, 0.0, &ResolutionConfig::default())
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NotBracketed { .. }));
    }

    #[test]
    fn zero_flux() {
        let registry = ModelRegistry::new();
        let models = vec![
            registry
                .create("disk")
                .unwrap()
                .with_value(param::FLUX_WEIGHT, 0.0),
        ];
        let err = resolving_frequency(&registry, &models, 0.0, &ResolutionConfig::default())
            .unwrap_err();
        assert!(matches!(err, ResolutionError::ZeroFlux));
        assert!(matches!(
            resolving_frequency(&registry, &[], 0.0, &ResolutionConfig::default()),
            Err(ResolutionError::ZeroFlux)
        ));
    }

    #[test]
    fn invalid_models_are_reported() {
        let registry = ModelRegistry::new();
        let models = vec![
            registry
                .create("ring")
                .unwrap()
                .with_value(param::WIDTH, -1.0),
        ];
        let err = resolving_frequency(&registry, &models, 0.0, &ResolutionConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::Model(ModelError::ParameterOutOfRange { .. })
        ));
    }

    #[test]
    fn scan_range_must_be_positive_and_ordered() {
        let registry = ModelRegistry::new();
        let models = vec![registry.create("gaussian").unwrap()];
        for (min_frequency, max_frequency) in [
            (0.0, 1e9),
            (-1e3, 1e9),
            (1e9, 1e3),
            (1e3, f64::INFINITY),
            (f64::NAN, 1e9),
        ] {
            let config = ResolutionConfig {
                min_frequency,
                max_frequency,
                ..ResolutionConfig::default()
            };
            let err = resolving_frequency(&registry, &models, 0.0, &config).unwrap_err();
            assert!(
                matches!(err, ResolutionError::InvalidScanRange { .. }),
                "[{min_frequency}, {max_frequency}] gave {err:?}"
            );
        }
    }

    #[test]
    fn unit_level_is_met_at_zero_frequency() {
        let registry = ModelRegistry::new();
        let models = vec![registry.create("gaussian").unwrap()];
        let config = ResolutionConfig {
            level: 1.0,
            ..ResolutionConfig::default()
        };
        let resolved = resolving_frequency(&registry, &models, 0.0, &config).unwrap();
        assert_eq!(resolved.frequency, 0.0);
    }
}
