//! Visibility models.
//!
//! Builds, validates and evaluates lists of analytic source models over
//! spatial frequencies, and renders them as amplitude or phase maps.
//!
//! A prepared [`ModelSet`] implements [`twine_core::Model`], mapping a
//! [`UvPoint`] to the total complex visibility. The computation lives in
//! the internal `core` module.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use uv_models::models::interferometry::visibility::{
//!     FrequencySamples, ComputeConfig, ModelRegistry, param,
//! };
//! use uv_models::support::parallel::{CancelToken, Scheduler, SchedulerConfig};
//!
//! let scheduler = Arc::new(Scheduler::new(SchedulerConfig::default()).unwrap());
//! let registry = ModelRegistry::new();
//! let disk = registry.create("disk").unwrap().with_value(param::DIAMETER, 2.0);
//! let samples = FrequencySamples::new(vec![0.0, 1e8], vec![0.0, 0.0]).unwrap();
//!
//! let vis = registry
//!     .compute_all(&[disk], &samples, &scheduler, &ComputeConfig::default(), &CancelToken::new())
//!     .unwrap()
//!     .completed()
//!     .unwrap();
//! assert_eq!(vis[0].re, 1.0);
//! assert!(vis[1].re < 1.0);
//! ```

mod core;

use std::convert::Infallible;

use num_complex::Complex64;
use twine_core::Model as TwineModel;

pub use self::core::{
    Bound, ColorMap, ColorScale, ComputeConfig, FrequencySamples, ImageMode, MapError,
    MapRequest, Model, ModelError, ModelKind, ModelRegistry, ModelSet, ParamSpec, Parameter,
    ParameterLink, PixelBuffer, ResolutionConfig, ResolutionError, ResolvedFrequency, Shape,
    UvRect, ValueRange, VisibilityMapResult, VisibilityMapService, assign_unique_name,
    generate_unique_name, param, parse_unique_index, relocate_models, resolving_frequency,
};

/// A point of the UV plane, in rad⁻¹.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UvPoint {
    pub u: f64,
    pub v: f64,
}

impl UvPoint {
    #[must_use]
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }
}

impl TwineModel for ModelSet {
    type Input = UvPoint;
    type Output = Complex64;
    type Error = Infallible;

    fn call(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
        Ok(self.visibility(input.u, input.v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use approx::assert_relative_eq;

    use crate::support::{
        constraint::StrictlyPositive,
        parallel::{CancelToken, Scheduler, SchedulerConfig},
    };

    #[test]
    fn adapter_matches_batch_computation() {
        let registry = ModelRegistry::new();
        let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
        let models = vec![
            registry
                .create("flatten_ring")
                .unwrap()
                .with_value(param::MAJOR_INTERNAL_DIAMETER, 3.0)
                .with_value(param::WIDTH, 0.4)
                .with_value(param::FLATTEN_RATIO, 1.8)
                .with_value(param::MINOR_AXIS_POS_ANGLE, 70.0)
                .with_value(param::X, -0.5),
            registry
                .create("punct")
                .unwrap()
                .with_value(param::FLUX_WEIGHT, 0.2),
        ];
        let points = [UvPoint::new(2e7, -4e7), UvPoint::new(-9e7, 1e6)];
        let samples = FrequencySamples::new(
            points.iter().map(|p| p.u).collect::<Vec<_>>(),
            points.iter().map(|p| p.v).collect::<Vec<_>>(),
        )
        .unwrap();

        let batch = registry
            .compute_all(
                &models,
                &samples,
                &scheduler,
                &ComputeConfig::default(),
                &CancelToken::new(),
            )
            .unwrap()
            .completed()
            .unwrap();

        let set = registry.prepare_all(&models).unwrap();
        for (point, expected) in points.iter().zip(&batch) {
            assert_eq!(set.call(point).unwrap(), *expected);
        }
        assert_relative_eq!(set.call(&UvPoint::default()).unwrap().re, 1.2);
    }

    #[test_log::test]
    fn shared_scheduler_serves_several_consumers() {
        let scheduler = Arc::new(
            Scheduler::new(SchedulerConfig {
                parallelism: Some(StrictlyPositive::new(3).unwrap()),
                ..SchedulerConfig::default()
            })
            .unwrap(),
        );
        let registry = Arc::new(ModelRegistry::new());
        let service = VisibilityMapService::new(Arc::clone(&registry), Arc::clone(&scheduler));

        let mut models = vec![registry.create("disk").unwrap()];
        let mut second = registry.create("gaussian").unwrap();
        assign_unique_name(&mut second, &models);
        assign_unique_name(&mut models[0], &[]);
        models.push(second);
        assert_eq!(models[0].name, "disk1");
        assert_eq!(models[1].name, "gaussian1");

        let request = MapRequest::new(
            UvRect::centred(1e8).unwrap(),
            StrictlyPositive::new(32).unwrap(),
        );
        let map = service
            .compute_map(&models, &request, &CancelToken::new())
            .unwrap()
            .completed()
            .unwrap();
        assert_eq!(map.image().pixels().len(), 32 * 32);

        scheduler.shutdown();
        assert!(!scheduler.is_enabled());
        let again = service
            .compute_map(&models, &request, &CancelToken::new())
            .unwrap()
            .completed()
            .unwrap();
        assert_eq!(again.values(), map.values());
    }
}
