//! Computational core of the visibility models.
//!
//! Records and kinds are plain data. A [`Shape`] resolves one model into an
//! evaluator and a [`ModelSet`] sums several of them; the registry, map
//! service and resolution estimator all work on prepared sets.

mod error;
mod function;
mod kind;
mod map;
mod naming;
mod record;
mod registry;
mod resolution;
mod shape;

pub use error::{Bound, ModelError};
pub use kind::{ModelKind, ParamSpec, param};
pub use map::{
    ColorMap, ColorScale, ImageMode, MapError, MapRequest, PixelBuffer, UvRect, ValueRange,
    VisibilityMapResult, VisibilityMapService,
};
pub use naming::{assign_unique_name, generate_unique_name, parse_unique_index, relocate_models};
pub use record::{Model, Parameter, ParameterLink};
pub use registry::{ComputeConfig, FrequencySamples, ModelRegistry};
pub use resolution::{ResolutionConfig, ResolutionError, ResolvedFrequency, resolving_frequency};
pub use shape::{ModelSet, Shape};
