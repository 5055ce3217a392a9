//! Crate-level utilities shared by the models.
//!
//! - [`constraint`]: type-level numeric invariants.
//! - [`units`]: angle conversions on top of [`uom`].
//! - [`bessel`]: Bessel functions of the first kind.
//! - [`geometry`]: phase shifts and anisotropic UV transforms.
//! - [`parallel`]: worker pool, cancellation and tiled reductions.

pub mod bessel;
pub mod constraint;
pub mod geometry;
pub mod parallel;
pub mod units;
