//! Angle conversions built on [`uom`].
//!
//! Source sizes and offsets are expressed in milliarcseconds (mas) and
//! position angles in degrees, while the Fourier kernels work in radians
//! against spatial frequencies in rad⁻¹.
//!
//! Per-model conversions go through [`uom`]; the per-sample kernels use the
//! precomputed [`MAS_TO_RAD`] factor.
//!
//! ```
//! use approx::assert_relative_eq;
//! use uv_models::support::units::{MAS_TO_RAD, mas_to_rad};
//!
//! assert_relative_eq!(mas_to_rad(2.0), 2.0 * MAS_TO_RAD, max_relative = 1e-15);
//! ```

use uom::si::{
    angle::{degree, radian, second},
    f64::Angle,
};

/// One milliarcsecond expressed in radians.
pub const MAS_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0 * 1000.0);

/// Converts an angle in milliarcseconds to radians.
#[must_use]
pub fn mas_to_rad(mas: f64) -> f64 {
    Angle::new::<second>(mas * 1e-3).get::<radian>()
}

/// Converts an angle in degrees to radians.
#[must_use]
pub fn deg_to_rad(deg: f64) -> f64 {
    Angle::new::<degree>(deg).get::<radian>()
}
