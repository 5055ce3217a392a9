//! Closed-form visibilities of circularly symmetric brightness profiles.
//!
//! Every function takes the radial spatial frequency `|f|` in rad⁻¹ and the
//! shape's sizes in mas, and returns the visibility normalised to `1.0` at
//! zero frequency. Flux weighting, anisotropy and position shifts are applied
//! by the caller.

use std::f64::consts::{LN_2, PI};

use crate::support::{
    bessel::{j0, j1, jn},
    units::MAS_TO_RAD,
};

/// Below this argument the Rayleigh term of the limb-darkened disk is taken
/// from its Taylor series; the direct form loses all precision there.
const SERIES_THRESHOLD: f64 = 1e-3;

/// `π·mas2rad·size·|f|`, the argument of the Bessel-based profiles.
fn argument(size: f64, radius: f64) -> f64 {
    PI * MAS_TO_RAD * size * radius
}

/// Point source.
#[must_use]
pub fn punct() -> f64 {
    1.0
}

/// Uniform disk: `2·J1(d)/d`.
#[must_use]
pub fn disk(radius: f64, diameter: f64) -> f64 {
    let d = argument(diameter, radius);
    if d == 0.0 { 1.0 } else { 2.0 * j1(d) / d }
}

/// Infinitely thin ring: `J0(d)`.
#[must_use]
pub fn circle(radius: f64, diameter: f64) -> f64 {
    let d = argument(diameter, radius);
    if d == 0.0 { 1.0 } else { j0(d) }
}

/// Uniform ring between the internal `diameter` and `diameter + 2·width`.
///
/// A zero width is a [`circle`] and a zero internal diameter is a [`disk`]
/// of diameter `2·width`.
#[must_use]
pub fn ring(radius: f64, diameter: f64, width: f64) -> f64 {
    if width == 0.0 {
        return circle(radius, diameter);
    }
    if diameter == 0.0 {
        return disk(radius, 2.0 * width);
    }
    if radius == 0.0 {
        return 1.0;
    }
    let inner = 0.5 * diameter;
    let outer = inner + width;
    let outer_term = outer * j1(argument(2.0 * outer, radius));
    let inner_term = inner * j1(argument(2.0 * inner, radius));
    (outer_term - inner_term) / (PI * MAS_TO_RAD * radius * (outer * outer - inner * inner))
}

/// Circular gaussian of full width at half maximum `fwhm`.
#[must_use]
pub fn gaussian(radius: f64, fwhm: f64) -> f64 {
    let a = PI * MAS_TO_RAD * fwhm;
    (-(a * a) * (radius * radius) / (4.0 * LN_2)).exp()
}

/// Disk darkened by the quadratic law `I(μ) = 1 − a1·(1−μ) − a2·(1−μ)²`.
///
/// The transform combines `J1(x)/x`, the half-integer term
/// `√(π/2)·J_{3/2}(x)/x^{3/2} = (sin x − x·cos x)/x³` and `J2(x)/x²`,
/// normalised by the law's flux integral. Coefficients making that integral
/// vanish yield a non-finite value.
#[must_use]
pub fn limb_quadratic(radius: f64, diameter: f64, a1: f64, a2: f64) -> f64 {
    let x = argument(diameter, radius);
    if x == 0.0 {
        return 1.0;
    }

    let uniform = 1.0 - a1 - a2;
    let linear = a1 + 2.0 * a2;

    let rayleigh = if x < SERIES_THRESHOLD {
        let x2 = x * x;
        1.0 / 3.0 - x2 / 30.0 + x2 * x2 / 840.0
    } else {
        (x.sin() - x * x.cos()) / (x * x * x)
    };

    let visibility =
        uniform * j1(x) / x + linear * rayleigh - 2.0 * a2 * jn(2, x) / (x * x);
    let flux = uniform / 2.0 + linear / 3.0 - a2 / 4.0;
    visibility / flux
}
