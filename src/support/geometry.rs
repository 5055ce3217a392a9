//! Geometric transforms shared by the analytic model functions.
//!
//! A positional offset of a source in the sky plane becomes a phase ramp in
//! the UV plane ([`shift`]). Elongated and flattened shapes are circular
//! shapes seen through an anisotropic scaling along a rotated axis, which in
//! the UV plane is the same rotation with the inverse scaling
//! ([`rotate_scale`], [`Anamorphosis`]).

use num_complex::Complex64;

use super::units::{MAS_TO_RAD, deg_to_rad};

/// Applies the phase shift of a source offset by `(x, y)` mas to `amplitude`.
///
/// Returns `amplitude · exp(−2iπ·mas2rad·(x·u + y·v))`.
/// A source at the phase centre yields exactly `amplitude + 0i`.
#[must_use]
pub fn shift(u: f64, v: f64, x: f64, y: f64, amplitude: f64) -> Complex64 {
    if x == 0.0 && y == 0.0 {
        return Complex64::new(amplitude, 0.0);
    }
    let phase = -2.0 * std::f64::consts::PI * MAS_TO_RAD * (x * u + y * v);
    Complex64::from_polar(amplitude, phase)
}

/// Rotates `(u, v)` onto the shape's axes and scales the first axis.
///
/// The first output component lies along the axis at angle `beta`
/// (counter-clockwise from the `u` axis) and is multiplied by `axis_ratio`;
/// the second lies along the perpendicular axis and is left unscaled.
#[must_use]
pub fn rotate_scale(u: f64, v: f64, axis_ratio: f64, cos_beta: f64, sin_beta: f64) -> (f64, f64) {
    (
        axis_ratio * (u * cos_beta + v * sin_beta),
        -u * sin_beta + v * cos_beta,
    )
}

/// Precomputed anisotropic transform of a model.
///
/// Built once per model so that the trigonometry of the position angle is
/// not repeated for every frequency sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anamorphosis {
    axis_ratio: f64,
    cos_beta: f64,
    sin_beta: f64,
}

impl Anamorphosis {
    /// Elongation along the axis at `major_axis_pos_angle` degrees (East of North).
    ///
    /// A circular shape of the model's (minor-axis) size is stretched by
    /// `elong_ratio` along the major axis; its transform shrinks by the same
    /// factor, so the frequency component along that axis grows.
    #[must_use]
    pub fn elongated(elong_ratio: f64, major_axis_pos_angle: f64) -> Self {
        Self::new(elong_ratio, major_axis_pos_angle)
    }

    /// Flattening along the axis at `minor_axis_pos_angle` degrees (East of North).
    ///
    /// A circular shape of the model's (major-axis) size is compressed by
    /// `flatten_ratio` along the minor axis.
    #[must_use]
    pub fn flattened(flatten_ratio: f64, minor_axis_pos_angle: f64) -> Self {
        Self::new(flatten_ratio.recip(), minor_axis_pos_angle)
    }

    fn new(axis_ratio: f64, pos_angle: f64) -> Self {
        let beta = deg_to_rad(90.0 - pos_angle);
        Self {
            axis_ratio,
            cos_beta: beta.cos(),
            sin_beta: beta.sin(),
        }
    }

    /// Maps a frequency into the frame of the equivalent circular shape.
    #[must_use]
    pub fn apply(&self, u: f64, v: f64) -> (f64, f64) {
        rotate_scale(u, v, self.axis_ratio, self.cos_beta, self.sin_beta)
    }

    /// Radial frequency seen by the equivalent circular shape.
    #[must_use]
    pub fn radius(&self, u: f64, v: f64) -> f64 {
        let (u, v) = self.apply(u, v);
        u.hypot(v)
    }
}
