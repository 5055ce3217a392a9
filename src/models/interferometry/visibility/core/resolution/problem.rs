//! Radial cut of a model list and the level-crossing equation on it.

use std::convert::Infallible;

use twine_core::{EquationProblem, Model};

use super::super::shape::ModelSet;

/// Normalised amplitude at one radial frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct RadialSample {
    pub(super) frequency: f64,
    pub(super) amplitude: f64,
}

/// Amplitude of a model list along a line through the origin of the UV
/// plane, normalised by the total flux.
pub(super) struct RadialCut<'a> {
    set: &'a ModelSet,
    sin_pa: f64,
    cos_pa: f64,
    flux: f64,
}

impl<'a> RadialCut<'a> {
    /// `position_angle` is in radians, East of North.
    pub(super) fn new(set: &'a ModelSet, position_angle: f64, flux: f64) -> Self {
        Self {
            set,
            sin_pa: position_angle.sin(),
            cos_pa: position_angle.cos(),
            flux,
        }
    }

    pub(super) fn amplitude(&self, frequency: f64) -> f64 {
        let (u, v) = (frequency * self.sin_pa, frequency * self.cos_pa);
        self.set.visibility(u, v).norm() / self.flux
    }
}

impl Model for RadialCut<'_> {
    type Input = f64;
    type Output = RadialSample;
    type Error = Infallible;

    fn call(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
        Ok(RadialSample {
            frequency: *input,
            amplitude: self.amplitude(*input),
        })
    }
}

/// Residual `amplitude - level`.
pub(super) struct LevelCrossing {
    level: f64,
}

impl LevelCrossing {
    pub(super) fn new(level: f64) -> Self {
        Self { level }
    }
}

impl EquationProblem<1> for LevelCrossing {
    type Input = f64;
    type Output = RadialSample;
    type Error = Infallible;

    fn input(&self, x: &[f64; 1]) -> Result<Self::Input, Self::Error> {
        Ok(x[0])
    }

    fn residuals(
        &self,
        _input: &Self::Input,
        output: &Self::Output,
    ) -> Result<[f64; 1], Self::Error> {
        Ok([output.amplitude - self.level])
    }
}
