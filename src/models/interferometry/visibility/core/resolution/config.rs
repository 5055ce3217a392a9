use twine_solvers::equation::bisection;

use super::error::ResolutionError;

/// Settings for [`resolving_frequency`](super::resolving_frequency).
#[derive(Debug, Clone, Copy)]
pub struct ResolutionConfig {
    /// Normalised amplitude the search stops at.
    pub level: f64,

    /// Start of the bracketing scan, in rad⁻¹.
    pub min_frequency: f64,

    /// End of the bracketing scan, in rad⁻¹.
    pub max_frequency: f64,

    /// Geometrically spaced samples of the bracketing scan.
    pub scan_steps: usize,

    /// Maximum iteration count for the bisection solve.
    pub max_iters: usize,

    /// Absolute tolerance on the frequency, in rad⁻¹.
    pub freq_tol: f64,

    /// Absolute tolerance on the amplitude residual.
    pub amplitude_tol: f64,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            level: 0.5,
            min_frequency: 1e3,
            max_frequency: 1e11,
            scan_steps: 400,
            max_iters: 100,
            freq_tol: 1e-3,
            amplitude_tol: 1e-12,
        }
    }
}

impl ResolutionConfig {
    /// Checks that the scan covers a finite range of positive frequencies.
    pub(super) fn check_scan(&self) -> Result<(), ResolutionError> {
        let valid = self.min_frequency > 0.0
            && self.max_frequency.is_finite()
            && self.max_frequency >= self.min_frequency;
        if valid {
            Ok(())
        } else {
            Err(ResolutionError::InvalidScanRange {
                min_frequency: self.min_frequency,
                max_frequency: self.max_frequency,
            })
        }
    }

    pub(super) fn bisection(&self) -> bisection::Config {
        bisection::Config {
            max_iters: self.max_iters,
            x_abs_tol: self.freq_tol,
            x_rel_tol: 0.0,
            residual_tol: self.amplitude_tol,
        }
    }
}
