use thiserror::Error;
use twine_solvers::equation::bisection;

use super::super::error::ModelError;

/// Errors raised while searching for a resolving frequency.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("invalid model list")]
    Model(#[from] ModelError),

    #[error("bisection solver error")]
    Bisection(#[from] bisection::Error),

    /// The scan range is empty, not positive, or not finite.
    #[error("invalid scan range [{min_frequency}, {max_frequency}] rad⁻¹")]
    InvalidScanRange {
        min_frequency: f64,
        max_frequency: f64,
    },

    /// The models have no flux to normalise by.
    #[error("total flux is zero")]
    ZeroFlux,

    /// The amplitude never drops to the requested level within the scan.
    #[error("amplitude stays above {level} up to {max_frequency} rad⁻¹")]
    NotBracketed { level: f64, max_frequency: f64 },

    #[error("solver hit iteration limit: residual={residual}")]
    MaxIters { residual: f64, iters: usize },
}
