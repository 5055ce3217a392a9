use thiserror::Error;

use crate::support::{constraint::ConstraintError, parallel::JobError};

/// The bound a parameter value violates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Min(f64),
    Max(f64),
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Min(min) => write!(f, "minimum {min}"),
            Self::Max(max) => write!(f, "maximum {max}"),
        }
    }
}

/// Errors raised while building, validating or evaluating models.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown model type `{0}`")]
    UnknownModelType(String),

    #[error("parameter `{parameter}` of model `{model}` violates its {bound}: value={value}")]
    ParameterOutOfRange {
        parameter: String,
        model: String,
        bound: Bound,
        value: f64,
    },

    #[error("model `{model}` has no `{parameter}` parameter")]
    MissingParameter { model: String, parameter: String },

    #[error("model `{0}` has child models; composite models are not supported")]
    CompositeUnsupported(String),

    #[error("invalid shape for model `{model}`")]
    Constraint {
        model: String,
        #[source]
        source: ConstraintError,
    },

    #[error("frequency arrays differ in length: u={u}, v={v}")]
    SampleLengthMismatch { u: usize, v: usize },

    #[error("visibility computation failed")]
    Job(#[from] JobError),
}
