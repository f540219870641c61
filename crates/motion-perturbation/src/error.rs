//! Error types for motion perturbation.

use ppn_common::FieldError;
use thiserror::Error;

/// Errors raised while regenerating perturbed motion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// Regeneration needs a fixed root seed.
    #[error("SEED must be set to regenerate perturbed motion fields")]
    MissingSeed,

    /// The configured perturbation method is not available.
    #[error("unsupported motion perturbation method '{0}'")]
    UnsupportedMethod(String),

    /// A perturbation parameter is outside its valid range.
    #[error("invalid motion perturbation parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Perturbation and base motion shapes disagree.
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Result type for motion perturbation operations.
pub type Result<T> = std::result::Result<T, MotionError>;
