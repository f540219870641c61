//! Error types for field transforms and encoding.

use ppn_common::{Transform, Unit};
use thiserror::Error;

/// Errors raised by unit and value transforms.
///
/// Preconditions are checked before any value is touched, so a failed
/// call leaves the field unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// The field is not in the unit the operation converts from.
    #[error("{operation} expects unit {expected}, field is in {found}")]
    UnitMismatch {
        operation: &'static str,
        expected: Unit,
        found: Unit,
    },

    /// The field carries a different value transform than required.
    #[error("{operation} expects transform {expected}, field has {found}")]
    TransformMismatch {
        operation: &'static str,
        expected: Transform,
        found: Transform,
    },

    /// The metadata threshold cannot be used by the operation.
    #[error("{operation} requires a positive threshold, got {threshold}")]
    NonPositiveThreshold {
        operation: &'static str,
        threshold: f64,
    },

    /// A conversion coefficient is outside its valid range.
    #[error("invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Errors raised when encoding floats as fixed-point integers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    /// A scaled value does not fit below the reserved nodata code.
    #[error("scaled value {value} reaches the nodata code {max}; increase SCALE_ZERO or decrease SCALER")]
    Overflow { value: f64, max: u64 },

    /// A value lies below the configured offset.
    #[error("value {value} is below the offset {offset}")]
    Underflow { value: f64, offset: f64 },

    /// Scaler must be finite and positive.
    #[error("invalid scaler {0}")]
    InvalidScaler(f64),
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;
