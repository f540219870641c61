//! Error types for field containers.

use thiserror::Error;

/// Errors raised when constructing or slicing field containers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// Data length does not match the declared dimensions.
    #[error("data length {actual} does not match shape {shape:?} (expected {expected})")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// An index along one axis is outside the container.
    #[error("{axis} index {index} out of range (len {len})")]
    IndexOutOfRange {
        axis: &'static str,
        index: usize,
        len: usize,
    },

    /// Frames or members with differing grid shapes were combined.
    #[error("grid shape {found:?} differs from expected {expected:?}")]
    GridMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A container needs at least one frame.
    #[error("empty {0}")]
    Empty(&'static str),
}

impl FieldError {
    pub(crate) fn shape_mismatch(shape: &[usize], actual: usize) -> Self {
        Self::ShapeMismatch {
            shape: shape.to_vec(),
            expected: shape.iter().product(),
            actual,
        }
    }
}

/// Result type for field container operations.
pub type Result<T> = std::result::Result<T, FieldError>;
