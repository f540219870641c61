//! Run-level error taxonomy.

use archive::ArchiveError;
use field_processor::{EncodingError, TransformError};
use motion_perturbation::MotionError;
use ppn_common::FieldError;
use ppn_config::{Artifact, ConfigError};
use thiserror::Error;

/// Errors that end a nowcast run.
///
/// None of them are retried: a failed run is re-run from the start.
#[derive(Error, Debug)]
pub enum NowcastError {
    /// Unresolvable profile, unsupported method or missing seed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Observation lookup or decoding failed.
    #[error("failed to read observations: {0}")]
    ObservationRead(#[source] ArchiveError),

    /// A product does not fit the storage encoding.
    #[error("cannot encode {product} for storage: {source}")]
    EncodingOverflow {
        product: String,
        #[source]
        source: EncodingError,
    },

    /// A product is requested for storage but never generated.
    #[error("cannot store {artifact}: {reason}")]
    StorageInconsistency {
        artifact: Artifact,
        reason: &'static str,
    },

    /// Unit or value transform precondition failed.
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),

    /// Motion estimation or forecast generation failed.
    #[error("{method} failed: {message}")]
    Engine { method: String, message: String },

    /// Writing the archive failed.
    #[error("archive write failed: {0}")]
    Archive(#[source] ArchiveError),
}

impl NowcastError {
    pub fn engine(method: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Engine {
            method: method.into(),
            message: message.to_string(),
        }
    }

    /// Classify an archive error raised while writing.
    pub fn from_write(err: ArchiveError) -> Self {
        match err {
            ArchiveError::StorageInconsistency { artifact, reason } => {
                Self::StorageInconsistency { artifact, reason }
            }
            ArchiveError::Encoding { product, source } => Self::EncodingOverflow { product, source },
            other => Self::Archive(other),
        }
    }
}

impl From<ConfigError> for NowcastError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<MotionError> for NowcastError {
    fn from(err: MotionError) -> Self {
        match err {
            MotionError::Field(e) => Self::engine("motion regeneration", e),
            other => Self::Configuration(other.to_string()),
        }
    }
}

impl From<FieldError> for NowcastError {
    fn from(err: FieldError) -> Self {
        Self::engine("field assembly", err)
    }
}

/// Result type for nowcast operations.
pub type Result<T> = std::result::Result<T, NowcastError>;
