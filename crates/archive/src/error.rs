//! Error types for archive reads and writes.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use field_processor::EncodingError;
use ppn_common::FieldError;
use ppn_config::Artifact;
use thiserror::Error;

/// Errors raised while reading observations or writing a nowcast archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// A product is requested for storage but the run does not produce it.
    #[error("cannot store {artifact}: {reason}")]
    StorageInconsistency {
        artifact: Artifact,
        reason: &'static str,
    },

    /// A product does not fit the storage encoding.
    #[error("cannot encode {product}: {source}")]
    Encoding {
        product: String,
        #[source]
        source: EncodingError,
    },

    /// No observation file exists for a required time.
    #[error("no observation for {time} at {path}")]
    MissingObservation { time: DateTime<Utc>, path: PathBuf },

    /// An observation file could not be opened or decoded.
    #[error("failed to read observation {path}: {message}")]
    ObservationRead { path: PathBuf, message: String },

    /// Stored attributes are missing or inconsistent.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Zarr store error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Field(#[from] FieldError),
}

impl ArchiveError {
    pub fn storage(msg: impl std::fmt::Display) -> Self {
        Self::Storage(msg.to_string())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn read_failed(path: impl Into<PathBuf>, msg: impl std::fmt::Display) -> Self {
        Self::ObservationRead {
            path: path.into(),
            message: msg.to_string(),
        }
    }
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;
