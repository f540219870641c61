//! Error types for configuration resolution.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving a run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The requested profile is neither built in nor present in the profile directory.
    #[error("unknown configuration profile '{0}'")]
    UnknownProfile(String),

    /// A profile overrides a key that has no default.
    #[error("profile '{profile}' sets unknown key '{key}'")]
    UnknownKey { profile: String, key: String },

    /// The merged table could not be turned into a typed configuration.
    #[error("invalid value in profile '{profile}': {message}")]
    InvalidValue { profile: String, message: String },

    /// A profile file exists but could not be read.
    #[error("failed to read profile {path}: {source}")]
    ProfileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A profile file is not a YAML mapping.
    #[error("failed to parse profile {path}: {message}")]
    ProfileParse { path: PathBuf, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(profile: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            profile: profile.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
