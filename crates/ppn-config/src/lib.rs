//! Run configuration for the precipitation nowcaster.
//!
//! A run is parameterized by a flat table of upper-case keys. The full
//! defaults table is overridden by exactly one named profile, either built
//! in or loaded from a YAML file, and the result is frozen into a typed
//! [`RunConfig`] that every component receives by reference.
//!
//! ```ignore
//! let config = ConfigResolver::new().resolve(Some("test"))?;
//! let requested = RequestedArtifacts::from_config(&config);
//! ```

pub mod artifacts;
pub mod config;
pub mod error;
pub mod profiles;
pub mod resolver;

pub use artifacts::{Artifact, RequestedArtifacts};
pub use config::{RunConfig, ScaleZero, ValueDomain, VelPertKwargs};
pub use error::{ConfigError, Result};
pub use resolver::{ConfigResolver, FALLBACK_OUTPUT_PATH, OUTPUT_PATH_ENV};
