//! Zarr V3 storage for the nowcaster.
//!
//! - [`ArchiveWriter`] lays out a finished run (forecast groups, motion,
//!   perturbed motion and run metadata) in a directory store. What gets
//!   written is decided up front by a [`StoragePlan`].
//! - [`ZarrImporter`] locates and reads the radar observations a run
//!   starts from.

pub mod error;
pub mod importer;
pub mod layout;
pub mod plan;
pub mod writer;

pub use error::{ArchiveError, Result};
pub use importer::{store_observation, DataSource, ObservationFile, ZarrImporter};
pub use layout::{output_file_name, TEST_OUTPUT_NAME};
pub use plan::{NowcastProducts, StoragePlan};
pub use writer::{ArchiveSummary, ArchiveWriter, EncodingSettings, RunMetadata};
