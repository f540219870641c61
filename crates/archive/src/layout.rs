//! Node paths of the nowcast archive.
//!
//! ```text
//! /                              root group
//! /member-00 .. /member-NN       ensemble members
//! /unperturbed                   control forecast
//! /deterministic                 extrapolation forecast
//!   /leadtime-00 .. leadtime-KK  uint16 [y, x], one per lead time
//! /motion                        float32 [2, y, x]
//! /perturbed-motion/member-NN    float32 [2, y, x]
//! /meta                          run attributes
//! /meta/configuration            resolved configuration, values as text
//! /meta/projection               spatial reference
//! ```

use std::fmt::Write;

use chrono::{DateTime, Utc};
use ppn_common::{leadtime_name, member_name};

use crate::error::{ArchiveError, Result};

pub const ROOT: &str = "/";
pub const UNPERTURBED_GROUP: &str = "/unperturbed";
pub const DETERMINISTIC_GROUP: &str = "/deterministic";
pub const MOTION_ARRAY: &str = "/motion";
pub const PERTURBED_MOTION_GROUP: &str = "/perturbed-motion";
pub const META_GROUP: &str = "/meta";
pub const CONFIGURATION_GROUP: &str = "/meta/configuration";
pub const PROJECTION_GROUP: &str = "/meta/projection";

/// Output name used by development runs.
pub const TEST_OUTPUT_NAME: &str = "00_nc_dev.zarr";

/// `nc_YYYYmmddHHMM.zarr`
pub fn output_file_name(start: DateTime<Utc>) -> String {
    format!("nc_{}.zarr", start.format("%Y%m%d%H%M"))
}

pub fn member_group(index: usize) -> String {
    format!("/{}", member_name(index))
}

pub fn leadtime_array(group: &str, index: usize) -> String {
    format!("{}/{}", group.trim_end_matches('/'), leadtime_name(index))
}

pub fn perturbed_motion_array(member: usize) -> String {
    format!("{}/{}", PERTURBED_MOTION_GROUP, member_name(member))
}

/// Format `time` with a user supplied strftime pattern.
///
/// Unlike `DelayedFormat::to_string`, an invalid pattern is an error
/// instead of a panic.
pub fn format_time(time: DateTime<Utc>, pattern: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", time.format(pattern))
        .map_err(|_| ArchiveError::InvalidMetadata(format!("invalid time format '{}'", pattern)))?;
    Ok(out)
}
