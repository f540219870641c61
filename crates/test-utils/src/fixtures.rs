//! Common test fixtures for nowcaster tests.
//!
//! This module provides pre-defined metadata, times and observation
//! series that represent common scenarios in radar nowcasting.

use chrono::{DateTime, Duration, TimeZone, Utc};
use ppn_common::{FieldMetadata, GridShape, ObservationSeries, Projection, Unit};

use crate::generators::reflectivity_frames;

/// Seed used by the motion perturbation regression tests.
pub const GOLDEN_SEED: u64 = 20190823;

/// Metadata of a raw reflectivity composite.
pub fn dbz_metadata() -> FieldMetadata {
    FieldMetadata::new(Unit::Dbz, -10.0, -10.0)
}

/// Metadata of a raw rain-rate composite.
pub fn rainrate_metadata() -> FieldMetadata {
    FieldMetadata::new(Unit::MmPerHour, 0.0, 0.1)
}

/// Polar stereographic projection of the FMI radar composite.
pub fn fmi_projection() -> Projection {
    Projection {
        projstr: "+proj=stere +lon_0=25E +lat_0=90N +lat_ts=60 +a=6371288 +x_0=380886.310 \
                  +y_0=3395677.920 +no_defs"
            .to_string(),
        x1: 0.0,
        y1: 0.0,
        x2: 760000.0,
        y2: 1226000.0,
        xpixelsize: 1000.0,
        ypixelsize: 1000.0,
        yorigin: "upper".to_string(),
    }
}

/// Nowcast start time used across tests (2019-08-23 12:00 UTC).
pub fn nowcast_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 8, 23, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// `n` observation times ending at `end`, oldest first.
pub fn observation_times(end: DateTime<Utc>, n: usize, step_minutes: i64) -> Vec<DateTime<Utc>> {
    (0..n)
        .rev()
        .map(|i| end - Duration::minutes(step_minutes * i as i64))
        .collect()
}

/// A reflectivity series of `n` frames 5 minutes apart ending at
/// [`nowcast_start`], with a rain cell moving one pixel right per frame.
pub fn observation_series(n: usize, grid: GridShape) -> ObservationSeries {
    let meta = dbz_metadata().with_projection(fmi_projection());
    match ObservationSeries::from_frames(
        reflectivity_frames(n, grid),
        grid,
        observation_times(nowcast_start(), n, 5),
        meta,
    ) {
        Ok(series) => series,
        Err(e) => panic!("invalid fixture series: {}", e),
    }
}
