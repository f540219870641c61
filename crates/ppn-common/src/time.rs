//! Time and naming helpers shared by the pipeline and the archive.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike, Utc};
use thiserror::Error;

/// Compact timestamp format used on the command line and in file names.
pub const COMPACT_FORMAT: &str = "%Y%m%d%H%M";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeParseError {
    #[error("invalid timestamp '{0}', expected YYYYmmddHHMM")]
    InvalidFormat(String),
}

/// Parse a `YYYYmmddHHMM` timestamp as UTC.
pub fn parse_compact(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    NaiveDateTime::parse_from_str(s.trim(), COMPACT_FORMAT)
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .map_err(|_| TimeParseError::InvalidFormat(s.to_string()))
}

/// Floor a time to a multiple of `minutes` within the hour, dropping seconds.
pub fn floor_to_minutes(time: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
    let step = minutes.max(1);
    let floored = time.minute() - time.minute() % step;
    time.with_minute(floored)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Current UTC time floored to `minutes`.
pub fn utcnow_floored(minutes: u32) -> DateTime<Utc> {
    floor_to_minutes(Utc::now(), minutes)
}

/// Valid time of the lead time at zero-based `index`.
///
/// The first stored field is one timestep ahead of the nowcast start.
pub fn valid_time(start: DateTime<Utc>, index: usize, timestep_minutes: u32) -> DateTime<Utc> {
    start + Duration::minutes((index as i64 + 1) * timestep_minutes as i64)
}

/// Group name of an ensemble member, e.g. `member-00`.
pub fn member_name(index: usize) -> String {
    format!("member-{:02}", index)
}

/// Array name of a lead time, e.g. `leadtime-00`.
pub fn leadtime_name(index: usize) -> String {
    format!("leadtime-{:02}", index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compact() {
        let t = parse_compact("201908231200").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2019, 8, 23, 12, 0, 0).unwrap());
        assert!(parse_compact("2019-08-23").is_err());
    }

    #[test]
    fn test_floor_to_minutes() {
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 10, 37, 42).unwrap();
        assert_eq!(
            floor_to_minutes(t, 5),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 35, 0).unwrap()
        );
        assert_eq!(
            floor_to_minutes(t, 15),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_utcnow_floored_is_aligned() {
        let t = utcnow_floored(5);
        assert_eq!(t.minute() % 5, 0);
        assert_eq!(t.second(), 0);
    }

    #[test]
    fn test_valid_time() {
        let start = Utc.with_ymd_and_hms(2019, 8, 23, 12, 0, 0).unwrap();
        assert_eq!(
            valid_time(start, 0, 5),
            Utc.with_ymd_and_hms(2019, 8, 23, 12, 5, 0).unwrap()
        );
        assert_eq!(
            valid_time(start, 23, 5),
            Utc.with_ymd_and_hms(2019, 8, 23, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_names() {
        assert_eq!(member_name(3), "member-03");
        assert_eq!(leadtime_name(11), "leadtime-11");
        assert_eq!(member_name(100), "member-100");
    }
}
