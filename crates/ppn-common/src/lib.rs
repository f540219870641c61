//! Shared types for the probabilistic precipitation nowcaster.
//!
//! Every field array travels together with a [`FieldMetadata`] describing
//! the unit and transform the values are currently expressed in. The
//! containers here ([`ObservationSeries`], [`ForecastEnsemble`],
//! [`MotionField`]) store row-major `f32` data with explicit shapes, the
//! same convention used for gridded data throughout the workspace.

pub mod error;
pub mod field;
pub mod motion;
pub mod series;
pub mod time;

pub use error::{FieldError, Result};
pub use field::{FieldMetadata, GridShape, Projection, Transform, Unit};
pub use motion::{DerivationProtocol, MotionField, PerturbedMotionSet};
pub use series::{FieldData, ForecastEnsemble, ObservationSeries};
pub use time::{
    floor_to_minutes, leadtime_name, member_name, parse_compact, utcnow_floored, valid_time,
    TimeParseError,
};
