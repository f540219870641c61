//! Orchestration of a probabilistic precipitation nowcast run.
//!
//! [`NowcastPipeline`] moves a run through the [`RunStage`]s: read and
//! preprocess observations, estimate motion, optionally regenerate the
//! ensemble's perturbed motion, generate the requested forecast
//! [`Variant`]s, convert them to the output unit and write the archive.
//!
//! Observation access, motion estimation and forecast generation sit
//! behind the [`ObservationImporter`], [`MotionEstimator`] and
//! [`NowcastEngine`] traits. The [`registry`] maps configured method names
//! to the [`baselines`] shipped with the crate.

pub mod baselines;
pub mod collaborators;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod registry;

pub use collaborators::{MotionEstimator, NowcastEngine, ObservationImporter};
pub use error::{NowcastError, Result};
pub use params::{NowcastMethod, NowcastParams, Variant, DEFAULT_NOISE_METHOD};
pub use pipeline::{ForecastRun, NowcastPipeline, RunOutcome, RunStage};
