//! Fake collaborators for pipeline tests.
//!
//! Each fake shares its call log through an `Arc` so tests can inspect it
//! after the pipeline has taken ownership of the boxed collaborator.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use archive::{ArchiveError, ObservationFile};
use chrono::{DateTime, Utc};
use nowcast::baselines::Advection;
use nowcast::{MotionEstimator, NowcastEngine, NowcastParams, ObservationImporter, Result};
use ppn_common::{FieldData, FieldMetadata, ForecastEnsemble, MotionField, ObservationSeries};

/// Serves a fixed series and counts lookups.
pub struct InMemoryImporter {
    series: Option<ObservationSeries>,
    pub lookups: Arc<Mutex<usize>>,
}

impl InMemoryImporter {
    pub fn new(series: ObservationSeries) -> Self {
        Self {
            series: Some(series),
            lookups: Arc::new(Mutex::new(0)),
        }
    }

    /// An importer whose archive is empty.
    pub fn missing() -> Self {
        Self {
            series: None,
            lookups: Arc::new(Mutex::new(0)),
        }
    }
}

impl ObservationImporter for InMemoryImporter {
    fn find_candidates(
        &self,
        start: DateTime<Utc>,
        _num_prev: usize,
    ) -> std::result::Result<Vec<ObservationFile>, ArchiveError> {
        *self.lookups.lock().unwrap() += 1;
        match &self.series {
            Some(series) => Ok(series
                .timestamps()
                .iter()
                .map(|&time| ObservationFile {
                    time,
                    path: format!("memory://{}", time.format("%Y%m%d%H%M")).into(),
                })
                .collect()),
            None => Err(ArchiveError::MissingObservation {
                time: start,
                path: "memory://missing".into(),
            }),
        }
    }

    fn read(&self, _files: &[ObservationFile]) -> std::result::Result<ObservationSeries, ArchiveError> {
        self.series
            .clone()
            .ok_or_else(|| ArchiveError::InvalidMetadata("empty archive".to_string()))
    }
}

/// Returns a fixed motion field.
pub struct FixedMotion(pub MotionField);

impl MotionEstimator for FixedMotion {
    fn name(&self) -> &str {
        "fixed"
    }

    fn estimate(&self, _observations: &ObservationSeries) -> Result<MotionField> {
        Ok(self.0.clone())
    }
}

/// One engine call as seen by the engine.
#[derive(Debug, Clone)]
pub struct EngineCall {
    pub params: NowcastParams,
    pub observation_metadata: FieldMetadata,
    pub timesteps: usize,
}

/// Delegates to the advection baseline and records every call.
#[derive(Default)]
pub struct RecordingEngine {
    pub calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl NowcastEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn generate(
        &self,
        observations: &ObservationSeries,
        motion: &MotionField,
        timesteps: usize,
        params: &NowcastParams,
    ) -> Result<ForecastEnsemble> {
        self.calls.lock().unwrap().push(EngineCall {
            params: params.clone(),
            observation_metadata: observations.metadata().clone(),
            timesteps,
        });
        Advection.generate(observations, motion, timesteps, params)
    }
}
