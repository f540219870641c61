//! One nowcast run from observation lookup to archive.

use std::path::Path;
use std::sync::Arc;

use archive::{ArchiveSummary, ArchiveWriter, NowcastProducts, RunMetadata, StoragePlan};
use chrono::{DateTime, Utc};
use field_processor::{postprocess_forecast, preprocess_observations};
use motion_perturbation::MotionRegenerator;
use ppn_common::{FieldData, ForecastEnsemble, MotionField, ObservationSeries, Projection};
use ppn_config::{RequestedArtifacts, RunConfig};
use tracing::{debug, info, warn};

use crate::collaborators::{MotionEstimator, NowcastEngine, ObservationImporter};
use crate::error::{NowcastError, Result};
use crate::params::{NowcastParams, Variant};
use crate::registry;

/// Stages of a run, in order. A run only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStage {
    ConfigResolved,
    ObservationsRead,
    Preprocessed,
    MotionEstimated,
    MotionRegenerated,
    ForecastsGenerated,
    OutputPrepared,
    Written,
    Done,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Written(ArchiveSummary),
    /// Every store flag was off; no file was created.
    NothingToStore,
}

/// Products of the forecast stages plus what the archive needs to
/// describe them.
#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub products: NowcastProducts,
    /// Time of the newest observation.
    pub init_time: DateTime<Utc>,
    pub started: DateTime<Utc>,
    pub ended: DateTime<Utc>,
    pub projection: Option<Projection>,
}

/// Sequences a run over its collaborators.
pub struct NowcastPipeline {
    config: Arc<RunConfig>,
    importer: Box<dyn ObservationImporter>,
    estimator: Box<dyn MotionEstimator>,
    engine: Box<dyn NowcastEngine>,
    writer: ArchiveWriter,
    requested: RequestedArtifacts,
    stage: RunStage,
}

impl NowcastPipeline {
    pub fn new(
        config: Arc<RunConfig>,
        importer: Box<dyn ObservationImporter>,
        estimator: Box<dyn MotionEstimator>,
        engine: Box<dyn NowcastEngine>,
    ) -> Self {
        let requested = RequestedArtifacts::from_config(&config);
        let writer = ArchiveWriter::from_config(&config);
        Self {
            config,
            importer,
            estimator,
            engine,
            writer,
            requested,
            stage: RunStage::ConfigResolved,
        }
    }

    /// Use the estimator and engine named by `OPTFLOW_METHOD` and
    /// `NOWCAST_METHOD`.
    pub fn from_registry(config: Arc<RunConfig>, importer: Box<dyn ObservationImporter>) -> Result<Self> {
        let (estimator, engine) = registry::from_config(&config)?;
        Ok(Self::new(config, importer, estimator, engine))
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    fn advance(&mut self, stage: RunStage) {
        if stage > self.stage {
            debug!(from = ?self.stage, to = ?stage, "Run stage");
            self.stage = stage;
        }
    }

    /// Run every stage and write the archive to `output`.
    ///
    /// Storage flags are validated first so an inconsistent configuration
    /// fails before any observation is read. When nothing is to be stored
    /// the run stops there and no file is created.
    pub fn run(&mut self, start: DateTime<Utc>, output: &Path) -> Result<RunOutcome> {
        info!(
            %start,
            domain = %self.config.domain,
            output = %output.display(),
            "Nowcast run starting"
        );

        let plan = StoragePlan::from_requested(&self.requested).map_err(NowcastError::from_write)?;
        if plan.is_empty() {
            warn!("Nothing to store, skipping nowcast");
            self.advance(RunStage::Done);
            return Ok(RunOutcome::NothingToStore);
        }

        let run = self.forecast(start)?;
        let summary = self.write(&run, output)?;

        self.advance(RunStage::Done);
        info!(
            elapsed_s = (run.ended - run.started).num_seconds(),
            path = %summary.path.display(),
            "Nowcast run complete"
        );
        Ok(RunOutcome::Written(summary))
    }

    /// Observation, motion and forecast stages.
    ///
    /// Forecasts are returned in the `FIELD_VALUES` unit without transform.
    pub fn forecast(&mut self, start: DateTime<Utc>) -> Result<ForecastRun> {
        let started = Utc::now();

        let observations = self.read_observations(start)?;
        let observations = preprocess_observations(observations, &self.config)?;
        self.advance(RunStage::Preprocessed);

        let motion = self.estimator.estimate(&observations)?;
        self.advance(RunStage::MotionEstimated);

        let mut products = NowcastProducts::default();
        if self.config.regenerate_perturbed_motion {
            let set = MotionRegenerator::from_config(&self.config).regenerate(&motion)?;
            products.perturbed_motion = Some(set);
            self.advance(RunStage::MotionRegenerated);
        }

        let base = NowcastParams::base(&self.config, observations.metadata().threshold);
        for variant in Variant::ALL {
            if !variant.is_enabled(&self.config) {
                continue;
            }
            let forecast = self.generate(&observations, &motion, base.clone().for_variant(variant))?;
            match variant {
                Variant::Ensemble => products.ensemble = Some(forecast),
                Variant::Unperturbed => products.unperturbed = Some(forecast),
                Variant::Deterministic => products.deterministic = Some(forecast),
            }
        }
        products.motion = Some(motion);
        self.advance(RunStage::ForecastsGenerated);

        let ended = Utc::now();
        Ok(ForecastRun {
            products,
            init_time: observations.latest_timestamp(),
            started,
            ended,
            projection: observations.metadata().projection.clone(),
        })
    }

    fn read_observations(&mut self, start: DateTime<Utc>) -> Result<ObservationSeries> {
        let files = self
            .importer
            .find_candidates(start, self.config.num_prev_observations)
            .map_err(NowcastError::ObservationRead)?;
        let observations = self
            .importer
            .read(&files)
            .map_err(NowcastError::ObservationRead)?;
        let expected = self.config.num_prev_observations + 1;
        if observations.num_frames() != expected {
            return Err(NowcastError::ObservationRead(archive::ArchiveError::InvalidMetadata(
                format!(
                    "importer returned {} frames, expected {}",
                    observations.num_frames(),
                    expected
                ),
            )));
        }
        self.advance(RunStage::ObservationsRead);
        info!(
            frames = observations.num_frames(),
            latest = %observations.latest_timestamp(),
            "Read observations"
        );
        Ok(observations)
    }

    fn generate(
        &self,
        observations: &ObservationSeries,
        motion: &MotionField,
        params: NowcastParams,
    ) -> Result<ForecastEnsemble> {
        let timesteps = self.config.timesteps();
        let forecast = self.engine.generate(observations, motion, timesteps, &params)?;

        let shape = forecast.shape();
        if shape[0] != params.n_ens_members || shape[1] != timesteps {
            return Err(NowcastError::engine(
                self.engine.name(),
                format!(
                    "returned {} members x {} lead times, expected {} x {}",
                    shape[0], shape[1], params.n_ens_members, timesteps
                ),
            ));
        }

        let forecast = postprocess_forecast(forecast, &self.config)?;
        let unit = forecast.metadata().unit;
        if unit != self.config.output_unit() || forecast.metadata().is_decibel() {
            return Err(NowcastError::engine(
                self.engine.name(),
                format!("forecast ended in {} instead of {}", unit, self.config.output_unit()),
            ));
        }
        info!(members = shape[0], leadtimes = shape[1], %unit, "Generated forecast");
        Ok(forecast)
    }

    /// Encode and write a finished forecast run.
    pub fn write(&mut self, run: &ForecastRun, output: &Path) -> Result<ArchiveSummary> {
        let plan = StoragePlan::new(&self.requested, &run.products).map_err(NowcastError::from_write)?;
        self.advance(RunStage::OutputPrepared);

        let meta = RunMetadata {
            started: run.started,
            ended: run.ended,
            init_time: run.init_time,
            unit: self.config.output_unit(),
            seed: self.config.seed,
            timestep: self.config.nowcast_timestep,
            time_format: self.config.output_time_format.clone(),
            configuration: self.config.stringified(),
            projection: run.projection.clone(),
        };

        if let Some(dir) = output.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| NowcastError::Archive(archive::ArchiveError::io(dir, e)))?;
        }
        let summary = self
            .writer
            .write(output, &plan, &run.products, &meta)
            .map_err(NowcastError::from_write)?;
        self.advance(RunStage::Written);
        Ok(summary)
    }
}
