//! Interfaces to the components a run delegates to.

use archive::{ArchiveError, ObservationFile, ZarrImporter};
use chrono::{DateTime, Utc};
use ppn_common::{ForecastEnsemble, MotionField, ObservationSeries};

use crate::error::Result;
use crate::params::NowcastParams;

/// Source of radar observations.
pub trait ObservationImporter: Send + Sync {
    /// Locate the observation at `start` and the `num_prev` preceding ones.
    ///
    /// # Returns
    /// Files ordered oldest first. A missing file is an error.
    fn find_candidates(
        &self,
        start: DateTime<Utc>,
        num_prev: usize,
    ) -> std::result::Result<Vec<ObservationFile>, ArchiveError>;

    /// Read the located files into one series.
    fn read(&self, files: &[ObservationFile]) -> std::result::Result<ObservationSeries, ArchiveError>;
}

impl ObservationImporter for ZarrImporter {
    fn find_candidates(
        &self,
        start: DateTime<Utc>,
        num_prev: usize,
    ) -> std::result::Result<Vec<ObservationFile>, ArchiveError> {
        ZarrImporter::find_candidates(self, start, num_prev)
    }

    fn read(&self, files: &[ObservationFile]) -> std::result::Result<ObservationSeries, ArchiveError> {
        ZarrImporter::read(self, files)
    }
}

/// Optical-flow estimator.
pub trait MotionEstimator: Send + Sync {
    /// Name used in `OPTFLOW_METHOD`.
    fn name(&self) -> &str;

    /// Estimate one motion field from the whole series.
    ///
    /// Must be a pure function of `observations`.
    fn estimate(&self, observations: &ObservationSeries) -> Result<MotionField>;
}

/// Forecast generator.
pub trait NowcastEngine: Send + Sync {
    /// Name used in `NOWCAST_METHOD`.
    fn name(&self) -> &str;

    /// Extrapolate `observations` for `timesteps` lead times.
    ///
    /// # Arguments
    /// * `observations` - preprocessed series, newest frame last
    /// * `motion` - base motion in pixels per timestep
    /// * `timesteps` - number of lead times to produce
    /// * `params` - variant specific keyword surface
    ///
    /// # Returns
    /// `params.n_ens_members` members in the unit and transform of
    /// `observations`. Identical inputs with an explicit seed give
    /// identical output.
    fn generate(
        &self,
        observations: &ObservationSeries,
        motion: &MotionField,
        timesteps: usize,
        params: &NowcastParams,
    ) -> Result<ForecastEnsemble>;
}
