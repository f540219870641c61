//! Decide what goes into the archive before anything is written.

use std::collections::BTreeSet;

use ppn_common::{ForecastEnsemble, MotionField, PerturbedMotionSet};
use ppn_config::{Artifact, RequestedArtifacts};
use tracing::debug;

use crate::error::{ArchiveError, Result};

/// Everything a nowcast run produced, already in the output unit.
#[derive(Debug, Clone, Default)]
pub struct NowcastProducts {
    pub ensemble: Option<ForecastEnsemble>,
    pub unperturbed: Option<ForecastEnsemble>,
    pub deterministic: Option<ForecastEnsemble>,
    pub motion: Option<MotionField>,
    pub perturbed_motion: Option<PerturbedMotionSet>,
}

impl NowcastProducts {
    pub fn contains(&self, artifact: Artifact) -> bool {
        match artifact {
            Artifact::Ensemble => self.ensemble.is_some(),
            Artifact::Unperturbed => self.unperturbed.is_some(),
            Artifact::Deterministic => self.deterministic.is_some(),
            Artifact::Motion => self.motion.is_some(),
            Artifact::PerturbedMotion => self.perturbed_motion.is_some(),
        }
    }

    /// Forecast products in archive order.
    pub fn forecasts(&self) -> impl Iterator<Item = (Artifact, &ForecastEnsemble)> {
        [
            (Artifact::Ensemble, self.ensemble.as_ref()),
            (Artifact::Unperturbed, self.unperturbed.as_ref()),
            (Artifact::Deterministic, self.deterministic.as_ref()),
        ]
        .into_iter()
        .filter_map(|(artifact, fct)| fct.map(|f| (artifact, f)))
    }
}

/// Products that must be present whenever their storage is requested.
///
/// A missing ensemble or deterministic forecast is a configuration fault.
/// Unperturbed forecasts and perturbed motion are optional extras that
/// are skipped when not generated.
fn is_strict(artifact: Artifact) -> bool {
    matches!(
        artifact,
        Artifact::Ensemble | Artifact::Deterministic | Artifact::Motion
    )
}

/// Validated set of products to write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoragePlan {
    artifacts: BTreeSet<Artifact>,
}

impl StoragePlan {
    /// Check the store requests against the generate requests.
    ///
    /// Used at the start of a run so inconsistent flags fail before any
    /// observation is read.
    pub fn from_requested(requested: &RequestedArtifacts) -> Result<Self> {
        Self::build(requested, |a| requested.generates(a), "disabled in configuration")
    }

    /// Check the store requests against the products of a finished run.
    pub fn new(requested: &RequestedArtifacts, products: &NowcastProducts) -> Result<Self> {
        Self::build(requested, |a| products.contains(a), "not produced by the run")
    }

    fn build(
        requested: &RequestedArtifacts,
        available: impl Fn(Artifact) -> bool,
        reason: &'static str,
    ) -> Result<Self> {
        let mut artifacts = BTreeSet::new();
        for artifact in requested.stored() {
            if available(artifact) {
                artifacts.insert(artifact);
            } else if is_strict(artifact) {
                return Err(ArchiveError::StorageInconsistency { artifact, reason });
            } else {
                debug!(%artifact, reason, "Skipping storage of unavailable product");
            }
        }
        Ok(Self { artifacts })
    }

    pub fn includes(&self, artifact: Artifact) -> bool {
        self.artifacts.contains(&artifact)
    }

    pub fn artifacts(&self) -> impl Iterator<Item = Artifact> + '_ {
        self.artifacts.iter().copied()
    }

    /// True when the run has nothing to write.
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
