//! Keyword surface of a forecast generation call.

use ppn_config::{RunConfig, VelPertKwargs};
use serde::Serialize;

/// Noise method requested for ensemble members.
pub const DEFAULT_NOISE_METHOD: &str = "nonparametric";

/// How the engine evolves the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NowcastMethod {
    /// Stochastic cascade nowcast.
    Steps,
    /// Plain advection of the latest observation.
    Extrapolation,
}

/// Forecast variants a run can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// `ENSEMBLE_SIZE` stochastic members.
    Ensemble,
    /// One member with noise and motion perturbation disabled.
    Unperturbed,
    /// Extrapolation only.
    Deterministic,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Ensemble, Variant::Unperturbed, Variant::Deterministic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ensemble => "ensemble",
            Self::Unperturbed => "unperturbed",
            Self::Deterministic => "deterministic",
        }
    }

    /// Whether the run configuration asks for this variant.
    pub fn is_enabled(&self, config: &RunConfig) -> bool {
        match self {
            Self::Ensemble => config.generate_ensemble,
            Self::Unperturbed => config.generate_unperturbed,
            Self::Deterministic => config.generate_deterministic,
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters passed to [`crate::NowcastEngine::generate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NowcastParams {
    pub method: NowcastMethod,
    pub n_cascade_levels: usize,
    pub kmperpixel: f64,
    /// Minutes.
    pub timestep: u32,
    pub num_workers: usize,
    pub fft_method: String,
    pub n_ens_members: usize,
    pub noise_method: Option<String>,
    pub vel_pert_method: Option<String>,
    pub vel_pert_kwargs: Option<VelPertKwargs>,
    pub seed: Option<u64>,
    /// Precipitation threshold in the unit and transform of the observations.
    pub precip_threshold: f64,
}

impl NowcastParams {
    /// Parameters shared by every variant.
    ///
    /// `precip_threshold` is taken from the preprocessed observations so it
    /// is already in the transformed domain.
    pub fn base(config: &RunConfig, precip_threshold: f64) -> Self {
        Self {
            method: NowcastMethod::Steps,
            n_cascade_levels: config.num_cascades,
            kmperpixel: config.kmperpixel,
            timestep: config.nowcast_timestep,
            num_workers: config.num_workers,
            fft_method: config.fft_method.clone(),
            n_ens_members: config.ensemble_size,
            noise_method: Some(DEFAULT_NOISE_METHOD.to_string()),
            vel_pert_method: config.vel_pert_method.clone(),
            vel_pert_kwargs: config.vel_pert_kwargs,
            seed: config.seed,
            precip_threshold,
        }
    }

    /// Apply the overrides of `variant`.
    pub fn for_variant(mut self, variant: Variant) -> Self {
        match variant {
            Variant::Ensemble => {}
            Variant::Unperturbed => {
                self.n_ens_members = 1;
                self.noise_method = None;
                self.vel_pert_method = None;
            }
            Variant::Deterministic => {
                self.method = NowcastMethod::Extrapolation;
                self.n_ens_members = 1;
                self.noise_method = None;
                self.vel_pert_method = None;
                self.vel_pert_kwargs = None;
            }
        }
        self
    }

    /// True when members differ from each other.
    pub fn is_stochastic(&self) -> bool {
        self.noise_method.is_some() || self.vel_pert_method.is_some()
    }
}
