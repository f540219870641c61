//! Rebuild the per-member motion fields of an ensemble run.

use ppn_common::{DerivationProtocol, MotionField, PerturbedMotionSet};
use ppn_config::{RunConfig, VelPertKwargs};
use tracing::{debug, info};

use crate::bps::{BpsParams, BpsPerturbator};
use crate::derivation::SeedChain;
use crate::error::{MotionError, Result};

/// Motion perturbation methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelPertMethod {
    Bps,
}

impl VelPertMethod {
    /// `None` disables perturbation.
    pub fn parse(name: Option<&str>) -> Result<Option<Self>> {
        match name {
            None => Ok(None),
            Some(n) if n.eq_ignore_ascii_case("bps") => Ok(Some(Self::Bps)),
            Some(other) => Err(MotionError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Inputs of a regeneration, taken from the run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RegenerationParams {
    pub seed: Option<u64>,
    pub ensemble_size: usize,
    pub timestep: u32,
    pub kmperpixel: f64,
    pub vel_pert_method: Option<String>,
    pub vel_pert_kwargs: Option<VelPertKwargs>,
    pub protocol: DerivationProtocol,
}

impl RegenerationParams {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            seed: config.seed,
            ensemble_size: config.ensemble_size,
            timestep: config.nowcast_timestep,
            kmperpixel: config.kmperpixel,
            vel_pert_method: config.vel_pert_method.clone(),
            vel_pert_kwargs: config.vel_pert_kwargs,
            protocol: DerivationProtocol::StepsV1,
        }
    }
}

/// Replays the engine's seed chain to recover each member's perturbed motion.
#[derive(Debug, Clone)]
pub struct MotionRegenerator {
    params: RegenerationParams,
}

impl MotionRegenerator {
    pub fn new(params: RegenerationParams) -> Self {
        Self { params }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(RegenerationParams::from_config(config))
    }

    pub fn params(&self) -> &RegenerationParams {
        &self.params
    }

    /// Perturbed motion of every member.
    ///
    /// Member `m` is `motion` plus its perturbation sampled at
    /// `timestep * (m + 1)` minutes. Fails without a seed.
    pub fn regenerate(&self, motion: &MotionField) -> Result<PerturbedMotionSet> {
        let p = &self.params;
        let seed = p.seed.ok_or(MotionError::MissingSeed)?;
        let method = VelPertMethod::parse(p.vel_pert_method.as_deref())?;
        let bps = BpsParams::new(p.vel_pert_kwargs.as_ref(), p.kmperpixel, p.timestep as f64)?;

        info!(
            seed,
            members = p.ensemble_size,
            method = ?method,
            "Regenerating perturbed motion fields"
        );

        let mut fields = Vec::with_capacity(p.ensemble_size);
        for mut streams in SeedChain::new(p.protocol, seed).take(p.ensemble_size) {
            let field = match method {
                Some(VelPertMethod::Bps) => {
                    let state = BpsPerturbator::init(motion, bps, &mut streams.motion_rng);
                    let t = (p.timestep as usize * (streams.member + 1)) as f64;
                    state.sample(t).add_to(motion)?
                }
                None => motion.clone(),
            };
            debug!(
                member = streams.member,
                precip_seed = streams.precip_seed,
                motion_seed = streams.motion_seed,
                "Regenerated member motion"
            );
            fields.push(field);
        }

        Ok(PerturbedMotionSet {
            fields,
            seed,
            protocol: p.protocol,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppn_common::GridShape;

    fn params(seed: Option<u64>) -> RegenerationParams {
        RegenerationParams {
            seed,
            ensemble_size: 3,
            timestep: 5,
            kmperpixel: 1.0,
            vel_pert_method: Some("bps".to_string()),
            vel_pert_kwargs: None,
            protocol: DerivationProtocol::StepsV1,
        }
    }

    #[test]
    fn test_missing_seed() {
        let motion = MotionField::uniform(1.0, 1.0, GridShape::new(2, 2));
        let err = MotionRegenerator::new(params(None))
            .regenerate(&motion)
            .unwrap_err();
        assert_eq!(err, MotionError::MissingSeed);
    }

    #[test]
    fn test_unknown_method() {
        let mut p = params(Some(1));
        p.vel_pert_method = Some("gaussian".to_string());
        let motion = MotionField::uniform(1.0, 1.0, GridShape::new(2, 2));
        assert_eq!(
            MotionRegenerator::new(p).regenerate(&motion).unwrap_err(),
            MotionError::UnsupportedMethod("gaussian".to_string())
        );
    }

    #[test]
    fn test_no_method_copies_base() {
        let mut p = params(Some(1));
        p.vel_pert_method = None;
        let motion = MotionField::uniform(1.0, -1.0, GridShape::new(2, 2));
        let set = MotionRegenerator::new(p).regenerate(&motion).unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.fields.iter().all(|f| f == &motion));
    }
}
