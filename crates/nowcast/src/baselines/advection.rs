//! Nearest-neighbour advection nowcast.

use motion_perturbation::{laplace, MotionRegenerator, RegenerationParams, SeedChain};
use ppn_common::{DerivationProtocol, FieldData, ForecastEnsemble, GridShape, MotionField, ObservationSeries};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::collaborators::NowcastEngine;
use crate::error::{NowcastError, Result};
use crate::params::NowcastParams;

pub const NAME: &str = "advection";

/// Scale of the Laplace noise added to precipitating pixels of noisy members.
pub const NOISE_SCALE: f64 = 1.0;

/// Moves the latest observation along the motion field.
///
/// Lead time `k` (1-based) takes each pixel from `k` motion vectors
/// upstream, rounded to the nearest pixel; pixels advected in from outside
/// the domain get the field's zero value.
///
/// Ensemble members use the perturbed motion of
/// [`MotionRegenerator`] with the same seed, so regenerated motion fields
/// are exactly the ones each member was advected with. When a noise method
/// is set, every member adds Laplace noise to pixels at or above the
/// precipitation threshold from its own precipitation stream.
#[derive(Debug, Clone, Default)]
pub struct Advection;

fn advect(field: &[f32], grid: GridShape, motion: &MotionField, steps: f32, fill: f32) -> Vec<f32> {
    let (h, w) = (grid.height as f32, grid.width as f32);
    let mut out = Vec::with_capacity(grid.len());
    for r in 0..grid.height {
        for c in 0..grid.width {
            let i = r * grid.width + c;
            let sr = (r as f32 - steps * motion.v()[i]).round();
            let sc = (c as f32 - steps * motion.u()[i]).round();
            if sr >= 0.0 && sc >= 0.0 && sr < h && sc < w {
                out.push(field[sr as usize * grid.width + sc as usize]);
            } else {
                out.push(fill);
            }
        }
    }
    out
}

impl Advection {
    fn member_motions(
        &self,
        motion: &MotionField,
        params: &NowcastParams,
        seed: u64,
    ) -> Result<Vec<MotionField>> {
        if params.vel_pert_method.is_none() {
            return Ok(vec![motion.clone(); params.n_ens_members]);
        }
        let regenerator = MotionRegenerator::new(RegenerationParams {
            seed: Some(seed),
            ensemble_size: params.n_ens_members,
            timestep: params.timestep,
            kmperpixel: params.kmperpixel,
            vel_pert_method: params.vel_pert_method.clone(),
            vel_pert_kwargs: params.vel_pert_kwargs,
            protocol: DerivationProtocol::StepsV1,
        });
        Ok(regenerator.regenerate(motion)?.fields)
    }
}

impl NowcastEngine for Advection {
    fn name(&self) -> &str {
        NAME
    }

    fn generate(
        &self,
        observations: &ObservationSeries,
        motion: &MotionField,
        timesteps: usize,
        params: &NowcastParams,
    ) -> Result<ForecastEnsemble> {
        let members = params.n_ens_members;
        if members == 0 {
            return Err(NowcastError::engine(NAME, "n_ens_members must be at least 1"));
        }
        let grid = observations.grid();
        if motion.grid() != grid {
            return Err(NowcastError::engine(NAME, "motion field does not match the observation grid"));
        }

        let latest = observations.frame(observations.num_frames() - 1)?;
        let fill = observations.metadata().zerovalue as f32;
        let threshold = params.precip_threshold as f32;
        // the root seed only matters for stochastic members
        let seed = params.seed.unwrap_or_else(rand::random::<u64>);

        info!(
            members,
            timesteps,
            method = ?params.method,
            noise = ?params.noise_method,
            vel_pert = ?params.vel_pert_method,
            "Generating advection nowcast"
        );

        let motions = self.member_motions(motion, params, seed)?;
        let mut data = Vec::with_capacity(members);
        for (streams, member_motion) in SeedChain::new(DerivationProtocol::StepsV1, seed).zip(&motions) {
            let mut rng = StdRng::seed_from_u64(streams.precip_seed);
            let mut fields = Vec::with_capacity(timesteps * grid.len());
            for k in 1..=timesteps {
                let mut field = advect(latest, grid, member_motion, k as f32, fill);
                if params.noise_method.is_some() {
                    for value in field.iter_mut().filter(|v| **v >= threshold) {
                        *value += laplace(&mut rng, NOISE_SCALE) as f32;
                    }
                }
                fields.extend(field);
            }
            debug!(member = streams.member, "Advected member");
            data.push(fields);
        }

        Ok(ForecastEnsemble::from_members(
            data,
            timesteps,
            grid,
            observations.metadata().clone(),
        )?)
    }
}
