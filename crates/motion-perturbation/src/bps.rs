//! `bps` motion perturbation model.
//!
//! Two scalar Laplace draws, one parallel and one perpendicular to the
//! local motion direction, are scaled by a standard deviation that grows
//! with lead time as `p0 * t^p1 + p2` (`t` in minutes). The result is
//! converted from km/h to pixels per timestep.

use ppn_common::{GridShape, MotionField};
use ppn_config::VelPertKwargs;
use rand::distributions::Open01;
use rand::Rng;

use crate::error::{MotionError, Result};

/// Coefficients used when no perturbation parameters are configured.
pub const DEFAULT_P_PAR: [f64; 3] = [10.88, 0.23, -7.68];
pub const DEFAULT_P_PERP: [f64; 3] = [5.76, 0.31, -2.72];

/// Motion magnitudes below this have no direction.
const MIN_MAGNITUDE: f64 = 1e-12;

/// Laplace(0, 1/sqrt(2)) has unit variance.
const LAPLACE_SCALE: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Draw from Laplace(0, `scale`) by inverting the CDF of one `Open01` sample.
pub fn laplace<R: Rng + ?Sized>(rng: &mut R, scale: f64) -> f64 {
    let u: f64 = rng.sample(Open01);
    if u >= 0.5 {
        -scale * (2.0 - u - u).ln()
    } else {
        scale * (u + u).ln()
    }
}

/// Physical parameters of the perturbation model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpsParams {
    pub p_par: [f64; 3],
    pub p_perp: [f64; 3],
    /// Grid resolution.
    pub kmperpixel: f64,
    /// Minutes per forecast step.
    pub timestep: f64,
}

impl BpsParams {
    /// Use `kwargs` or, when absent, [`DEFAULT_P_PAR`]/[`DEFAULT_P_PERP`].
    pub fn new(kwargs: Option<&VelPertKwargs>, kmperpixel: f64, timestep: f64) -> Result<Self> {
        if !(kmperpixel.is_finite() && kmperpixel > 0.0) {
            return Err(MotionError::InvalidParameter {
                name: "KMPERPIXEL",
                value: kmperpixel,
            });
        }
        if !(timestep.is_finite() && timestep > 0.0) {
            return Err(MotionError::InvalidParameter {
                name: "NOWCAST_TIMESTEP",
                value: timestep,
            });
        }
        let (p_par, p_perp) = match kwargs {
            Some(kw) => (kw.p_par, kw.p_perp),
            None => (DEFAULT_P_PAR, DEFAULT_P_PERP),
        };
        Ok(Self {
            p_par,
            p_perp,
            kmperpixel,
            timestep,
        })
    }

    /// km/h to pixels per timestep.
    pub fn velocity_scale(&self) -> f64 {
        (1.0 / self.kmperpixel) / (60.0 / self.timestep)
    }
}

fn std_at(p: &[f64; 3], t: f64) -> f64 {
    p[0] * t.powf(p[1]) + p[2]
}

/// Perturbation in pixels per timestep, kept in double precision until it
/// is added to a base field.
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbationField {
    pub u: Vec<f64>,
    pub v: Vec<f64>,
    pub grid: GridShape,
}

impl PerturbationField {
    /// `base + self`, rounded to `f32` after the addition.
    pub fn add_to(&self, base: &MotionField) -> Result<MotionField> {
        let add = |b: &[f32], p: &[f64]| -> Vec<f32> {
            b.iter()
                .zip(p)
                .map(|(&b, &p)| (b as f64 + p) as f32)
                .collect()
        };
        Ok(MotionField::new(
            add(base.u(), &self.u),
            add(base.v(), &self.v),
            base.grid(),
        )?)
    }
}

/// Initialized perturbation state for one member.
#[derive(Debug, Clone)]
pub struct BpsPerturbator {
    params: BpsParams,
    eps_par: f64,
    eps_perp: f64,
    par_u: Vec<f64>,
    par_v: Vec<f64>,
    grid: GridShape,
}

impl BpsPerturbator {
    /// Draw the parallel then the perpendicular noise value from `rng` and
    /// compute the direction of `motion`.
    pub fn init<R: Rng + ?Sized>(motion: &MotionField, params: BpsParams, rng: &mut R) -> Self {
        let eps_par = laplace(rng, LAPLACE_SCALE);
        let eps_perp = laplace(rng, LAPLACE_SCALE);

        let mut par_u = Vec::with_capacity(motion.grid().len());
        let mut par_v = Vec::with_capacity(motion.grid().len());
        for (&u, &v) in motion.u().iter().zip(motion.v()) {
            let (u, v) = (u as f64, v as f64);
            let n = (u * u + v * v).sqrt();
            if n > MIN_MAGNITUDE {
                par_u.push(u / n);
                par_v.push(v / n);
            } else {
                par_u.push(0.0);
                par_v.push(0.0);
            }
        }

        Self {
            params,
            eps_par,
            eps_perp,
            par_u,
            par_v,
            grid: motion.grid(),
        }
    }

    /// The two noise values `(parallel, perpendicular)`.
    pub fn noise(&self) -> (f64, f64) {
        (self.eps_par, self.eps_perp)
    }

    /// Perturbation at lead time `t` minutes.
    pub fn sample(&self, t: f64) -> PerturbationField {
        let vsf = self.params.velocity_scale();
        let a = std_at(&self.params.p_par, t) * self.eps_par;
        let b = std_at(&self.params.p_perp, t) * self.eps_perp;

        // perpendicular unit vector is (-par_v, par_u)
        let u = self
            .par_u
            .iter()
            .zip(&self.par_v)
            .map(|(&pu, &pv)| vsf * (a * pu + b * -pv))
            .collect();
        let v = self
            .par_u
            .iter()
            .zip(&self.par_v)
            .map(|(&pu, &pv)| vsf * (a * pv + b * pu))
            .collect();

        PerturbationField {
            u,
            v,
            grid: self.grid,
        }
    }
}
