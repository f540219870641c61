//! Regeneration of ensemble motion perturbations.
//!
//! The ensemble nowcast perturbs the advection field of every member but
//! does not return those fields. [`MotionRegenerator`] replays the seed
//! derivation ([`derivation`]) and the `bps` perturbation model ([`bps`])
//! to rebuild them from the run seed and the base motion field.

pub mod bps;
pub mod derivation;
pub mod error;
pub mod regenerate;

pub use bps::{laplace, BpsParams, BpsPerturbator, PerturbationField, DEFAULT_P_PAR, DEFAULT_P_PERP};
pub use derivation::{derive_member_streams, MemberStreams, SeedChain, SEED_UPPER_BOUND};
pub use error::{MotionError, Result};
pub use regenerate::{MotionRegenerator, RegenerationParams, VelPertMethod};
