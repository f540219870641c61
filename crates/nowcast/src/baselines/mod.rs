//! Motion estimator and nowcast engine shipped with the crate.
//!
//! Both are simple stand-ins for operational methods, useful for
//! development runs and tests.

pub mod advection;
pub mod global_shift;

pub use advection::Advection;
pub use global_shift::GlobalShift;
