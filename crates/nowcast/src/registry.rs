//! Method names to collaborator implementations.

use ppn_config::RunConfig;

use crate::baselines::{advection, global_shift, Advection, GlobalShift};
use crate::collaborators::{MotionEstimator, NowcastEngine};
use crate::error::{NowcastError, Result};

/// Names accepted in `OPTFLOW_METHOD`.
pub const MOTION_METHODS: &[&str] = &[global_shift::NAME];

/// Names accepted in `NOWCAST_METHOD`.
pub const NOWCAST_METHODS: &[&str] = &[advection::NAME];

pub fn motion_estimator(name: &str) -> Result<Box<dyn MotionEstimator>> {
    match name.to_ascii_lowercase().as_str() {
        global_shift::NAME => Ok(Box::new(GlobalShift::default())),
        _ => Err(NowcastError::Configuration(format!(
            "optical flow method '{}' is not available (available: {})",
            name,
            MOTION_METHODS.join(", ")
        ))),
    }
}

pub fn nowcast_engine(name: &str) -> Result<Box<dyn NowcastEngine>> {
    match name.to_ascii_lowercase().as_str() {
        advection::NAME => Ok(Box::new(Advection)),
        _ => Err(NowcastError::Configuration(format!(
            "nowcast method '{}' is not available (available: {})",
            name,
            NOWCAST_METHODS.join(", ")
        ))),
    }
}

/// Estimator and engine selected by `config`.
pub fn from_config(config: &RunConfig) -> Result<(Box<dyn MotionEstimator>, Box<dyn NowcastEngine>)> {
    Ok((
        motion_estimator(&config.optflow_method)?,
        nowcast_engine(&config.nowcast_method)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppn_config::ConfigResolver;

    #[test]
    fn test_bundled_methods() {
        assert_eq!(motion_estimator("global-shift").unwrap().name(), "global-shift");
        assert_eq!(nowcast_engine("Advection").unwrap().name(), "advection");
    }

    #[test]
    fn test_unknown_method_is_named() {
        match nowcast_engine("steps") {
            Err(NowcastError::Configuration(msg)) => assert!(msg.contains("'steps'")),
            _ => panic!("expected a configuration error"),
        }
    }

    #[test]
    fn test_test_profile_uses_bundled_methods() {
        let config = ConfigResolver::new().resolve(Some("test")).unwrap();
        assert!(from_config(&config).is_ok());
    }
}
