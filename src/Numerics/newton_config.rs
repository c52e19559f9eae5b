//! Settings of the batched Newton solver.
//!
//! | field          | default | meaning                                                        |
//! |----------------|---------|----------------------------------------------------------------|
//! | `rtol`         | 1e-6    | relative tolerance, scalar or one value per state component    |
//! | `atol`         | 1e-30   | absolute tolerance, scalar or one value per state component    |
//! | `max_iter`     | 100     | iteration cap of one instance                                  |
//! | `careful_steps`| 1       | number of first iterations with a damped (ramped) Newton step  |
//! | `parallel`     | true    | run the instances on the rayon thread pool                     |
//!
//! The config can be read from JSON, tolerances may be written either as a number or as an array:
//! ```json
//! { "rtol": 1e-8, "atol": [1e-12, 1e-3], "max_iter": 50, "careful_steps": 4, "parallel": false }
//! ```
use crate::Numerics::solver_errors::NewtonError;
use crate::Numerics::tolerance::{Tolerance, ToleranceSpec};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonConfig {
    pub rtol: Tolerance,
    pub atol: Tolerance,
    pub max_iter: usize,
    /// 0 is accepted and treated as 1
    pub careful_steps: usize,
    pub parallel: bool,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            rtol: Tolerance::Scalar(1e-6),
            atol: Tolerance::Scalar(1e-30),
            max_iter: 100,
            careful_steps: 1,
            parallel: true,
        }
    }
}

impl NewtonConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rtol(mut self, rtol: impl Into<Tolerance>) -> Self {
        self.rtol = rtol.into();
        self
    }

    pub fn with_atol(mut self, atol: impl Into<Tolerance>) -> Self {
        self.atol = atol.into();
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_careful_steps(mut self, careful_steps: usize) -> Self {
        self.careful_steps = careful_steps;
        self
    }

    /// run instances one after another on the calling thread
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, NewtonError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, NewtonError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// careful_steps actually used by the iteration: 0 would divide by zero in the
    /// damping ramp, so it is replaced with 1 (undamped from the first step)
    pub fn effective_careful_steps(&self) -> usize {
        self.careful_steps.max(1)
    }

    /// checks the config against the state dimension n and returns tolerances broadcast to n
    pub fn validate(&self, n: usize) -> Result<ToleranceSpec, NewtonError> {
        if self.careful_steps == 0 {
            warn!("careful_steps = 0 is not allowed, using careful_steps = 1 instead");
        }
        ToleranceSpec::resolve(&self.rtol, &self.atol, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = NewtonConfig::default();
        assert_eq!(config.rtol, Tolerance::Scalar(1e-6));
        assert_eq!(config.atol, Tolerance::Scalar(1e-30));
        assert_eq!(config.max_iter, 100);
        assert_eq!(config.careful_steps, 1);
        assert!(config.parallel);
    }

    #[test]
    fn builder_setters() {
        let config = NewtonConfig::new()
            .with_rtol(1e-8)
            .with_atol(vec![1e-12, 1e-3])
            .with_max_iter(20)
            .with_careful_steps(5)
            .sequential();
        assert_eq!(config.rtol, Tolerance::Scalar(1e-8));
        assert_eq!(config.atol, Tolerance::PerComponent(vec![1e-12, 1e-3]));
        assert_eq!(config.max_iter, 20);
        assert_eq!(config.careful_steps, 5);
        assert!(!config.parallel);
    }

    #[test]
    fn zero_careful_steps_falls_back_to_one() {
        let config = NewtonConfig::new().with_careful_steps(0);
        assert_eq!(config.effective_careful_steps(), 1);
        assert_eq!(
            NewtonConfig::new()
                .with_careful_steps(7)
                .effective_careful_steps(),
            7
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = NewtonConfig::from_json_str(r#"{ "max_iter": 12, "atol": [1e-9, 1e-3] }"#)
            .unwrap();
        assert_eq!(config.max_iter, 12);
        assert_eq!(config.atol, Tolerance::PerComponent(vec![1e-9, 1e-3]));
        assert_eq!(config.rtol, Tolerance::Scalar(1e-6));
        assert_eq!(config.careful_steps, 1);
    }

    #[test]
    fn json_file_roundtrip() {
        let config = NewtonConfig::new().with_rtol(1e-9).with_careful_steps(3);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = NewtonConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn tiny_tolerance_is_read_exactly() {
        let config = NewtonConfig::from_json_str(r#"{ "atol": 1e-30 }"#).unwrap();
        assert_eq!(config.atol, Tolerance::Scalar(1e-30));
        let config = NewtonConfig::from_json_str(r#"{ "rtol": [1e-30, 3e-17] }"#).unwrap();
        assert_eq!(config.rtol, Tolerance::PerComponent(vec![1e-30, 3e-17]));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = NewtonConfig::from_json_file(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, NewtonError::ConfigIo(_)));
    }

    #[test]
    fn validate_broadcasts_tolerances() {
        let spec = NewtonConfig::new().with_rtol(vec![1e-3, 1e-4]).validate(2).unwrap();
        assert_relative_eq!(spec.rtol[1], 1e-4);
        assert_relative_eq!(spec.atol[0], 1e-30);
        assert!(NewtonConfig::new().with_rtol(vec![1e-3, 1e-4]).validate(3).is_err());
    }
}
