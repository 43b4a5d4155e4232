//! Configuration surface and bookkeeping for an external calibration loop.
//!
//! No estimator lives in this crate. These types carry what an estimator
//! needs from the model (which parameters are identifiable, which pose
//! components a tracker can observe, step coefficients) and the running
//! error-norm counters it updates between iterations.

use serde::{Deserialize, Serialize};

use crate::{KinematicsError, Result};

/// Number of pose components a measurement can observe (x, y, z, rz, ry, rx).
pub const POSE_COMPONENTS: usize = 6;

/// Geometric parameters per link that an estimator may adjust.
pub const LINK_PARAMETER_COUNT: usize = 4;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CalibrationSettings {
    pub optimization_method: String,
    /// One entry per estimable parameter: links first, then base, then tool.
    pub identifiability_mask: Vec<u8>,
    /// Indices into the six pose components that the tracker measures.
    pub measurable_params_mask: Vec<usize>,
    pub koef: f64,
    pub lm_koef: f64,
}

impl CalibrationSettings {
    pub fn new(optimization_method: String, joint_count: usize) -> Self {
        Self {
            optimization_method,
            identifiability_mask: vec![1; parameter_count(joint_count)],
            measurable_params_mask: (0..POSE_COMPONENTS).collect(),
            koef: 0.001,
            lm_koef: 0.01,
        }
    }

    pub fn set_measurable_params_mask(&mut self, mask: Vec<usize>) -> Result<()> {
        if let Some(bad) = mask.iter().find(|&&i| i >= POSE_COMPONENTS) {
            return Err(KinematicsError::InvalidArgument(format!(
                "measurable parameter index {bad} is outside the {POSE_COMPONENTS} pose components"
            )));
        }
        self.measurable_params_mask = mask;
        Ok(())
    }

    pub fn set_identifiability_mask(&mut self, mask: Vec<u8>) -> Result<()> {
        let expected = self.identifiability_mask.len();
        if mask.len() != expected {
            return Err(KinematicsError::dimension("identifiability mask", expected, mask.len()));
        }
        self.identifiability_mask = mask;
        Ok(())
    }

    pub fn identifiable_count(&self) -> usize {
        self.identifiability_mask.iter().filter(|&&m| m != 0).count()
    }
}

/// Link parameters plus the base and tool offsets.
pub fn parameter_count(joint_count: usize) -> usize {
    joint_count * LINK_PARAMETER_COUNT + 2 * POSE_COMPONENTS
}

/// Error-norm counters owned by the calibration loop.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CalibrationProgress {
    pub norm: f64,
    pub prev_norm: f64,
    pub num_point: usize,
}

impl Default for CalibrationProgress {
    fn default() -> Self {
        Self {
            norm: 10.0,
            prev_norm: 0.0,
            num_point: 0,
        }
    }
}

impl CalibrationProgress {
    pub fn record_norm(&mut self, norm: f64) {
        self.prev_norm = self.norm;
        self.norm = norm;
    }

    pub fn advance_point(&mut self) -> usize {
        self.num_point += 1;
        self.num_point
    }

    pub fn improvement(&self) -> f64 {
        self.prev_norm - self.norm
    }
}

/// Where datasets and results are persisted. Opaque to the engine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DatasetPaths {
    pub dataset_file: String,
    pub base_circles_dataset_file: String,
    pub tool_circles_dataset_file: String,
    pub results_file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_six_joints() {
        let settings = CalibrationSettings::new("lm".to_string(), 6);
        assert_eq!(settings.identifiability_mask.len(), 36);
        assert_eq!(settings.identifiable_count(), 36);
        assert_eq!(settings.measurable_params_mask, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(settings.koef, 0.001);
        assert_eq!(settings.lm_koef, 0.01);
    }

    #[test]
    fn test_measurable_mask_rejects_out_of_range() {
        let mut settings = CalibrationSettings::new("lm".to_string(), 6);
        assert!(settings.set_measurable_params_mask(vec![0, 1, 2]).is_ok());
        assert_eq!(settings.measurable_params_mask, vec![0, 1, 2]);

        let err = settings.set_measurable_params_mask(vec![0, 6]).unwrap_err();
        assert!(matches!(err, KinematicsError::InvalidArgument(_)));
        assert_eq!(settings.measurable_params_mask, vec![0, 1, 2]);
    }

    #[test]
    fn test_identifiability_mask_length() {
        let mut settings = CalibrationSettings::new("lm".to_string(), 6);
        let mut mask = vec![1; 36];
        mask[3] = 0;
        settings.set_identifiability_mask(mask).unwrap();
        assert_eq!(settings.identifiable_count(), 35);
        assert!(settings.set_identifiability_mask(vec![1; 30]).is_err());
    }

    #[test]
    fn test_progress_counters() {
        let mut progress = CalibrationProgress::default();
        assert_eq!(progress.norm, 10.0);
        progress.record_norm(4.0);
        assert_eq!(progress.prev_norm, 10.0);
        assert_eq!(progress.improvement(), 6.0);
        assert_eq!(progress.advance_point(), 1);
        assert_eq!(progress.advance_point(), 2);
    }
}
