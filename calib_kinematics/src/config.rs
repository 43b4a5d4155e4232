use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::params::{FrameOffset, LinkParameters};
use crate::joints::JointConvention;
use crate::{KinematicsError, Result};

/// Configuration snapshot a [`KinematicModel`](crate::KinematicModel) is built from.
///
/// Mirrors the JSON file field for field. Every field is optional at the
/// serde level so that a missing one surfaces as
/// [`KinematicsError::MissingConfiguration`] naming the field, rather than
/// as a generic parse error.
///
/// ```rust,ignore
/// let config = ModelConfig::from_file("ARM95.json")?;
/// let model = KinematicModel::from_config(&config)?;
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ModelConfig {
    pub optimization_method: Option<String>,
    pub dataset_file: Option<String>,
    pub base_circles_dataset_file: Option<String>,
    pub tool_circles_dataset_file: Option<String>,
    pub results_file: Option<String>,

    /// Rows of `[a, alpha, d_or_beta, theta_offset, convention]`.
    pub nominal_dh: Option<Vec<Vec<f64>>>,
    pub nominal_base_params: Option<Vec<f64>>,
    pub nominal_tool_params: Option<Vec<f64>>,

    pub real_dh: Option<Vec<Vec<f64>>>,
    pub real_base_params: Option<Vec<f64>>,
    pub real_tool_params: Option<Vec<f64>>,

    pub joint_limits_general_h: Option<Vec<f64>>,
    pub joint_limits_general_l: Option<Vec<f64>>,
    pub joint_limits_circle_h: Option<Vec<f64>>,
    pub joint_limits_circle_l: Option<Vec<f64>>,

    /// `[[xmin, xmax], [ymin, ymax], [zmin, zmax]]`
    pub cartesian_limits: Option<Vec<Vec<f64>>>,
    pub max_z_angle: Option<f64>,

    pub general_samples_number: Option<usize>,
    pub circle_samples_number: Option<usize>,

    pub zero_tracker_position: Option<Vec<f64>>,
}

impl ModelConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| KinematicsError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that every required field is present.
    ///
    /// Reports the first missing field in file order.
    pub fn validate(&self) -> Result<()> {
        required(&self.optimization_method, "optimization_method")?;
        required(&self.dataset_file, "dataset_file")?;
        required(&self.base_circles_dataset_file, "base_circles_dataset_file")?;
        required(&self.tool_circles_dataset_file, "tool_circles_dataset_file")?;
        required(&self.results_file, "results_file")?;
        required(&self.nominal_dh, "nominal_dh")?;
        required(&self.nominal_base_params, "nominal_base_params")?;
        required(&self.nominal_tool_params, "nominal_tool_params")?;
        required(&self.real_dh, "real_dh")?;
        required(&self.real_base_params, "real_base_params")?;
        required(&self.real_tool_params, "real_tool_params")?;
        required(&self.joint_limits_general_h, "joint_limits_general_h")?;
        required(&self.joint_limits_general_l, "joint_limits_general_l")?;
        required(&self.joint_limits_circle_h, "joint_limits_circle_h")?;
        required(&self.joint_limits_circle_l, "joint_limits_circle_l")?;
        required(&self.cartesian_limits, "cartesian_limits")?;
        required(&self.max_z_angle, "max_z_angle")?;
        required(&self.general_samples_number, "general_samples_number")?;
        required(&self.circle_samples_number, "circle_samples_number")?;
        required(&self.zero_tracker_position, "zero_tracker_position")?;
        Ok(())
    }
}

pub(crate) fn required<'a, T>(value: &'a Option<T>, field: &str) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| KinematicsError::missing(field))
}

/// Splits one `[a, alpha, d_or_beta, theta_offset, convention]` row into the
/// link geometry and its raw convention flag.
pub(crate) fn parse_link_row(row: &[f64], field: &str, index: usize) -> Result<(LinkParameters, f64)> {
    match *row {
        [a, alpha, d_or_beta, theta_offset, flag] => {
            Ok((LinkParameters::new(a, alpha, d_or_beta, theta_offset), flag))
        }
        _ => Err(KinematicsError::dimension(format!("{field}[{index}]"), 5, row.len())),
    }
}

pub(crate) fn parse_convention(flag: f64, field: &str, index: usize) -> Result<JointConvention> {
    JointConvention::from_flag(flag)
        .map_err(|e| KinematicsError::InvalidArgument(format!("{field}[{index}]: {e}")))
}

pub(crate) fn parse_frame(values: &[f64], field: &str) -> Result<FrameOffset> {
    FrameOffset::from_slice(values)
        .map_err(|_| KinematicsError::dimension(field, 6, values.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_reports_first_missing_field() {
        let config = ModelConfig::from_json_str("{}").unwrap();
        match config.validate() {
            Err(KinematicsError::MissingConfiguration(field)) => {
                assert_eq!(field, "optimization_method")
            }
            other => panic!("expected MissingConfiguration, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let config = ModelConfig::from_json_str(r#"{"max_z_angle": 0.5, "comment": "x"}"#).unwrap();
        assert_eq!(config.max_z_angle, Some(0.5));
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let err = ModelConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, KinematicsError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = ModelConfig::from_file("/nonexistent/ARM95.json").unwrap_err();
        match err {
            KinematicsError::ConfigRead { path, .. } => assert!(path.ends_with("ARM95.json")),
            other => panic!("expected ConfigRead, got {:?}", other),
        }
    }

    #[test]
    fn test_link_row_parsing() {
        let (link, flag) = parse_link_row(&[0.1, 0.2, 0.3, 0.4, 1.0], "nominal_dh", 0).unwrap();
        assert_eq!(link, LinkParameters::new(0.1, 0.2, 0.3, 0.4));
        assert_eq!(parse_convention(flag, "nominal_dh", 0).unwrap(), JointConvention::Hayati);

        let err = parse_link_row(&[0.1, 0.2, 0.3, 0.4], "nominal_dh", 2).unwrap_err();
        assert!(err.to_string().contains("nominal_dh[2]"));

        let err = parse_convention(3.0, "nominal_dh", 1).unwrap_err();
        assert!(matches!(err, KinematicsError::InvalidArgument(_)));
        assert!(err.to_string().contains("nominal_dh[1]"));
    }
}
