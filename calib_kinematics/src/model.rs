//! Forward kinematics over three parameter hypotheses.
//!
//! A [`KinematicModel`] owns the nominal (design), real (ground truth used
//! only in simulation) and estimated (calibration output) parameter sets of
//! one serial manipulator. All three share the per-joint transform
//! convention, which is resolved once from configuration.
//!
//! The chain is composed as
//!
//! ```text
//! T = T_base · T_0(q_0) · T_1(q_1) · … · T_{N-1}(q_{N-1}) · T_tool
//! ```
//!
//! and an evaluation records the origin after the base, after every joint,
//! and after the tool, giving N+2 points in chain order.
//!
//! Reads take `&self`. The only writer is
//! [`KinematicModel::replace_estimated`], which takes `&mut self`.

use nalgebra::{Matrix4, Point3};
use tracing::{debug, info, warn};

use crate::calibration::{CalibrationProgress, CalibrationSettings, DatasetPaths};
use crate::config::{parse_convention, parse_frame, parse_link_row, required, ModelConfig};
use crate::joints::JointConvention;
use crate::limits::{JointLimits, WorkspaceBounds};
use crate::params::{LinkParameters, ParameterSet, ParameterSetId};
use crate::transforms::origin;
use crate::{KinematicsError, Result};

/// Result of one chain evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainEvaluation {
    /// End-effector pose, tool frame included.
    pub pose: Matrix4<f64>,
    /// Base origin, each joint origin, tool tip.
    pub points: Vec<Point3<f64>>,
}

impl ChainEvaluation {
    pub fn tool_tip(&self) -> Point3<f64> {
        origin(&self.pose)
    }
}

#[derive(Debug, Clone)]
pub struct KinematicModel {
    conventions: Vec<JointConvention>,
    nominal: ParameterSet,
    real: ParameterSet,
    estimated: ParameterSet,

    general_limits: JointLimits,
    circle_limits: JointLimits,
    workspace: WorkspaceBounds,
    max_z_angle: f64,
    general_samples_number: usize,
    circle_samples_number: usize,
    zero_tracker_position: Point3<f64>,
    paths: DatasetPaths,

    pub calibration: CalibrationSettings,
    pub progress: CalibrationProgress,
}

impl KinematicModel {
    /// Builds a model from a configuration snapshot.
    ///
    /// # Errors
    ///
    /// - `MissingConfiguration` naming the first absent field.
    /// - `DimensionMismatch` when `nominal_dh` is empty, or when rows,
    ///   offsets or limit vectors do not fit the joint count it gives.
    /// - `InvalidArgument` for a nominal convention flag other than 0 or 1.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        config.validate()?;

        let nominal_rows = required(&config.nominal_dh, "nominal_dh")?;
        let real_rows = required(&config.real_dh, "real_dh")?;
        let joint_count = nominal_rows.len();
        if joint_count == 0 {
            return Err(KinematicsError::dimension("nominal_dh", 1, 0));
        }
        if real_rows.len() != joint_count {
            return Err(KinematicsError::dimension("real_dh", joint_count, real_rows.len()));
        }

        let mut conventions = Vec::with_capacity(joint_count);
        let mut nominal_links = Vec::with_capacity(joint_count);
        for (i, row) in nominal_rows.iter().enumerate() {
            let (link, flag) = parse_link_row(row, "nominal_dh", i)?;
            conventions.push(parse_convention(flag, "nominal_dh", i)?);
            nominal_links.push(link);
        }

        let mut real_links = Vec::with_capacity(joint_count);
        for (i, row) in real_rows.iter().enumerate() {
            let (link, flag) = parse_link_row(row, "real_dh", i)?;
            if JointConvention::from_flag(flag).ok() != Some(conventions[i]) {
                warn!(
                    "real_dh[{}] convention flag {} differs from nominal {:?}; using nominal",
                    i, flag, conventions[i]
                );
            }
            real_links.push(link);
        }

        let nominal = ParameterSet::new(
            nominal_links,
            parse_frame(required(&config.nominal_base_params, "nominal_base_params")?, "nominal_base_params")?,
            parse_frame(required(&config.nominal_tool_params, "nominal_tool_params")?, "nominal_tool_params")?,
        );
        let real = ParameterSet::new(
            real_links,
            parse_frame(required(&config.real_base_params, "real_base_params")?, "real_base_params")?,
            parse_frame(required(&config.real_tool_params, "real_tool_params")?, "real_tool_params")?,
        );

        let general_limits = limits_for(
            joint_count,
            required(&config.joint_limits_general_h, "joint_limits_general_h")?,
            required(&config.joint_limits_general_l, "joint_limits_general_l")?,
            "joint_limits_general",
        )?;
        let circle_limits = limits_for(
            joint_count,
            required(&config.joint_limits_circle_h, "joint_limits_circle_h")?,
            required(&config.joint_limits_circle_l, "joint_limits_circle_l")?,
            "joint_limits_circle",
        )?;
        let workspace = WorkspaceBounds::from_pairs(required(&config.cartesian_limits, "cartesian_limits")?)?;

        let tracker = required(&config.zero_tracker_position, "zero_tracker_position")?;
        let zero_tracker_position = match tracker.as_slice() {
            [x, y, z] => Point3::new(*x, *y, *z),
            other => return Err(KinematicsError::dimension("zero_tracker_position", 3, other.len())),
        };

        let paths = DatasetPaths {
            dataset_file: required(&config.dataset_file, "dataset_file")?.clone(),
            base_circles_dataset_file: required(&config.base_circles_dataset_file, "base_circles_dataset_file")?.clone(),
            tool_circles_dataset_file: required(&config.tool_circles_dataset_file, "tool_circles_dataset_file")?.clone(),
            results_file: required(&config.results_file, "results_file")?.clone(),
        };

        let optimization_method = required(&config.optimization_method, "optimization_method")?.clone();

        let model = Self {
            estimated: nominal.clone(),
            conventions,
            nominal,
            real,
            general_limits,
            circle_limits,
            workspace,
            max_z_angle: *required(&config.max_z_angle, "max_z_angle")?,
            general_samples_number: *required(&config.general_samples_number, "general_samples_number")?,
            circle_samples_number: *required(&config.circle_samples_number, "circle_samples_number")?,
            zero_tracker_position,
            paths,
            calibration: CalibrationSettings::new(optimization_method, joint_count),
            progress: CalibrationProgress::default(),
        };

        info!(
            "Built kinematic model: {} joints, {} Hayati, method '{}'",
            joint_count,
            model.conventions.iter().filter(|c| **c == JointConvention::Hayati).count(),
            model.calibration.optimization_method
        );
        Ok(model)
    }

    /// Builds a model straight from parameter sets, without limits or
    /// dataset settings from a file.
    ///
    /// Joint limits default to `[-π, π]`, the workspace is unbounded and the
    /// dataset paths are empty.
    pub fn from_parameter_sets(
        conventions: Vec<JointConvention>,
        nominal: ParameterSet,
        real: ParameterSet,
    ) -> Result<Self> {
        let n = conventions.len();
        if n == 0 {
            return Err(KinematicsError::dimension("conventions", 1, 0));
        }
        for (name, set) in [("nominal", &nominal), ("real", &real)] {
            if set.joint_count() != n {
                return Err(KinematicsError::dimension(format!("{name} links"), n, set.joint_count()));
            }
        }
        let pi = std::f64::consts::PI;
        let limits = JointLimits::new(vec![pi; n], vec![-pi; n])?;
        let unbounded = [f64::NEG_INFINITY, f64::INFINITY];

        Ok(Self {
            estimated: nominal.clone(),
            conventions,
            nominal,
            real,
            general_limits: limits.clone(),
            circle_limits: limits,
            workspace: WorkspaceBounds {
                x: unbounded,
                y: unbounded,
                z: unbounded,
            },
            max_z_angle: pi,
            general_samples_number: 0,
            circle_samples_number: 0,
            zero_tracker_position: Point3::origin(),
            paths: DatasetPaths::default(),
            calibration: CalibrationSettings::new(String::new(), n),
            progress: CalibrationProgress::default(),
        })
    }

    pub fn joint_count(&self) -> usize {
        self.conventions.len()
    }

    pub fn conventions(&self) -> &[JointConvention] {
        &self.conventions
    }

    pub fn parameter_set(&self, id: ParameterSetId) -> &ParameterSet {
        match id {
            ParameterSetId::Nominal => &self.nominal,
            ParameterSetId::Real => &self.real,
            ParameterSetId::Estimated => &self.estimated,
        }
    }

    /// Evaluates the full chain for `angles` under one parameter set.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` when `angles.len()` differs from the joint count.
    pub fn evaluate(&self, angles: &[f64], set: ParameterSetId) -> Result<ChainEvaluation> {
        let mut points = Vec::with_capacity(self.joint_count() + 2);
        let pose = self.compose(angles, set, |t| points.push(origin(t)))?;
        points.push(origin(&pose));
        Ok(ChainEvaluation { pose, points })
    }

    /// Like [`evaluate`](Self::evaluate) with the set named as a string.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for any name other than `nominal`, `real` or
    /// `estimated`; `DimensionMismatch` as for `evaluate`.
    pub fn evaluate_named(&self, angles: &[f64], set: &str) -> Result<ChainEvaluation> {
        self.evaluate(angles, set.parse()?)
    }

    /// Final pose only.
    pub fn pose(&self, angles: &[f64], set: ParameterSetId) -> Result<Matrix4<f64>> {
        self.compose(angles, set, |_| {})
    }

    /// Per-joint transforms before chaining, in joint order.
    pub fn joint_transforms(&self, angles: &[f64], set: ParameterSetId) -> Result<Vec<Matrix4<f64>>> {
        self.check_angles(angles)?;
        let params = self.parameter_set(set);
        Ok(self
            .conventions
            .iter()
            .zip(&params.links)
            .zip(angles)
            .map(|((convention, link), angle)| convention.transform(link, *angle))
            .collect())
    }

    /// `(T_base, T_tool)` for one parameter set.
    pub fn base_tool_transforms(&self, set: ParameterSetId) -> (Matrix4<f64>, Matrix4<f64>) {
        let params = self.parameter_set(set);
        (params.base.transform(), params.tool.transform())
    }

    /// Overwrites the estimated parameter set.
    ///
    /// This is the single mutation entry point, meant for the calibration
    /// procedure. The joint count must match; conventions stay with the
    /// joints and are not part of the replacement.
    pub fn replace_estimated(&mut self, estimated: ParameterSet) -> Result<()> {
        if estimated.joint_count() != self.joint_count() {
            return Err(KinematicsError::dimension(
                "estimated links",
                self.joint_count(),
                estimated.joint_count(),
            ));
        }
        debug!("Replacing estimated parameter set: {:?}", estimated);
        self.estimated = estimated;
        info!("Estimated parameter set updated");
        Ok(())
    }

    /// Restores the estimated set to a copy of the nominal set.
    pub fn reset_estimated(&mut self) {
        self.estimated = self.nominal.clone();
        info!("Estimated parameter set reset to nominal");
    }

    pub fn general_limits(&self) -> &JointLimits {
        &self.general_limits
    }

    pub fn circle_limits(&self) -> &JointLimits {
        &self.circle_limits
    }

    pub fn workspace(&self) -> &WorkspaceBounds {
        &self.workspace
    }

    pub fn max_z_angle(&self) -> f64 {
        self.max_z_angle
    }

    pub fn general_samples_number(&self) -> usize {
        self.general_samples_number
    }

    pub fn circle_samples_number(&self) -> usize {
        self.circle_samples_number
    }

    pub fn zero_tracker_position(&self) -> Point3<f64> {
        self.zero_tracker_position
    }

    pub fn paths(&self) -> &DatasetPaths {
        &self.paths
    }

    fn check_angles(&self, angles: &[f64]) -> Result<()> {
        if angles.len() != self.joint_count() {
            return Err(KinematicsError::dimension("joint angles", self.joint_count(), angles.len()));
        }
        Ok(())
    }

    /// Chains base, joints and tool, handing every intermediate accumulator
    /// (base included, tool excluded) to `visit`.
    fn compose<F>(&self, angles: &[f64], set: ParameterSetId, mut visit: F) -> Result<Matrix4<f64>>
    where
        F: FnMut(&Matrix4<f64>),
    {
        self.check_angles(angles)?;
        let params = self.parameter_set(set);

        let mut acc = params.base.transform();
        visit(&acc);
        for ((convention, link), angle) in self.conventions.iter().zip(&params.links).zip(angles) {
            acc *= convention.transform(link, *angle);
            visit(&acc);
        }
        Ok(acc * params.tool.transform())
    }
}

fn limits_for(joint_count: usize, high: &[f64], low: &[f64], field: &str) -> Result<JointLimits> {
    for (suffix, values) in [("_h", high), ("_l", low)] {
        if values.len() != joint_count {
            return Err(KinematicsError::dimension(format!("{field}{suffix}"), joint_count, values.len()));
        }
    }
    JointLimits::new(high.to_vec(), low.to_vec())
}

/// Convenience for building link lists in code.
pub fn links(rows: &[[f64; 4]]) -> Vec<LinkParameters> {
    rows.iter()
        .map(|&[a, alpha, d_or_beta, theta_offset]| LinkParameters::new(a, alpha, d_or_beta, theta_offset))
        .collect()
}
