/// Built-in arm configurations for running the simulator without a file.
///
/// The six-axis demo arm is an anthropomorphic wrist-partitioned layout. The
/// elbow joint (index 2) is nearly parallel to the shoulder, so it is described
/// with the Hayati convention; every other joint is DH. The real parameter set
/// is the nominal one with sub-millimetre and sub-milliradian errors, roughly
/// what an uncalibrated arm fresh from assembly shows.
use std::f64::consts::FRAC_PI_2;

use calib_kinematics::ModelConfig;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArmPreset {
    /// Six joints, Hayati elbow.
    #[default]
    Demo6,
    /// Three-joint planar arm, all DH. Handy for eyeballing projections.
    Planar3,
}

impl ArmPreset {
    pub fn config(self) -> ModelConfig {
        match self {
            ArmPreset::Demo6 => demo_arm(),
            ArmPreset::Planar3 => planar_arm(),
        }
    }
}

/// Six-axis demo arm, lengths in metres.
pub fn demo_arm() -> ModelConfig {
    let nominal_dh = vec![
        vec![0.0, FRAC_PI_2, 0.3, 0.0, 0.0],
        vec![0.4, 0.0, 0.0, -FRAC_PI_2, 0.0],
        vec![0.05, FRAC_PI_2, 0.0, 0.0, 1.0],
        vec![0.0, -FRAC_PI_2, 0.35, 0.0, 0.0],
        vec![0.0, FRAC_PI_2, 0.0, 0.0, 0.0],
        vec![0.0, 0.0, 0.08, 0.0, 0.0],
    ];
    // Per-joint [da, dalpha, dd_or_beta, dtheta]
    let errors = [
        [0.0005, 0.0004, 0.0007, 0.0004],
        [0.0011, 0.0003, 0.0, 0.0006],
        [-0.0004, -0.0007, 0.0009, 0.0],
        [0.0002, 0.0001, 0.0002, 0.0006],
        [0.0, 0.0006, 0.0, -0.0003],
        [0.0001, 0.0, 0.0003, 0.0],
    ];
    let real_dh = nominal_dh
        .iter()
        .zip(errors)
        .map(|(row, err)| {
            let mut real = row.clone();
            for (value, delta) in real.iter_mut().zip(err) {
                *value += delta;
            }
            real
        })
        .collect();

    ModelConfig {
        optimization_method: Some("lm".to_string()),
        dataset_file: Some("datasets/general.csv".to_string()),
        base_circles_dataset_file: Some("datasets/base_circles.csv".to_string()),
        tool_circles_dataset_file: Some("datasets/tool_circles.csv".to_string()),
        results_file: Some("results/estimated.json".to_string()),
        nominal_dh: Some(nominal_dh),
        nominal_base_params: Some(vec![0.0; 6]),
        nominal_tool_params: Some(vec![0.0, 0.0, 0.05, 0.0, 0.0, 0.0]),
        real_dh: Some(real_dh),
        real_base_params: Some(vec![0.001, -0.002, 0.0005, 0.0003, 0.0, -0.0002]),
        real_tool_params: Some(vec![0.0004, 0.0, 0.0507, 0.0, 0.0002, 0.0]),
        joint_limits_general_h: Some(vec![2.5, 0.5, 2.0, 2.5, 2.0, 3.0]),
        joint_limits_general_l: Some(vec![-2.5, -1.5, -0.5, -2.5, 0.5, -3.0]),
        joint_limits_circle_h: Some(vec![3.0, 0.0, 1.57, 0.0, 1.57, 3.0]),
        joint_limits_circle_l: Some(vec![-3.0, 0.0, 1.57, 0.0, 1.57, -3.0]),
        cartesian_limits: Some(vec![vec![-1.0, 1.0], vec![-1.0, 1.0], vec![-0.5, 1.2]]),
        max_z_angle: Some(0.7),
        general_samples_number: Some(200),
        circle_samples_number: Some(36),
        zero_tracker_position: Some(vec![0.6, 0.0, 0.0]),
    }
}

/// Three-joint planar arm in the XY plane.
pub fn planar_arm() -> ModelConfig {
    let nominal_dh = vec![
        vec![0.5, 0.0, 0.0, 0.0, 0.0],
        vec![0.4, 0.0, 0.0, 0.0, 0.0],
        vec![0.2, 0.0, 0.0, 0.0, 0.0],
    ];
    let real_dh = vec![
        vec![0.502, 0.0, 0.0, 0.001, 0.0],
        vec![0.399, 0.0, 0.0, -0.002, 0.0],
        vec![0.2, 0.0, 0.0, 0.0, 0.0],
    ];
    let pi = std::f64::consts::PI;

    ModelConfig {
        optimization_method: Some("lm".to_string()),
        dataset_file: Some("datasets/planar_general.csv".to_string()),
        base_circles_dataset_file: Some("datasets/planar_base_circles.csv".to_string()),
        tool_circles_dataset_file: Some("datasets/planar_tool_circles.csv".to_string()),
        results_file: Some("results/planar_estimated.json".to_string()),
        nominal_dh: Some(nominal_dh),
        nominal_base_params: Some(vec![0.0; 6]),
        nominal_tool_params: Some(vec![0.0; 6]),
        real_dh: Some(real_dh),
        real_base_params: Some(vec![0.0; 6]),
        real_tool_params: Some(vec![0.0; 6]),
        joint_limits_general_h: Some(vec![pi, 2.5, 2.5]),
        joint_limits_general_l: Some(vec![-pi, -2.5, -2.5]),
        joint_limits_circle_h: Some(vec![pi, 0.0, pi]),
        joint_limits_circle_l: Some(vec![-pi, 0.0, -pi]),
        cartesian_limits: Some(vec![vec![-1.2, 1.2], vec![-1.2, 1.2], vec![-0.1, 0.1]]),
        max_z_angle: Some(pi),
        general_samples_number: Some(100),
        circle_samples_number: Some(24),
        zero_tracker_position: Some(vec![1.1, 0.0, 0.0]),
    }
}
