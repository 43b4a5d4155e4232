use std::f64::consts::FRAC_PI_2;

use approx::assert_relative_eq;
use calib_kinematics::joints::{dh_transform, hayati_transform};
use calib_kinematics::model::links;
use calib_kinematics::transforms::{is_rigid, rotate_x, rotate_y, rotation_block, translate};
use calib_kinematics::{
    FrameOffset, JointConvention, KinematicModel, KinematicsError, ModelConfig, ParameterSet,
    ParameterSetId,
};
use nalgebra::{Matrix3, Matrix4, Vector3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn arm6() -> KinematicModel {
    let config = ModelConfig::from_json_str(include_str!("fixtures/arm6.json")).unwrap();
    KinematicModel::from_config(&config).unwrap()
}

fn six_joint_model(alphas: [f64; 6], tool: FrameOffset) -> KinematicModel {
    let rows: Vec<[f64; 4]> = alphas.iter().map(|&alpha| [0.0, alpha, 0.0, 0.0]).collect();
    let set = ParameterSet::new(links(&rows), FrameOffset::identity(), tool);
    KinematicModel::from_parameter_sets(vec![JointConvention::Dh; 6], set.clone(), set).unwrap()
}

#[test]
fn test_poses_are_rigid_and_trajectories_have_n_plus_two_points() {
    let model = arm6();
    let mut rng = SmallRng::seed_from_u64(42);

    for _ in 0..200 {
        let angles: Vec<f64> = (0..6).map(|_| rng.gen_range(-3.2..3.2)).collect();
        for set in ParameterSetId::all() {
            let eval = model.evaluate(&angles, set).unwrap();
            assert_eq!(eval.points.len(), model.joint_count() + 2);

            let r = rotation_block(&eval.pose);
            assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-9);
            assert!(is_rigid(&eval.pose, 1e-9));
        }
    }
}

#[test]
fn test_evaluation_is_bit_identical_on_repeat() {
    let model = arm6();
    let angles = [0.1, -0.4, 1.2, 0.0, 0.9, -2.2];
    for set in [ParameterSetId::Nominal, ParameterSetId::Real] {
        assert_eq!(model.evaluate(&angles, set).unwrap(), model.evaluate(&angles, set).unwrap());
    }
}

#[test]
fn test_zero_angles_reduce_to_static_link_product() {
    let rows = [
        [0.1, FRAC_PI_2, 0.3, 0.0],
        [0.4, 0.0, 0.02, 0.0],
        [0.05, -0.3, 0.01, 0.0],
    ];
    let conventions = vec![JointConvention::Dh, JointConvention::Dh, JointConvention::Hayati];
    let base = FrameOffset::new(0.2, -0.1, 0.5, 0.3, 0.0, 0.1);
    let tool = FrameOffset::new(0.0, 0.0, 0.12, 0.0, 0.2, 0.0);
    let set = ParameterSet::new(links(&rows), base, tool);
    let model = KinematicModel::from_parameter_sets(conventions, set.clone(), set).unwrap();

    let mut expected = base.transform();
    for (i, [a, alpha, d_or_beta, _]) in rows.iter().enumerate() {
        expected *= if i < 2 {
            translate(&Vector3::new(0.0, 0.0, *d_or_beta)) * translate(&Vector3::new(*a, 0.0, 0.0)) * rotate_x(*alpha)
        } else {
            translate(&Vector3::new(*a, 0.0, 0.0)) * rotate_x(*alpha) * rotate_y(*d_or_beta)
        };
    }
    expected *= tool.transform();

    let pose = model.pose(&[0.0; 3], ParameterSetId::Nominal).unwrap();
    assert_relative_eq!(pose, expected, epsilon = 1e-12);
}

#[test]
fn test_hayati_joint_with_zero_beta_matches_dh_joint_with_zero_d() {
    let rows = [[0.3, FRAC_PI_2, 0.0, 0.1], [0.25, 0.02, 0.0, -0.2]];
    let set = ParameterSet::new(links(&rows), FrameOffset::identity(), FrameOffset::identity());
    let dh = KinematicModel::from_parameter_sets(vec![JointConvention::Dh; 2], set.clone(), set.clone()).unwrap();
    let mixed = KinematicModel::from_parameter_sets(
        vec![JointConvention::Dh, JointConvention::Hayati],
        set.clone(),
        set.clone(),
    )
    .unwrap();

    let angles = [0.7, -1.3];
    assert_relative_eq!(
        mixed.pose(&angles, ParameterSetId::Nominal).unwrap(),
        dh.pose(&angles, ParameterSetId::Nominal).unwrap(),
        epsilon = 1e-15
    );
    assert_relative_eq!(
        hayati_transform(&set.links[1], angles[1]),
        dh_transform(&set.links[1], angles[1]),
        epsilon = 1e-15
    );
}

#[test]
fn test_short_angle_vector_and_unknown_selector_fail() {
    let model = arm6();
    match model.evaluate(&[0.0; 5], ParameterSetId::Nominal) {
        Err(KinematicsError::DimensionMismatch { expected, actual, .. }) => {
            assert_eq!((expected, actual), (6, 5));
        }
        other => panic!("expected DimensionMismatch, got {:?}", other),
    }
    assert!(matches!(
        model.evaluate_named(&[0.0; 6], "unknown"),
        Err(KinematicsError::InvalidArgument(_))
    ));
}

#[test]
fn test_zero_geometry_is_identity_and_tool_offset_adds_ten_in_z() {
    let model = six_joint_model([0.0; 6], FrameOffset::identity());
    let pose = model.pose(&[0.0; 6], ParameterSetId::Nominal).unwrap();
    assert_relative_eq!(pose, Matrix4::identity(), epsilon = 1e-15);

    let shifted = six_joint_model([0.0; 6], FrameOffset::new(0.0, 0.0, 10.0, 0.0, 0.0, 0.0));
    for set in ParameterSetId::all() {
        let moved = shifted.pose(&[0.0; 6], set).unwrap();
        assert_eq!(moved[(2, 3)] - pose[(2, 3)], 10.0);
    }
}

#[test]
fn test_alternating_twist_has_no_translation_and_accumulates_rotation() {
    let alphas = [0.0, FRAC_PI_2, 0.0, FRAC_PI_2, 0.0, FRAC_PI_2];
    let model = six_joint_model(alphas, FrameOffset::identity());
    let pose = model.pose(&[0.0; 6], ParameterSetId::Real).unwrap();

    let expected = alphas.iter().fold(Matrix4::identity(), |acc, &a| acc * rotate_x(a));
    assert_relative_eq!(pose, expected, epsilon = 1e-12);
    assert_relative_eq!(pose.fixed_view::<3, 1>(0, 3).into_owned(), Vector3::zeros(), epsilon = 1e-15);
}

#[test]
fn test_estimated_tracks_replacement_and_real_is_untouched() {
    let mut model = arm6();
    let angles = [0.3, -0.2, 1.0, 0.4, 1.1, 0.0];
    let real_before = model.evaluate(&angles, ParameterSetId::Real).unwrap();
    assert_eq!(
        model.evaluate(&angles, ParameterSetId::Estimated).unwrap(),
        model.evaluate(&angles, ParameterSetId::Nominal).unwrap()
    );

    let real = model.parameter_set(ParameterSetId::Real).clone();
    model.replace_estimated(real).unwrap();
    assert_eq!(model.evaluate(&angles, ParameterSetId::Estimated).unwrap(), real_before);
    assert_eq!(model.evaluate(&angles, ParameterSetId::Real).unwrap(), real_before);
}
