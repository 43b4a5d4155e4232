//! Per-joint transform builders.
//!
//! Two conventions are supported:
//!
//! | Convention | Flag | Third link parameter | Use                        |
//! |------------|------|----------------------|----------------------------|
//! | DH         | 0    | `d` (translation)    | general joints             |
//! | Hayati     | 1    | `beta` (rotation)    | nearly parallel joint axes |
//!
//! With `beta = 0` the Hayati matrix is exactly the DH matrix with `d = 0`.
//!
//! Neither builder validates its input. Parameters come from trusted
//! configuration, and a physically meaningless value (e.g. a huge beta)
//! produces a meaningless but finite transform rather than an error.

use int_enum::IntEnum;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::params::LinkParameters;
use crate::{KinematicsError, Result};

/// How a joint's link parameters are turned into a transform.
///
/// Resolved once when the model is built and shared by all three parameter
/// sets for that joint index.
#[repr(u8)]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, IntEnum)]
pub enum JointConvention {
    Dh = 0,
    Hayati = 1,
}

impl JointConvention {
    /// Reads the numeric flag stored as the fifth entry of a link row.
    pub fn from_flag(flag: f64) -> Result<Self> {
        if flag.fract() != 0.0 || !(0.0..=255.0).contains(&flag) {
            return Err(KinematicsError::InvalidArgument(format!(
                "joint convention flag must be 0 (DH) or 1 (Hayati), got {flag}"
            )));
        }
        JointConvention::try_from(flag as u8).map_err(|raw| {
            KinematicsError::InvalidArgument(format!(
                "joint convention flag must be 0 (DH) or 1 (Hayati), got {raw}"
            ))
        })
    }

    pub fn flag(self) -> u8 {
        self.into()
    }

    /// Builds the joint transform for a live joint angle.
    pub fn transform(self, link: &LinkParameters, angle: f64) -> Matrix4<f64> {
        match self {
            JointConvention::Dh => dh_transform(link, angle),
            JointConvention::Hayati => hayati_transform(link, angle),
        }
    }
}

/// Standard DH transform with `theta = theta_offset + angle`.
#[rustfmt::skip]
pub fn dh_transform(link: &LinkParameters, angle: f64) -> Matrix4<f64> {
    let (sa, ca) = link.alpha.sin_cos();
    let (sq, cq) = (link.theta_offset + angle).sin_cos();
    let a = link.a;
    let d = link.d_or_beta;

    Matrix4::new(
        cq, -ca * sq, sa * sq, a * cq,
        sq, ca * cq, -sa * cq, a * sq,
        0.0, sa, ca, d,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Hayati transform: the `d` translation is replaced by a `beta` rotation.
#[rustfmt::skip]
pub fn hayati_transform(link: &LinkParameters, angle: f64) -> Matrix4<f64> {
    let (sa, ca) = link.alpha.sin_cos();
    let (sb, cb) = link.d_or_beta.sin_cos();
    let (sq, cq) = (link.theta_offset + angle).sin_cos();
    let a = link.a;

    Matrix4::new(
        -sa * sb * sq + cb * cq, -ca * sq, sa * cb * sq + sb * cq, a * cq,
        sa * sb * cq + cb * sq, ca * cq, -sa * cb * cq + sb * sq, a * sq,
        -ca * sb, sa, ca * cb, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::{is_rigid, rotate_x, rotate_y, rotate_z, translate};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_flag_round_trip() {
        assert_eq!(JointConvention::from_flag(0.0).unwrap(), JointConvention::Dh);
        assert_eq!(JointConvention::from_flag(1.0).unwrap(), JointConvention::Hayati);
        assert_eq!(JointConvention::Hayati.flag(), 1);
    }

    #[test]
    fn test_flag_rejects_other_values() {
        for bad in [2.0, -1.0, 0.5, f64::NAN] {
            assert!(
                matches!(JointConvention::from_flag(bad), Err(KinematicsError::InvalidArgument(_))),
                "flag {bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_dh_matches_rotation_product() {
        // Standard DH: Rz(theta) * Tz(d) * Tx(a) * Rx(alpha)
        let link = LinkParameters::new(0.4, -0.7, 0.25, 0.1);
        let angle = 0.9;
        let expected = rotate_z(0.1 + angle)
            * translate(&Vector3::new(0.0, 0.0, 0.25))
            * translate(&Vector3::new(0.4, 0.0, 0.0))
            * rotate_x(-0.7);
        assert_relative_eq!(dh_transform(&link, angle), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_hayati_matches_rotation_product() {
        // Hayati: Rz(theta) * Tx(a) * Rx(alpha) * Ry(beta)
        let link = LinkParameters::new(0.3, 0.05, -0.02, -0.4);
        let angle = 1.2;
        let expected = rotate_z(-0.4 + angle)
            * translate(&Vector3::new(0.3, 0.0, 0.0))
            * rotate_x(0.05)
            * rotate_y(-0.02);
        assert_relative_eq!(hayati_transform(&link, angle), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_hayati_with_zero_beta_equals_dh_with_zero_d() {
        for (a, alpha, offset, angle) in [
            (0.0, 0.0, 0.0, 0.0),
            (0.5, FRAC_PI_2, 0.2, -1.1),
            (1.25, -0.3, -0.7, 2.4),
        ] {
            let link = LinkParameters::new(a, alpha, 0.0, offset);
            assert_relative_eq!(
                hayati_transform(&link, angle),
                dh_transform(&link, angle),
                epsilon = 1e-15
            );
        }
    }

    #[test]
    fn test_builders_produce_rigid_transforms() {
        let link = LinkParameters::new(0.7, 1.1, 0.3, 0.2);
        for angle in [-2.0, 0.0, 0.5, 3.0] {
            assert!(is_rigid(&dh_transform(&link, angle), 1e-12));
            assert!(is_rigid(&hayati_transform(&link, angle), 1e-12));
        }
    }

    #[test]
    fn test_theta_offset_adds_to_angle() {
        let with_offset = LinkParameters::new(0.2, 0.4, 0.1, 0.5);
        let without = LinkParameters::new(0.2, 0.4, 0.1, 0.0);
        assert_relative_eq!(
            JointConvention::Dh.transform(&with_offset, 0.25),
            JointConvention::Dh.transform(&without, 0.75),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_degenerate_parameters_do_not_panic() {
        let link = LinkParameters::new(f64::MAX, 1e308, 1e300, 0.0);
        let _ = dh_transform(&link, 0.0);
        let _ = hayati_transform(&link, 0.0);
    }
}
