//! Homogeneous transform primitives.
//!
//! Elementary 4x4 rigid transforms built on nalgebra: rotations about the
//! principal axes, pure translation, and the Rodrigues rotation about an
//! arbitrary unit axis. Everything here is a pure function of its inputs.
//!
//! # Examples
//!
//! ```rust
//! use calib_kinematics::transforms::{rotate_z, translate, origin};
//! use nalgebra::Vector3;
//!
//! let t = translate(&Vector3::new(1.0, 0.0, 0.0)) * rotate_z(std::f64::consts::FRAC_PI_2);
//! let p = origin(&t);
//! assert!((p.x - 1.0).abs() < 1e-12);
//! ```
//!
//! # Notes
//!
//! - Angles are in radians, lengths in the unit of the configuration (the
//!   engine never converts).
//! - Matrices are column-vector convention: a chain is composed by
//!   right-multiplication, `T_acc = T_acc * T_next`.

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

use crate::{KinematicsError, Result};

/// Allowed deviation of a rotation axis norm from 1.0.
pub const AXIS_NORM_TOLERANCE: f64 = 1e-6;

/// Rotation about the X axis.
#[rustfmt::skip]
pub fn rotate_x(angle: f64) -> Matrix4<f64> {
    let (s, c) = angle.sin_cos();
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, c, -s, 0.0,
        0.0, s, c, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Rotation about the Y axis.
#[rustfmt::skip]
pub fn rotate_y(angle: f64) -> Matrix4<f64> {
    let (s, c) = angle.sin_cos();
    Matrix4::new(
        c, 0.0, s, 0.0,
        0.0, 1.0, 0.0, 0.0,
        -s, 0.0, c, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Rotation about the Z axis.
#[rustfmt::skip]
pub fn rotate_z(angle: f64) -> Matrix4<f64> {
    let (s, c) = angle.sin_cos();
    Matrix4::new(
        c, -s, 0.0, 0.0,
        s, c, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Pure translation; the vector lands in the last column.
#[rustfmt::skip]
pub fn translate(v: &Vector3<f64>) -> Matrix4<f64> {
    Matrix4::new(
        1.0, 0.0, 0.0, v.x,
        0.0, 1.0, 0.0, v.y,
        0.0, 0.0, 1.0, v.z,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Rodrigues rotation by `angle` about `axis`.
///
/// The axis must already be normalized (within [`AXIS_NORM_TOLERANCE`]);
/// anything else is `InvalidArgument`, never rescaled.
#[rustfmt::skip]
pub fn rotate_about_axis(axis: &Vector3<f64>, angle: f64) -> Result<Matrix3<f64>> {
    let norm = axis.norm();
    if !norm.is_finite() || (norm - 1.0).abs() > AXIS_NORM_TOLERANCE {
        return Err(KinematicsError::InvalidArgument(format!(
            "rotation axis must be a unit vector, got norm {norm}"
        )));
    }

    let (s, c) = angle.sin_cos();
    let nu = 1.0 - c;
    let (x, y, z) = (axis.x, axis.y, axis.z);

    Ok(Matrix3::new(
        c + nu * x * x,     nu * x * y - s * z, nu * x * z + s * y,
        nu * y * x + s * z, c + nu * y * y,     nu * y * z - s * x,
        nu * z * x - s * y, nu * z * y + s * x, c + nu * z * z,
    ))
}

/// Origin of a homogeneous transform (its translation column).
pub fn origin(t: &Matrix4<f64>) -> Point3<f64> {
    Point3::new(t[(0, 3)], t[(1, 3)], t[(2, 3)])
}

/// Rotation block of a homogeneous transform.
pub fn rotation_block(t: &Matrix4<f64>) -> Matrix3<f64> {
    t.fixed_view::<3, 3>(0, 0).into_owned()
}

/// True when `t` has an orthonormal rotation block and a `[0 0 0 1]` bottom row.
pub fn is_rigid(t: &Matrix4<f64>, tolerance: f64) -> bool {
    let r = rotation_block(t);
    let orthogonal = (r * r.transpose() - Matrix3::identity()).amax() <= tolerance;
    let bottom = t[(3, 0)].abs() <= tolerance
        && t[(3, 1)].abs() <= tolerance
        && t[(3, 2)].abs() <= tolerance
        && (t[(3, 3)] - 1.0).abs() <= tolerance;
    orthogonal && bottom
}
