//! Geometric parameter types shared by the three hypotheses.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

use crate::transforms::{rotate_x, rotate_y, rotate_z, translate};
use crate::{KinematicsError, Result};

/// Geometry of one link.
///
/// `d_or_beta` is read as a translation along the joint axis for DH joints
/// and as the beta rotation for Hayati joints; which one is decided by the
/// joint's [`JointConvention`](crate::joints::JointConvention), not here.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LinkParameters {
    pub a: f64,
    pub alpha: f64,
    pub d_or_beta: f64,
    pub theta_offset: f64,
}

impl LinkParameters {
    pub fn new(a: f64, alpha: f64, d_or_beta: f64, theta_offset: f64) -> Self {
        Self {
            a,
            alpha,
            d_or_beta,
            theta_offset,
        }
    }
}

/// Rigid offset `(x, y, z, rz, ry, rx)` used for base and tool frames.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameOffset {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rz: f64,
    pub ry: f64,
    pub rx: f64,
}

impl FrameOffset {
    pub fn new(x: f64, y: f64, z: f64, rz: f64, ry: f64, rx: f64) -> Self {
        Self { x, y, z, rz, ry, rx }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    /// Builds from the six-value configuration layout.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        match *values {
            [x, y, z, rz, ry, rx] => Ok(Self::new(x, y, z, rz, ry, rx)),
            _ => Err(KinematicsError::dimension("frame offset", 6, values.len())),
        }
    }

    pub fn as_array(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.rz, self.ry, self.rx]
    }

    /// Translate, then rotate about Z, Y and X in that order.
    pub fn transform(&self) -> Matrix4<f64> {
        translate(&Vector3::new(self.x, self.y, self.z))
            * rotate_z(self.rz)
            * rotate_y(self.ry)
            * rotate_x(self.rx)
    }
}

/// One complete hypothesis of the manipulator geometry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParameterSet {
    pub links: Vec<LinkParameters>,
    pub base: FrameOffset,
    pub tool: FrameOffset,
}

impl ParameterSet {
    pub fn new(links: Vec<LinkParameters>, base: FrameOffset, tool: FrameOffset) -> Self {
        Self { links, base, tool }
    }

    pub fn joint_count(&self) -> usize {
        self.links.len()
    }
}

/// Selects which hypothesis an evaluation runs against.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ParameterSetId {
    Nominal,
    Real,
    Estimated,
}

impl ParameterSetId {
    pub fn all() -> [ParameterSetId; 3] {
        [
            ParameterSetId::Nominal,
            ParameterSetId::Real,
            ParameterSetId::Estimated,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ParameterSetId::Nominal => "nominal",
            ParameterSetId::Real => "real",
            ParameterSetId::Estimated => "estimated",
        }
    }
}

impl fmt::Display for ParameterSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ParameterSetId {
    type Err = KinematicsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nominal" => Ok(ParameterSetId::Nominal),
            "real" => Ok(ParameterSetId::Real),
            "estimated" => Ok(ParameterSetId::Estimated),
            other => Err(KinematicsError::InvalidArgument(format!(
                "parameter set must be 'nominal', 'real' or 'estimated', got '{other}'"
            ))),
        }
    }
}
