//! Joint limits and the Cartesian workspace bound.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::{KinematicsError, Result};

/// High/low limit pair per joint, in radians.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JointLimits {
    pub high: Vec<f64>,
    pub low: Vec<f64>,
}

impl JointLimits {
    pub fn new(high: Vec<f64>, low: Vec<f64>) -> Result<Self> {
        if high.len() != low.len() {
            return Err(KinematicsError::dimension("joint limits", high.len(), low.len()));
        }
        Ok(Self { high, low })
    }

    pub fn len(&self) -> usize {
        self.high.len()
    }

    pub fn is_empty(&self) -> bool {
        self.high.is_empty()
    }

    /// Midpoint of each joint's range.
    pub fn midpoint(&self) -> Vec<f64> {
        self.high
            .iter()
            .zip(&self.low)
            .map(|(h, l)| (h + l) / 2.0)
            .collect()
    }

    /// Clamps `value` into joint `index`'s range, or `None` past the last joint.
    pub fn clamp(&self, index: usize, value: f64) -> Option<f64> {
        self.range(index).map(|(lo, hi)| value.clamp(lo, hi))
    }

    /// `(min, max)` of joint `index`. The pair may be stored in either order.
    pub fn range(&self, index: usize) -> Option<(f64, f64)> {
        let (h, l) = (*self.high.get(index)?, *self.low.get(index)?);
        Some((h.min(l), h.max(l)))
    }

    /// Ordered ranges of every joint.
    pub fn ranges(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.high.iter().zip(&self.low).map(|(h, l)| (h.min(*l), h.max(*l)))
    }

    pub fn contains(&self, angles: &[f64]) -> bool {
        angles.len() == self.len() && angles.iter().zip(self.ranges()).all(|(a, (lo, hi))| (lo..=hi).contains(a))
    }
}

/// Axis-aligned box `[[xmin, xmax], [ymin, ymax], [zmin, zmax]]`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct WorkspaceBounds {
    pub x: [f64; 2],
    pub y: [f64; 2],
    pub z: [f64; 2],
}

impl WorkspaceBounds {
    pub fn from_pairs(pairs: &[Vec<f64>]) -> Result<Self> {
        if pairs.len() != 3 {
            return Err(KinematicsError::dimension("cartesian_limits", 3, pairs.len()));
        }
        let mut axes = [[0.0; 2]; 3];
        for (axis, pair) in axes.iter_mut().zip(pairs) {
            match pair.as_slice() {
                [lo, hi] => *axis = [lo.min(*hi), lo.max(*hi)],
                _ => {
                    return Err(KinematicsError::dimension(
                        "cartesian_limits pair",
                        2,
                        pair.len(),
                    ))
                }
            }
        }
        Ok(Self {
            x: axes[0],
            y: axes[1],
            z: axes[2],
        })
    }

    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (self.x[0]..=self.x[1]).contains(&p.x)
            && (self.y[0]..=self.y[1]).contains(&p.y)
            && (self.z[0]..=self.z[1]).contains(&p.z)
    }
}
