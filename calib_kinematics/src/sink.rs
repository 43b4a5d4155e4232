//! Where evaluated frames go.

use std::collections::VecDeque;

use nalgebra::Point3;

use crate::model::ChainEvaluation;

/// Number of tool-tip points a [`Trail`] keeps by default.
pub const DEFAULT_TRAIL_LENGTH: usize = 100;

/// One tick of the evaluation loop: both hypotheses for the live angles.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainFrame {
    pub sequence: u64,
    pub nominal_angles: Vec<f64>,
    pub real_angles: Vec<f64>,
    pub nominal: ChainEvaluation,
    pub real: ChainEvaluation,
}

impl ChainFrame {
    /// Distance between the nominal and real tool tips.
    pub fn tip_error(&self) -> f64 {
        (self.real.tool_tip() - self.nominal.tool_tip()).norm()
    }
}

/// Consumer of evaluated frames.
///
/// Called at a bounded rate with no acknowledgment. Implementations must
/// cope with a frame identical to the previous one.
pub trait VisualizationSink {
    fn present(&mut self, frame: &ChainFrame);
}

impl<S: VisualizationSink + ?Sized> VisualizationSink for Box<S> {
    fn present(&mut self, frame: &ChainFrame) {
        (**self).present(frame)
    }
}

/// Bounded history of tool-tip positions, oldest first.
#[derive(Debug, Clone)]
pub struct Trail {
    points: VecDeque<Point3<f64>>,
    capacity: usize,
}

impl Default for Trail {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TRAIL_LENGTH)
    }
}

impl Trail {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, point: Point3<f64>) {
        if self.capacity == 0 {
            return;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> impl Iterator<Item = &Point3<f64>> + '_ {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
