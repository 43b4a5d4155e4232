//! Angle writers for the input loop.
//!
//! An [`AngleInput`] is polled by the input loop and publishes the commanded
//! nominal and real joint vectors into the shared slots. It is the only
//! writer of those slots.

use std::error::Error;
use std::f64::consts::TAU;
use std::time::{Duration, Instant};

use calib_kinematics::{JointLimits, ParameterSetId, RunningFlag, SharedAngles};

pub type InputResult = Result<(), Box<dyn Error + Send + Sync>>;

/// A source of live joint angles.
pub trait AngleInput: Send {
    /// Called once per input tick. May stop the session through `running`.
    fn update(&mut self, nominal: &SharedAngles, real: &SharedAngles, running: &RunningFlag) -> InputResult;
}

/// Headless writer: every joint oscillates inside its limits.
///
/// Joint `i` runs at `1 + i/2` times the base frequency so the tool tip
/// traces a non-repeating figure instead of a line.
#[derive(Debug, Clone)]
pub struct SweepInput {
    limits: JointLimits,
    period: Duration,
    started: Instant,
}

impl SweepInput {
    pub fn new(limits: JointLimits, period: Duration) -> Self {
        Self {
            limits,
            period,
            started: Instant::now(),
        }
    }

    pub fn angles_at(&self, elapsed: Duration) -> Vec<f64> {
        let phase = TAU * elapsed.as_secs_f64() / self.period.as_secs_f64().max(f64::EPSILON);
        self.limits
            .ranges()
            .enumerate()
            .map(|(i, (lo, hi))| {
                let mid = (lo + hi) / 2.0;
                let half = (hi - lo) / 2.0;
                mid + half * (phase * (1.0 + i as f64 / 2.0)).sin()
            })
            .collect()
    }
}

impl AngleInput for SweepInput {
    fn update(&mut self, nominal: &SharedAngles, real: &SharedAngles, _running: &RunningFlag) -> InputResult {
        let angles = self.angles_at(self.started.elapsed());
        nominal.store_all(&angles)?;
        real.store_all(&angles)?;
        Ok(())
    }
}

/// Joints that start away from their limit midpoint, as `(joint, angle)`.
///
/// Puts the demo arm's elbow and wrist at a right angle so the initial pose
/// is not folded onto itself.
pub const SLIDER_START_OVERRIDES: [(usize, f64); 2] = [(2, 1.57), (4, 1.57)];

/// One slider per joint per hypothesis: nominal joints first, then real.
#[derive(Debug, Clone)]
pub struct JointSliders {
    limits: JointLimits,
    nominal: Vec<f64>,
    real: Vec<f64>,
    selected: usize,
}

impl JointSliders {
    pub fn new(limits: JointLimits) -> Self {
        let start = Self::start_values(&limits);
        Self {
            nominal: start.clone(),
            real: start,
            limits,
            selected: 0,
        }
    }

    fn start_values(limits: &JointLimits) -> Vec<f64> {
        let mut values = limits.midpoint();
        for (joint, angle) in SLIDER_START_OVERRIDES {
            if let Some(angle) = limits.clamp(joint, angle) {
                values[joint] = angle;
            }
        }
        values
    }

    pub fn joint_count(&self) -> usize {
        self.limits.len()
    }

    /// Total number of sliders.
    pub fn len(&self) -> usize {
        2 * self.joint_count()
    }

    pub fn is_empty(&self) -> bool {
        self.joint_count() == 0
    }

    /// Which hypothesis and joint slider `index` drives.
    pub fn slider(&self, index: usize) -> (ParameterSetId, usize) {
        let n = self.joint_count();
        if index < n {
            (ParameterSetId::Nominal, index)
        } else {
            (ParameterSetId::Real, index - n)
        }
    }

    pub fn value(&self, index: usize) -> f64 {
        match self.slider(index) {
            (ParameterSetId::Real, joint) => self.real[joint],
            (_, joint) => self.nominal[joint],
        }
    }

    pub fn limits(&self) -> &JointLimits {
        &self.limits
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        if !self.is_empty() {
            self.selected = (self.selected + 1) % self.len();
        }
    }

    pub fn select_previous(&mut self) {
        if !self.is_empty() {
            self.selected = (self.selected + self.len() - 1) % self.len();
        }
    }

    /// Sets slider `index`, clamped to its joint's limits. Out-of-range
    /// indices are ignored.
    pub fn set(&mut self, index: usize, value: f64) {
        if index >= self.len() {
            return;
        }
        let (set, joint) = self.slider(index);
        let Some(clamped) = self.limits.clamp(joint, value) else {
            return;
        };
        match set {
            ParameterSetId::Real => self.real[joint] = clamped,
            _ => self.nominal[joint] = clamped,
        }
    }

    /// Moves the selected slider by `delta` radians.
    pub fn nudge(&mut self, delta: f64) {
        let index = self.selected;
        if index < self.len() {
            self.set(index, self.value(index) + delta);
        }
    }

    pub fn reset(&mut self) {
        let start = Self::start_values(&self.limits);
        self.nominal = start.clone();
        self.real = start;
    }

    pub fn nominal(&self) -> &[f64] {
        &self.nominal
    }

    pub fn real(&self) -> &[f64] {
        &self.real
    }
}

impl AngleInput for JointSliders {
    fn update(&mut self, nominal: &SharedAngles, real: &SharedAngles, _running: &RunningFlag) -> InputResult {
        nominal.store_all(&self.nominal)?;
        real.store_all(&self.real)?;
        Ok(())
    }
}
