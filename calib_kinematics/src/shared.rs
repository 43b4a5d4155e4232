//! Lock-free state shared between the angle writer and the evaluation loop.
//!
//! Each joint angle lives in its own `AtomicU64` cell holding the `f64` bit
//! pattern. A single cell is never torn, but a [`SharedAngles::snapshot`]
//! taken while the writer is mid-update may mix values from two consecutive
//! writer ticks. The reader accepts that skew; at display rates a frame
//! built from one-tick-stale joints is indistinguishable from a coherent one.
//!
//! Discipline: exactly one writer and one reader per `SharedAngles`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::{KinematicsError, Result};

#[derive(Debug)]
pub struct SharedAngles {
    cells: Box<[AtomicU64]>,
}

impl SharedAngles {
    /// All cells start at 0.0.
    pub fn new(joint_count: usize) -> Self {
        Self::from_values(&vec![0.0; joint_count])
    }

    pub fn from_values(values: &[f64]) -> Self {
        Self {
            cells: values.iter().map(|v| AtomicU64::new(v.to_bits())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn store(&self, index: usize, value: f64) -> Result<()> {
        self.cell(index)?.store(value.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    pub fn load(&self, index: usize) -> Result<f64> {
        Ok(f64::from_bits(self.cell(index)?.load(Ordering::Relaxed)))
    }

    /// Writes every cell, one at a time.
    pub fn store_all(&self, values: &[f64]) -> Result<()> {
        if values.len() != self.len() {
            return Err(KinematicsError::dimension("shared angles", self.len(), values.len()));
        }
        for (cell, v) in self.cells.iter().zip(values) {
            cell.store(v.to_bits(), Ordering::Relaxed);
        }
        Ok(())
    }

    /// Reads every cell, one at a time. No cross-cell consistency.
    pub fn snapshot(&self) -> Vec<f64> {
        self.cells
            .iter()
            .map(|c| f64::from_bits(c.load(Ordering::Relaxed)))
            .collect()
    }

    fn cell(&self, index: usize) -> Result<&AtomicU64> {
        self.cells.get(index).ok_or_else(|| {
            KinematicsError::InvalidArgument(format!(
                "joint index {index} out of range for {} shared angles",
                self.len()
            ))
        })
    }
}

/// Cooperative shutdown signal. Starts raised; every loop polls it.
#[derive(Debug, Clone)]
pub struct RunningFlag(Arc<AtomicBool>);

impl Default for RunningFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
