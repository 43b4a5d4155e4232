//! Synthetic measurement datasets.
//!
//! Samples are produced by evaluating the *real* parameter set, standing in
//! for what a tracker would observe on the physical arm. Each row is the
//! joint vector followed by the observed tool-tip position.
//!
//! | Kind         | Angles                                              |
//! |--------------|-----------------------------------------------------|
//! | General      | uniform within the general limits, workspace-filtered |
//! | Base circle  | first joint swept across its circle limits          |
//! | Tool circle  | last joint swept across its circle limits           |
//!
//! Joints not being swept in a circle dataset sit at the midpoint of their
//! general limits.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::Writer;
use nalgebra::Point3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::model::KinematicModel;
use crate::params::ParameterSetId;
use crate::{KinematicsError, Result};

/// A general dataset gives up after this many attempts per requested sample.
pub const MAX_ATTEMPTS_PER_SAMPLE: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub angles: Vec<f64>,
    pub position: Point3<f64>,
}

impl DatasetRow {
    fn record(&self) -> Vec<String> {
        self.angles
            .iter()
            .chain([self.position.x, self.position.y, self.position.z].iter())
            .map(|v| v.to_string())
            .collect()
    }
}

/// Which end of the chain a circle dataset sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircleJoint {
    Base,
    Tool,
}

impl CircleJoint {
    fn index(self, joint_count: usize) -> usize {
        match self {
            CircleJoint::Base => 0,
            CircleJoint::Tool => joint_count.saturating_sub(1),
        }
    }
}

/// Draws `general_samples_number` reachable samples.
///
/// May return fewer rows than requested if the workspace rejects too many
/// draws; a warning is logged in that case.
pub fn generate_general(model: &KinematicModel, seed: u64) -> Result<Vec<DatasetRow>> {
    let wanted = model.general_samples_number();
    let limits = model.general_limits();
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(wanted);
    let mut rejected = 0usize;

    let max_attempts = wanted.saturating_mul(MAX_ATTEMPTS_PER_SAMPLE);
    for _ in 0..max_attempts {
        if rows.len() == wanted {
            break;
        }
        let angles: Vec<f64> = limits.ranges().map(|(lo, hi)| rng.gen_range(lo..=hi)).collect();
        let position = model.evaluate(&angles, ParameterSetId::Real)?.tool_tip();
        if model.workspace().contains(&position) {
            rows.push(DatasetRow { angles, position });
        } else {
            rejected += 1;
        }
    }

    if rows.len() < wanted {
        warn!(
            "General dataset short: {} of {} samples after {} attempts",
            rows.len(),
            wanted,
            max_attempts
        );
    }
    debug!("General dataset rejected {} samples outside the workspace", rejected);
    Ok(rows)
}

/// Sweeps one end joint evenly across its circle limits.
pub fn generate_circle(model: &KinematicModel, joint: CircleJoint) -> Result<Vec<DatasetRow>> {
    let count = model.circle_samples_number();
    let index = joint.index(model.joint_count());
    let (lo, hi) = model.circle_limits().range(index).ok_or_else(|| {
        KinematicsError::InvalidArgument(format!("no circle limits for joint {index}"))
    })?;
    let mut angles = model.general_limits().midpoint();

    (0..count)
        .map(|k| {
            angles[index] = if count > 1 {
                lo + (hi - lo) * k as f64 / (count - 1) as f64
            } else {
                (lo + hi) / 2.0
            };
            let position = model.evaluate(&angles, ParameterSetId::Real)?.tool_tip();
            Ok(DatasetRow {
                angles: angles.clone(),
                position,
            })
        })
        .collect()
}

/// Writes rows as CSV with a `q1..qN,x,y,z` header.
///
/// The header is sized by `joint_count`, so an empty dataset still carries
/// every column.
pub fn write_csv<W: Write>(writer: W, joint_count: usize, rows: &[DatasetRow]) -> Result<()> {
    let mut csv = Writer::from_writer(writer);
    let header: Vec<String> = (1..=joint_count)
        .map(|i| format!("q{i}"))
        .chain(["x", "y", "z"].into_iter().map(String::from))
        .collect();
    csv.write_record(&header)?;
    for row in rows {
        if row.angles.len() != joint_count {
            return Err(KinematicsError::dimension("dataset row", joint_count, row.angles.len()));
        }
        csv.write_record(row.record())?;
    }
    csv.flush().map_err(|e| KinematicsError::Dataset(e.to_string()))?;
    Ok(())
}

pub fn write_csv_file<P: AsRef<Path>>(path: P, joint_count: usize, rows: &[DatasetRow]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| KinematicsError::Dataset(format!("{}: {}", parent.display(), e)))?;
    }
    let file = File::create(path)
        .map_err(|e| KinematicsError::Dataset(format!("{}: {}", path.display(), e)))?;
    write_csv(BufWriter::new(file), joint_count, rows)?;
    info!("Wrote {} samples to {}", rows.len(), path.display());
    Ok(())
}

/// Row counts of a full generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetSummary {
    pub general: usize,
    pub base_circle: usize,
    pub tool_circle: usize,
}

/// Generates all three datasets and writes them to the model's configured paths.
pub fn generate_all(model: &KinematicModel, seed: u64) -> Result<DatasetSummary> {
    let paths = model.paths();
    let n = model.joint_count();
    let general = generate_general(model, seed)?;
    write_csv_file(&paths.dataset_file, n, &general)?;
    let base = generate_circle(model, CircleJoint::Base)?;
    write_csv_file(&paths.base_circles_dataset_file, n, &base)?;
    let tool = generate_circle(model, CircleJoint::Tool)?;
    write_csv_file(&paths.tool_circles_dataset_file, n, &tool)?;

    Ok(DatasetSummary {
        general: general.len(),
        base_circle: base.len(),
        tool_circle: tool.len(),
    })
}
