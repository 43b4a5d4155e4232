//! Forward kinematics for serial manipulators under calibration.
//!
//! Each joint uses either the DH or the Hayati convention, and the model
//! carries three geometric hypotheses side by side: nominal, real and
//! estimated.

pub mod errors;
pub use errors::*;

pub mod transforms;
pub mod params;
pub mod joints;
pub mod limits;
pub mod calibration;
pub mod config;
pub mod model;
pub mod shared;
pub mod sink;
pub mod dataset;

pub use calibration::{CalibrationProgress, CalibrationSettings, DatasetPaths};
pub use config::ModelConfig;
pub use joints::JointConvention;
pub use limits::{JointLimits, WorkspaceBounds};
pub use model::{ChainEvaluation, KinematicModel};
pub use params::{FrameOffset, LinkParameters, ParameterSet, ParameterSetId};
pub use shared::{RunningFlag, SharedAngles};
pub use sink::{ChainFrame, Trail, VisualizationSink};
