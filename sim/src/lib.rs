// Library exports for the calibration session simulator

pub mod robot_config;
pub mod input;
pub mod session;

pub use robot_config::ArmPreset;
pub use input::{AngleInput, JointSliders, SweepInput};
pub use session::{LogSink, Session, SessionReport, ShutdownOutcome};
