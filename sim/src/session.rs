//! The live session: one input task writing angles, one evaluation loop
//! reading them.
//!
//! The two sides share nothing but the angle slots and the running flag.
//! The evaluation loop never blocks on the writer; it throttles itself with a
//! minimum-interval check and a short sleep, so a stalled writer only makes
//! frames stale.
//!
//! Shutdown is cooperative. Clearing the flag asks both sides to stop; the
//! input thread gets [`SHUTDOWN_TIMEOUT`] to notice. After that it is
//! detached and the session returns anyway.
//!
//! The input side runs on its own OS thread because [`AngleInput::update`]
//! is synchronous and may block (terminal polling, a tracker read). A
//! blocked writer then never occupies a runtime worker or the timer.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use calib_kinematics::sink::Trail;
use calib_kinematics::{
    ChainFrame, KinematicModel, KinematicsError, ParameterSetId, Result, RunningFlag, SharedAngles,
    VisualizationSink,
};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::input::AngleInput;

pub const DEFAULT_RATE_HZ: f64 = 60.0;
pub const INPUT_POLL_INTERVAL: Duration = Duration::from_micros(16_667);
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
const IDLE_SLEEP: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownOutcome {
    /// The input thread observed the flag and exited in time.
    Joined,
    /// The input thread missed the timeout and was detached.
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub frames: u64,
    pub shutdown: ShutdownOutcome,
}

/// Angle slots and shutdown flag shared by the two loops.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub nominal: Arc<SharedAngles>,
    pub real: Arc<SharedAngles>,
    pub running: RunningFlag,
}

impl SessionState {
    pub fn new(joint_count: usize) -> Self {
        Self {
            nominal: Arc::new(SharedAngles::new(joint_count)),
            real: Arc::new(SharedAngles::new(joint_count)),
            running: RunningFlag::new(),
        }
    }
}

/// Minimum time between two frames at `rate_hz`.
///
/// # Errors
///
/// `InvalidArgument` unless `rate_hz` is positive, finite, and slow enough
/// that its period fits in a [`Duration`].
pub fn frame_interval(rate_hz: f64) -> Result<Duration> {
    if !(rate_hz.is_finite() && rate_hz > 0.0) {
        return Err(KinematicsError::InvalidArgument(format!(
            "evaluation rate must be positive, got {rate_hz}"
        )));
    }
    Duration::try_from_secs_f64(1.0 / rate_hz).map_err(|e| {
        KinematicsError::InvalidArgument(format!("evaluation rate {rate_hz} has no usable period: {e}"))
    })
}

pub struct Session {
    model: Arc<KinematicModel>,
    state: SessionState,
    rate_hz: f64,
}

impl Session {
    /// # Errors
    ///
    /// `InvalidArgument` if `rate_hz` is rejected by [`frame_interval`].
    pub fn new(model: Arc<KinematicModel>, rate_hz: f64) -> Result<Self> {
        frame_interval(rate_hz)?;
        let state = SessionState::new(model.joint_count());
        Ok(Self { model, state, rate_hz })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn running(&self) -> RunningFlag {
        self.state.running.clone()
    }

    /// Runs until the flag drops, `duration` elapses, or evaluation fails.
    pub async fn run<I, S>(&self, input: I, sink: &mut S, duration: Option<Duration>) -> Result<SessionReport>
    where
        I: AngleInput + 'static,
        S: VisualizationSink + ?Sized,
    {
        let input_thread = spawn_input(input, self.state.clone(), INPUT_POLL_INTERVAL)?;

        let deadline = duration.map(|d| {
            let running = self.state.running.clone();
            tokio::spawn(async move {
                tokio::time::sleep(d).await;
                info!("Session duration of {:.1}s reached", d.as_secs_f64());
                running.stop();
            })
        });

        let result = run_evaluation_loop(&self.model, &self.state, self.rate_hz, sink).await;

        if let Some(deadline) = deadline {
            deadline.abort();
        }
        let shutdown = shutdown(&self.state.running, input_thread, SHUTDOWN_TIMEOUT).await;

        let frames = result?;
        Ok(SessionReport { frames, shutdown })
    }
}

/// Evaluates both hypotheses at up to `rate_hz` and hands each frame to `sink`.
///
/// Returns the number of frames presented. An evaluation error clears the
/// running flag and is returned as is. A rate rejected by [`frame_interval`]
/// fails before the first frame.
///
/// The loop yields after every frame, so a rate high enough to make every
/// iteration due still lets other tasks run.
pub async fn run_evaluation_loop<S>(
    model: &KinematicModel,
    state: &SessionState,
    rate_hz: f64,
    sink: &mut S,
) -> Result<u64>
where
    S: VisualizationSink + ?Sized,
{
    let min_interval = frame_interval(rate_hz)?;
    let mut last_update: Option<Instant> = None;
    let mut frames: u64 = 0;
    info!("Evaluation loop started at {:.0} Hz", rate_hz);

    while state.running.is_running() {
        let due = last_update.map_or(true, |t| t.elapsed() >= min_interval);
        if !due {
            tokio::time::sleep(IDLE_SLEEP).await;
            continue;
        }
        last_update = Some(Instant::now());

        match evaluate_frame(model, state, frames) {
            Ok(frame) => {
                sink.present(&frame);
                frames += 1;
                tokio::task::yield_now().await;
            }
            Err(e) => {
                error!("Evaluation failed after {} frames: {}", frames, e);
                state.running.stop();
                return Err(e);
            }
        }
    }

    info!("Evaluation loop stopped after {} frames", frames);
    Ok(frames)
}

fn evaluate_frame(model: &KinematicModel, state: &SessionState, sequence: u64) -> Result<ChainFrame> {
    let nominal_angles = state.nominal.snapshot();
    let real_angles = state.real.snapshot();
    let nominal = model.evaluate(&nominal_angles, ParameterSetId::Nominal)?;
    let real = model.evaluate(&real_angles, ParameterSetId::Real)?;
    Ok(ChainFrame {
        sequence,
        nominal_angles,
        real_angles,
        nominal,
        real,
    })
}

/// Running input thread, as returned by [`spawn_input`].
#[derive(Debug)]
pub struct InputThread {
    handle: thread::JoinHandle<()>,
    done: oneshot::Receiver<()>,
}

/// Starts the input loop on its own thread, polling `input` every `interval`
/// until the flag drops. Missed ticks are skipped. An input error is logged
/// and stops the session.
pub fn spawn_input<I>(mut input: I, state: SessionState, interval: Duration) -> Result<InputThread>
where
    I: AngleInput + 'static,
{
    let (done_tx, done) = oneshot::channel();
    let handle = thread::Builder::new()
        .name("angle-input".to_string())
        .spawn(move || {
            let mut next_tick = Instant::now();
            while state.running.is_running() {
                let now = Instant::now();
                if now < next_tick {
                    thread::sleep(next_tick - now);
                }
                next_tick = next_tick.max(now) + interval;

                if let Err(e) = input.update(&state.nominal, &state.real, &state.running) {
                    error!("Input loop failed: {}", e);
                    state.running.stop();
                    break;
                }
            }
            debug!("Input loop exited");
            // The receiver is gone once shutdown has given up on us.
            let _ = done_tx.send(());
        })
        .map_err(KinematicsError::Spawn)?;
    Ok(InputThread { handle, done })
}

/// Clears the flag and waits up to `timeout` for the input thread.
///
/// A thread that misses the timeout is detached: the caller gets
/// [`ShutdownOutcome::Forced`] and the thread is left to end with the process.
pub async fn shutdown(running: &RunningFlag, input: InputThread, timeout: Duration) -> ShutdownOutcome {
    running.stop();
    let InputThread { handle, done } = input;
    match tokio::time::timeout(timeout, done).await {
        Ok(Ok(())) => {
            info!("Input thread joined");
            ShutdownOutcome::Joined
        }
        Ok(Err(_)) => {
            warn!("Input thread ended abnormally");
            ShutdownOutcome::Joined
        }
        Err(_) => {
            warn!(
                "Input thread {:?} did not stop within {:?}; detaching it",
                handle.thread().name().unwrap_or("unnamed"),
                timeout
            );
            drop(handle);
            ShutdownOutcome::Forced
        }
    }
}

/// Headless sink: logs tool tips and keeps the real tool-tip trail.
#[derive(Debug, Default)]
pub struct LogSink {
    frames: u64,
    trail: Trail,
    last_error: f64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    /// Nominal-to-real tool-tip distance of the latest frame.
    pub fn last_error(&self) -> f64 {
        self.last_error
    }
}

impl VisualizationSink for LogSink {
    fn present(&mut self, frame: &ChainFrame) {
        let nominal = frame.nominal.tool_tip();
        let real = frame.real.tool_tip();
        self.last_error = frame.tip_error();
        self.trail.push(real);
        self.frames += 1;
        debug!(
            "frame {}: nominal tip ({:.4}, {:.4}, {:.4}) real tip ({:.4}, {:.4}, {:.4}) error {:.6}",
            frame.sequence, nominal.x, nominal.y, nominal.z, real.x, real.y, real.z, self.last_error
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputResult, JointSliders, SweepInput};
    use crate::robot_config::demo_arm;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn demo_model() -> Arc<KinematicModel> {
        Arc::new(KinematicModel::from_config(&demo_arm()).unwrap())
    }

    struct StopAfter {
        ticks: usize,
        seen: Arc<AtomicUsize>,
    }

    impl AngleInput for StopAfter {
        fn update(&mut self, _: &SharedAngles, _: &SharedAngles, running: &RunningFlag) -> InputResult {
            if self.seen.fetch_add(1, Ordering::Relaxed) + 1 >= self.ticks {
                running.stop();
            }
            Ok(())
        }
    }

    /// Blocks inside `update` until `release` is set, ignoring the flag.
    struct Blocking {
        entered: Arc<AtomicBool>,
        release: Arc<AtomicBool>,
    }

    impl AngleInput for Blocking {
        fn update(&mut self, _: &SharedAngles, _: &SharedAngles, _: &RunningFlag) -> InputResult {
            self.entered.store(true, Ordering::Relaxed);
            while !self.release.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(5));
            }
            Ok(())
        }
    }

    struct Failing;

    impl AngleInput for Failing {
        fn update(&mut self, _: &SharedAngles, _: &SharedAngles, _: &RunningFlag) -> InputResult {
            Err("tracker disconnected".into())
        }
    }

    #[tokio::test]
    async fn test_session_runs_for_duration_and_joins() {
        let model = demo_model();
        let session = Session::new(model.clone(), 200.0).unwrap();
        let sweep = SweepInput::new(model.general_limits().clone(), Duration::from_secs(2));
        let mut sink = LogSink::new();

        let report = session.run(sweep, &mut sink, Some(Duration::from_millis(150))).await.unwrap();

        assert_eq!(report.shutdown, ShutdownOutcome::Joined);
        assert!(report.frames > 0);
        assert_eq!(report.frames, sink.frames());
        assert!(!session.running().is_running());
        assert!(sink.trail().len() <= 100);
    }

    #[tokio::test]
    async fn test_rate_throttles_frames() {
        let model = demo_model();
        let session = Session::new(model.clone(), 20.0).unwrap();
        let sliders = JointSliders::new(model.general_limits().clone());
        let mut sink = LogSink::new();

        let report = session.run(sliders, &mut sink, Some(Duration::from_millis(300))).await.unwrap();
        // 20 Hz over 0.3 s: about 6 frames, never dozens.
        assert!(report.frames >= 2 && report.frames <= 8, "{} frames", report.frames);
    }

    #[tokio::test]
    async fn test_input_can_stop_the_session() {
        let model = demo_model();
        let session = Session::new(model, 60.0).unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        let input = StopAfter { ticks: 3, seen: seen.clone() };
        let mut sink = LogSink::new();

        let report = session.run(input, &mut sink, None).await.unwrap();
        assert_eq!(report.shutdown, ShutdownOutcome::Joined);
        assert_eq!(seen.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_input_error_stops_session() {
        let session = Session::new(demo_model(), 60.0).unwrap();
        let mut sink = LogSink::new();
        let report = session.run(Failing, &mut sink, Some(Duration::from_secs(5))).await.unwrap();
        assert_eq!(report.shutdown, ShutdownOutcome::Joined);
    }

    #[tokio::test]
    async fn test_evaluation_error_clears_flag() {
        let model = demo_model();
        // Slots sized for the wrong arm.
        let state = SessionState::new(model.joint_count() - 1);
        let mut sink = LogSink::new();

        let err = run_evaluation_loop(&model, &state, 60.0, &mut sink).await.unwrap_err();
        assert!(matches!(err, KinematicsError::DimensionMismatch { .. }));
        assert!(!state.running.is_running());
        assert_eq!(sink.frames(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_blocked_input_is_detached() {
        let model = demo_model();
        let state = SessionState::new(model.joint_count());
        let entered = Arc::new(AtomicBool::new(false));
        let release = Arc::new(AtomicBool::new(false));
        let input = Blocking {
            entered: entered.clone(),
            release: release.clone(),
        };

        let thread = spawn_input(input, state.clone(), Duration::from_millis(1)).unwrap();
        while !entered.load(Ordering::Relaxed) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            shutdown(&state.running, thread, Duration::from_millis(100)),
        )
        .await
        .expect("shutdown must return while the input is blocked");
        assert_eq!(outcome, ShutdownOutcome::Forced);
        assert!(!state.running.is_running());
        release.store(true, Ordering::Relaxed);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_session_with_blocked_input_still_returns() {
        let session = Session::new(demo_model(), 100.0).unwrap();
        let release = Arc::new(AtomicBool::new(false));
        let input = Blocking {
            entered: Arc::new(AtomicBool::new(false)),
            release: release.clone(),
        };
        let mut sink = LogSink::new();

        let report = tokio::time::timeout(
            SHUTDOWN_TIMEOUT + Duration::from_secs(3),
            session.run(input, &mut sink, Some(Duration::from_millis(100))),
        )
        .await
        .expect("session must not hang on a blocked input")
        .unwrap();
        assert_eq!(report.shutdown, ShutdownOutcome::Forced);
        assert!(report.frames > 0);
        release.store(true, Ordering::Relaxed);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_unthrottled_rate_does_not_starve_the_runtime() {
        let model = demo_model();
        let session = Session::new(model.clone(), 1e12).unwrap();
        let sweep = SweepInput::new(model.general_limits().clone(), Duration::from_secs(1));
        let mut sink = LogSink::new();

        // The duration timer is a separate task on this single-threaded runtime.
        let report = tokio::time::timeout(
            Duration::from_secs(5),
            session.run(sweep, &mut sink, Some(Duration::from_millis(50))),
        )
        .await
        .expect("evaluation loop must yield")
        .unwrap();
        assert_eq!(report.shutdown, ShutdownOutcome::Joined);
        assert!(report.frames > 0);
    }

    #[tokio::test]
    async fn test_log_sink_tracks_tip_error() {
        let model = demo_model();
        let state = SessionState::new(model.joint_count());
        let mid = model.general_limits().midpoint();
        state.nominal.store_all(&mid).unwrap();
        state.real.store_all(&mid).unwrap();

        let frame = evaluate_frame(&model, &state, 0).unwrap();
        let mut sink = LogSink::new();
        sink.present(&frame);
        sink.present(&frame);

        assert_eq!(sink.trail().len(), 2);
        // Real geometry differs from nominal by sub-millimetre link errors.
        assert!(sink.last_error() > 0.0 && sink.last_error() < 0.02);
    }

    #[test]
    fn test_rate_must_be_positive_with_a_usable_period() {
        for rate in [0.0, -5.0, f64::NAN, f64::INFINITY, 1e-20, 1e-300] {
            assert!(
                matches!(Session::new(demo_model(), rate), Err(KinematicsError::InvalidArgument(_))),
                "rate {rate} accepted"
            );
        }
        assert_eq!(frame_interval(4.0).unwrap(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_evaluation_loop_rejects_bad_rate() {
        let model = demo_model();
        let state = SessionState::new(model.joint_count());
        let mut sink = LogSink::new();
        for rate in [0.0, 1e-300] {
            let err = run_evaluation_loop(&model, &state, rate, &mut sink).await.unwrap_err();
            assert!(matches!(err, KinematicsError::InvalidArgument(_)));
        }
        assert_eq!(sink.frames(), 0);
    }
}
