use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use calib_kinematics::dataset::generate_all;
use calib_kinematics::{KinematicModel, ModelConfig};
use clap::Parser;
use sim::session::{DEFAULT_RATE_HZ, SHUTDOWN_TIMEOUT};
use sim::{ArmPreset, LogSink, Session, SweepInput};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Headless calibration session: sweeps the arm, evaluates the nominal and
/// real chains, and logs where they disagree.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON model configuration. Falls back to the built-in preset.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Built-in arm used when no configuration file is given.
    #[arg(long, value_enum, default_value_t = ArmPreset::Demo6)]
    preset: ArmPreset,

    /// Write the general and circle datasets to the configured paths and exit.
    #[arg(long)]
    generate: bool,

    /// Seconds to run. Runs until Ctrl-C when omitted.
    #[arg(long)]
    duration: Option<f64>,

    /// Evaluations per second.
    #[arg(long, default_value_t = DEFAULT_RATE_HZ)]
    rate: f64,

    /// Seed for the general dataset sampler.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Period of the headless joint sweep, in seconds.
    #[arg(long, default_value_t = 8.0)]
    sweep_period: f64,
}

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));
    // Leftover tasks get the same grace period as the input thread.
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    result
}

async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = match &args.config {
        Some(path) => ModelConfig::from_file(path)?,
        None => {
            info!("No configuration given, using {:?} preset", args.preset);
            args.preset.config()
        }
    };
    let model = match KinematicModel::from_config(&config) {
        Ok(model) => Arc::new(model),
        Err(e) => {
            error!("Invalid model configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.generate {
        let summary = generate_all(&model, args.seed)?;
        info!(
            "Generated {} general, {} base-circle and {} tool-circle samples",
            summary.general, summary.base_circle, summary.tool_circle
        );
        return Ok(());
    }

    let duration = match args.duration {
        Some(secs) if secs.is_finite() && secs > 0.0 => Some(Duration::from_secs_f64(secs)),
        Some(secs) => return Err(format!("--duration must be positive, got {secs}").into()),
        None => None,
    };
    if !(args.sweep_period.is_finite() && args.sweep_period > 0.0) {
        return Err(format!("--sweep-period must be positive, got {}", args.sweep_period).into());
    }

    let session = Session::new(model.clone(), args.rate)?;

    let running = session.running();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping");
                running.stop();
            }
            Err(e) => warn!("Could not listen for Ctrl-C: {}", e),
        }
    });

    let sweep = SweepInput::new(
        model.general_limits().clone(),
        Duration::from_secs_f64(args.sweep_period),
    );
    let mut sink = LogSink::new();
    let report = session.run(sweep, &mut sink, duration).await?;

    info!(
        "Session finished: {} frames, input {:?}, last tip error {:.6}",
        report.frames,
        report.shutdown,
        sink.last_error()
    );
    info!("{}", serde_json::to_string(&report)?);
    Ok(())
}
