//! rig-fusion CLI: calibrate against a marker, then stream world positions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use rig_fusion::aruco::SquareMarkerLocator;
use rig_fusion::replay::Recording;
use rig_fusion::{
    CalibrationEngine, CalibrationOutcome, CalibrationSettings, Estimate, FrameSource,
    FusionConfig, PoseEstimator, RetryPolicy, SensorRig,
};
use std::path::PathBuf;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "rig-fusion")]
#[command(about = "Marker-anchored world positions from a tracking camera")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate on a recorded session, then print positions until it ends.
    Run(RunArgs),
    /// Print the default configuration as JSON.
    PrintConfig,
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Configuration JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Recording JSON (intrinsics + frames).
    #[arg(long)]
    recording: PathBuf,

    /// Print every N-th position.
    #[arg(long, default_value = "20")]
    print_every: u64,

    /// Give up calibrating after this many ticks.
    #[arg(long)]
    max_calibration_attempts: Option<u32>,

    /// Also report the camera position relative to the visible marker.
    #[arg(long)]
    detect: bool,

    /// Log verbosity; with the `tracing` feature, `RUST_LOG` overrides it.
    #[arg(long, value_enum, default_value_t = LogLevelArg::Info)]
    log_level: LogLevelArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for log::LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Off => Self::Off,
            LogLevelArg::Error => Self::Error,
            LogLevelArg::Warn => Self::Warn,
            LogLevelArg::Info => Self::Info,
            LogLevelArg::Debug => Self::Debug,
            LogLevelArg::Trace => Self::Trace,
        }
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(&args),
        Commands::PrintConfig => {
            println!("{}", serde_json::to_string_pretty(&FusionConfig::default())?);
            Ok(())
        }
    }
}

#[cfg(feature = "tracing")]
fn init_logging(level: LogLevelArg) {
    let _ = tracing_log::LogTracer::init();
    rig_fusion::core::init_tracing(false, level.into());
}

#[cfg(not(feature = "tracing"))]
fn init_logging(level: LogLevelArg) {
    let _ = rig_fusion::core::init_with_level(level.into());
}

fn run(args: &RunArgs) -> CliResult<()> {
    init_logging(args.log_level);

    let mut cfg = match &args.config {
        Some(path) => FusionConfig::load_json(path)?,
        None => FusionConfig::default(),
    };
    if args.detect {
        cfg.detect_mode = true;
    }
    if args.max_calibration_attempts.is_some() {
        cfg.calibration.max_attempts = args.max_calibration_attempts;
    }

    log::info!("loading recording {}", args.recording.display());
    let (color, pose) = Recording::load_json(&args.recording)?.into_streams();
    let mut rig = SensorRig::open(color, pose, &cfg.stream)?;

    let locator = SquareMarkerLocator::from_dictionary_file(
        &cfg.marker.dictionary,
        cfg.marker.dictionary_path.as_deref(),
        rig.intrinsics(),
        cfg.marker.locator_params(),
    )?;

    let mut engine = CalibrationEngine::new(CalibrationSettings::from(&cfg.calibration));
    let policy = RetryPolicy::from(&cfg.calibration);
    let outcome = engine.run_calibration(&mut rig, &locator, &policy, |tick| {
        println!("{tick}");
        tick.is_end_of_stream()
    })?;
    match outcome {
        CalibrationOutcome::Calibrated { attempts } => {
            println!("calibration success: matrices loaded after {attempts} attempt(s)");
        }
        CalibrationOutcome::Stopped { attempts } => {
            rig.stop();
            return Err(format!(
                "calibration did not complete after {attempts} attempt(s): recording ended"
            )
            .into());
        }
        CalibrationOutcome::Exhausted { attempts } => {
            rig.stop();
            return Err(format!("calibration did not complete after {attempts} attempt(s)").into());
        }
    }

    let estimator = PoseEstimator::new(&engine, &locator).with_detect_mode(cfg.detect_mode);
    let every = args.print_every.max(1);
    let mut counter = 0u64;
    loop {
        match estimator.poll(&mut rig) {
            Estimate::Location {
                world,
                marker_relative,
            } => {
                if counter % every == 0 {
                    match marker_relative {
                        Some(m) => println!(
                            "[{:.3} {:.3} {:.3}] marker [{:.3} {:.3} {:.3}]",
                            world.x, world.y, world.z, m.x, m.y, m.z
                        ),
                        None => println!("[{:.3} {:.3} {:.3}]", world.x, world.y, world.z),
                    }
                }
                counter += 1;
            }
            Estimate::Invalid(reason) => {
                log::info!("stopping after {counter} positions: {reason}");
                rig.stop();
                break;
            }
        }
    }

    Ok(())
}
