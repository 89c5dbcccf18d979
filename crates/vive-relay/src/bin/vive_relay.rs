//! vive-relay: answer tracker-name datagrams with pose JSON.

use clap::{Parser, ValueEnum};
use std::net::UdpSocket;
use std::path::PathBuf;
use vive_relay::{DeviceRegistry, RelayError, RelayServer, StaticRegistry};

#[derive(Parser)]
#[command(name = "vive-relay")]
#[command(about = "Serve tracker poses over UDP as JSON")]
#[command(version)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "192.168.1.5:8000")]
    bind: String,

    /// JSON snapshot of device readings keyed by device name.
    #[arg(long)]
    registry: PathBuf,

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

#[cfg(feature = "tracing")]
fn init_logging(level: LogLevelArg) {
    let _ = tracing_log::LogTracer::init();
    rig_fusion_core::init_tracing(false, level.into());
}

#[cfg(not(feature = "tracing"))]
fn init_logging(level: LogLevelArg) {
    let _ = rig_fusion_core::init_with_level(level.into());
}

fn main() -> Result<(), RelayError> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let registry = StaticRegistry::load_json(&cli.registry)?;
    log::info!("{} devices, trackers: {:?}", registry.len(), registry.trackers());

    let socket = UdpSocket::bind(&cli.bind).map_err(|source| RelayError::Bind {
        addr: cli.bind.clone(),
        source,
    })?;
    RelayServer::new(registry).serve(&socket)
}
