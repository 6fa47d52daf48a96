//! gesturectl - replay hand-tracking traces through the gesture engine.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use gesturectl::backend::{self, DriverType, RunOptions};
use gesturectl::catalog::GestureMode;
use gesturectl::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "gesturectl", about = "Hand-gesture recognition engine")]
struct Cli {
    /// Config file (s-expression plist)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame trace to replay (default: stdin)
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Input mode: bare or glove
    #[arg(long, default_value = "bare")]
    mode: String,

    /// Override the inference rate (frames per second, minimum 5)
    #[arg(long)]
    infer_fps: Option<u32>,

    /// Tick at the inference rate on the newest frame instead of replaying every frame
    #[arg(long)]
    realtime: bool,

    /// Exit after N seconds (realtime mode)
    #[arg(long)]
    exit_after: Option<u64>,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("gesturectl {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Logs go to stderr; stdout carries events.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gesturectl=info".into()),
        )
        .init();

    info!("gesturectl v{} starting", env!("CARGO_PKG_VERSION"));

    let mode = match cli.mode.as_str() {
        "bare" => GestureMode::Bare,
        "glove" => GestureMode::Glove,
        other => {
            eprintln!("Unknown mode: {other}. Use: bare or glove");
            std::process::exit(1);
        }
    };

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(fps) = cli.infer_fps {
        config.runtime.infer_fps = fps.max(5);
    }

    let driver = if cli.realtime {
        DriverType::Realtime
    } else {
        DriverType::Offline
    };

    backend::run(
        config,
        RunOptions {
            driver,
            trace: cli.trace,
            mode,
            exit_after: cli.exit_after,
        },
    )
}
