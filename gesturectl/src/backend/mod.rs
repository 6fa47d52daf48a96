//! Frame drivers: trace input, offline replay and the realtime loop.

pub mod replay;
pub mod trace;

use std::path::PathBuf;

use tracing::info;

use crate::catalog::GestureMode;
use crate::config::AppConfig;
use crate::runtime::{LogPointerSink, PointerWorker};

use replay::{FrameSource, Session};

/// Driver selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverType {
    /// Every frame, trace timestamps.
    Offline,
    /// Latest frame at the inference rate, wall-clock timestamps.
    Realtime,
}

/// Options taken from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub driver: DriverType,
    /// Trace file; stdin when absent.
    pub trace: Option<PathBuf>,
    pub mode: GestureMode,
    /// Realtime only: stop after N seconds.
    pub exit_after: Option<u64>,
}

/// Run the selected driver until the input ends or a signal arrives.
pub fn run(config: AppConfig, options: RunOptions) -> anyhow::Result<()> {
    replay::install_signal_handlers();
    info!(
        "mode: {}, driver: {:?}, input: {}",
        options.mode.as_str(),
        options.driver,
        options
            .trace
            .as_ref()
            .map_or_else(|| "stdin".to_string(), |p| p.display().to_string())
    );

    let infer_fps = config.runtime.infer_fps;
    let pointer_hz = config.runtime.pointer_hz;
    let mut session = Session::new(config, options.mode);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match options.driver {
        DriverType::Offline => {
            let frames = match &options.trace {
                Some(path) => trace::load_trace(path)?,
                None => trace::read_trace(std::io::stdin().lock())?,
            };
            replay::run_offline(&mut session, &frames, &mut out)?;
        }
        DriverType::Realtime => {
            let worker = PointerWorker::start(pointer_hz, Box::new(LogPointerSink::default()))?;
            let source = match &options.trace {
                Some(path) => FrameSource::Frames(trace::load_trace(path)?),
                None => FrameSource::Stdin,
            };
            replay::run_realtime(
                session.with_pointer(worker),
                source,
                infer_fps,
                options.exit_after,
                &mut out,
            )?;
        }
    }
    Ok(())
}
