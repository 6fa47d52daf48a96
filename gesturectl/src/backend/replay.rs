//! Trace replay drivers.
//!
//! Offline replay feeds every frame to the engine using the trace's own
//! timestamps. Realtime replay runs a producer thread into a latest-frame
//! slot, ticks the engine from a calloop timer at the inference rate and
//! drives a pointer worker alongside. Both handle SIGINT/SIGTERM and write
//! one s-expression per event to the output.

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Context;
use calloop::timer::{TimeoutAction, Timer};
use calloop::EventLoop;
use tracing::{debug, info, warn};

use crate::catalog::GestureMode;
use crate::config::{AppConfig, RuntimeConfig};
use crate::runtime::{LatestFrame, PointerMapper, PointerWorker};
use crate::sexp::{format_event, opt_string_sexp};
use crate::state::SystemState;
use crate::vision::landmarks::HandLandmark;
use crate::vision::GestureEngine;

use super::trace::TraceFrame;

/// Global flag set by SIGTERM/SIGINT handlers.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

const STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// Install signal handlers for graceful shutdown (SIGTERM, SIGINT).
pub fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGINT, signal_handler as libc::sighandler_t);
    }
}

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

// ── Session ────────────────────────────────────────────────

/// Counters reported at shutdown and in status logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub events: u64,
    pub scrolls: u64,
    pub pointer_targets: u64,
}

/// Engine plus the state and pointer plumbing around it.
#[derive(Debug)]
pub struct Session {
    engine: GestureEngine,
    state: SystemState,
    mode: GestureMode,
    runtime: RuntimeConfig,
    mapper: PointerMapper,
    pointer: Option<PointerWorker>,
    pointer_active: bool,
    last_raw: Option<String>,
    stats: SessionStats,
}

impl Session {
    pub fn new(config: AppConfig, mode: GestureMode) -> Self {
        let mapper = PointerMapper::new(&config.runtime);
        Self {
            engine: GestureEngine::new(config.engine, config.catalog, config.templates),
            state: SystemState::new(),
            mode,
            runtime: config.runtime,
            mapper,
            pointer: None,
            pointer_active: false,
            last_raw: None,
            stats: SessionStats::default(),
        }
    }

    /// Forward pointer targets to `worker`.
    pub fn with_pointer(mut self, worker: PointerWorker) -> Self {
        self.pointer = Some(worker);
        self
    }

    pub fn engine(&self) -> &GestureEngine {
        &self.engine
    }

    pub fn state(&self) -> &SystemState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SystemState {
        &mut self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Run one engine tick and return the event lines it produced.
    pub fn tick(&mut self, frame: &TraceFrame, now_ms: u64) -> Vec<String> {
        self.stats.frames += 1;
        let out = match self.mode {
            GestureMode::Glove => self.engine.update_glove(frame.blob(), &mut self.state, now_ms),
            GestureMode::Bare | GestureMode::Both => {
                self.engine.update_bare(frame.landmarks(), &mut self.state, now_ms)
            }
        };

        if out.raw_label != self.last_raw {
            debug!("Raw label: {}", out.raw_label.as_deref().unwrap_or("-"));
            self.last_raw = out.raw_label.clone();
        }
        self.update_pointer(frame);

        let t = now_ms.to_string();
        let raw = opt_string_sexp(out.raw_label.as_deref());
        let mut lines = Vec::new();
        if let Some(id) = out.event.as_deref() {
            self.stats.events += 1;
            info!("Gesture {} at {} ms", id, now_ms);
            lines.push(format_event(
                "gesture",
                &[("id", &opt_string_sexp(Some(id))), ("raw", &raw), ("t", &t)],
            ));
        }
        if let Some(scroll) = out.scroll.filter(|s| !s.is_zero()) {
            self.stats.scrolls += 1;
            lines.push(format_event(
                "scroll",
                &[
                    ("sv", &scroll.sv.to_string()),
                    ("sh", &scroll.sh.to_string()),
                    ("t", &t),
                ],
            ));
        }
        lines
    }

    /// Map the tracked point to a screen target while pointer output is
    /// allowed; invalidate the worker otherwise.
    fn update_pointer(&mut self, frame: &TraceFrame) -> Option<(f32, f32)> {
        if !self.state.pointer_output_allowed() {
            if self.pointer_active {
                debug!("Pointer output off");
                self.mapper.reset();
                if let Some(worker) = &self.pointer {
                    worker.invalidate();
                }
                self.pointer_active = false;
            }
            return None;
        }
        self.pointer_active = true;

        let point = match self.mode {
            GestureMode::Glove => frame.blob().and_then(|b| b.center),
            GestureMode::Bare | GestureMode::Both => {
                frame.landmarks().map(|lm| lm.get(HandLandmark::IndexTip))
            }
        }?;
        let (x, y) = self.mapper.map(
            point[0],
            point[1],
            self.runtime.frame_width,
            self.runtime.frame_height,
        )?;
        self.stats.pointer_targets += 1;
        if let Some(worker) = &self.pointer {
            worker.set_target(x, y);
        }
        Some((x, y))
    }

    /// Generate s-expression for session status.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:mode :{} :frames {} :events {} :scrolls {} :pointer-targets {} :state {} :engine {})",
            self.mode.as_str(),
            self.stats.frames,
            self.stats.events,
            self.stats.scrolls,
            self.stats.pointer_targets,
            self.state.status_sexp(),
            self.engine.status_sexp(),
        )
    }

    /// Stop the pointer worker, if any.
    pub fn shutdown(&mut self) {
        if let Some(mut worker) = self.pointer.take() {
            worker.stop();
        }
    }
}

// ── Offline ────────────────────────────────────────────────

/// Feed every frame in order, stamped with its trace time.
pub fn run_offline<W: Write>(
    session: &mut Session,
    frames: &[TraceFrame],
    out: &mut W,
) -> anyhow::Result<SessionStats> {
    info!("Replaying {} frames offline", frames.len());
    let mut last_t = 0;
    for frame in frames {
        if shutdown_requested() {
            info!("Shutdown signal received, exiting");
            break;
        }
        if frame.t_ms < last_t {
            warn!("Trace time went backwards ({} < {} ms)", frame.t_ms, last_t);
        }
        last_t = frame.t_ms;
        for line in session.tick(frame, frame.t_ms) {
            writeln!(out, "{}", line).context("Failed to write event")?;
        }
    }
    out.flush().context("Failed to flush output")?;
    let stats = session.stats();
    info!(
        "Offline replay done: {} frame(s), {} event(s), {} scroll step(s)",
        stats.frames, stats.events, stats.scrolls
    );
    Ok(stats)
}

// ── Realtime ───────────────────────────────────────────────

/// Where realtime frames come from.
#[derive(Debug)]
pub enum FrameSource {
    /// Recorded frames, published at their trace timing.
    Frames(Vec<TraceFrame>),
    /// Live lines on stdin, published as they arrive.
    Stdin,
}

fn spawn_producer(
    source: FrameSource,
    slot: Arc<LatestFrame<TraceFrame>>,
) -> anyhow::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("frame-producer".into())
        .spawn(move || {
            match source {
                FrameSource::Frames(frames) => {
                    let start = Instant::now();
                    let base = frames.first().map_or(0, |f| f.t_ms);
                    for frame in frames {
                        let due = Duration::from_millis(frame.t_ms.saturating_sub(base));
                        while start.elapsed() < due {
                            if shutdown_requested() {
                                slot.close();
                                return;
                            }
                            thread::sleep(due.saturating_sub(start.elapsed()).min(Duration::from_millis(10)));
                        }
                        slot.publish(frame);
                    }
                }
                FrameSource::Stdin => {
                    let stdin = std::io::stdin();
                    for (lineno, line) in stdin.lock().lines().enumerate() {
                        let Ok(line) = line else { break };
                        match TraceFrame::parse_line(&line) {
                            Ok(Some(frame)) => slot.publish(frame),
                            Ok(None) => {}
                            Err(e) => warn!("stdin line {}: {:#}", lineno + 1, e),
                        }
                        if shutdown_requested() {
                            break;
                        }
                    }
                }
            }
            slot.close();
        })
        .context("Failed to spawn frame producer thread")
}

/// State shared with the inference timer callback.
struct LoopData {
    session: Session,
    slot: Arc<LatestFrame<TraceFrame>>,
    start: Instant,
    pending: Vec<String>,
    ticks: u64,
    finished: bool,
}

/// Tick the engine at `infer_fps` on the newest available frame until the
/// source is exhausted, a signal arrives or `exit_after` seconds pass.
pub fn run_realtime<W: Write>(
    session: Session,
    source: FrameSource,
    infer_fps: u32,
    exit_after: Option<u64>,
    out: &mut W,
) -> anyhow::Result<SessionStats> {
    let infer_fps = infer_fps.max(5);
    let interval = Duration::from_secs_f64(1.0 / infer_fps as f64);
    let slot = Arc::new(LatestFrame::new());

    let mut event_loop: EventLoop<LoopData> =
        EventLoop::try_new().context("Failed to create event loop")?;
    event_loop
        .handle()
        .insert_source(Timer::from_duration(interval), move |_, _, data| {
            data.ticks += 1;
            let closed = data.slot.is_closed();
            match data.slot.take() {
                Some(frame) => {
                    let now_ms = data.start.elapsed().as_millis() as u64;
                    let lines = data.session.tick(&frame, now_ms);
                    data.pending.extend(lines);
                }
                None if closed => data.finished = true,
                None => {}
            }
            TimeoutAction::ToDuration(interval)
        })
        .map_err(|e| anyhow::anyhow!("Failed to insert inference timer: {}", e.error))?;

    let producer = spawn_producer(source, Arc::clone(&slot))?;

    let mut data = LoopData {
        session,
        slot,
        start: Instant::now(),
        pending: Vec::new(),
        ticks: 0,
        finished: false,
    };

    let exit_duration = exit_after.map(Duration::from_secs);
    let mut last_status_log = Instant::now();
    info!("Realtime replay at {} inference fps, entering event loop", infer_fps);

    while !data.finished {
        if shutdown_requested() {
            info!("Shutdown signal received, exiting");
            break;
        }
        if let Some(dur) = exit_duration {
            if data.start.elapsed() >= dur {
                info!("Exit timer fired after {}s", dur.as_secs());
                break;
            }
        }
        if last_status_log.elapsed() >= STATUS_INTERVAL {
            info!(
                "Status: {} tick(s), {} dropped frame(s) {}",
                data.ticks,
                data.slot.dropped(),
                data.session.status_sexp()
            );
            last_status_log = Instant::now();
        }

        event_loop
            .dispatch(Some(interval), &mut data)
            .context("Event loop dispatch failed")?;

        for line in data.pending.drain(..) {
            writeln!(out, "{}", line).context("Failed to write event")?;
        }
        out.flush().context("Failed to flush output")?;
    }

    data.session.shutdown();
    if data.slot.is_closed() && producer.join().is_err() {
        warn!("Frame producer thread panicked");
    }
    let stats = data.session.stats();
    info!(
        "Realtime replay done: {} tick(s), {} frame(s), {} dropped, {} event(s)",
        data.ticks,
        stats.frames,
        data.slot.dropped(),
        stats.events
    );
    Ok(stats)
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::trace::{landmarks_line, read_trace};
    use crate::vision::classifier::{make_pose, StaticPose};

    fn trace_of(poses: &[Option<StaticPose>], step_ms: u64) -> Vec<TraceFrame> {
        let text: Vec<String> = poses
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let t = i as u64 * step_ms;
                match p {
                    Some(pose) => landmarks_line(t, &make_pose(*pose)),
                    None => format!("(:t {})", t),
                }
            })
            .collect();
        read_trace(text.join("\n").as_bytes()).unwrap()
    }

    fn run_lines(session: &mut Session, frames: &[TraceFrame]) -> Vec<String> {
        let mut out = Vec::new();
        run_offline(session, frames, &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_offline_fist_event_line() {
        let mut session = Session::new(AppConfig::default(), GestureMode::Bare);
        let frames = trace_of(&[Some(StaticPose::Fist); 5], 80);
        let lines = run_lines(&mut session, &frames);
        assert_eq!(
            lines,
            vec!["(:type :event :event :gesture :id \"FIST\" :raw \"FIST\" :t 160)".to_string()]
        );
        let stats = session.stats();
        assert_eq!(stats.frames, 5);
        assert_eq!(stats.events, 1);
    }

    #[test]
    fn test_offline_scroll_lines() {
        let mut session = Session::new(AppConfig::default(), GestureMode::Bare);
        let ok = make_pose(StaticPose::OkSign);
        let text: Vec<String> = (0..4)
            .map(|i| {
                let pts: Vec<[f32; 2]> = ok.points().iter().map(|p| [p[0], p[1] - 20.0 * i as f32]).collect();
                let lm = crate::vision::LandmarkSet::from_points(&pts).unwrap();
                landmarks_line(i * 80, &lm)
            })
            .collect();
        let frames = read_trace(text.join("\n").as_bytes()).unwrap();
        let lines = run_lines(&mut session, &frames);
        // the first frame only anchors the scroll
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "(:type :event :event :scroll :sv 32 :sh 0 :t 80)");
        assert_eq!(session.stats().scrolls, 3);
    }

    #[test]
    fn test_no_hand_frames_are_quiet() {
        let mut session = Session::new(AppConfig::default(), GestureMode::Bare);
        let frames = trace_of(&[None, None, None], 80);
        assert!(run_lines(&mut session, &frames).is_empty());
        assert_eq!(session.stats().frames, 3);
    }

    #[test]
    fn test_pointer_targets_follow_mouse_mode() {
        let mut session = Session::new(AppConfig::default(), GestureMode::Bare);
        let frames = trace_of(&[Some(StaticPose::VSign); 4], 80);
        run_lines(&mut session, &frames);
        // mode confirmed on the third frame
        assert!(session.state().mouse_move_mode);
        assert!(session.stats().pointer_targets >= 1);

        let before = session.stats().pointer_targets;
        session.state_mut().mouse_move_output_enabled = false;
        run_lines(&mut session, &trace_of(&[Some(StaticPose::VSign)], 80));
        assert_eq!(session.stats().pointer_targets, before);
    }

    #[test]
    fn test_glove_mode_ignores_hand_frames() {
        let mut session = Session::new(AppConfig::default(), GestureMode::Glove);
        let frames = trace_of(&[Some(StaticPose::Fist); 4], 80);
        assert!(run_lines(&mut session, &frames).is_empty());
        assert!(!session.state().mouse_move_mode);
    }

    #[test]
    fn test_status_sexp() {
        let session = Session::new(AppConfig::default(), GestureMode::Glove);
        let s = session.status_sexp();
        assert!(s.starts_with("(:mode :glove :frames 0"));
        assert!(s.contains(":engine (:raw nil"));
    }

    #[test]
    fn test_realtime_drains_trace() {
        let session = Session::new(AppConfig::default(), GestureMode::Bare);
        let frames = trace_of(&[Some(StaticPose::Fist); 6], 20);
        let mut out = Vec::new();
        let stats = run_realtime(session, FrameSource::Frames(frames), 50, Some(5), &mut out).unwrap();
        assert!(stats.frames >= 1);
        assert!(stats.frames <= 6);
    }
}
