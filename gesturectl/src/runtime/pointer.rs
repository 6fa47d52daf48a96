//! Pointer output: frame-to-screen mapping and the fixed-rate mover thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{debug, info, trace};

use crate::config::RuntimeConfig;

// ── Mapping ────────────────────────────────────────────────

/// Maps a tracked point in camera-frame pixels to a screen target.
#[derive(Debug, Clone)]
pub struct PointerMapper {
    screen_width: f32,
    screen_height: f32,
    /// Weight of the previous smoothed position (0 = follow input exactly).
    smoothing: f32,
    sensitivity: f32,
    deadzone_px: f32,
    smoothed: Option<(f32, f32)>,
    last_emitted: Option<(f32, f32)>,
}

impl PointerMapper {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            screen_width: config.screen_width as f32,
            screen_height: config.screen_height as f32,
            smoothing: config.mouse_smoothing,
            sensitivity: config.mouse_sensitivity,
            deadzone_px: config.mouse_deadzone_px,
            smoothed: None,
            last_emitted: None,
        }
    }

    /// Take new smoothing/sensitivity/deadzone/screen values, keeping state.
    pub fn update(&mut self, config: &RuntimeConfig) {
        self.screen_width = config.screen_width as f32;
        self.screen_height = config.screen_height as f32;
        self.smoothing = config.mouse_smoothing;
        self.sensitivity = config.mouse_sensitivity;
        self.deadzone_px = config.mouse_deadzone_px;
    }

    /// Forget smoothing history.
    pub fn reset(&mut self) {
        self.smoothed = None;
        self.last_emitted = None;
    }

    /// Screen target for `(x, y)` in a `frame_w` x `frame_h` frame, or `None`
    /// when the frame size is unusable or the target sits inside the deadzone
    /// of the last emitted one.
    pub fn map(&mut self, x: f32, y: f32, frame_w: u32, frame_h: u32) -> Option<(f32, f32)> {
        if frame_w <= 1 || frame_h <= 1 {
            return None;
        }
        let (sw, sh) = (self.screen_width, self.screen_height);
        let (cx, cy) = (sw / 2.0, sh / 2.0);

        let tx = cx + (x / frame_w as f32 * sw - cx) * self.sensitivity;
        let ty = cy + (y / frame_h as f32 * sh - cy) * self.sensitivity;
        let tx = tx.clamp(0.0, (sw - 1.0).max(0.0));
        let ty = ty.clamp(0.0, (sh - 1.0).max(0.0));

        let a = self.smoothing;
        let (sx, sy) = match self.smoothed {
            Some((px, py)) => (px * a + tx * (1.0 - a), py * a + ty * (1.0 - a)),
            None => (tx, ty),
        };
        self.smoothed = Some((sx, sy));

        if let Some((lx, ly)) = self.last_emitted {
            if (sx - lx).abs() < self.deadzone_px && (sy - ly).abs() < self.deadzone_px {
                return None;
            }
        }
        self.last_emitted = Some((sx, sy));
        Some((sx, sy))
    }
}

// ── Worker ─────────────────────────────────────────────────

/// Target the worker moves toward. Ignored while `valid` is false.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerTarget {
    pub x: f32,
    pub y: f32,
    pub valid: bool,
}

/// Destination of pointer moves (OS injection, a log, a test recorder).
pub trait PointerSink: Send {
    fn move_to(&mut self, x: f32, y: f32);
}

/// Sink that only traces the targets it receives.
#[derive(Debug, Default)]
pub struct LogPointerSink {
    last: Option<(i32, i32)>,
}

impl PointerSink for LogPointerSink {
    fn move_to(&mut self, x: f32, y: f32) {
        let pos = (x.round() as i32, y.round() as i32);
        if self.last != Some(pos) {
            trace!("pointer -> ({}, {})", pos.0, pos.1);
            self.last = Some(pos);
        }
    }
}

fn lock_target(target: &Mutex<PointerTarget>) -> MutexGuard<'_, PointerTarget> {
    target.lock().unwrap_or_else(|e| e.into_inner())
}

/// Thread that applies the current target to a sink at a fixed rate.
#[derive(Debug)]
pub struct PointerWorker {
    target: Arc<Mutex<PointerTarget>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PointerWorker {
    /// Spawn the worker ticking at `hz` (at least 10).
    pub fn start(hz: u32, mut sink: Box<dyn PointerSink>) -> anyhow::Result<Self> {
        let hz = hz.max(10);
        let interval = Duration::from_secs_f64(1.0 / hz as f64);
        let target = Arc::new(Mutex::new(PointerTarget::default()));
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let target = Arc::clone(&target);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("pointer-worker".into())
                .spawn(move || {
                    while running.load(Ordering::SeqCst) {
                        let tick = Instant::now();
                        let current = *lock_target(&target);
                        if current.valid {
                            sink.move_to(current.x, current.y);
                        }
                        if let Some(rest) = interval.checked_sub(tick.elapsed()) {
                            thread::sleep(rest);
                        }
                    }
                })
                .context("Failed to spawn pointer worker thread")?
        };
        info!("Pointer worker started at {} Hz", hz);

        Ok(Self {
            target,
            running,
            handle: Some(handle),
        })
    }

    pub fn set_target(&self, x: f32, y: f32) {
        *lock_target(&self.target) = PointerTarget { x, y, valid: true };
    }

    /// Stop moving until the next `set_target`.
    pub fn invalidate(&self) {
        lock_target(&self.target).valid = false;
    }

    pub fn target(&self) -> PointerTarget {
        *lock_target(&self.target)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("Pointer worker thread panicked");
            }
            info!("Pointer worker stopped");
        }
    }
}

impl Drop for PointerWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(smoothing: f32, sensitivity: f32, deadzone: f32) -> PointerMapper {
        let cfg = RuntimeConfig {
            mouse_smoothing: smoothing,
            mouse_sensitivity: sensitivity,
            mouse_deadzone_px: deadzone,
            ..RuntimeConfig::default()
        };
        PointerMapper::new(&cfg)
    }

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<(f32, f32)>>>);

    impl PointerSink for RecordingSink {
        fn move_to(&mut self, x: f32, y: f32) {
            self.0.lock().unwrap().push((x, y));
        }
    }

    #[test]
    fn test_map_scales_to_screen() {
        let mut m = mapper(0.0, 1.0, 0.0);
        assert_eq!(m.map(320.0, 240.0, 640, 480), Some((960.0, 540.0)));
        assert_eq!(m.map(160.0, 120.0, 640, 480), Some((480.0, 270.0)));
    }

    #[test]
    fn test_map_rejects_bad_frame() {
        let mut m = mapper(0.0, 1.0, 0.0);
        assert_eq!(m.map(10.0, 10.0, 1, 480), None);
        assert_eq!(m.map(10.0, 10.0, 640, 0), None);
    }

    #[test]
    fn test_sensitivity_about_center_and_clamp() {
        let mut m = mapper(0.0, 2.0, 0.0);
        // quarter point moves twice as far from center
        assert_eq!(m.map(480.0, 240.0, 640, 480), Some((1919.0, 540.0)));
        m.reset();
        assert_eq!(m.map(0.0, 0.0, 640, 480), Some((0.0, 0.0)));
    }

    #[test]
    fn test_smoothing() {
        let mut m = mapper(0.5, 1.0, 0.0);
        assert_eq!(m.map(0.0, 0.0, 640, 480), Some((0.0, 0.0)));
        let (x, y) = m.map(320.0, 240.0, 640, 480).unwrap();
        assert!((x - 480.0).abs() < 1e-3);
        assert!((y - 270.0).abs() < 1e-3);
    }

    #[test]
    fn test_deadzone_against_last_emitted() {
        let mut m = mapper(0.0, 1.0, 5.0);
        assert!(m.map(320.0, 240.0, 640, 480).is_some());
        // 3 screen px away on x, 0 on y
        assert_eq!(m.map(321.0, 240.0, 640, 480), None);
        assert!(m.map(330.0, 240.0, 640, 480).is_some());
        m.reset();
        assert!(m.map(330.0, 240.0, 640, 480).is_some());
    }

    #[test]
    fn test_worker_idle_until_target() {
        let sink = RecordingSink::default();
        let moves = Arc::clone(&sink.0);
        let mut worker = PointerWorker::start(100, Box::new(sink)).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(moves.lock().unwrap().is_empty());

        worker.set_target(100.0, 200.0);
        thread::sleep(Duration::from_millis(80));
        worker.stop();
        let seen = moves.lock().unwrap().clone();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|m| *m == (100.0, 200.0)));
        assert!(!worker.is_running());
    }

    #[test]
    fn test_worker_invalidate() {
        let sink = RecordingSink::default();
        let moves = Arc::clone(&sink.0);
        let mut worker = PointerWorker::start(100, Box::new(sink)).unwrap();
        worker.set_target(1.0, 1.0);
        worker.invalidate();
        assert!(!worker.target().valid);
        thread::sleep(Duration::from_millis(50));
        worker.stop();
        // at most a tick that raced the invalidate
        assert!(moves.lock().unwrap().len() <= 1);
    }
}
