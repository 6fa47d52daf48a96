//! Time-bounded trajectory window of tracked points.

use std::collections::VecDeque;

use super::landmarks::Point;
use super::primitives::distance;

/// Samples needed before delta and speed are reported.
pub const MIN_MOTION_SAMPLES: usize = 6;

/// One tracked position with its timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSample {
    pub t_ms: u64,
    pub pos: Point,
}

/// Rolling buffer of recent positions, oldest first.
///
/// Samples older than `window_ms` relative to the newest sample are evicted
/// on every [`TrackWindow::add`].
#[derive(Debug, Clone)]
pub struct TrackWindow {
    window_ms: u64,
    samples: VecDeque<TrackSample>,
}

impl TrackWindow {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            samples: VecDeque::new(),
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Change the age limit. Takes effect on the next `add`.
    pub fn set_window(&mut self, window_ms: u64) {
        self.window_ms = window_ms;
    }

    pub fn add(&mut self, t_ms: u64, pos: Point) {
        self.samples.push_back(TrackSample { t_ms, pos });
        let cutoff = t_ms.saturating_sub(self.window_ms);
        while let Some(front) = self.samples.front() {
            if front.t_ms >= cutoff {
                break;
            }
            self.samples.pop_front();
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sum of distances between consecutive samples.
    pub fn path_length(&self) -> f32 {
        self.samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|(a, b)| distance(a.pos, b.pos))
            .sum()
    }

    /// Newest minus oldest position, once the window holds enough samples.
    pub fn delta(&self) -> Option<(f32, f32)> {
        if self.samples.len() < MIN_MOTION_SAMPLES {
            return None;
        }
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        Some((last.pos[0] - first.pos[0], last.pos[1] - first.pos[1]))
    }

    /// Straight-line oldest-to-newest distance over elapsed seconds.
    /// Zero with too few samples or no elapsed time.
    pub fn avg_speed_px_per_s(&self) -> f32 {
        if self.samples.len() < MIN_MOTION_SAMPLES {
            return 0.0;
        }
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        let dt = last.t_ms.saturating_sub(first.t_ms) as f32 / 1000.0;
        if dt <= 1e-6 {
            return 0.0;
        }
        distance(first.pos, last.pos) / dt
    }

    pub fn points(&self) -> Vec<Point> {
        self.samples.iter().map(|s| s.pos).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n: u64, step_ms: u64, dx: f32) -> TrackWindow {
        let mut w = TrackWindow::new(10_000);
        for i in 0..n {
            w.add(i * step_ms, [i as f32 * dx, 0.0]);
        }
        w
    }

    #[test]
    fn test_evicts_old_samples() {
        let mut w = TrackWindow::new(450);
        w.add(0, [0.0, 0.0]);
        w.add(200, [1.0, 0.0]);
        w.add(450, [2.0, 0.0]);
        assert_eq!(w.len(), 3);
        w.add(500, [3.0, 0.0]);
        // t=0 is now older than 500 - 450
        assert_eq!(w.len(), 3);
        assert_eq!(w.points()[0], [1.0, 0.0]);
    }

    #[test]
    fn test_path_length() {
        let mut w = TrackWindow::new(1000);
        w.add(0, [0.0, 0.0]);
        w.add(10, [3.0, 4.0]);
        w.add(20, [0.0, 0.0]);
        assert!((w.path_length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_delta_needs_min_samples() {
        let w = filled(5, 50, 10.0);
        assert_eq!(w.delta(), None);
        let w = filled(6, 50, 10.0);
        assert_eq!(w.delta(), Some((50.0, 0.0)));
    }

    #[test]
    fn test_avg_speed() {
        // 50 px over 250 ms
        let w = filled(6, 50, 10.0);
        assert!((w.avg_speed_px_per_s() - 200.0).abs() < 1e-3);
        assert_eq!(filled(3, 50, 10.0).avg_speed_px_per_s(), 0.0);
    }

    #[test]
    fn test_avg_speed_zero_elapsed() {
        let mut w = TrackWindow::new(1000);
        for i in 0..8 {
            w.add(100, [i as f32, 0.0]);
        }
        assert_eq!(w.avg_speed_px_per_s(), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut w = filled(8, 10, 1.0);
        w.reset();
        assert!(w.is_empty());
        assert_eq!(w.path_length(), 0.0);
    }
}
