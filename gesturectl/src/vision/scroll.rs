//! Anchor-based pinch scrolling.

use super::landmarks::Point;

/// Scroll step: `sv` positive scrolls content up, `sh` positive scrolls right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollVector {
    pub sv: i32,
    pub sh: i32,
}

impl ScrollVector {
    pub fn is_zero(&self) -> bool {
        self.sv == 0 && self.sh == 0
    }
}

/// Position captured when a pinch starts; displacement is measured from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollAnchor {
    origin: Option<Point>,
}

impl ScrollAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the anchor at `pos` unless one is already active.
    pub fn start(&mut self, pos: Point) {
        if self.origin.is_none() {
            self.origin = Some(pos);
        }
    }

    pub fn stop(&mut self) {
        self.origin = None;
    }

    pub fn is_active(&self) -> bool {
        self.origin.is_some()
    }

    pub fn origin(&self) -> Option<Point> {
        self.origin
    }

    /// `pos - origin`, or `None` when inactive.
    pub fn delta(&self, pos: Point) -> Option<(f32, f32)> {
        self.origin.map(|o| (pos[0] - o[0], pos[1] - o[1]))
    }
}

fn scroll_axis(d: f32, gain: f32, deadzone: f32, max_step: f32) -> i32 {
    if d.abs() < deadzone {
        return 0;
    }
    (d * gain).clamp(-max_step, max_step) as i32
}

/// Map anchor displacement to a scroll step. Moving the finger up (negative
/// `dy`) yields positive `sv`.
pub fn compute_scroll(dx: f32, dy: f32, gain: f32, deadzone: f32, max_step: f32) -> ScrollVector {
    ScrollVector {
        sv: scroll_axis(-dy, gain, deadzone, max_step),
        sh: scroll_axis(dx, gain, deadzone, max_step),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_keeps_first_origin() {
        let mut a = ScrollAnchor::new();
        a.start([10.0, 20.0]);
        a.start([50.0, 50.0]);
        assert_eq!(a.origin(), Some([10.0, 20.0]));
        assert_eq!(a.delta([15.0, 10.0]), Some((5.0, -10.0)));
        a.stop();
        assert!(!a.is_active());
        assert_eq!(a.delta([0.0, 0.0]), None);
    }

    #[test]
    fn test_upward_motion_scrolls_positive() {
        let v = compute_scroll(0.0, -20.0, 1.6, 6.0, 120.0);
        assert_eq!(v, ScrollVector { sv: 32, sh: 0 });
    }

    #[test]
    fn test_deadzone() {
        let v = compute_scroll(5.9, -5.9, 1.6, 6.0, 120.0);
        assert!(v.is_zero());
        let v = compute_scroll(6.0, 0.0, 1.0, 6.0, 120.0);
        assert_eq!(v.sh, 6);
    }

    #[test]
    fn test_clamped_to_max_step() {
        let v = compute_scroll(-500.0, 500.0, 1.6, 6.0, 120.0);
        assert_eq!(v, ScrollVector { sv: -120, sh: -120 });
    }
}
