//! Geometric primitives over a landmark set.
//!
//! Every ratio is divided by palm width (index MCP to pinky MCP) so the
//! tests are independent of hand size and camera distance.

use crate::config::FingerRules;

use super::landmarks::{Finger, HandLandmark, LandmarkSet, Point};

/// Added to palm width so ratios never divide by zero.
pub const PALM_EPSILON: f32 = 1e-6;

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f32 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    (dx * dx + dy * dy).sqrt()
}

fn sub(a: Point, b: Point) -> Point {
    [a[0] - b[0], a[1] - b[1]]
}

fn norm(v: Point) -> f32 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

/// Cosine of the angle between two vectors; 0 when either is degenerate.
pub fn cos_angle(a: Point, b: Point) -> f32 {
    let denom = norm(a) * norm(b);
    if denom < PALM_EPSILON {
        return 0.0;
    }
    (a[0] * b[0] + a[1] * b[1]) / denom
}

/// `|indexMCP - pinkyMCP| + ε`.
pub fn palm_width(lm: &LandmarkSet) -> f32 {
    distance(lm.get(HandLandmark::IndexMcp), lm.get(HandLandmark::PinkyMcp)) + PALM_EPSILON
}

/// Mean of index MCP, pinky MCP and wrist.
pub fn palm_center(lm: &LandmarkSet) -> Point {
    let a = lm.get(HandLandmark::IndexMcp);
    let b = lm.get(HandLandmark::PinkyMcp);
    let w = lm.get(HandLandmark::Wrist);
    [(a[0] + b[0] + w[0]) / 3.0, (a[1] + b[1] + w[1]) / 3.0]
}

/// Tip distance over palm width. Symmetric in `a` and `b`.
pub fn pinch_ratio(lm: &LandmarkSet, a: HandLandmark, b: HandLandmark) -> f32 {
    distance(lm.get(a), lm.get(b)) / palm_width(lm)
}

/// Same formula as [`pinch_ratio`]; used for adjacent-finger closeness.
pub fn close_ratio(lm: &LandmarkSet, a: HandLandmark, b: HandLandmark) -> f32 {
    pinch_ratio(lm, a, b)
}

/// `|tip - mcp| / palm_width` for one finger.
pub fn finger_length_ratio(lm: &LandmarkSet, finger: Finger) -> f32 {
    distance(lm.get(finger.tip()), lm.get(finger.mcp())) / palm_width(lm)
}

/// Long enough and pointing radially away from the palm center.
fn extended_directional(lm: &LandmarkSet, finger: Finger, rules: &FingerRules) -> bool {
    let thr = rules.threshold(finger);
    let tip = lm.get(finger.tip());
    let v = sub(tip, lm.get(finger.mcp()));
    let u = sub(tip, palm_center(lm));
    norm(v) / palm_width(lm) > thr.len_thr && cos_angle(v, u) >= thr.cos_thr
}

/// Tip above its PIP joint (smaller y).
fn extended_vertical(lm: &LandmarkSet, finger: Finger) -> bool {
    lm.get(finger.tip())[1] < lm.get(finger.pip())[1]
}

/// Whether one finger is extended. The thumb always uses the directional test.
pub fn is_extended(lm: &LandmarkSet, finger: Finger, rules: &FingerRules) -> bool {
    if finger == Finger::Thumb || rules.use_direction {
        extended_directional(lm, finger, rules)
    } else {
        extended_vertical(lm, finger)
    }
}

/// Extension state of all five fingers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FingerStates {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerStates {
    pub fn compute(lm: &LandmarkSet, rules: &FingerRules) -> Self {
        Self {
            thumb: is_extended(lm, Finger::Thumb, rules),
            index: is_extended(lm, Finger::Index, rules),
            middle: is_extended(lm, Finger::Middle, rules),
            ring: is_extended(lm, Finger::Ring, rules),
            pinky: is_extended(lm, Finger::Pinky, rules),
        }
    }

    pub fn get(&self, finger: Finger) -> bool {
        match finger {
            Finger::Thumb => self.thumb,
            Finger::Index => self.index,
            Finger::Middle => self.middle,
            Finger::Ring => self.ring,
            Finger::Pinky => self.pinky,
        }
    }

    /// Number of extended fingers, thumb included.
    pub fn count(&self) -> usize {
        Finger::ALL.iter().filter(|f| self.get(**f)).count()
    }
}

// ── Test helpers ───────────────────────────────────────────

/// Synthetic hand facing the camera, wrist at the bottom, with the chosen
/// fingers extended upward (thumb outward to the left) and the rest folded
/// onto the palm.
#[cfg(test)]
pub(crate) fn make_hand(extended: [bool; 5]) -> LandmarkSet {
    use super::landmarks::LANDMARK_COUNT;

    let mut lm = LandmarkSet::new([[0.0, 0.0]; LANDMARK_COUNT]);
    lm.set(HandLandmark::Wrist, [100.0, 200.0]);

    // MCP row, palm width 60 px, palm center at (100, 166.7).
    let mcps = [
        (Finger::Index, 70.0),
        (Finger::Middle, 90.0),
        (Finger::Ring, 110.0),
        (Finger::Pinky, 130.0),
    ];
    for (i, (finger, x)) in mcps.iter().enumerate() {
        lm.set(finger.mcp(), [*x, 150.0]);
        if extended[i + 1] {
            lm.set(finger.pip(), [*x, 120.0]);
            lm.set(finger.tip(), [*x, 70.0]);
        } else {
            lm.set(finger.pip(), [*x, 135.0]);
            lm.set(finger.tip(), [*x, 155.0]);
        }
    }

    lm.set(HandLandmark::ThumbCmc, [80.0, 190.0]);
    lm.set(HandLandmark::ThumbMcp, [65.0, 175.0]);
    if extended[0] {
        lm.set(HandLandmark::ThumbIp, [45.0, 165.0]);
        lm.set(HandLandmark::ThumbTip, [25.0, 155.0]);
    } else {
        lm.set(HandLandmark::ThumbIp, [75.0, 170.0]);
        lm.set(HandLandmark::ThumbTip, [85.0, 165.0]);
    }
    lm
}

// ── Tests ──────────────────────────────────────────────────
