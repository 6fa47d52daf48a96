//! Hand geometry inputs: the 21-point landmark set and glove blob features.
//!
//! Points are 2D image-pixel coordinates with y growing downward.

use tracing::debug;

/// 2D point in image pixels.
pub type Point = [f32; 2];

// ── Landmark definitions ───────────────────────────────────

/// The 21 hand landmarks in extractor order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Total number of landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

impl HandLandmark {
    /// Array index (0-20).
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wrist => "wrist",
            Self::ThumbCmc => "thumb-cmc",
            Self::ThumbMcp => "thumb-mcp",
            Self::ThumbIp => "thumb-ip",
            Self::ThumbTip => "thumb-tip",
            Self::IndexMcp => "index-mcp",
            Self::IndexPip => "index-pip",
            Self::IndexDip => "index-dip",
            Self::IndexTip => "index-tip",
            Self::MiddleMcp => "middle-mcp",
            Self::MiddlePip => "middle-pip",
            Self::MiddleDip => "middle-dip",
            Self::MiddleTip => "middle-tip",
            Self::RingMcp => "ring-mcp",
            Self::RingPip => "ring-pip",
            Self::RingDip => "ring-dip",
            Self::RingTip => "ring-tip",
            Self::PinkyMcp => "pinky-mcp",
            Self::PinkyPip => "pinky-pip",
            Self::PinkyDip => "pinky-dip",
            Self::PinkyTip => "pinky-tip",
        }
    }
}

// ── Fingers ────────────────────────────────────────────────

/// One of the five digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn tip(&self) -> HandLandmark {
        match self {
            Self::Thumb => HandLandmark::ThumbTip,
            Self::Index => HandLandmark::IndexTip,
            Self::Middle => HandLandmark::MiddleTip,
            Self::Ring => HandLandmark::RingTip,
            Self::Pinky => HandLandmark::PinkyTip,
        }
    }

    /// Middle joint used by the vertical fallback test. The thumb's is its IP joint.
    pub fn pip(&self) -> HandLandmark {
        match self {
            Self::Thumb => HandLandmark::ThumbIp,
            Self::Index => HandLandmark::IndexPip,
            Self::Middle => HandLandmark::MiddlePip,
            Self::Ring => HandLandmark::RingPip,
            Self::Pinky => HandLandmark::PinkyPip,
        }
    }

    pub fn mcp(&self) -> HandLandmark {
        match self {
            Self::Thumb => HandLandmark::ThumbMcp,
            Self::Index => HandLandmark::IndexMcp,
            Self::Middle => HandLandmark::MiddleMcp,
            Self::Ring => HandLandmark::RingMcp,
            Self::Pinky => HandLandmark::PinkyMcp,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thumb => "thumb",
            Self::Index => "index",
            Self::Middle => "middle",
            Self::Ring => "ring",
            Self::Pinky => "pinky",
        }
    }
}

// ── Landmark set ───────────────────────────────────────────

/// A full set of 21 landmarks for one detected hand.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Point; LANDMARK_COUNT],
}

impl LandmarkSet {
    pub fn new(points: [Point; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Build from an extractor's point list. Any length other than 21 is rejected.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        if points.len() != LANDMARK_COUNT {
            debug!(
                "Landmarks: expected {} points, got {}",
                LANDMARK_COUNT,
                points.len()
            );
            return None;
        }
        let mut arr = [[0.0; 2]; LANDMARK_COUNT];
        arr.copy_from_slice(points);
        Some(Self { points: arr })
    }

    pub fn get(&self, lm: HandLandmark) -> Point {
        self.points[lm.index()]
    }

    pub fn set(&mut self, lm: HandLandmark, p: Point) {
        self.points[lm.index()] = p;
    }

    pub fn points(&self) -> &[Point; LANDMARK_COUNT] {
        &self.points
    }

    /// Uniformly scale all points, e.g. to undo an inference downscale.
    pub fn scaled(&self, factor: f32) -> Self {
        let mut points = self.points;
        for p in &mut points {
            p[0] *= factor;
            p[1] *= factor;
        }
        Self { points }
    }
}

// ── Glove blob ─────────────────────────────────────────────

/// Features of a colored-glove blob. Only `center` and the fingertip count
/// are consumed by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlobFeatures {
    pub center: Option<Point>,
    /// Up to five fingertip candidates.
    pub fingertips: Vec<Point>,
}

impl BlobFeatures {
    pub fn new(center: Option<Point>, fingertips: Vec<Point>) -> Self {
        Self {
            center,
            fingertips,
        }
    }

    pub fn fingertip_count(&self) -> usize {
        self.fingertips.len()
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_count() {
        assert_eq!(HandLandmark::Wrist.index(), 0);
        assert_eq!(HandLandmark::ThumbTip.index(), 4);
        assert_eq!(HandLandmark::IndexMcp.index(), 5);
        assert_eq!(HandLandmark::IndexTip.index(), 8);
        assert_eq!(HandLandmark::MiddleTip.index(), 12);
        assert_eq!(HandLandmark::PinkyMcp.index(), 17);
        assert_eq!(HandLandmark::PinkyTip.index(), 20);
        assert_eq!(LANDMARK_COUNT, 21);
    }

    #[test]
    fn test_finger_joints() {
        assert_eq!(Finger::Thumb.mcp(), HandLandmark::ThumbMcp);
        assert_eq!(Finger::Ring.pip(), HandLandmark::RingPip);
        assert_eq!(Finger::Pinky.tip(), HandLandmark::PinkyTip);
    }

    #[test]
    fn test_from_points_valid() {
        let pts: Vec<Point> = (0..LANDMARK_COUNT).map(|i| [i as f32, 0.0]).collect();
        let lm = LandmarkSet::from_points(&pts).unwrap();
        assert_eq!(lm.get(HandLandmark::IndexTip), [8.0, 0.0]);
    }

    #[test]
    fn test_from_points_wrong_count() {
        let pts = vec![[0.0, 0.0]; 10];
        assert!(LandmarkSet::from_points(&pts).is_none());
    }

    #[test]
    fn test_scaled() {
        let mut lm = LandmarkSet::new([[1.0, 2.0]; LANDMARK_COUNT]);
        lm.set(HandLandmark::Wrist, [10.0, 20.0]);
        let s = lm.scaled(2.0);
        assert_eq!(s.get(HandLandmark::Wrist), [20.0, 40.0]);
        assert_eq!(s.get(HandLandmark::IndexTip), [2.0, 4.0]);
    }

    #[test]
    fn test_landmark_as_str() {
        assert_eq!(HandLandmark::Wrist.as_str(), "wrist");
        assert_eq!(HandLandmark::IndexTip.as_str(), "index-tip");
        assert_eq!(Finger::Pinky.as_str(), "pinky");
    }

    #[test]
    fn test_blob_fingertip_count() {
        let blob = BlobFeatures::new(Some([5.0, 5.0]), vec![[1.0, 1.0], [2.0, 2.0]]);
        assert_eq!(blob.fingertip_count(), 2);
        assert_eq!(BlobFeatures::default().fingertip_count(), 0);
    }
}
