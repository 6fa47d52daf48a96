//! Static pose classification from the finger-extension pattern.
//!
//! Poses are tested in a fixed priority order and the first match wins.

use crate::config::FingerRules;

use super::landmarks::{Finger, HandLandmark, LandmarkSet};
use super::primitives::{finger_length_ratio, palm_center, pinch_ratio, FingerStates};

/// Recognized static hand poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticPose {
    /// All fingers and thumb extended, palm raised.
    OpenPalm,
    /// Nothing extended.
    Fist,
    /// Thumb only.
    ThumbsUp,
    /// Index and middle.
    VSign,
    /// Index without middle, ring, pinky.
    IndexOnly,
    /// Thumb and pinky.
    ThumbPinky,
    /// Thumb-index pinch with the other fingers up.
    OkSign,
}

impl StaticPose {
    pub const ALL: [StaticPose; 7] = [
        StaticPose::OpenPalm,
        StaticPose::Fist,
        StaticPose::ThumbsUp,
        StaticPose::VSign,
        StaticPose::IndexOnly,
        StaticPose::ThumbPinky,
        StaticPose::OkSign,
    ];

    /// Catalog gesture id.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenPalm => "OPEN_PALM",
            Self::Fist => "FIST",
            Self::ThumbsUp => "THUMBS_UP",
            Self::VSign => "V_SIGN",
            Self::IndexOnly => "INDEX_ONLY",
            Self::ThumbPinky => "THUMB_PINKY",
            Self::OkSign => "OK_SIGN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == s)
    }
}

/// Every finger outside `keep` is short enough to count as folded.
fn others_folded(lm: &LandmarkSet, rules: &FingerRules, keep: &[Finger]) -> bool {
    if !rules.single_finger_enhance {
        return true;
    }
    [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky]
        .iter()
        .filter(|f| !keep.contains(f))
        .all(|f| finger_length_ratio(lm, *f) < rules.others_fold_len_thr)
}

/// Classify a landmark set into a static pose, or `None` when nothing matches.
pub fn classify_static(
    lm: &LandmarkSet,
    pinch_threshold_ratio: f32,
    rules: &FingerRules,
) -> Option<StaticPose> {
    let s = FingerStates::compute(lm, rules);
    let four_up = s.index && s.middle && s.ring && s.pinky;

    // Tips above the palm center separate a raised palm from an
    // incidental all-extended hand.
    let center_y = palm_center(lm)[1];
    if four_up
        && s.thumb
        && lm.get(HandLandmark::IndexTip)[1] < center_y
        && lm.get(HandLandmark::PinkyTip)[1] < center_y
    {
        return Some(StaticPose::OpenPalm);
    }

    if s.count() == 0 {
        return Some(StaticPose::Fist);
    }

    if s.thumb
        && !s.index
        && !s.middle
        && !s.ring
        && !s.pinky
        && others_folded(lm, rules, &[])
    {
        return Some(StaticPose::ThumbsUp);
    }

    if s.index && s.middle && !s.ring && !s.pinky {
        return Some(StaticPose::VSign);
    }

    if s.index && !s.middle && !s.ring && !s.pinky && others_folded(lm, rules, &[Finger::Index]) {
        return Some(StaticPose::IndexOnly);
    }

    if s.thumb
        && s.pinky
        && !s.index
        && !s.middle
        && !s.ring
        && others_folded(lm, rules, &[Finger::Pinky])
    {
        return Some(StaticPose::ThumbPinky);
    }

    let pinch = pinch_ratio(lm, HandLandmark::ThumbTip, HandLandmark::IndexTip);
    let others_up = [s.middle, s.ring, s.pinky].iter().filter(|e| **e).count();
    if pinch < pinch_threshold_ratio && others_up >= 2 {
        return Some(StaticPose::OkSign);
    }

    None
}

// ── Test helpers ───────────────────────────────────────────

/// Hand for a named pose, built from [`super::primitives::make_hand`].
#[cfg(test)]
pub(crate) fn make_pose(pose: StaticPose) -> LandmarkSet {
    use super::primitives::make_hand;

    match pose {
        StaticPose::OpenPalm => make_hand([true; 5]),
        StaticPose::Fist => make_hand([false; 5]),
        StaticPose::ThumbsUp => make_hand([true, false, false, false, false]),
        StaticPose::VSign => make_hand([false, true, true, false, false]),
        StaticPose::IndexOnly => make_hand([false, true, false, false, false]),
        StaticPose::ThumbPinky => make_hand([true, false, false, false, true]),
        StaticPose::OkSign => {
            let mut lm = make_hand([true, false, true, true, true]);
            // Index curls over to meet the thumb tip.
            lm.set(HandLandmark::IndexPip, [55.0, 145.0]);
            lm.set(HandLandmark::IndexTip, [40.0, 156.0]);
            lm
        }
    }
}

// ── Tests ──────────────────────────────────────────────────
