//! Swipe direction from net window displacement.

/// Swipe direction, named by the catalog id it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

impl SwipeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "SWIPE_LEFT",
            Self::Right => "SWIPE_RIGHT",
            Self::Up => "SWIPE_UP",
            Self::Down => "SWIPE_DOWN",
        }
    }
}

/// Pick the dominant axis of `(dx, dy)` and report a swipe when its magnitude
/// exceeds `thresh_px`. Image y grows downward. Equal magnitudes are not a swipe.
pub fn detect_swipe(dx: f32, dy: f32, thresh_px: f32) -> Option<SwipeDirection> {
    let (ax, ay) = (dx.abs(), dy.abs());
    if ax > ay {
        if ax <= thresh_px {
            return None;
        }
        Some(if dx > 0.0 {
            SwipeDirection::Right
        } else {
            SwipeDirection::Left
        })
    } else if ay > ax {
        if ay <= thresh_px {
            return None;
        }
        Some(if dy > 0.0 {
            SwipeDirection::Down
        } else {
            SwipeDirection::Up
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal() {
        assert_eq!(detect_swipe(150.0, 10.0, 80.0), Some(SwipeDirection::Right));
        assert_eq!(detect_swipe(-150.0, 10.0, 80.0), Some(SwipeDirection::Left));
    }

    #[test]
    fn test_vertical() {
        assert_eq!(detect_swipe(5.0, -90.0, 80.0), Some(SwipeDirection::Up));
        assert_eq!(detect_swipe(5.0, 90.0, 80.0), Some(SwipeDirection::Down));
    }

    #[test]
    fn test_below_threshold() {
        assert_eq!(detect_swipe(80.0, 0.0, 80.0), None);
        assert_eq!(detect_swipe(0.0, 0.0, 80.0), None);
    }

    #[test]
    fn test_tie_is_not_a_swipe() {
        assert_eq!(detect_swipe(100.0, -100.0, 80.0), None);
    }

    #[test]
    fn test_ids() {
        assert_eq!(SwipeDirection::Right.as_str(), "SWIPE_RIGHT");
        assert_eq!(SwipeDirection::Up.as_str(), "SWIPE_UP");
    }
}
