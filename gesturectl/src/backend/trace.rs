//! Frame traces: one s-expression per line describing a tracked frame.
//!
//! ```text
//! ; comment
//! (:t 0 :landmarks ((312.0 410.5) (330.2 398.0) ...))   ; 21 points, frame pixels
//! (:t 83 :center (320 240) :fingertips ((300 200) (340 205)))
//! (:t 166)                                              ; no hand
//! ```

use std::io::BufRead;
use std::path::Path;

use anyhow::{bail, Context};
use tracing::{info, warn};

use crate::sexp::{get_int, get_value, parse_point, parse_points};
use crate::vision::landmarks::{BlobFeatures, LandmarkSet, Point, LANDMARK_COUNT};

/// Geometry carried by one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameInput {
    Hand(LandmarkSet),
    Blob(BlobFeatures),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceFrame {
    pub t_ms: u64,
    pub input: FrameInput,
}

impl TraceFrame {
    pub fn landmarks(&self) -> Option<&LandmarkSet> {
        match &self.input {
            FrameInput::Hand(lm) => Some(lm),
            _ => None,
        }
    }

    pub fn blob(&self) -> Option<&BlobFeatures> {
        match &self.input {
            FrameInput::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Parse one trace line. Blank lines and `;` comments yield `Ok(None)`.
    pub fn parse_line(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            return Ok(None);
        }
        let value = lexpr::from_str(line).context("Invalid s-expression")?;

        let t_ms = match get_int(&value, "t") {
            Some(t) if t >= 0 => t as u64,
            Some(t) => bail!("Negative timestamp {}", t),
            None => bail!("Missing :t"),
        };

        let input = if let Some(lm) = get_value(&value, "landmarks") {
            let points: Vec<Point> = parse_points(lm).context("Malformed :landmarks")?;
            match LandmarkSet::from_points(&points) {
                Some(set) => FrameInput::Hand(set),
                None => bail!(
                    "Expected {} landmarks, got {}",
                    LANDMARK_COUNT,
                    points.len()
                ),
            }
        } else if let Some(center) = get_value(&value, "center") {
            let center = parse_point(center).context("Malformed :center")?;
            let fingertips = match get_value(&value, "fingertips") {
                Some(tips) => parse_points(tips).context("Malformed :fingertips")?,
                None => Vec::new(),
            };
            FrameInput::Blob(BlobFeatures::new(Some(center), fingertips))
        } else {
            FrameInput::Empty
        };

        Ok(Some(Self { t_ms, input }))
    }
}

/// Read every frame from `reader`. Lines that fail to parse are skipped
/// with a warning.
pub fn read_trace<R: BufRead>(reader: R) -> anyhow::Result<Vec<TraceFrame>> {
    let mut frames = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read trace line")?;
        match TraceFrame::parse_line(&line) {
            Ok(Some(frame)) => frames.push(frame),
            Ok(None) => {}
            Err(e) => warn!("Trace line {}: {:#}", lineno + 1, e),
        }
    }
    Ok(frames)
}

pub fn load_trace(path: &Path) -> anyhow::Result<Vec<TraceFrame>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open trace {}", path.display()))?;
    let frames = read_trace(std::io::BufReader::new(file))?;
    info!("Loaded trace {}: {} frames", path.display(), frames.len());
    Ok(frames)
}

#[cfg(test)]
pub(crate) fn landmarks_line(t_ms: u64, lm: &LandmarkSet) -> String {
    let pts: Vec<String> = lm
        .points()
        .iter()
        .map(|p| format!("({} {})", p[0], p[1]))
        .collect();
    format!("(:t {} :landmarks ({}))", t_ms, pts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::classifier::{make_pose, StaticPose};

    #[test]
    fn test_parse_landmarks() {
        let lm = make_pose(StaticPose::Fist);
        let frame = TraceFrame::parse_line(&landmarks_line(42, &lm)).unwrap().unwrap();
        assert_eq!(frame.t_ms, 42);
        assert_eq!(frame.landmarks(), Some(&lm));
        assert!(frame.blob().is_none());
    }

    #[test]
    fn test_parse_blob() {
        let frame = TraceFrame::parse_line("(:t 7 :center (320 240) :fingertips ((1 2) (3.5 4)))")
            .unwrap()
            .unwrap();
        let blob = frame.blob().unwrap();
        assert_eq!(blob.center, Some([320.0, 240.0]));
        assert_eq!(blob.fingertip_count(), 2);
    }

    #[test]
    fn test_parse_empty_and_comments() {
        let frame = TraceFrame::parse_line("(:t 100)").unwrap().unwrap();
        assert_eq!(frame.input, FrameInput::Empty);
        assert!(TraceFrame::parse_line("").unwrap().is_none());
        assert!(TraceFrame::parse_line("  ; a comment").unwrap().is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(TraceFrame::parse_line("(:landmarks ())").is_err());
        assert!(TraceFrame::parse_line("(:t -5)").is_err());
        assert!(TraceFrame::parse_line("(:t 1 :landmarks ((1 2) (3 4)))").is_err());
        assert!(TraceFrame::parse_line("(:t 1 :center (1))").is_err());
        assert!(TraceFrame::parse_line("(:t 1").is_err());
    }

    #[test]
    fn test_read_trace_skips_bad_lines() {
        let text = "; header\n(:t 0)\nnot a frame (\n\n(:t 80 :center (1 1))\n";
        let frames = read_trace(text.as_bytes()).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].t_ms, 80);
    }
}
