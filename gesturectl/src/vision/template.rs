//! Custom trajectory templates: resampling, normalization and matching.
//!
//! A template is a 64-point polyline, centered on its centroid and scaled to
//! unit RMS radius. Matching is position and scale invariant but makes no
//! attempt at rotation or start-point alignment.

use lexpr::Value;
use tracing::{debug, warn};

use crate::catalog::GestureMode;
use crate::sexp::{escape_string, format_points, get_keyword, get_value, list_items, parse_points};

use super::landmarks::Point;
use super::primitives::distance;

/// Points per resampled template.
pub const TEMPLATE_POINTS: usize = 64;

/// Fewest raw samples accepted when recording a new template.
pub const MIN_RECORD_POINTS: usize = 12;

const DEGENERATE_EPSILON: f32 = 1e-6;

// ── Geometry ───────────────────────────────────────────────

/// Resample a polyline to `n` points spaced evenly along its arc length.
/// Returns `None` for fewer than two input points. A polyline with no length
/// maps to `n` copies of its first point.
pub fn resample_polyline(points: &[Point], n: usize) -> Option<Vec<Point>> {
    if points.len() < 2 || n == 0 {
        return None;
    }
    let mut cumulative = Vec::with_capacity(points.len());
    cumulative.push(0.0f32);
    for pair in points.windows(2) {
        let last = cumulative[cumulative.len() - 1];
        cumulative.push(last + distance(pair[0], pair[1]));
    }
    let total = cumulative[cumulative.len() - 1];
    if total < DEGENERATE_EPSILON {
        return Some(vec![points[0]; n]);
    }

    let mut out = Vec::with_capacity(n);
    let mut j = 0;
    for i in 0..n {
        let target = if n == 1 {
            0.0
        } else {
            total * i as f32 / (n - 1) as f32
        };
        while j < cumulative.len() - 2 && cumulative[j + 1] < target {
            j += 1;
        }
        let (s0, s1) = (cumulative[j], cumulative[j + 1]);
        let (p0, p1) = (points[j], points[j + 1]);
        if s1 - s0 < DEGENERATE_EPSILON {
            out.push(p0);
        } else {
            let a = (target - s0) / (s1 - s0);
            out.push([p0[0] * (1.0 - a) + p1[0] * a, p0[1] * (1.0 - a) + p1[1] * a]);
        }
    }
    Some(out)
}

/// Resample to [`TEMPLATE_POINTS`], subtract the centroid and divide by the
/// RMS radius (1 when the radius is near zero).
pub fn normalize_trajectory(points: &[Point]) -> Option<Vec<Point>> {
    let mut rs = resample_polyline(points, TEMPLATE_POINTS)?;
    let n = rs.len() as f32;
    let cx = rs.iter().map(|p| p[0]).sum::<f32>() / n;
    let cy = rs.iter().map(|p| p[1]).sum::<f32>() / n;
    for p in rs.iter_mut() {
        p[0] -= cx;
        p[1] -= cy;
    }
    let mut scale = (rs.iter().map(|p| p[0] * p[0] + p[1] * p[1]).sum::<f32>() / n).sqrt();
    if scale < DEGENERATE_EPSILON {
        scale = 1.0;
    }
    for p in rs.iter_mut() {
        p[0] /= scale;
        p[1] /= scale;
    }
    Some(rs)
}

/// Mean distance between corresponding points. Polylines of different
/// lengths are never compared: the distance is infinite.
pub fn template_distance(a: &[Point], b: &[Point]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return f32::INFINITY;
    }
    a.iter().zip(b).map(|(p, q)| distance(*p, *q)).sum::<f32>() / a.len() as f32
}

// ── Store ──────────────────────────────────────────────────

/// A stored, normalized template.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomTemplate {
    pub id: String,
    pub mode: GestureMode,
    pub points: Vec<Point>,
}

impl CustomTemplate {
    /// Parse `(:id "CIRCLE" :mode :bare :template ((x y) ...))`.
    pub fn from_sexp(value: &Value) -> Option<Self> {
        let id = get_keyword(value, "id")?;
        let mode = match get_keyword(value, "mode") {
            Some(m) => match GestureMode::from_str(&m) {
                Some(mode) => mode,
                None => {
                    warn!("Custom gesture {}: unknown mode {:?}", id, m);
                    return None;
                }
            },
            None => GestureMode::Bare,
        };
        let points = get_value(value, "template").and_then(parse_points)?;
        if points.len() != TEMPLATE_POINTS {
            warn!(
                "Custom gesture {}: template has {} points, expected {}",
                id,
                points.len(),
                TEMPLATE_POINTS
            );
            return None;
        }
        Some(Self { id, mode, points })
    }

    pub fn to_sexp(&self) -> String {
        format!(
            "(:id \"{}\" :mode :{} :template {})",
            escape_string(&self.id),
            self.mode.as_str(),
            format_points(&self.points)
        )
    }
}

/// User-recorded templates, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: Vec<CustomTemplate>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `:custom-gestures` list. Malformed templates are skipped.
    pub fn from_sexp(value: &Value) -> Self {
        let mut store = Self::new();
        for item in list_items(value) {
            match CustomTemplate::from_sexp(item) {
                Some(t) => {
                    store.templates.retain(|x| x.id != t.id);
                    store.templates.push(t);
                }
                None => warn!("Skipping malformed custom gesture: {}", item),
            }
        }
        store
    }

    /// Render as a `:custom-gestures` list.
    pub fn to_sexp(&self) -> String {
        let items: Vec<String> = self.templates.iter().map(|t| t.to_sexp()).collect();
        format!("({})", items.join(" "))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CustomTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Normalize `raw_points` and store them under `id`, replacing any
    /// template with the same id. Fails for fewer than two points.
    pub fn add_template(&mut self, id: &str, mode: GestureMode, raw_points: &[Point]) -> bool {
        let Some(points) = normalize_trajectory(raw_points) else {
            return false;
        };
        self.templates.retain(|t| t.id != id);
        self.templates.push(CustomTemplate {
            id: id.to_string(),
            mode,
            points,
        });
        debug!("Stored custom gesture {} ({})", id, mode.as_str());
        true
    }

    /// Like [`Self::add_template`], but requires a full recording of at
    /// least [`MIN_RECORD_POINTS`] samples.
    pub fn record_template(&mut self, id: &str, mode: GestureMode, raw_points: &[Point]) -> bool {
        if raw_points.len() < MIN_RECORD_POINTS {
            debug!(
                "Recording for {} too short: {} < {} samples",
                id,
                raw_points.len(),
                MIN_RECORD_POINTS
            );
            return false;
        }
        self.add_template(id, mode, raw_points)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.templates.len();
        self.templates.retain(|t| t.id != id);
        self.templates.len() != before
    }

    /// Ids of templates usable in `mode` (declared for it or for both).
    pub fn list_ids(&self, mode: GestureMode) -> Vec<&str> {
        self.templates
            .iter()
            .filter(|t| t.mode.applies_to(mode))
            .map(|t| t.id.as_str())
            .collect()
    }

    /// Best template for `raw_points` among those usable in `mode`, if its
    /// distance is within `threshold`.
    pub fn match_trajectory(
        &self,
        mode: GestureMode,
        raw_points: &[Point],
        threshold: f32,
    ) -> Option<(String, f32)> {
        let norm = normalize_trajectory(raw_points)?;
        let mut best: Option<(&CustomTemplate, f32)> = None;
        for t in self.templates.iter().filter(|t| t.mode.applies_to(mode)) {
            let d = template_distance(&norm, &t.points);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((t, d));
            }
        }
        match best {
            Some((t, d)) if d <= threshold => Some((t.id.clone(), d)),
            _ => None,
        }
    }
}

// ── Test helpers ───────────────────────────────────────────

/// Circle of `n` samples around `(cx, cy)`, starting at angle 0.
#[cfg(test)]
pub(crate) fn circle(n: usize, cx: f32, cy: f32, r: f32) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let a = i as f32 / (n - 1) as f32 * std::f32::consts::TAU;
            [cx + r * a.cos(), cy + r * a.sin()]
        })
        .collect()
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn zigzag() -> Vec<Point> {
        vec![[0.0, 0.0], [40.0, 80.0], [80.0, 0.0], [120.0, 80.0], [160.0, 0.0]]
    }

    #[test]
    fn test_resample_endpoints_and_count() {
        let rs = resample_polyline(&[[0.0, 0.0], [63.0, 0.0]], 64).unwrap();
        assert_eq!(rs.len(), 64);
        assert_eq!(rs[0], [0.0, 0.0]);
        assert!((rs[63][0] - 63.0).abs() < 1e-3);
        // evenly spaced: one pixel apart
        assert!((rs[10][0] - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_resample_rejects_short_input() {
        assert!(resample_polyline(&[[1.0, 1.0]], 64).is_none());
        assert!(resample_polyline(&[], 64).is_none());
    }

    #[test]
    fn test_resample_degenerate() {
        let rs = resample_polyline(&[[5.0, 7.0], [5.0, 7.0], [5.0, 7.0]], 64).unwrap();
        assert!(rs.iter().all(|p| *p == [5.0, 7.0]));
    }

    #[test]
    fn test_normalize_centroid_and_scale() {
        let norm = normalize_trajectory(&zigzag()).unwrap();
        let n = norm.len() as f32;
        let cx: f32 = norm.iter().map(|p| p[0]).sum::<f32>() / n;
        let cy: f32 = norm.iter().map(|p| p[1]).sum::<f32>() / n;
        assert!(cx.abs() < 1e-4 && cy.abs() < 1e-4);
        let rms = (norm.iter().map(|p| p[0] * p[0] + p[1] * p[1]).sum::<f32>() / n).sqrt();
        assert!((rms - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_self_match_is_zero() {
        let a = normalize_trajectory(&zigzag()).unwrap();
        let b = normalize_trajectory(&zigzag()).unwrap();
        assert!(template_distance(&a, &b) < 1e-5);
    }

    #[test]
    fn test_scale_and_translation_invariant() {
        let a = normalize_trajectory(&circle(30, 0.0, 0.0, 10.0)).unwrap();
        let b = normalize_trajectory(&circle(30, 300.0, 200.0, 80.0)).unwrap();
        assert!(template_distance(&a, &b) < 1e-3);
    }

    #[test]
    fn test_length_mismatch_is_infinite() {
        let a = vec![[0.0, 0.0]; 64];
        let b = vec![[0.0, 0.0]; 63];
        assert!(template_distance(&a, &b).is_infinite());
    }

    #[test]
    fn test_add_replaces_same_id() {
        let mut store = TemplateStore::new();
        assert!(store.add_template("Z", GestureMode::Bare, &zigzag()));
        assert!(store.add_template("Z", GestureMode::Glove, &circle(20, 0.0, 0.0, 5.0)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("Z").unwrap().mode, GestureMode::Glove);
        assert!(!store.add_template("P", GestureMode::Bare, &[[1.0, 1.0]]));
    }

    #[test]
    fn test_record_requires_min_points() {
        let mut store = TemplateStore::new();
        assert!(!store.record_template("Z", GestureMode::Bare, &zigzag()));
        assert!(store.record_template("C", GestureMode::Bare, &circle(12, 0.0, 0.0, 5.0)));
    }

    #[test]
    fn test_list_ids_by_mode() {
        let mut store = TemplateStore::new();
        store.add_template("A", GestureMode::Bare, &zigzag());
        store.add_template("B", GestureMode::Glove, &zigzag());
        store.add_template("C", GestureMode::Both, &zigzag());
        assert_eq!(store.list_ids(GestureMode::Bare), vec!["A", "C"]);
        assert_eq!(store.list_ids(GestureMode::Glove), vec!["B", "C"]);
        assert!(store.remove("C"));
        assert!(!store.remove("C"));
    }

    #[test]
    fn test_match_picks_best_within_threshold() {
        let mut store = TemplateStore::new();
        store.add_template("CIRCLE", GestureMode::Bare, &circle(40, 0.0, 0.0, 50.0));
        store.add_template("ZIGZAG", GestureMode::Bare, &zigzag());

        let (id, d) = store
            .match_trajectory(GestureMode::Bare, &circle(25, 320.0, 240.0, 90.0), 0.22)
            .unwrap();
        assert_eq!(id, "CIRCLE");
        assert!(d < 0.05);

        // glove mode sees no bare templates
        assert!(store
            .match_trajectory(GestureMode::Glove, &circle(25, 0.0, 0.0, 9.0), 0.22)
            .is_none());
        // a straight line matches neither
        let line: Vec<Point> = (0..20).map(|i| [i as f32 * 10.0, 0.0]).collect();
        assert!(store.match_trajectory(GestureMode::Bare, &line, 0.22).is_none());
    }

    #[test]
    fn test_from_sexp_skips_malformed() {
        let mut store = TemplateStore::new();
        store.add_template("CIRCLE", GestureMode::Both, &circle(30, 0.0, 0.0, 5.0));
        let text = format!(
            "({} (:id \"SHORT\" :mode :bare :template ((0 0) (1 1))) (:mode :bare))",
            store.get("CIRCLE").unwrap().to_sexp()
        );
        let value = lexpr::from_str(&text).unwrap();
        let loaded = TemplateStore::from_sexp(&value);
        assert_eq!(loaded.len(), 1);
        let t = loaded.get("CIRCLE").unwrap();
        assert_eq!(t.mode, GestureMode::Both);
        assert_eq!(t.points.len(), TEMPLATE_POINTS);
    }
}
