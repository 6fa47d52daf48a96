//! Engine and runtime configuration.
//!
//! All defaults live in the `Default` impls below. Config files are
//! s-expression plists:
//!
//! ```text
//! (:general (:stable-frames 3 :cooldown-ms 450
//!            :finger-rules (:use-direction t :thumb (:len-thr 0.5 :cos-thr 0.2)))
//!  :runtime (:infer-fps 12)
//!  :gesture-catalog ((:id "FIST" :kind :static :params (:cooldown-ms 450)))
//!  :custom-gestures ((:id "CIRCLE" :mode :bare :template ((0.1 0.2) ...))))
//! ```
//!
//! Unknown keys are ignored; malformed values keep the default and log a warning.

use std::path::Path;

use anyhow::Context;
use lexpr::Value;
use tracing::{info, warn};

use crate::catalog::GestureCatalog;
use crate::sexp::{bool_sexp, get_bool, get_float, get_int, get_value};
use crate::vision::landmarks::Finger;
use crate::vision::template::TemplateStore;

// ── Finger rules ───────────────────────────────────────────

/// Directional extension thresholds for one finger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerThreshold {
    /// Minimum `|tip - mcp| / palm_width`.
    pub len_thr: f32,
    /// Minimum cosine between the finger axis and the palm-center-to-tip direction.
    pub cos_thr: f32,
}

impl FingerThreshold {
    pub const fn new(len_thr: f32, cos_thr: f32) -> Self {
        Self { len_thr, cos_thr }
    }
}

/// Finger-extension test configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerRules {
    /// Directional test when true, vertical tip-above-pip fallback otherwise.
    pub use_direction: bool,
    /// Require the other fingers to be short for single-finger poses.
    pub single_finger_enhance: bool,
    /// Length ratio below which a finger counts as folded for the enhancement.
    pub others_fold_len_thr: f32,
    pub index: FingerThreshold,
    pub middle: FingerThreshold,
    pub ring: FingerThreshold,
    pub pinky: FingerThreshold,
    pub thumb: FingerThreshold,
}

impl Default for FingerRules {
    fn default() -> Self {
        Self {
            use_direction: true,
            single_finger_enhance: true,
            others_fold_len_thr: 0.45,
            index: FingerThreshold::new(0.55, 0.55),
            middle: FingerThreshold::new(0.55, 0.55),
            ring: FingerThreshold::new(0.55, 0.55),
            pinky: FingerThreshold::new(0.50, 0.50),
            thumb: FingerThreshold::new(0.50, 0.20),
        }
    }
}

impl FingerRules {
    pub fn threshold(&self, finger: Finger) -> FingerThreshold {
        match finger {
            Finger::Thumb => self.thumb,
            Finger::Index => self.index,
            Finger::Middle => self.middle,
            Finger::Ring => self.ring,
            Finger::Pinky => self.pinky,
        }
    }

    fn threshold_mut(&mut self, finger: Finger) -> &mut FingerThreshold {
        match finger {
            Finger::Thumb => &mut self.thumb,
            Finger::Index => &mut self.index,
            Finger::Middle => &mut self.middle,
            Finger::Ring => &mut self.ring,
            Finger::Pinky => &mut self.pinky,
        }
    }

    /// Apply overrides from a `:finger-rules` plist.
    pub fn apply_sexp(&mut self, value: &Value) {
        set_bool(value, "use-direction", &mut self.use_direction);
        set_bool(value, "single-finger-enhance", &mut self.single_finger_enhance);
        set_f32(value, "others-fold-len-thr", &mut self.others_fold_len_thr, |v| v >= 0.0);
        for finger in Finger::ALL {
            if let Some(fv) = get_value(value, finger.as_str()) {
                let thr = self.threshold_mut(finger);
                set_f32(fv, "len-thr", &mut thr.len_thr, |v| v >= 0.0);
                set_f32(fv, "cos-thr", &mut thr.cos_thr, |v| (-1.0..=1.0).contains(&v));
            }
        }
    }
}

// ── Engine config ──────────────────────────────────────────

/// Thresholds and gates for the per-frame gesture engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Fingertip distance / palm width below which two tips pinch.
    pub pinch_threshold_ratio: f32,
    /// Index-middle tip distance / palm width below which the fingers are "closed".
    pub two_finger_close_ratio: f32,
    /// Identical consecutive raw labels required before a label is confirmed.
    pub stable_frames: u32,
    /// Default minimum spacing between firings of the same event.
    pub cooldown_ms: u64,
    /// Net displacement over the window needed for a swipe.
    pub swipe_thresh_px: f32,
    /// Age limit of the swipe/speed trajectory window.
    pub dynamic_window_ms: u64,
    /// Age limit of the custom-template trajectory window. Matching needs
    /// `MIN_RECORD_POINTS` (12) samples inside it, so at 600 ms the frame
    /// rate must be at least 20 fps; at the 12 fps realtime default raise
    /// this to 1000 ms or more.
    pub custom_window_ms: u64,
    /// Path length above which the hand counts as moving and clicks are suppressed.
    pub click_guard_move_px: f32,
    /// Consecutive frames a click condition must hold before it may fire.
    pub click_hold_frames: u32,
    /// Average speed above which clicks are suppressed.
    pub click_max_speed_px_per_s: f32,
    pub scroll_gain: f32,
    pub scroll_deadzone_px: f32,
    pub scroll_max_step: f32,
    /// Maximum mean point distance accepted for a custom template match.
    pub custom_match_threshold: f32,
    pub finger_rules: FingerRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pinch_threshold_ratio: 0.33,
            two_finger_close_ratio: 0.22,
            stable_frames: 3,
            cooldown_ms: 450,
            swipe_thresh_px: 80.0,
            dynamic_window_ms: 450,
            custom_window_ms: 600,
            click_guard_move_px: 35.0,
            click_hold_frames: 2,
            click_max_speed_px_per_s: 650.0,
            scroll_gain: 1.6,
            scroll_deadzone_px: 6.0,
            scroll_max_step: 120.0,
            custom_match_threshold: 0.22,
            finger_rules: FingerRules::default(),
        }
    }
}

impl EngineConfig {
    /// Apply overrides from a `:general` plist.
    pub fn apply_sexp(&mut self, value: &Value) {
        set_f32(value, "pinch-threshold-ratio", &mut self.pinch_threshold_ratio, positive);
        set_f32(value, "two-finger-close-ratio", &mut self.two_finger_close_ratio, positive);
        set_u32(value, "stable-frames", &mut self.stable_frames, 1);
        set_u64(value, "cooldown-ms", &mut self.cooldown_ms);
        set_f32(value, "swipe-thresh-px", &mut self.swipe_thresh_px, positive);
        set_u64(value, "dynamic-window-ms", &mut self.dynamic_window_ms);
        set_u64(value, "custom-window-ms", &mut self.custom_window_ms);
        set_f32(value, "click-guard-move-px", &mut self.click_guard_move_px, non_negative);
        set_u32(value, "click-hold-frames", &mut self.click_hold_frames, 1);
        set_f32(
            value,
            "click-max-speed-px-per-s",
            &mut self.click_max_speed_px_per_s,
            non_negative,
        );
        set_f32(value, "scroll-gain", &mut self.scroll_gain, non_negative);
        set_f32(value, "scroll-deadzone-px", &mut self.scroll_deadzone_px, non_negative);
        set_f32(value, "scroll-max-step", &mut self.scroll_max_step, non_negative);
        set_f32(value, "custom-match-threshold", &mut self.custom_match_threshold, non_negative);
        if let Some(rules) = get_value(value, "finger-rules") {
            self.finger_rules.apply_sexp(rules);
        }
    }

    /// Generate s-expression for the active configuration.
    pub fn config_sexp(&self) -> String {
        let fr = &self.finger_rules;
        let finger = |t: FingerThreshold| format!("(:len-thr {:.2} :cos-thr {:.2})", t.len_thr, t.cos_thr);
        format!(
            "(:pinch-threshold-ratio {:.2} :two-finger-close-ratio {:.2} :stable-frames {} :cooldown-ms {} :swipe-thresh-px {:.0} :dynamic-window-ms {} :custom-window-ms {} :click-guard-move-px {:.0} :click-hold-frames {} :click-max-speed-px-per-s {:.0} :scroll-gain {:.2} :scroll-deadzone-px {:.0} :scroll-max-step {:.0} :custom-match-threshold {:.2} :finger-rules (:use-direction {} :single-finger-enhance {} :others-fold-len-thr {:.2} :index {} :middle {} :ring {} :pinky {} :thumb {}))",
            self.pinch_threshold_ratio,
            self.two_finger_close_ratio,
            self.stable_frames,
            self.cooldown_ms,
            self.swipe_thresh_px,
            self.dynamic_window_ms,
            self.custom_window_ms,
            self.click_guard_move_px,
            self.click_hold_frames,
            self.click_max_speed_px_per_s,
            self.scroll_gain,
            self.scroll_deadzone_px,
            self.scroll_max_step,
            self.custom_match_threshold,
            bool_sexp(fr.use_direction),
            bool_sexp(fr.single_finger_enhance),
            fr.others_fold_len_thr,
            finger(fr.index),
            finger(fr.middle),
            finger(fr.ring),
            finger(fr.pinky),
            finger(fr.thumb),
        )
    }
}

// ── Runtime config ─────────────────────────────────────────

/// Settings for the driver loop and pointer output.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Inference ticks per second (minimum 5).
    pub infer_fps: u32,
    /// Pointer worker ticks per second (minimum 10).
    pub pointer_hz: u32,
    /// Exponential smoothing factor for pointer targets (0 = none).
    pub mouse_smoothing: f32,
    /// Gain about the screen center.
    pub mouse_sensitivity: f32,
    /// Targets closer than this to the last emitted one are dropped.
    pub mouse_deadzone_px: f32,
    pub screen_width: u32,
    pub screen_height: u32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            infer_fps: 12,
            pointer_hz: 60,
            mouse_smoothing: 0.35,
            mouse_sensitivity: 1.0,
            mouse_deadzone_px: 2.0,
            screen_width: 1920,
            screen_height: 1080,
            frame_width: 640,
            frame_height: 480,
        }
    }
}

impl RuntimeConfig {
    /// Apply overrides from a `:runtime` plist. Rates are clamped to their minimums.
    pub fn apply_sexp(&mut self, value: &Value) {
        set_u32(value, "infer-fps", &mut self.infer_fps, 1);
        set_u32(value, "pointer-hz", &mut self.pointer_hz, 1);
        set_f32(value, "mouse-smoothing", &mut self.mouse_smoothing, |v| (0.0..1.0).contains(&v));
        set_f32(value, "mouse-sensitivity", &mut self.mouse_sensitivity, positive);
        set_f32(value, "mouse-deadzone-px", &mut self.mouse_deadzone_px, non_negative);
        set_u32(value, "screen-width", &mut self.screen_width, 1);
        set_u32(value, "screen-height", &mut self.screen_height, 1);
        set_u32(value, "frame-width", &mut self.frame_width, 1);
        set_u32(value, "frame-height", &mut self.frame_height, 1);
        self.infer_fps = self.infer_fps.max(5);
        self.pointer_hz = self.pointer_hz.max(10);
    }
}

// ── Whole-file config ──────────────────────────────────────

/// Everything a config file can carry.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub runtime: RuntimeConfig,
    pub catalog: GestureCatalog,
    pub templates: TemplateStore,
}

impl AppConfig {
    /// Build from a parsed config plist. Missing sections keep their defaults.
    pub fn from_sexp(value: &Value) -> Self {
        let mut cfg = Self::default();
        if let Some(general) = get_value(value, "general") {
            cfg.engine.apply_sexp(general);
        }
        if let Some(runtime) = get_value(value, "runtime") {
            cfg.runtime.apply_sexp(runtime);
        }
        if let Some(catalog) = get_value(value, "gesture-catalog") {
            cfg.catalog = GestureCatalog::from_sexp(catalog);
        }
        if let Some(templates) = get_value(value, "custom-gestures") {
            cfg.templates = TemplateStore::from_sexp(templates);
        }
        cfg
    }

    /// Parse config text.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let value = lexpr::from_str(text).context("malformed config s-expression")?;
        Ok(Self::from_sexp(&value))
    }

    /// Load a config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg = Self::parse(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        info!(
            "Loaded config {}: {} catalog entries, {} custom templates",
            path.display(),
            cfg.catalog.len(),
            cfg.templates.len()
        );
        Ok(cfg)
    }
}

// ── Field setters ──────────────────────────────────────────

fn positive(v: f32) -> bool {
    v > 0.0
}

fn non_negative(v: f32) -> bool {
    v >= 0.0
}

fn set_f32(value: &Value, key: &str, field: &mut f32, valid: impl Fn(f32) -> bool) {
    if get_value(value, key).is_none() {
        return;
    }
    match get_float(value, key) {
        Some(v) if v.is_finite() && valid(v as f32) => *field = v as f32,
        _ => warn!("config: ignoring invalid :{} (keeping {})", key, field),
    }
}

fn set_u32(value: &Value, key: &str, field: &mut u32, min: u32) {
    if get_value(value, key).is_none() {
        return;
    }
    match get_int(value, key) {
        Some(v) if v >= min as i64 && v <= u32::MAX as i64 => *field = v as u32,
        _ => warn!("config: ignoring invalid :{} (keeping {})", key, field),
    }
}

fn set_u64(value: &Value, key: &str, field: &mut u64) {
    if get_value(value, key).is_none() {
        return;
    }
    match get_int(value, key) {
        Some(v) if v >= 0 => *field = v as u64,
        _ => warn!("config: ignoring invalid :{} (keeping {})", key, field),
    }
}

fn set_bool(value: &Value, key: &str, field: &mut bool) {
    if let Some(v) = get_bool(value, key) {
        *field = v;
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.stable_frames, 3);
        assert_eq!(cfg.cooldown_ms, 450);
        assert_eq!(cfg.dynamic_window_ms, 450);
        assert_eq!(cfg.click_hold_frames, 2);
        assert!((cfg.pinch_threshold_ratio - 0.33).abs() < 1e-6);
        assert!((cfg.finger_rules.thumb.cos_thr - 0.20).abs() < 1e-6);
        assert!(cfg.finger_rules.use_direction);
    }

    #[test]
    fn test_apply_general_overrides() {
        let v = lexpr::from_str(
            "(:stable-frames 5 :cooldown-ms 300 :scroll-gain 2.5 :swipe-thresh-px 60)",
        )
        .unwrap();
        let mut cfg = EngineConfig::default();
        cfg.apply_sexp(&v);
        assert_eq!(cfg.stable_frames, 5);
        assert_eq!(cfg.cooldown_ms, 300);
        assert!((cfg.scroll_gain - 2.5).abs() < 1e-6);
        assert!((cfg.swipe_thresh_px - 60.0).abs() < 1e-6);
        // untouched
        assert_eq!(cfg.click_hold_frames, 2);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let v = lexpr::from_str("(:stable-frames 0 :cooldown-ms -5 :pinch-threshold-ratio :big)")
            .unwrap();
        let mut cfg = EngineConfig::default();
        cfg.apply_sexp(&v);
        assert_eq!(cfg.stable_frames, 3);
        assert_eq!(cfg.cooldown_ms, 450);
        assert!((cfg.pinch_threshold_ratio - 0.33).abs() < 1e-6);
    }

    #[test]
    fn test_finger_rules_overrides() {
        let v = lexpr::from_str(
            "(:finger-rules (:use-direction nil :others-fold-len-thr 0.4 :thumb (:cos-thr 0.1)))",
        )
        .unwrap();
        let mut cfg = EngineConfig::default();
        cfg.apply_sexp(&v);
        let fr = &cfg.finger_rules;
        assert!(!fr.use_direction);
        assert!(fr.single_finger_enhance);
        assert!((fr.others_fold_len_thr - 0.4).abs() < 1e-6);
        assert!((fr.thumb.cos_thr - 0.1).abs() < 1e-6);
        assert!((fr.thumb.len_thr - 0.5).abs() < 1e-6);
        assert_eq!(fr.threshold(Finger::Pinky), FingerThreshold::new(0.50, 0.50));
    }

    #[test]
    fn test_runtime_rates_clamped() {
        let v = lexpr::from_str("(:infer-fps 2 :pointer-hz 3)").unwrap();
        let mut rt = RuntimeConfig::default();
        rt.apply_sexp(&v);
        assert_eq!(rt.infer_fps, 5);
        assert_eq!(rt.pointer_hz, 10);
    }

    #[test]
    fn test_app_config_sections() {
        let cfg = AppConfig::parse(
            "(:general (:stable-frames 2) :runtime (:infer-fps 20) \
             :gesture-catalog ((:id \"FIST\" :kind :static)))",
        )
        .unwrap();
        assert_eq!(cfg.engine.stable_frames, 2);
        assert_eq!(cfg.runtime.infer_fps, 20);
        assert_eq!(cfg.catalog.len(), 1);
        assert!(cfg.catalog.contains("FIST"));
        assert!(cfg.templates.is_empty());
    }

    #[test]
    fn test_app_config_missing_sections_use_defaults() {
        let cfg = AppConfig::parse("()").unwrap();
        assert_eq!(cfg.engine, EngineConfig::default());
        assert!(cfg.catalog.contains("PINCH_SCROLL"));
    }

    #[test]
    fn test_app_config_malformed_text() {
        assert!(AppConfig::parse("(:general (:stable-frames").is_err());
    }

    #[test]
    fn test_config_sexp() {
        let sexp = EngineConfig::default().config_sexp();
        assert!(sexp.contains(":stable-frames 3"));
        assert!(sexp.contains(":cooldown-ms 450"));
        assert!(sexp.contains(":pinch-threshold-ratio 0.33"));
        assert!(sexp.contains(":use-direction t"));
        assert!(lexpr::from_str(&sexp).is_ok());
    }
}
