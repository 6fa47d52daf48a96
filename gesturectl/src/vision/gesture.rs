//! Per-frame gesture engine.
//!
//! Turns a stream of hand landmark sets (or glove blob features) into
//! discrete gesture events and pinch-scroll vectors. The engine owns all of
//! its counters (debounce, edge/hold states, cooldowns, scroll anchor,
//! trajectory windows) and expects exactly one call per inference tick with
//! a monotonic timestamp.

use tracing::{debug, trace};

use crate::catalog::{GestureCatalog, GestureMode};
use crate::config::EngineConfig;
use crate::sexp::{bool_sexp, opt_string_sexp};
use crate::state::SystemState;

use super::classifier::classify_static;
use super::cooldown::CooldownRegistry;
use super::landmarks::{BlobFeatures, HandLandmark, LandmarkSet};
use super::primitives::{close_ratio, pinch_ratio};
use super::scroll::{compute_scroll, ScrollAnchor, ScrollVector};
use super::stability::StabilityFilter;
use super::swipe::detect_swipe;
use super::template::{TemplateStore, MIN_RECORD_POINTS};
use super::track_window::TrackWindow;

/// Raw label reported for every glove frame with a blob.
pub const GLOVE_RAW_LABEL: &str = "GLOVE_TRACKING";

pub const PINCH_SCROLL: &str = "PINCH_SCROLL";
pub const PINCH_RIGHT_CLICK: &str = "PINCH_RIGHT_CLICK";
pub const INDEX_MIDDLE_DOUBLE_CLICK: &str = "INDEX_MIDDLE_DOUBLE_CLICK";
pub const UNKNOWN: &str = "UNKNOWN";

const RIGHT_CLICK_COOLDOWN_MS: u64 = 500;
const DOUBLE_CLICK_COOLDOWN_MS: u64 = 700;
const UNKNOWN_COOLDOWN_MS: u64 = 800;
const UNKNOWN_STABLE_FRAMES: u32 = 3;

// ── Output ─────────────────────────────────────────────────

/// Result of one tick. `event` and `scroll` are never both set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    /// Discrete gesture id fired this tick.
    pub event: Option<String>,
    /// Unconfirmed classification of this frame, for display.
    pub raw_label: Option<String>,
    /// Pinch-scroll step while scrolling.
    pub scroll: Option<ScrollVector>,
}

impl FrameOutput {
    fn event(id: &str, raw_label: Option<String>) -> Self {
        Self {
            event: Some(id.to_string()),
            raw_label,
            scroll: None,
        }
    }

    fn raw(raw_label: Option<String>) -> Self {
        Self {
            event: None,
            raw_label,
            scroll: None,
        }
    }
}

// ── Edge trigger ───────────────────────────────────────────

/// Edge trigger with a hold requirement for one composite click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeState {
    /// Condition already triggered; cleared only when it releases.
    pub down: bool,
    /// Consecutive frames the condition has held.
    pub hold: u32,
}

impl EdgeState {
    /// Advance by one frame. Returns true when the edge should trigger now.
    fn advance(&mut self, active: bool, hold_frames: u32) -> bool {
        if !active {
            self.release();
            return false;
        }
        self.hold = self.hold.saturating_add(1);
        self.hold >= hold_frames && !self.down
    }

    fn release(&mut self) {
        self.down = false;
        self.hold = 0;
    }

    /// Mark as already triggered so a later release cannot fire.
    fn force_down(&mut self) {
        self.down = true;
        self.hold = 0;
    }
}

// ── Engine ─────────────────────────────────────────────────

/// Gesture recognizer state for one input stream.
#[derive(Debug, Clone)]
pub struct GestureEngine {
    config: EngineConfig,
    catalog: GestureCatalog,
    templates: TemplateStore,
    stability: StabilityFilter,
    cooldowns: CooldownRegistry,
    scroll: ScrollAnchor,
    /// Swipe, speed and movement-guard window.
    track: TrackWindow,
    /// Custom template window.
    custom_track: TrackWindow,
    right_click: EdgeState,
    double_click: EdgeState,
    unknown_streak: u32,
    last_raw: Option<String>,
    last_confirmed: Option<String>,
}

impl GestureEngine {
    pub fn new(config: EngineConfig, catalog: GestureCatalog, templates: TemplateStore) -> Self {
        let track = TrackWindow::new(config.dynamic_window_ms);
        let custom_track = TrackWindow::new(config.custom_window_ms);
        Self {
            config,
            catalog,
            templates,
            stability: StabilityFilter::new(),
            cooldowns: CooldownRegistry::new(),
            scroll: ScrollAnchor::new(),
            track,
            custom_track,
            right_click: EdgeState::default(),
            double_click: EdgeState::default(),
            unknown_streak: 0,
            last_raw: None,
            last_confirmed: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Swap in a new configuration snapshot between ticks.
    pub fn set_config(&mut self, config: EngineConfig) {
        self.track.set_window(config.dynamic_window_ms);
        self.custom_track.set_window(config.custom_window_ms);
        self.config = config;
    }

    pub fn catalog(&self) -> &GestureCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut GestureCatalog {
        &mut self.catalog
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateStore {
        &mut self.templates
    }

    /// Clear all per-stream counters. Cooldowns are kept.
    pub fn reset(&mut self) {
        self.stability.reset();
        self.scroll.stop();
        self.track.reset();
        self.custom_track.reset();
        self.right_click.release();
        self.double_click.release();
        self.unknown_streak = 0;
        self.last_raw = None;
        self.last_confirmed = None;
    }

    pub fn reset_cooldowns(&mut self) {
        self.cooldowns.clear();
    }

    /// Whether the catalog declares `id` and its `enable_when` holds.
    fn enabled(&self, id: &str, state: &SystemState) -> bool {
        self.catalog.is_enabled(id, state)
    }

    fn no_hand(&mut self, state: &mut SystemState) {
        self.reset();
        state.mouse_move_mode = false;
    }

    // ── Bare hand ──────────────────────────────────────────

    /// Process one bare-hand frame. `None` means no hand was detected.
    pub fn update_bare(
        &mut self,
        landmarks: Option<&LandmarkSet>,
        state: &mut SystemState,
        now_ms: u64,
    ) -> FrameOutput {
        let Some(lm) = landmarks else {
            self.no_hand(state);
            return FrameOutput::default();
        };

        let tip = lm.get(HandLandmark::IndexTip);
        self.track.add(now_ms, tip);
        self.custom_track.add(now_ms, tip);

        let raw = classify_static(
            lm,
            self.config.pinch_threshold_ratio,
            &self.config.finger_rules,
        )
        .map(|p| p.as_str().to_string());
        let confirmed = self
            .stability
            .update(raw.as_deref(), self.config.stable_frames);
        state.mouse_move_mode =
            confirmed.as_deref() == Some(self.catalog.mouse_mode_gesture_id());
        self.last_raw = raw.clone();
        self.last_confirmed = confirmed.clone();

        if !state.recognition_enabled {
            self.scroll.stop();
            self.right_click.release();
            self.double_click.release();
            self.unknown_streak = 0;
            return FrameOutput::raw(raw);
        }

        let moving = self.track.path_length() > self.config.click_guard_move_px;
        let slow_enough = self.track.avg_speed_px_per_s() <= self.config.click_max_speed_px_per_s;

        let pinch_thr = self.config.pinch_threshold_ratio;
        let pinch_index = pinch_ratio(lm, HandLandmark::ThumbTip, HandLandmark::IndexTip) < pinch_thr;
        let pinch_middle =
            pinch_ratio(lm, HandLandmark::ThumbTip, HandLandmark::MiddleTip) < pinch_thr;

        if pinch_index && pinch_middle {
            // Three-finger pinch cancels scroll and clicks.
            self.scroll.stop();
            self.right_click.force_down();
            self.double_click.force_down();
        } else {
            if self.enabled(PINCH_SCROLL, state) {
                if pinch_index {
                    self.scroll.start(tip);
                    let (dx, dy) = self.scroll.delta(tip).unwrap_or((0.0, 0.0));
                    let scroll = compute_scroll(
                        dx,
                        dy,
                        self.config.scroll_gain,
                        self.config.scroll_deadzone_px,
                        self.config.scroll_max_step,
                    );
                    trace!("Pinch scroll sv={} sh={}", scroll.sv, scroll.sh);
                    return FrameOutput {
                        event: None,
                        raw_label: raw,
                        scroll: Some(scroll),
                    };
                }
                self.scroll.stop();
            }

            if !moving && slow_enough {
                if let Some(id) = self.step_clicks(lm, pinch_middle, state, now_ms) {
                    return FrameOutput::event(id, raw);
                }
            } else {
                self.right_click.release();
                self.double_click.release();
            }
        }

        if let Some(id) = confirmed.as_deref() {
            if self.enabled(id, state) {
                let cd = self.catalog.cooldown_ms(id, self.config.cooldown_ms);
                if self.cooldowns.try_fire(id, cd, now_ms) {
                    debug!("Static gesture {}", id);
                    return FrameOutput::event(id, raw);
                }
            }
        }

        if let Some(id) = self.check_swipe(state, now_ms) {
            return FrameOutput::event(id, raw);
        }

        if raw.is_none() {
            if let Some(id) = self.step_unknown(state, now_ms) {
                return FrameOutput::event(id, raw);
            }
        } else {
            self.unknown_streak = 0;
            if let Some(id) = self.match_custom(GestureMode::Bare, state, now_ms) {
                return FrameOutput {
                    event: Some(id),
                    raw_label: raw,
                    scroll: None,
                };
            }
        }

        FrameOutput::raw(raw)
    }

    /// Right-click then double-click edge triggers. Returns the id that fired.
    fn step_clicks(
        &mut self,
        lm: &LandmarkSet,
        pinch_middle: bool,
        state: &SystemState,
        now_ms: u64,
    ) -> Option<&'static str> {
        let hold_frames = self.config.click_hold_frames;

        if self.enabled(PINCH_RIGHT_CLICK, state) {
            if self.right_click.advance(pinch_middle, hold_frames) {
                self.right_click.down = true;
                let cd = self.catalog.cooldown_ms(PINCH_RIGHT_CLICK, RIGHT_CLICK_COOLDOWN_MS);
                if self.cooldowns.try_fire(PINCH_RIGHT_CLICK, cd, now_ms) {
                    debug!("Composite gesture {}", PINCH_RIGHT_CLICK);
                    return Some(PINCH_RIGHT_CLICK);
                }
            }
        } else {
            self.right_click.release();
        }

        if self.enabled(INDEX_MIDDLE_DOUBLE_CLICK, state) {
            let close = close_ratio(lm, HandLandmark::IndexTip, HandLandmark::MiddleTip)
                < self.config.two_finger_close_ratio;
            if self.double_click.advance(close, hold_frames) {
                self.double_click.down = true;
                let cd = self
                    .catalog
                    .cooldown_ms(INDEX_MIDDLE_DOUBLE_CLICK, DOUBLE_CLICK_COOLDOWN_MS);
                if self.cooldowns.try_fire(INDEX_MIDDLE_DOUBLE_CLICK, cd, now_ms) {
                    debug!("Composite gesture {}", INDEX_MIDDLE_DOUBLE_CLICK);
                    return Some(INDEX_MIDDLE_DOUBLE_CLICK);
                }
            }
        } else {
            self.double_click.release();
        }

        None
    }

    /// Swipe over the dynamic window. Clears the window when it fires.
    fn check_swipe(&mut self, state: &SystemState, now_ms: u64) -> Option<&'static str> {
        let (dx, dy) = self.track.delta()?;
        let id = detect_swipe(dx, dy, self.config.swipe_thresh_px)?.as_str();
        if !self.enabled(id, state) {
            return None;
        }
        let cd = self.catalog.cooldown_ms(id, self.config.cooldown_ms);
        if !self.cooldowns.try_fire(id, cd, now_ms) {
            return None;
        }
        debug!("Swipe {} (dx={:.0} dy={:.0})", id, dx, dy);
        self.track.reset();
        Some(id)
    }

    /// Count consecutive unclassified frames and fire `UNKNOWN` once enough
    /// have passed.
    fn step_unknown(&mut self, state: &SystemState, now_ms: u64) -> Option<&'static str> {
        if !self.enabled(UNKNOWN, state) {
            self.unknown_streak = 0;
            return None;
        }
        self.unknown_streak = self.unknown_streak.saturating_add(1);
        let need = self.catalog.stable_frames(UNKNOWN, UNKNOWN_STABLE_FRAMES);
        if self.unknown_streak < need {
            return None;
        }
        let cd = self.catalog.cooldown_ms(UNKNOWN, UNKNOWN_COOLDOWN_MS);
        if !self.cooldowns.try_fire(UNKNOWN, cd, now_ms) {
            return None;
        }
        self.unknown_streak = 0;
        Some(UNKNOWN)
    }

    /// Match the custom window against stored templates for `mode`.
    fn match_custom(
        &mut self,
        mode: GestureMode,
        state: &SystemState,
        now_ms: u64,
    ) -> Option<String> {
        if self.templates.is_empty() || self.custom_track.len() < MIN_RECORD_POINTS {
            return None;
        }
        let (id, dist) = self.templates.match_trajectory(
            mode,
            &self.custom_track.points(),
            self.config.custom_match_threshold,
        )?;
        if self.catalog.contains(&id) && !self.enabled(&id, state) {
            return None;
        }
        let cd = self.catalog.cooldown_ms(&id, self.config.cooldown_ms);
        if !self.cooldowns.try_fire(&id, cd, now_ms) {
            return None;
        }
        debug!("Custom gesture {} (distance {:.3})", id, dist);
        self.custom_track.reset();
        Some(id)
    }

    // ── Glove ──────────────────────────────────────────────

    /// Process one glove frame. Only swipes are recognized; two or more
    /// visible fingertips switch on mouse-move mode.
    pub fn update_glove(
        &mut self,
        features: Option<&BlobFeatures>,
        state: &mut SystemState,
        now_ms: u64,
    ) -> FrameOutput {
        let Some(center) = features.and_then(|f| f.center) else {
            self.no_hand(state);
            return FrameOutput::default();
        };
        let fingertips = features.map_or(0, |f| f.fingertip_count());

        self.track.add(now_ms, center);
        state.mouse_move_mode = fingertips >= 2;
        let raw = Some(GLOVE_RAW_LABEL.to_string());
        self.last_raw = raw.clone();

        if !state.recognition_enabled {
            self.scroll.stop();
            return FrameOutput::raw(raw);
        }

        match self.check_swipe(state, now_ms) {
            Some(id) => FrameOutput::event(id, raw),
            None => FrameOutput::raw(raw),
        }
    }

    // ── Introspection ──────────────────────────────────────

    /// Generate s-expression for engine status.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:raw {} :confirmed {} :stable-count {} :unknown-streak {} :scroll-active {} :right-click (:down {} :hold {}) :double-click (:down {} :hold {}) :track-samples {} :custom-samples {} :templates {})",
            opt_string_sexp(self.last_raw.as_deref()),
            opt_string_sexp(self.last_confirmed.as_deref()),
            self.stability.count(),
            self.unknown_streak,
            bool_sexp(self.scroll.is_active()),
            bool_sexp(self.right_click.down),
            self.right_click.hold,
            bool_sexp(self.double_click.down),
            self.double_click.hold,
            self.track.len(),
            self.custom_track.len(),
            self.templates.len(),
        )
    }

    pub fn config_sexp(&self) -> String {
        self.config.config_sexp()
    }
}

// ── Tests ──────────────────────────────────────────────────
