//! Gesture catalog: which gesture ids exist, when they are enabled, and
//! their per-id parameter overrides.
//!
//! Entries keep declaration order for enumeration; lookups go through an
//! id index.

use std::collections::HashMap;

use lexpr::Value;
use tracing::warn;

use crate::sexp::{get_int, get_keyword, get_value, list_items};
use crate::state::SystemState;

/// Gesture id that drives `mouse_move_mode` when no entry claims it.
pub const DEFAULT_MODE_GESTURE: &str = "V_SIGN";

/// `default_use` value marking the mouse-move-mode gesture.
pub const MOUSE_MOVE_MODE_USE: &str = "mouse_move_mode";

// ── Entry fields ───────────────────────────────────────────

/// How a gesture is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Static,
    Dynamic,
    Composite,
    State,
}

impl GestureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
            Self::Composite => "composite",
            Self::State => "state",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "static" => Some(Self::Static),
            "dynamic" => Some(Self::Dynamic),
            "composite" => Some(Self::Composite),
            "state" => Some(Self::State),
            _ => None,
        }
    }
}

/// Which input mode a gesture (or template) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureMode {
    Bare,
    Glove,
    Both,
}

impl GestureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bare => "bare",
            Self::Glove => "glove",
            Self::Both => "both",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bare" => Some(Self::Bare),
            "glove" => Some(Self::Glove),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    /// Whether an item declared with `self` applies when running in `mode`.
    pub fn applies_to(&self, mode: GestureMode) -> bool {
        *self == GestureMode::Both || *self == mode
    }
}

/// Per-id parameter overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GestureParams {
    pub cooldown_ms: Option<u64>,
    pub stable_frames: Option<u32>,
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub kind: GestureKind,
    pub mode: GestureMode,
    /// Free-form intended use, e.g. `mouse_move_mode` or `toggle_recognition`.
    pub default_use: Option<String>,
    /// Required system-state values: `(field, expected)`.
    pub enable_when: Vec<(String, bool)>,
    pub params: GestureParams,
}

impl CatalogEntry {
    pub fn new(id: &str, kind: GestureKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            mode: GestureMode::Bare,
            default_use: None,
            enable_when: Vec::new(),
            params: GestureParams::default(),
        }
    }

    pub fn with_use(mut self, default_use: &str) -> Self {
        self.default_use = Some(default_use.to_string());
        self
    }

    pub fn with_cooldown(mut self, cooldown_ms: u64) -> Self {
        self.params.cooldown_ms = Some(cooldown_ms);
        self
    }

    pub fn with_stable_frames(mut self, stable_frames: u32) -> Self {
        self.params.stable_frames = Some(stable_frames);
        self
    }

    pub fn with_enable_when(mut self, field: &str, expected: bool) -> Self {
        self.enable_when.push((field.to_string(), expected));
        self
    }

    /// Every `enable_when` clause holds. Fields unknown to the state are ignored.
    pub fn enabled_in(&self, state: &SystemState) -> bool {
        self.enable_when
            .iter()
            .all(|(field, expected)| state.field(field).map_or(true, |v| v == *expected))
    }

    /// Parse one entry plist. Returns `None` when `:id` is missing.
    pub fn from_sexp(value: &Value) -> Option<Self> {
        let id = get_keyword(value, "id").filter(|s| !s.is_empty() && s != "nil")?;
        let kind = get_keyword(value, "kind")
            .and_then(|k| GestureKind::from_str(&k))
            .unwrap_or(GestureKind::Static);
        let mut entry = Self::new(&id, kind);
        if let Some(mode) = get_keyword(value, "mode").and_then(|m| GestureMode::from_str(&m)) {
            entry.mode = mode;
        }
        entry.default_use = get_keyword(value, "default-use")
            .filter(|s| s != "nil")
            .map(|s| s.replace('-', "_"));
        if let Some(cond) = get_value(value, "enable-when") {
            entry.enable_when = parse_enable_when(cond);
        }
        if let Some(params) = get_value(value, "params") {
            entry.params.cooldown_ms = get_int(params, "cooldown-ms")
                .filter(|v| *v >= 0)
                .map(|v| v as u64);
            entry.params.stable_frames = get_int(params, "stable-frames")
                .filter(|v| *v >= 1)
                .map(|v| v as u32);
        }
        Some(entry)
    }
}

/// Parse `(:field t :other nil)` into clauses.
fn parse_enable_when(value: &Value) -> Vec<(String, bool)> {
    let items = list_items(value);
    let mut out = Vec::new();
    for pair in items.chunks(2) {
        if pair.len() != 2 {
            break;
        }
        let name = match pair[0] {
            Value::Keyword(k) => k.to_string(),
            Value::Symbol(s) => {
                let s: &str = s;
                s.strip_prefix(':').unwrap_or(s).to_string()
            }
            _ => continue,
        };
        let expected = !matches!(pair[1], Value::Null | Value::Nil | Value::Bool(false))
            && !matches!(pair[1], Value::Symbol(s) if s.as_ref() == "nil");
        out.push((name.replace('-', "_"), expected));
    }
    out
}

// ── Catalog ────────────────────────────────────────────────

/// Ordered, id-indexed gesture catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl Default for GestureCatalog {
    fn default() -> Self {
        Self::from_entries(default_entries())
    }
}

impl GestureCatalog {
    /// Empty catalog: nothing is declared, so nothing fires.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build from entries; a later duplicate id replaces the earlier one in place.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let mut catalog = Self::empty();
        for entry in entries {
            catalog.upsert(entry);
        }
        catalog
    }

    /// Parse a `:gesture-catalog` list. Entries without an id are skipped.
    pub fn from_sexp(value: &Value) -> Self {
        let mut catalog = Self::empty();
        for item in list_items(value) {
            match CatalogEntry::from_sexp(item) {
                Some(entry) => catalog.upsert(entry),
                None => warn!("catalog: skipping entry without :id: {}", item),
            }
        }
        catalog
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All ids in declaration order.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    /// Ids usable in `mode`, in declaration order.
    pub fn ids_for_mode(&self, mode: GestureMode) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.mode.applies_to(mode))
            .map(|e| e.id.as_str())
            .collect()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Insert or replace (keeping the original position) an entry.
    pub fn upsert(&mut self, entry: CatalogEntry) {
        match self.index.get(&entry.id) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.index.insert(entry.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Remove an entry. Returns true if it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(pos) = self.index.remove(id) else {
            return false;
        };
        self.entries.remove(pos);
        for i in self.index.values_mut() {
            if *i > pos {
                *i -= 1;
            }
        }
        true
    }

    /// Declared and its `enable_when` holds against `state`.
    pub fn is_enabled(&self, id: &str, state: &SystemState) -> bool {
        self.get(id).map_or(false, |e| e.enabled_in(state))
    }

    /// The entry's `cooldown_ms` override, else `default`.
    pub fn cooldown_ms(&self, id: &str, default: u64) -> u64 {
        self.get(id)
            .and_then(|e| e.params.cooldown_ms)
            .unwrap_or(default)
    }

    /// The entry's `stable_frames` override, else `default`.
    pub fn stable_frames(&self, id: &str, default: u32) -> u32 {
        self.get(id)
            .and_then(|e| e.params.stable_frames)
            .unwrap_or(default)
    }

    /// Id of the gesture that switches on mouse-move mode.
    pub fn mouse_mode_gesture_id(&self) -> &str {
        self.entries
            .iter()
            .find(|e| e.default_use.as_deref() == Some(MOUSE_MOVE_MODE_USE))
            .map(|e| e.id.as_str())
            .unwrap_or(DEFAULT_MODE_GESTURE)
    }
}

/// Factory catalog used when a config carries none.
fn default_entries() -> Vec<CatalogEntry> {
    use GestureKind::*;
    vec![
        CatalogEntry::new("OPEN_PALM", Static).with_use("neutral"),
        CatalogEntry::new("THUMBS_UP", Static)
            .with_use("toggle_recognition")
            .with_stable_frames(4)
            .with_cooldown(1200),
        CatalogEntry::new("V_SIGN", Static).with_use(MOUSE_MOVE_MODE_USE),
        CatalogEntry::new("PINCH_RIGHT_CLICK", Composite)
            .with_use("right_click")
            .with_cooldown(500),
        CatalogEntry::new("INDEX_MIDDLE_DOUBLE_CLICK", Composite)
            .with_use("double_click_left")
            .with_cooldown(700),
        CatalogEntry::new("PINCH_SCROLL", State).with_use("scroll_proportional"),
        CatalogEntry::new("SWIPE_LEFT", Dynamic).with_use("custom_bind"),
        CatalogEntry::new("SWIPE_RIGHT", Dynamic).with_use("custom_bind"),
        CatalogEntry::new("SWIPE_UP", Dynamic).with_use("custom_bind"),
        CatalogEntry::new("SWIPE_DOWN", Dynamic).with_use("custom_bind"),
        CatalogEntry::new("INDEX_ONLY", Static)
            .with_use("custom_bind")
            .with_cooldown(450)
            .with_stable_frames(2),
        CatalogEntry::new("THUMB_PINKY", Static)
            .with_use("custom_bind")
            .with_cooldown(450)
            .with_stable_frames(2),
        CatalogEntry::new("FIST", Static)
            .with_use("custom_bind")
            .with_cooldown(450)
            .with_stable_frames(2),
        CatalogEntry::new("UNKNOWN", Static)
            .with_use("custom_bind")
            .with_cooldown(800)
            .with_stable_frames(3),
    ]
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_order() {
        let c = GestureCatalog::default();
        assert_eq!(c.len(), 14);
        let ids = c.ids();
        assert_eq!(ids[0], "OPEN_PALM");
        assert_eq!(ids[5], "PINCH_SCROLL");
        assert_eq!(ids[13], "UNKNOWN");
    }

    #[test]
    fn test_lookup_and_params() {
        let c = GestureCatalog::default();
        assert_eq!(c.get("FIST").unwrap().kind, GestureKind::Static);
        assert_eq!(c.cooldown_ms("THUMBS_UP", 450), 1200);
        assert_eq!(c.cooldown_ms("OPEN_PALM", 450), 450);
        assert_eq!(c.cooldown_ms("NOT_DECLARED", 300), 300);
        assert_eq!(c.stable_frames("UNKNOWN", 1), 3);
    }

    #[test]
    fn test_mouse_mode_gesture_default() {
        assert_eq!(GestureCatalog::default().mouse_mode_gesture_id(), "V_SIGN");
        assert_eq!(GestureCatalog::empty().mouse_mode_gesture_id(), DEFAULT_MODE_GESTURE);
    }

    #[test]
    fn test_mouse_mode_gesture_from_entry() {
        let c = GestureCatalog::from_entries(vec![
            CatalogEntry::new("INDEX_ONLY", GestureKind::Static).with_use(MOUSE_MOVE_MODE_USE),
        ]);
        assert_eq!(c.mouse_mode_gesture_id(), "INDEX_ONLY");
    }

    #[test]
    fn test_enable_when() {
        let c = GestureCatalog::from_entries(vec![
            CatalogEntry::new("FIST", GestureKind::Static).with_enable_when("mouse_move_mode", false),
            CatalogEntry::new("V_SIGN", GestureKind::Static).with_enable_when("bogus_flag", true),
        ]);
        let mut state = SystemState::new();
        assert!(c.is_enabled("FIST", &state));
        state.mouse_move_mode = true;
        assert!(!c.is_enabled("FIST", &state));
        // unknown fields do not block
        assert!(c.is_enabled("V_SIGN", &state));
        assert!(!c.is_enabled("OPEN_PALM", &state));
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut c = GestureCatalog::default();
        c.upsert(CatalogEntry::new("V_SIGN", GestureKind::Static).with_cooldown(99));
        assert_eq!(c.ids()[2], "V_SIGN");
        assert_eq!(c.cooldown_ms("V_SIGN", 0), 99);
        assert_eq!(c.len(), 14);
    }

    #[test]
    fn test_remove_reindexes() {
        let mut c = GestureCatalog::default();
        assert!(c.remove("OPEN_PALM"));
        assert!(!c.remove("OPEN_PALM"));
        assert_eq!(c.len(), 13);
        assert_eq!(c.get("UNKNOWN").unwrap().id, "UNKNOWN");
        assert_eq!(c.get("THUMBS_UP").unwrap().id, "THUMBS_UP");
    }

    #[test]
    fn test_ids_for_mode() {
        let mut c = GestureCatalog::empty();
        let mut glove = CatalogEntry::new("SWIPE_LEFT", GestureKind::Dynamic);
        glove.mode = GestureMode::Both;
        c.upsert(glove);
        c.upsert(CatalogEntry::new("FIST", GestureKind::Static));
        assert_eq!(c.ids_for_mode(GestureMode::Glove), vec!["SWIPE_LEFT"]);
        assert_eq!(c.ids_for_mode(GestureMode::Bare), vec!["SWIPE_LEFT", "FIST"]);
    }

    #[test]
    fn test_from_sexp() {
        let v = lexpr::from_str(
            "((:id \"FIST\" :kind :static :mode :both :params (:cooldown-ms 200 :stable-frames 4) \
               :enable-when (:execution-enabled t :mouse-move-mode nil)) \
              (:kind :dynamic) \
              (:id \"V_SIGN\" :default-use :mouse-move-mode))",
        )
        .unwrap();
        let c = GestureCatalog::from_sexp(&v);
        assert_eq!(c.len(), 2);
        let fist = c.get("FIST").unwrap();
        assert_eq!(fist.mode, GestureMode::Both);
        assert_eq!(fist.params.cooldown_ms, Some(200));
        assert_eq!(fist.params.stable_frames, Some(4));
        assert_eq!(
            fist.enable_when,
            vec![
                ("execution_enabled".to_string(), true),
                ("mouse_move_mode".to_string(), false)
            ]
        );
        assert_eq!(c.mouse_mode_gesture_id(), "V_SIGN");
    }

    #[test]
    fn test_kind_and_mode_strings() {
        assert_eq!(GestureKind::from_str("composite"), Some(GestureKind::Composite));
        assert_eq!(GestureKind::State.as_str(), "state");
        assert_eq!(GestureMode::from_str("glove"), Some(GestureMode::Glove));
        assert!(GestureMode::Both.applies_to(GestureMode::Bare));
        assert!(!GestureMode::Glove.applies_to(GestureMode::Bare));
    }
}
