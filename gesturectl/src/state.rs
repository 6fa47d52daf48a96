//! System state flags read by the engine and its collaborators.
//!
//! `mouse_move_mode` is the one field the engine writes; everything else is
//! owned by the host (toggle actions, UI, CLI).

use crate::sexp::bool_sexp;

/// Boolean switches consulted by `enable_when` clauses and output gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemState {
    /// Gesture recognition on/off.
    pub recognition_enabled: bool,
    /// Action execution on/off (recognition keeps running).
    pub execution_enabled: bool,
    /// Camera preview visible. Display only.
    pub camera_preview_enabled: bool,
    /// Camera device open and delivering frames.
    pub camera_device_enabled: bool,
    /// Pointer movement output allowed.
    pub mouse_move_output_enabled: bool,
    /// Written by the engine every tick: the mode gesture is confirmed.
    pub mouse_move_mode: bool,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            recognition_enabled: true,
            execution_enabled: true,
            camera_preview_enabled: true,
            camera_device_enabled: true,
            mouse_move_output_enabled: true,
            mouse_move_mode: false,
        }
    }
}

impl SystemState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a field by its config name (`recognition_enabled` or
    /// `recognition-enabled`). Unknown names return `None`.
    pub fn field(&self, name: &str) -> Option<bool> {
        match name.replace('-', "_").as_str() {
            "recognition_enabled" => Some(self.recognition_enabled),
            "execution_enabled" => Some(self.execution_enabled),
            "camera_preview_enabled" => Some(self.camera_preview_enabled),
            "camera_device_enabled" => Some(self.camera_device_enabled),
            "mouse_move_output_enabled" => Some(self.mouse_move_output_enabled),
            "mouse_move_mode" => Some(self.mouse_move_mode),
            _ => None,
        }
    }

    /// Whether pointer movement output should be active this tick.
    pub fn pointer_output_allowed(&self) -> bool {
        self.camera_device_enabled
            && self.recognition_enabled
            && self.execution_enabled
            && self.mouse_move_output_enabled
            && self.mouse_move_mode
    }

    /// Generate s-expression for status reporting.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:recognition-enabled {} :execution-enabled {} :camera-preview-enabled {} :camera-device-enabled {} :mouse-move-output-enabled {} :mouse-move-mode {})",
            bool_sexp(self.recognition_enabled),
            bool_sexp(self.execution_enabled),
            bool_sexp(self.camera_preview_enabled),
            bool_sexp(self.camera_device_enabled),
            bool_sexp(self.mouse_move_output_enabled),
            bool_sexp(self.mouse_move_mode),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = SystemState::new();
        assert!(s.recognition_enabled);
        assert!(s.execution_enabled);
        assert!(!s.mouse_move_mode);
    }

    #[test]
    fn test_field_lookup() {
        let mut s = SystemState::new();
        s.execution_enabled = false;
        assert_eq!(s.field("execution_enabled"), Some(false));
        assert_eq!(s.field("execution-enabled"), Some(false));
        assert_eq!(s.field("recognition_enabled"), Some(true));
        assert_eq!(s.field("no_such_flag"), None);
    }

    #[test]
    fn test_pointer_output_requires_mode() {
        let mut s = SystemState::new();
        assert!(!s.pointer_output_allowed());
        s.mouse_move_mode = true;
        assert!(s.pointer_output_allowed());
        s.mouse_move_output_enabled = false;
        assert!(!s.pointer_output_allowed());
    }

    #[test]
    fn test_status_sexp() {
        let sexp = SystemState::new().status_sexp();
        assert!(sexp.contains(":recognition-enabled t"));
        assert!(sexp.contains(":mouse-move-mode nil"));
    }
}
