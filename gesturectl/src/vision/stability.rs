//! Debounce: a raw label is confirmed only after it repeats on enough
//! consecutive frames.

/// Tracks the previous raw label and how many frames in a row it was seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StabilityFilter {
    last_raw: Option<String>,
    count: u32,
}

impl StabilityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw classification. Returns the label once it has been seen
    /// `stable_frames` times in a row. `None` is tracked but never confirmed.
    pub fn update(&mut self, raw: Option<&str>, stable_frames: u32) -> Option<String> {
        if raw == self.last_raw.as_deref() {
            self.count = self.count.saturating_add(1);
        } else {
            self.last_raw = raw.map(str::to_string);
            self.count = 1;
        }
        match &self.last_raw {
            Some(label) if self.count >= stable_frames => Some(label.clone()),
            _ => None,
        }
    }

    pub fn last_raw(&self) -> Option<&str> {
        self.last_raw.as_deref()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
