//! Per-event-key cooldowns.

use std::collections::HashMap;

/// Last successful fire time per event key, in engine milliseconds.
///
/// Keys are added lazily; a key that never fired is always ready.
#[derive(Debug, Clone, Default)]
pub struct CooldownRegistry {
    last_fire_ms: HashMap<String, u64>,
}

impl CooldownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` may fire at `now_ms` under `cooldown_ms`.
    pub fn is_ready(&self, key: &str, cooldown_ms: u64, now_ms: u64) -> bool {
        match self.last_fire_ms.get(key) {
            Some(&last) => now_ms.saturating_sub(last) >= cooldown_ms,
            None => true,
        }
    }

    /// Check and, when ready, record a fire at `now_ms`. Returns whether it fired.
    pub fn try_fire(&mut self, key: &str, cooldown_ms: u64, now_ms: u64) -> bool {
        if !self.is_ready(key, cooldown_ms, now_ms) {
            return false;
        }
        self.last_fire_ms.insert(key.to_string(), now_ms);
        true
    }

    pub fn last_fire(&self, key: &str) -> Option<u64> {
        self.last_fire_ms.get(key).copied()
    }

    pub fn clear(&mut self) {
        self.last_fire_ms.clear();
    }
}
