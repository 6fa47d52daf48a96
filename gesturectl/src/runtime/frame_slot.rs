//! Single-slot frame handoff with overwrite-on-write.
//!
//! The producer never waits for the consumer: publishing over an untaken
//! frame replaces it and counts it as dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
pub struct LatestFrame<T> {
    slot: Mutex<Option<T>>,
    published: AtomicU64,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl<T> Default for LatestFrame<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }
}

impl<T> LatestFrame<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        // A panicked holder cannot leave the slot half-written.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `frame`, replacing any frame not yet taken.
    pub fn publish(&self, frame: T) {
        let replaced = self.lock().replace(frame).is_some();
        self.published.fetch_add(1, Ordering::Relaxed);
        if replaced {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Take the newest frame, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    /// Mark the producer as finished.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Frames overwritten before anyone took them.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
