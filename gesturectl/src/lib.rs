//! gesturectl - hand-gesture classification, debounce and gating engine.
//!
//! Landmark sets (or glove blob features) go in once per inference tick;
//! debounced gesture events and pinch-scroll vectors come out.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod runtime;
pub mod sexp;
pub mod state;
pub mod vision;
