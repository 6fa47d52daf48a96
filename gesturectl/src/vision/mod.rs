//! Hand geometry, classification and the per-frame gesture engine.

pub mod classifier;
pub mod cooldown;
pub mod gesture;
pub mod landmarks;
pub mod primitives;
pub mod scroll;
pub mod stability;
pub mod swipe;
pub mod template;
pub mod track_window;

pub use gesture::{FrameOutput, GestureEngine};
pub use landmarks::{BlobFeatures, LandmarkSet};
