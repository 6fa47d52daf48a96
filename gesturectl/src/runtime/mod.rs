//! Runtime collaborators of the engine: the latest-frame handoff from the
//! capture side and the pointer output worker.

pub mod frame_slot;
pub mod pointer;

pub use frame_slot::LatestFrame;
pub use pointer::{LogPointerSink, PointerMapper, PointerSink, PointerTarget, PointerWorker};
