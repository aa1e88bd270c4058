//! Canvas interaction engine
//!
//! Turns pointer, touch and wheel input into graph edits under a pan/zoom
//! coordinate system. The engine is synchronous and never fails: rejected
//! edits come back as a `CanvasOutcome`, not as errors.

pub mod engine;
pub mod gesture;
pub mod viewport;

pub use engine::CanvasEngine;
pub use gesture::{CanvasOutcome, DragMode, HitTarget, PointerButton, PointerEvent, Touch};
pub use viewport::Viewport;
