//! Timeline event model and boundary editing.

mod drag;
mod model;

pub use drag::{DragPhase, DragSession, HitTarget, PressOutcome, PressRejection, ReleaseOutcome};
pub use model::{TimelineModel, TrackGeometry};
