//! Shared data models for the swing timeline engine.
//!
//! This crate provides Serde-serializable types for:
//! - Timeline events, boundary adjustments and effective boundaries
//! - Pose / object / projectile detection payloads
//! - Tracked joints, trajectory points and velocity samples
//! - Sprite sheet layout and scrub-preview cues

pub mod detection;
pub mod event;
pub mod joint;
pub mod motion;
pub mod sprite;
pub mod timestamp;

// Re-export common types
pub use detection::{
    BoundingBox, DetectedObject, Detection, DetectionKind, FrameDetection, Keypoint,
    ObjectResult, PosePerson, PoseResult, ProjectileResult,
};
pub use event::{BoundaryAdjustment, Edge, EffectiveBoundaries, EventId, EventKind, TimelineEvent};
pub use joint::{JointId, Side, TrackedPoint};
pub use motion::{SpeedUnit, TrajectoryPoint, VelocitySample};
pub use sprite::{CueEntry, SpriteLayout, TileRect};
