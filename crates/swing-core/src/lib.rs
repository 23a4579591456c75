#![deny(unreachable_patterns)]
//! Motion and event timeline engine for sports video analysis.
//!
//! This crate provides:
//! - Frame-rate detection and time/frame conversion
//! - Latest-wins multiplexing of pose, object and projectile detections
//! - Bounded per-joint trajectories and limb velocities
//! - Timeline event boundaries with pointer-driven drag editing
//! - Scrub-preview sprite sheets with WebVTT cues
//! - An FFmpeg-backed frame source for local files

pub mod cancel;
pub mod config;
pub mod detection;
pub mod error;
pub mod ffmpeg;
pub mod frame_clock;
pub mod kinematics;
pub mod metrics;
pub mod progress;
pub mod session;
pub mod source;
pub mod sprite;
pub mod timeline;
pub mod trajectory;

pub use cancel::CancelToken;
pub use config::{
    EngineConfig, FrameClockConfig, KinematicsConfig, SpriteConfig, TimelineConfig, TrackerConfig,
};
pub use detection::{DetectionFeed, DetectionMultiplexer, DetectionSnapshot, IngestOutcome};
pub use error::{EngineError, EngineResult};
pub use frame_clock::{detect_fps, FpsDetection, FpsSource, FrameClock};
pub use kinematics::{KinematicsEngine, MotionSample};
pub use progress::{ProgressEvent, ProgressReceiver, ProgressSender, SpriteProgress};
pub use session::{MotionSession, TickReport};
pub use source::{Frame, FrameCallbacks, FrameSource, FrameTiming, SharedVideo, SourceId};
pub use sprite::{
    GenerationOutcome, HandleRegistry, ImageRasterizer, Rasterizer, RequestOutcome,
    ResourceHandle, SpriteFormat, SpriteGenerator, SpritePreview, SpriteSheet,
};
pub use timeline::{DragPhase, HitTarget, PressOutcome, ReleaseOutcome, TimelineModel};
pub use trajectory::{Observation, TrajectoryTracker};
