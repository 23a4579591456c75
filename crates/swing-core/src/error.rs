//! Error types for the timeline engine.

use std::path::PathBuf;
use std::time::Duration;

use swing_models::{DetectionKind, EventId};
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the engine.
///
/// Drag clamping, rejected drag starts and missing detection streams are
/// not errors; they degrade silently and never produce one of these.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Video metadata not available after {}ms", .0.as_millis())]
    MetadataTimeout(Duration),

    #[error("Seek to {time:.3}s did not complete within {}ms", .after.as_millis())]
    SeekTimeout { time: f64, after: Duration },

    #[error("Video element is leased by another operation")]
    VideoBusy,

    #[error("Frame capture failed: {0}")]
    FrameCapture(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("Invalid video: {0}")]
    InvalidVideo(String),

    #[error("Invalid event {id}: {reason}")]
    InvalidEvent { id: EventId, reason: String },

    #[error("Duplicate event id: {0}")]
    DuplicateEvent(EventId),

    #[error("Feed for {expected} received a {actual} detection")]
    FeedKindMismatch {
        expected: DetectionKind,
        actual: DetectionKind,
    },

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Only produced by low-level helpers; generation reports cancellation
    /// as an outcome instead.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Create an invalid event error.
    pub fn invalid_event(id: &EventId, reason: impl Into<String>) -> Self {
        Self::InvalidEvent {
            id: id.clone(),
            reason: reason.into(),
        }
    }

    /// Create a frame capture error.
    pub fn frame_capture(message: impl Into<String>) -> Self {
        Self::FrameCapture(message.into())
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error came from a bounded wait expiring.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::MetadataTimeout(_) | Self::SeekTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_messages() {
        let err = EngineError::MetadataTimeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "Video metadata not available after 10000ms");
        assert!(err.is_timeout());

        let err = EngineError::SeekTimeout {
            time: 1.5,
            after: Duration::from_millis(500),
        };
        assert_eq!(err.to_string(), "Seek to 1.500s did not complete within 500ms");
        assert!(err.is_timeout());

        assert!(!EngineError::VideoBusy.is_timeout());
    }
}
