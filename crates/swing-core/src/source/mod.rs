//! Video source capabilities.
//!
//! The engine never talks to a browser video element or a decoder
//! directly. It drives a [`FrameSource`] (seek + rasterize the presented
//! frame) and, for FPS detection, a [`FrameCallbacks`] stream of
//! frame-presentation timings. Implementations:
//!
//! | Source | Use |
//! |--------|-----|
//! | [`synthetic::SyntheticVideo`] | Deterministic tests and demos |
//! | [`crate::ffmpeg::FfmpegSource`] | Local files decoded through the FFmpeg CLI |
//!
//! A video is a single exclusively-driven resource. [`SharedVideo`] enforces
//! that with a lease: sprite generation holds it for a whole run, while
//! user scrubbing uses [`SharedVideo::try_scrub`] and fails fast with
//! [`EngineError::VideoBusy`] instead of racing the generator's seeks.

pub mod synthetic;

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// A decoded video frame.
pub type Frame = image::RgbaImage;

/// Exact identity of a video source (URL or path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Seekable video that can rasterize its presented frame.
#[async_trait]
pub trait FrameSource: Send {
    /// Identity used for cache keying.
    fn source_id(&self) -> &SourceId;

    /// Resolves with the duration in seconds once metadata has loaded.
    ///
    /// May never resolve; callers bound the wait.
    async fn wait_for_metadata(&mut self) -> EngineResult<f64>;

    /// Seek and resolve on the seek-completed signal.
    ///
    /// Dropping the returned future must detach any listener it attached.
    async fn seek(&mut self, time: f64) -> EngineResult<()>;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Rasterize the currently presented frame.
    async fn capture_frame(&mut self) -> EngineResult<Frame>;
}

/// Timing reported by one frame-presentation callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    /// Wall-clock time of presentation, in seconds
    pub now: f64,
    /// Media time of the presented frame, in seconds
    pub media_time: f64,
}

/// Stream of frame-presentation callbacks during playback.
#[async_trait]
pub trait FrameCallbacks: Send {
    /// Whether the platform offers a frame-presentation primitive at all.
    fn supported(&self) -> bool {
        true
    }

    /// Next presented frame, or `None` once playback has ended.
    async fn next_frame(&mut self) -> Option<FrameTiming>;
}

/// Who currently drives the shared video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseOwner {
    SpriteGeneration,
    Scrub,
}

/// A frame source shared between the sprite generator and user scrubbing.
pub struct SharedVideo<S> {
    id: SourceId,
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedVideo<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: FrameSource> SharedVideo<S> {
    pub fn new(source: S) -> Self {
        Self {
            id: source.source_id().clone(),
            inner: Arc::new(Mutex::new(source)),
        }
    }

    pub fn source_id(&self) -> &SourceId {
        &self.id
    }

    /// Wait for exclusive use of the video.
    pub async fn lease(&self, owner: LeaseOwner) -> VideoLease<S> {
        let guard = Arc::clone(&self.inner).lock_owned().await;
        debug!(source = %self.id, ?owner, "Video leased");
        VideoLease { guard, owner }
    }

    /// Take the video only if nobody else holds it.
    pub fn try_lease(&self, owner: LeaseOwner) -> EngineResult<VideoLease<S>> {
        let guard = Arc::clone(&self.inner)
            .try_lock_owned()
            .map_err(|_| EngineError::VideoBusy)?;
        Ok(VideoLease { guard, owner })
    }

    pub fn is_leased(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Seek on behalf of the user, failing fast while generation owns the video.
    pub async fn try_scrub(&self, time: f64) -> EngineResult<()> {
        let mut lease = self.try_lease(LeaseOwner::Scrub)?;
        lease.seek(time).await
    }
}

/// Exclusive access to a [`SharedVideo`]; released on drop.
pub struct VideoLease<S> {
    guard: OwnedMutexGuard<S>,
    owner: LeaseOwner,
}

impl<S> VideoLease<S> {
    pub fn owner(&self) -> LeaseOwner {
        self.owner
    }
}

impl<S> Deref for VideoLease<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.guard
    }
}

impl<S> DerefMut for VideoLease<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.guard
    }
}
