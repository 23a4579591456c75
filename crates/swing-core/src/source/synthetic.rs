//! Synthetic video and frame clock for deterministic runs.
//!
//! [`SyntheticVideo`] renders a solid frame whose colour encodes the
//! presented time, so a tile can be traced back to the timestamp it was
//! captured at. Seek listeners are counted so callers can verify that an
//! aborted seek leaves nothing attached.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::Rgba;

use super::{Frame, FrameCallbacks, FrameSource, FrameTiming, SourceId};
use crate::error::{EngineError, EngineResult};

/// Shared counter of seek listeners currently attached to a video.
#[derive(Debug, Clone, Default)]
pub struct ListenerProbe(Arc<AtomicUsize>);

impl ListenerProbe {
    pub fn attached(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn attach(&self) -> ListenerGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        ListenerGuard(Arc::clone(&self.0))
    }
}

/// Detaches its listener when dropped, including when a seek is abandoned.
struct ListenerGuard(Arc<AtomicUsize>);

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory stand-in for a video element.
#[derive(Debug)]
pub struct SyntheticVideo {
    id: SourceId,
    duration: Option<f64>,
    width: u32,
    height: u32,
    metadata_delay: Duration,
    seek_latency: Duration,
    /// Seeks at or after this index never complete
    stall_after: Option<usize>,
    current_time: f64,
    seeks_issued: usize,
    listeners: ListenerProbe,
}

impl SyntheticVideo {
    /// A 320x180 video of the given duration with instant metadata and seeks.
    pub fn new(id: impl Into<String>, duration: f64) -> Self {
        Self {
            id: SourceId::new(id),
            duration: Some(duration),
            width: 320,
            height: 180,
            metadata_delay: Duration::ZERO,
            seek_latency: Duration::ZERO,
            stall_after: None,
            current_time: 0.0,
            seeks_issued: 0,
            listeners: ListenerProbe::default(),
        }
    }

    /// A video whose metadata never loads.
    pub fn without_metadata(id: impl Into<String>) -> Self {
        Self {
            duration: None,
            ..Self::new(id, 0.0)
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    pub fn with_metadata_delay(mut self, delay: Duration) -> Self {
        self.metadata_delay = delay;
        self
    }

    pub fn with_seek_latency(mut self, latency: Duration) -> Self {
        self.seek_latency = latency;
        self
    }

    /// Make every seek from the `index`-th on hang forever.
    pub fn stall_seeks_after(mut self, index: usize) -> Self {
        self.stall_after = Some(index);
        self
    }

    /// Handle for observing attached seek listeners after the video is shared.
    pub fn listener_probe(&self) -> ListenerProbe {
        self.listeners.clone()
    }

    /// Red channel used for a frame presented at `time`.
    pub fn shade_for(time: f64) -> u8 {
        ((time * 10.0).round() as i64).rem_euclid(256) as u8
    }
}

#[async_trait]
impl FrameSource for SyntheticVideo {
    fn source_id(&self) -> &SourceId {
        &self.id
    }

    async fn wait_for_metadata(&mut self) -> EngineResult<f64> {
        match self.duration {
            Some(duration) => {
                tokio::time::sleep(self.metadata_delay).await;
                Ok(duration)
            }
            None => std::future::pending().await,
        }
    }

    async fn seek(&mut self, time: f64) -> EngineResult<()> {
        let _listener = self.listeners.attach();
        let index = self.seeks_issued;
        self.seeks_issued += 1;

        if self.stall_after.is_some_and(|stall| index >= stall) {
            std::future::pending::<()>().await;
        }

        tokio::time::sleep(self.seek_latency).await;
        let upper = self.duration.unwrap_or(0.0).max(0.0);
        self.current_time = time.clamp(0.0, upper);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    async fn capture_frame(&mut self) -> EngineResult<Frame> {
        if self.duration.is_none() {
            return Err(EngineError::frame_capture("no frame presented yet"));
        }
        let shade = Self::shade_for(self.current_time);
        Ok(Frame::from_pixel(
            self.width,
            self.height,
            Rgba([shade, 64, 128, 255]),
        ))
    }
}

/// Scripted frame-presentation callbacks.
#[derive(Debug, Clone)]
pub struct SyntheticFrameCallbacks {
    timings: std::vec::IntoIter<FrameTiming>,
    supported: bool,
    interval: Duration,
}

impl SyntheticFrameCallbacks {
    /// `count` callbacks at exactly `fps`, wall and media time in lockstep.
    pub fn fixed_rate(fps: f64, count: usize) -> Self {
        let timings = (0..count)
            .map(|i| {
                let t = i as f64 / fps;
                FrameTiming {
                    now: 10.0 + t,
                    media_time: t,
                }
            })
            .collect();
        Self::from_timings(timings)
    }

    /// Replay the given timings in order.
    pub fn from_timings(timings: Vec<FrameTiming>) -> Self {
        Self {
            timings: timings.into_iter(),
            supported: true,
            interval: Duration::ZERO,
        }
    }

    /// A platform without a frame-presentation primitive.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::from_timings(Vec::new())
        }
    }

    /// Wait this long before delivering each callback.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[async_trait]
impl FrameCallbacks for SyntheticFrameCallbacks {
    fn supported(&self) -> bool {
        self.supported
    }

    async fn next_frame(&mut self) -> Option<FrameTiming> {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
        self.timings.next()
    }
}
