//! Frame source backed by the FFmpeg CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::command::{FfmpegCommand, FfmpegRunner};
use super::probe::{probe_frame_times, probe_video, VideoInfo};
use crate::cancel::CancelToken;
use crate::error::{EngineError, EngineResult};
use crate::source::{Frame, FrameCallbacks, FrameSource, FrameTiming, SourceId};

/// A local video file decoded one frame at a time.
///
/// Seeking only moves the read position; the frame is decoded by
/// [`FrameSource::capture_frame`].
#[derive(Debug)]
pub struct FfmpegSource {
    id: SourceId,
    path: PathBuf,
    info: Option<VideoInfo>,
    current_time: f64,
    runner: FfmpegRunner,
}

impl FfmpegSource {
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EngineError::FileNotFound(path.to_path_buf()));
        }
        Ok(Self {
            id: SourceId::new(path.to_string_lossy()),
            path: path.to_path_buf(),
            info: None,
            current_time: 0.0,
            runner: FfmpegRunner::new().with_timeout(Duration::from_secs(30)),
        })
    }

    /// Bound each frame decode.
    pub fn with_decode_timeout(mut self, timeout: Duration) -> Self {
        self.runner = self.runner.with_timeout(timeout);
        self
    }

    /// Kill an in-flight decode when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.runner = self.runner.with_cancel(cancel);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Probe results, once metadata has been loaded.
    pub fn info(&self) -> Option<&VideoInfo> {
        self.info.as_ref()
    }
}

#[async_trait]
impl FrameSource for FfmpegSource {
    fn source_id(&self) -> &SourceId {
        &self.id
    }

    async fn wait_for_metadata(&mut self) -> EngineResult<f64> {
        if let Some(info) = &self.info {
            return Ok(info.duration);
        }
        let info = probe_video(&self.path).await?;
        debug!(
            path = %self.path.display(),
            duration = info.duration,
            width = info.width,
            height = info.height,
            "Probed video"
        );
        let duration = info.duration;
        self.info = Some(info);
        Ok(duration)
    }

    async fn seek(&mut self, time: f64) -> EngineResult<()> {
        let upper = self.info.as_ref().map_or(f64::INFINITY, |info| info.duration);
        self.current_time = if time.is_finite() {
            time.clamp(0.0, upper.max(0.0))
        } else {
            0.0
        };
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    async fn capture_frame(&mut self) -> EngineResult<Frame> {
        let cmd = FfmpegCommand::to_stdout(&self.path)
            .seek(self.current_time)
            .single_frame()
            .png_pipe();
        let bytes = self.runner.output(&cmd).await?;
        if bytes.is_empty() {
            return Err(EngineError::frame_capture(format!(
                "no frame decoded at {:.3}s",
                self.current_time
            )));
        }
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }
}

/// Frame callbacks replayed from probed presentation timestamps.
///
/// Models real-time playback: each frame is presented at its own timestamp.
#[derive(Debug, Clone)]
pub struct ProbedFrameCallbacks {
    timings: std::vec::IntoIter<FrameTiming>,
}

impl ProbedFrameCallbacks {
    pub async fn probe(path: impl AsRef<Path>, count: usize) -> EngineResult<Self> {
        let times = probe_frame_times(path, count).await?;
        Ok(Self::from_times(times))
    }

    pub fn from_times(times: Vec<f64>) -> Self {
        let timings: Vec<FrameTiming> = times
            .into_iter()
            .map(|t| FrameTiming {
                now: t,
                media_time: t,
            })
            .collect();
        Self {
            timings: timings.into_iter(),
        }
    }
}

#[async_trait]
impl FrameCallbacks for ProbedFrameCallbacks {
    async fn next_frame(&mut self) -> Option<FrameTiming> {
        self.timings.next()
    }
}
