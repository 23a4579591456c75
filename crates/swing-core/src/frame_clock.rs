//! Frame clock and FPS auto-detection.
//!
//! Playback time is continuous; detections and trajectories are keyed by
//! integer frame index. The clock converts between the two with
//! `frame = round(time × fps)`.
//!
//! FPS detection samples frame-presentation callbacks after playback
//! starts. With `sample_count` callbacks collected it estimates
//! `frames / elapsed wall time`, refines the estimate from media-time
//! deltas when enough distinct deltas exist, and snaps the result to the
//! nearest canonical rate to absorb scheduler jitter. It never fails: an
//! unsupported platform, a video that ends early, or a cancel request all
//! fall back to the configured default.

use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::config::FrameClockConfig;
use crate::metrics;
use crate::progress::ProgressSender;
use crate::source::{FrameCallbacks, FrameTiming};

/// Rates the estimate is snapped to.
pub const CANONICAL_FPS: [u32; 7] = [24, 25, 30, 48, 50, 60, 120];

/// Where an FPS value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpsSource {
    /// Measured from frame callbacks
    Detected,
    /// Platform has no frame-presentation primitive
    Unsupported,
    /// Playback ended before enough samples arrived
    Incomplete,
    /// Detection was cancelled
    Cancelled,
    /// Explicitly configured
    Fixed,
}

/// Result of FPS detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsDetection {
    pub fps: u32,
    pub source: FpsSource,
    /// Callbacks observed
    pub samples: usize,
    /// Estimate before snapping, when one was computed
    pub raw_estimate: Option<f64>,
}

impl FpsDetection {
    fn fallback(config: &FrameClockConfig, source: FpsSource, samples: usize) -> Self {
        Self {
            fps: config.default_fps,
            source,
            samples,
            raw_estimate: None,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.source == FpsSource::Detected
    }
}

/// Snap a measured rate to the nearest canonical rate.
pub fn snap_to_canonical(estimate: f64) -> u32 {
    CANONICAL_FPS
        .iter()
        .copied()
        .min_by(|a, b| {
            let da = (f64::from(*a) - estimate).abs();
            let db = (f64::from(*b) - estimate).abs();
            da.total_cmp(&db)
        })
        .unwrap_or(30)
}

/// Estimate the rate from collected callback timings.
///
/// Returns `None` when the timings span no wall time.
pub fn estimate_fps(samples: &[FrameTiming], min_media_samples: usize) -> Option<f64> {
    let (first, last) = (samples.first()?, samples.last()?);
    let elapsed = last.now - first.now;
    if samples.len() < 2 || elapsed.is_nan() || elapsed <= 0.0 {
        return None;
    }
    let wall_estimate = (samples.len() - 1) as f64 / elapsed;

    // Repeated presentations of the same media frame carry no rate information
    let media_deltas: Vec<f64> = samples
        .windows(2)
        .map(|pair| pair[1].media_time - pair[0].media_time)
        .filter(|delta| *delta > 0.0)
        .collect();

    if media_deltas.len() >= min_media_samples.max(1) {
        let mean = media_deltas.iter().sum::<f64>() / media_deltas.len() as f64;
        if mean > 0.0 {
            return Some(1.0 / mean);
        }
    }

    Some(wall_estimate)
}

/// Sample frame callbacks and settle on an FPS.
pub async fn detect_fps<C>(
    callbacks: &mut C,
    config: &FrameClockConfig,
    cancel: &CancelToken,
    progress: &ProgressSender,
) -> FpsDetection
where
    C: FrameCallbacks + ?Sized,
{
    let detection = sample_and_estimate(callbacks, config, cancel).await;

    match detection.source {
        FpsSource::Detected => info!(
            fps = detection.fps,
            raw = ?detection.raw_estimate,
            samples = detection.samples,
            "Detected playback FPS"
        ),
        source => debug!(
            fps = detection.fps,
            ?source,
            samples = detection.samples,
            "FPS detection fell back to default"
        ),
    }
    metrics::record_fps(detection.fps, detection.is_detected());
    progress.fps_detected(detection.fps, detection.is_detected());

    detection
}

async fn sample_and_estimate<C>(
    callbacks: &mut C,
    config: &FrameClockConfig,
    cancel: &CancelToken,
) -> FpsDetection
where
    C: FrameCallbacks + ?Sized,
{
    if !callbacks.supported() {
        return FpsDetection::fallback(config, FpsSource::Unsupported, 0);
    }

    let wanted = config.sample_count.max(2);
    let mut samples = Vec::with_capacity(wanted);

    while samples.len() < wanted {
        if cancel.is_cancelled() {
            return FpsDetection::fallback(config, FpsSource::Cancelled, samples.len());
        }
        match cancel.run(callbacks.next_frame()).await {
            None => return FpsDetection::fallback(config, FpsSource::Cancelled, samples.len()),
            Some(None) => {
                return FpsDetection::fallback(config, FpsSource::Incomplete, samples.len())
            }
            Some(Some(timing)) => samples.push(timing),
        }
    }

    match estimate_fps(&samples, config.min_media_samples) {
        Some(raw) => FpsDetection {
            fps: snap_to_canonical(raw),
            source: FpsSource::Detected,
            samples: samples.len(),
            raw_estimate: Some(raw),
        },
        None => FpsDetection::fallback(config, FpsSource::Incomplete, samples.len()),
    }
}

/// Converts between playback time and frame index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    fps: u32,
    source: FpsSource,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::fixed(FrameClockConfig::default().default_fps)
    }
}

impl FrameClock {
    /// A clock running at a known rate.
    pub fn fixed(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            source: FpsSource::Fixed,
        }
    }

    /// Adopt the result of [`detect_fps`].
    pub fn apply(&mut self, detection: &FpsDetection) {
        self.fps = detection.fps.max(1);
        self.source = detection.source;
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn source(&self) -> FpsSource {
        self.source
    }

    /// Frame index presented at `time` seconds.
    pub fn frame_at(&self, time: f64) -> u64 {
        if !time.is_finite() || time <= 0.0 {
            return 0;
        }
        (time * f64::from(self.fps)).round() as u64
    }

    /// Start time of `frame`, in seconds.
    pub fn time_for_frame(&self, frame: u64) -> f64 {
        frame as f64 / f64::from(self.fps)
    }

    /// Time of the frame `delta` frames away from the one shown at `time`.
    pub fn step(&self, time: f64, delta: i64) -> f64 {
        let frame = self.frame_at(time) as i64;
        let target = (frame + delta).max(0) as u64;
        self.time_for_frame(target)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration(&self) -> f64 {
        1.0 / f64::from(self.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::noop_sender;
    use crate::source::synthetic::SyntheticFrameCallbacks;
    use std::time::Duration;

    fn config() -> FrameClockConfig {
        FrameClockConfig::default()
    }

    #[tokio::test]
    async fn test_sixty_fps_callbacks_converge_to_sixty() {
        let mut callbacks = SyntheticFrameCallbacks::fixed_rate(60.0, 120);
        let detection =
            detect_fps(&mut callbacks, &config(), &CancelToken::new(), &noop_sender()).await;

        assert_eq!(detection.fps, 60);
        assert_eq!(detection.source, FpsSource::Detected);
        assert_eq!(detection.samples, 30);
        assert!((detection.raw_estimate.unwrap() - 60.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_jitter_snaps_to_canonical_rate() {
        // 25 fps media with +-3ms wall-clock jitter
        let timings = (0..30)
            .map(|i| {
                let jitter = if i % 2 == 0 { 0.003 } else { -0.003 };
                FrameTiming {
                    now: i as f64 * 0.04 + jitter,
                    media_time: i as f64 * 0.04,
                }
            })
            .collect();
        let mut callbacks = SyntheticFrameCallbacks::from_timings(timings);
        let detection =
            detect_fps(&mut callbacks, &config(), &CancelToken::new(), &noop_sender()).await;
        assert_eq!(detection.fps, 25);
    }

    #[tokio::test]
    async fn test_media_time_refines_refresh_rate_callbacks() {
        // Callbacks at 60 Hz display refresh, media advancing at 30 fps
        let timings = (0..30)
            .map(|i| FrameTiming {
                now: i as f64 / 60.0,
                media_time: (i / 2) as f64 / 30.0,
            })
            .collect();
        let mut callbacks = SyntheticFrameCallbacks::from_timings(timings);
        let detection =
            detect_fps(&mut callbacks, &config(), &CancelToken::new(), &noop_sender()).await;
        assert_eq!(detection.fps, 30);
    }

    #[tokio::test]
    async fn test_unsupported_falls_back() {
        let mut callbacks = SyntheticFrameCallbacks::unsupported();
        let detection =
            detect_fps(&mut callbacks, &config(), &CancelToken::new(), &noop_sender()).await;
        assert_eq!(detection.fps, 30);
        assert_eq!(detection.source, FpsSource::Unsupported);
    }

    #[tokio::test]
    async fn test_video_ending_early_falls_back() {
        let mut callbacks = SyntheticFrameCallbacks::fixed_rate(60.0, 12);
        let detection =
            detect_fps(&mut callbacks, &config(), &CancelToken::new(), &noop_sender()).await;
        assert_eq!(detection.fps, 30);
        assert_eq!(detection.source, FpsSource::Incomplete);
        assert_eq!(detection.samples, 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_sampling() {
        let mut callbacks = SyntheticFrameCallbacks::fixed_rate(60.0, 120)
            .with_interval(Duration::from_millis(16));
        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let detection = detect_fps(&mut callbacks, &config(), &cancel, &noop_sender()).await;
        assert_eq!(detection.source, FpsSource::Cancelled);
        assert_eq!(detection.fps, 30);
        assert!(detection.samples < 30);
    }

    #[test]
    fn test_snap_to_canonical() {
        assert_eq!(snap_to_canonical(23.976), 24);
        assert_eq!(snap_to_canonical(29.97), 30);
        assert_eq!(snap_to_canonical(59.2), 60);
        assert_eq!(snap_to_canonical(49.0), 50);
        assert_eq!(snap_to_canonical(240.0), 120);
    }

    #[test]
    fn test_frame_index_math() {
        let clock = FrameClock::fixed(30);
        assert_eq!(clock.frame_at(0.0), 0);
        assert_eq!(clock.frame_at(1.0), 30);
        assert_eq!(clock.frame_at(1.016), 30);
        assert_eq!(clock.frame_at(1.02), 31);
        assert_eq!(clock.frame_at(-2.0), 0);
        assert!((clock.time_for_frame(45) - 1.5).abs() < 1e-9);
        assert!((clock.step(1.0, 3) - 1.1).abs() < 1e-9);
        assert_eq!(clock.step(0.0, -5), 0.0);
    }

    #[test]
    fn test_apply_detection() {
        let mut clock = FrameClock::default();
        clock.apply(&FpsDetection {
            fps: 60,
            source: FpsSource::Detected,
            samples: 30,
            raw_estimate: Some(59.9),
        });
        assert_eq!(clock.fps(), 60);
        assert_eq!(clock.source(), FpsSource::Detected);
    }
}
