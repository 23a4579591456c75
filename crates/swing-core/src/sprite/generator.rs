//! Sprite sheet and cue file generation.

use std::time::Instant;

use tokio::time::timeout;
use tracing::{debug, info, info_span, warn, Instrument};

use swing_models::sprite::render_vtt;
use swing_models::{CueEntry, SpriteLayout};

use super::handles::{HandleRegistry, ResourceHandle};
use super::rasterizer::Rasterizer;
use crate::cancel::CancelToken;
use crate::config::SpriteConfig;
use crate::error::{EngineError, EngineResult};
use crate::metrics;
use crate::progress::ProgressSender;
use crate::source::{FrameSource, LeaseOwner, SharedVideo, SourceId};

/// A finished sprite sheet with its cue file.
///
/// Both handles stay live in the registry until [`SpriteSheet::release`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSheet {
    pub source: SourceId,
    pub sprite: ResourceHandle,
    pub cues_handle: ResourceHandle,
    pub layout: SpriteLayout,
    pub cues: Vec<CueEntry>,
    pub duration: f64,
    /// File extension matching the sprite encoding
    pub extension: &'static str,
}

impl SpriteSheet {
    /// Cue shown when hovering `time` on the scrub bar.
    pub fn tile_at(&self, time: f64) -> Option<&CueEntry> {
        if !time.is_finite() || time < 0.0 {
            return None;
        }
        if time >= self.duration {
            return self.cues.last();
        }
        let index = self.cues.partition_point(|cue| cue.end <= time);
        self.cues.get(index).filter(|cue| cue.contains(time))
    }

    /// Cue file text referencing `image_name` instead of the sprite handle.
    pub fn vtt_for(&self, image_name: &str) -> String {
        render_vtt(&self.cues, image_name)
    }

    /// Release both handles.
    pub fn release(&self, registry: &HandleRegistry) {
        registry.release(self.sprite);
        registry.release(self.cues_handle);
    }
}

/// How a generation run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Complete(SpriteSheet),
    /// Stopped by the cancel token; nothing was left allocated
    Cancelled,
}

impl GenerationOutcome {
    pub fn sheet(&self) -> Option<&SpriteSheet> {
        match self {
            GenerationOutcome::Complete(sheet) => Some(sheet),
            GenerationOutcome::Cancelled => None,
        }
    }
}

/// Produces scrub-preview sprites from a shared video.
#[derive(Debug)]
pub struct SpriteGenerator<R> {
    config: SpriteConfig,
    rasterizer: R,
    registry: HandleRegistry,
}

impl<R: Rasterizer> SpriteGenerator<R> {
    pub fn new(config: SpriteConfig, rasterizer: R, registry: HandleRegistry) -> Self {
        Self {
            config,
            rasterizer,
            registry,
        }
    }

    pub fn config(&self) -> &SpriteConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Generate a sprite sheet for `video`.
    ///
    /// Holds the video lease for the whole run. Timeouts are single-attempt
    /// errors; a cancel request ends the run with
    /// [`GenerationOutcome::Cancelled`] and drops the partial surface.
    pub async fn generate<S: FrameSource>(
        &self,
        video: &SharedVideo<S>,
        cancel: &CancelToken,
        progress: &ProgressSender,
    ) -> EngineResult<GenerationOutcome> {
        let span = info_span!("sprite_generation", source = %video.source_id());
        let result = self.run(video, cancel, progress).instrument(span).await;

        match &result {
            Ok(GenerationOutcome::Cancelled) => metrics::record_sprite_cancelled(),
            Ok(GenerationOutcome::Complete(_)) => {}
            Err(e) => {
                warn!(source = %video.source_id(), error = %e, "Sprite generation failed");
                metrics::record_sprite_failed(failure_reason(e));
                progress.sprite_failed(e.to_string());
            }
        }
        result
    }

    async fn run<S: FrameSource>(
        &self,
        video: &SharedVideo<S>,
        cancel: &CancelToken,
        progress: &ProgressSender,
    ) -> EngineResult<GenerationOutcome> {
        let started = Instant::now();
        let config = &self.config;

        let Some(mut lease) = cancel.run(video.lease(LeaseOwner::SpriteGeneration)).await else {
            return Ok(cancelled(progress, 0));
        };

        let duration = match cancel
            .run(timeout(config.metadata_timeout, lease.wait_for_metadata()))
            .await
        {
            None => return Ok(cancelled(progress, 0)),
            Some(Err(_)) => return Err(EngineError::MetadataTimeout(config.metadata_timeout)),
            Some(Ok(duration)) => duration?,
        };
        if !duration.is_finite() || duration <= 0.0 {
            return Err(EngineError::InvalidVideo(format!(
                "duration {duration} is not positive"
            )));
        }

        let count = config.count.max(1);
        let layout = SpriteLayout::for_count(count, config.tile_width, config.tile_height);
        let interval = duration / f64::from(count);
        let mut surface = self
            .rasterizer
            .create_surface(layout.sheet_width(), layout.sheet_height())?;
        let mut cues = Vec::with_capacity(count as usize);

        info!(
            duration,
            tiles = count,
            columns = layout.columns,
            rows = layout.rows,
            "Generating sprite sheet"
        );
        progress.sprite_started(count, duration, layout);

        for index in 0..count {
            if cancel.is_cancelled() {
                return Ok(cancelled(progress, index));
            }
            let timestamp = f64::from(index) * interval;

            match cancel
                .run(timeout(config.seek_timeout, lease.seek(timestamp)))
                .await
            {
                None => return Ok(cancelled(progress, index)),
                Some(Err(_)) => {
                    return Err(EngineError::SeekTimeout {
                        time: timestamp,
                        after: config.seek_timeout,
                    })
                }
                Some(Ok(seeked)) => seeked?,
            }

            if !config.settle_delay.is_zero()
                && cancel
                    .run(tokio::time::sleep(config.settle_delay))
                    .await
                    .is_none()
            {
                return Ok(cancelled(progress, index));
            }

            let frame = match lease.capture_frame().await {
                // The decoder was killed by the same cancel request
                Err(EngineError::Cancelled) => return Ok(cancelled(progress, index)),
                other => other?,
            };
            let rect = layout.tile_rect(index);
            self.rasterizer.draw_tile(&mut surface, &frame, rect)?;

            // The last cue absorbs rounding so the cues sum to the duration
            let end = if index + 1 == count {
                duration
            } else {
                f64::from(index + 1) * interval
            };
            cues.push(CueEntry {
                start: timestamp,
                end,
                rect,
            });
            progress.tile_rendered(index + 1, count);
            debug!(tile = index, timestamp, "Tile rendered");
        }

        // Scrubbing may resume while the sheet is encoded
        drop(lease);

        let encoded = self.rasterizer.encode(surface)?;
        if cancel.is_cancelled() {
            return Ok(cancelled(progress, count));
        }

        let sprite = self.registry.create(encoded.bytes, encoded.mime);
        let vtt = render_vtt(&cues, &sprite.to_string());
        let cues_handle = self.registry.create(vtt.into_bytes(), "text/vtt");

        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_sprite_generated(count, elapsed);
        progress.sprite_complete(count);
        info!(
            tiles = count,
            sprite = %sprite,
            elapsed_ms = (elapsed * 1000.0) as u64,
            "Sprite sheet ready"
        );

        Ok(GenerationOutcome::Complete(SpriteSheet {
            source: video.source_id().clone(),
            sprite,
            cues_handle,
            layout,
            cues,
            duration,
            extension: encoded.extension,
        }))
    }
}

fn cancelled(progress: &ProgressSender, tiles_done: u32) -> GenerationOutcome {
    info!(tiles_done, "Sprite generation cancelled");
    progress.sprite_cancelled(tiles_done);
    GenerationOutcome::Cancelled
}

fn failure_reason(error: &EngineError) -> &'static str {
    match error {
        EngineError::MetadataTimeout(_) => "metadata_timeout",
        EngineError::SeekTimeout { .. } => "seek_timeout",
        EngineError::FrameCapture(_) => "capture",
        EngineError::Encode(_) | EngineError::Image(_) => "encode",
        EngineError::InvalidVideo(_) => "invalid_video",
        _ => "other",
    }
}
