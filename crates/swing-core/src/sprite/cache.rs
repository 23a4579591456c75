//! Per-source sprite cache with a single in-flight generation.

use std::sync::Arc;

use futures::FutureExt;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info};

use super::generator::{GenerationOutcome, SpriteGenerator, SpriteSheet};
use super::handles::ResourceHandle;
use super::rasterizer::Rasterizer;
use crate::cancel::CancelToken;
use crate::error::{EngineError, EngineResult};
use crate::progress::{self, ProgressReceiver, SpriteProgress};
use crate::source::{FrameSource, SharedVideo, SourceId};

/// Snapshot of the cache for the active source.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteCache {
    pub source: SourceId,
    pub sprite: Option<ResourceHandle>,
    pub cues: Option<ResourceHandle>,
    pub progress: SpriteProgress,
    pub in_flight: bool,
}

/// Result of [`SpritePreview::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A sheet for this exact source already exists
    AlreadyBuilt,
    /// Generation for this source is running
    AlreadyRunning,
    /// A new generation was spawned
    Started,
}

#[derive(Debug)]
enum Settled {
    Ready(SpriteSheet),
    Failed(String),
    Cancelled,
}

#[derive(Debug)]
struct Active {
    source: SourceId,
    cancel: CancelToken,
    progress_rx: ProgressReceiver,
    progress: SpriteProgress,
    task: Option<JoinHandle<EngineResult<GenerationOutcome>>>,
    settled: Option<Settled>,
}

/// Owns the sprite for the currently active video source.
///
/// Switching sources cancels the in-flight generation, waits for it to
/// stop and releases every handle of the previous source before anything
/// new starts.
#[derive(Debug)]
pub struct SpritePreview<R: Rasterizer> {
    generator: Arc<SpriteGenerator<R>>,
    active: Option<Active>,
}

impl<R> SpritePreview<R>
where
    R: Rasterizer + 'static,
{
    pub fn new(generator: SpriteGenerator<R>) -> Self {
        Self {
            generator: Arc::new(generator),
            active: None,
        }
    }

    pub fn generator(&self) -> &SpriteGenerator<R> {
        &self.generator
    }

    /// Make sure a sprite exists (or is being built) for `video`.
    pub async fn request<S>(&mut self, video: &SharedVideo<S>) -> RequestOutcome
    where
        S: FrameSource + Sync + 'static,
    {
        if let Some(active) = self.active.as_mut() {
            if &active.source == video.source_id() {
                let _ = collect_finished(active);
                match &active.settled {
                    Some(Settled::Ready(_)) => return RequestOutcome::AlreadyBuilt,
                    None if active.task.is_some() => return RequestOutcome::AlreadyRunning,
                    // Failed or cancelled runs are retried
                    _ => {}
                }
            }
        }

        self.invalidate().await;
        self.start(video.clone());
        RequestOutcome::Started
    }

    fn start<S>(&mut self, video: SharedVideo<S>)
    where
        S: FrameSource + Sync + 'static,
    {
        let source = video.source_id().clone();
        let cancel = CancelToken::new();
        let (sender, progress_rx) = progress::channel(source.as_str());
        let generator = Arc::clone(&self.generator);
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            generator.generate(&video, &task_cancel, &sender).await
        });
        info!(source = %source, "Sprite generation started");

        self.active = Some(Active {
            source,
            cancel,
            progress_rx,
            progress: SpriteProgress::default(),
            task: Some(task),
            settled: None,
        });
    }

    /// Wait for the in-flight generation and return the sheet, if any.
    pub async fn wait(&mut self) -> EngineResult<Option<&SpriteSheet>> {
        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };
        if let Some(task) = active.task.take() {
            let joined = task.await;
            settle(active, joined)?;
        }
        refresh(active);
        match &active.settled {
            Some(Settled::Ready(sheet)) => Ok(Some(sheet)),
            _ => Ok(None),
        }
    }

    /// Latest progress for the active source.
    pub fn progress(&mut self) -> SpriteProgress {
        match self.active.as_mut() {
            Some(active) => {
                let _ = collect_finished(active);
                refresh(active);
                active.progress
            }
            None => SpriteProgress::default(),
        }
    }

    /// Current cache state, if a source is active.
    pub fn cache(&mut self) -> Option<SpriteCache> {
        let active = self.active.as_mut()?;
        let _ = collect_finished(active);
        refresh(active);
        let sheet = match &active.settled {
            Some(Settled::Ready(sheet)) => Some(sheet),
            _ => None,
        };
        Some(SpriteCache {
            source: active.source.clone(),
            sprite: sheet.map(|s| s.sprite),
            cues: sheet.map(|s| s.cues_handle),
            progress: active.progress,
            in_flight: active.task.is_some(),
        })
    }

    /// Last failure for the active source.
    pub fn failure(&self) -> Option<&str> {
        match self.active.as_ref()?.settled.as_ref()? {
            Settled::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Cancel any in-flight run, wait for it to stop, and release all handles.
    pub async fn invalidate(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        active.cancel.cancel();
        if let Some(task) = active.task.take() {
            // A run that finished before seeing the cancel still owns handles
            if let Ok(Ok(GenerationOutcome::Complete(sheet))) = task.await {
                sheet.release(self.generator.registry());
            }
        }
        if let Some(Settled::Ready(sheet)) = &active.settled {
            sheet.release(self.generator.registry());
        }
        debug!(source = %active.source, "Sprite cache invalidated");
    }

    pub async fn shutdown(&mut self) {
        self.invalidate().await;
    }
}

/// Move a finished task's result into `settled` without waiting.
fn collect_finished(active: &mut Active) -> EngineResult<()> {
    let joined = match active.task.as_mut() {
        Some(task) if task.is_finished() => task.now_or_never(),
        _ => None,
    };
    match joined {
        Some(joined) => {
            active.task = None;
            settle(active, joined)
        }
        None => Ok(()),
    }
}

fn settle(
    active: &mut Active,
    joined: Result<EngineResult<GenerationOutcome>, JoinError>,
) -> EngineResult<()> {
    let (settled, result) = match joined {
        Ok(Ok(GenerationOutcome::Complete(sheet))) => (Settled::Ready(sheet), Ok(())),
        Ok(Ok(GenerationOutcome::Cancelled)) => (Settled::Cancelled, Ok(())),
        Ok(Err(e)) => (Settled::Failed(e.to_string()), Err(e)),
        Err(e) => {
            let message = format!("sprite task failed: {e}");
            (
                Settled::Failed(message.clone()),
                Err(EngineError::internal(message)),
            )
        }
    };
    active.settled = Some(settled);
    result
}

/// Fold queued progress events. A ready sheet always reads as complete,
/// since the bounded channel may have dropped its last events.
fn refresh(active: &mut Active) {
    while let Some(event) = active.progress_rx.try_recv() {
        active.progress.apply(&event);
    }
    if let Some(Settled::Ready(sheet)) = &active.settled {
        let total = u32::try_from(sheet.cues.len()).unwrap_or(u32::MAX);
        active.progress = SpriteProgress {
            tiles_done: total,
            total_tiles: total,
        };
    }
}

impl<R: Rasterizer> Drop for SpritePreview<R> {
    fn drop(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        active.cancel.cancel();
        let _ = collect_finished(&mut active);
        let registry = self.generator.registry();
        if let Some(Settled::Ready(sheet)) = &active.settled {
            sheet.release(registry);
        }
        // Still running: release whatever it finishes with once it stops
        if let Some(task) = active.task.take() {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                let registry = registry.clone();
                runtime.spawn(async move {
                    if let Ok(Ok(GenerationOutcome::Complete(sheet))) = task.await {
                        sheet.release(&registry);
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpriteConfig;
    use crate::source::synthetic::SyntheticVideo;
    use crate::sprite::handles::HandleRegistry;
    use crate::sprite::rasterizer::{ImageRasterizer, SpriteFormat};
    use std::time::Duration;

    fn preview(registry: &HandleRegistry) -> SpritePreview<ImageRasterizer> {
        let config = SpriteConfig {
            count: 6,
            tile_width: 8,
            tile_height: 8,
            settle_delay: Duration::from_millis(10),
            ..SpriteConfig::default()
        };
        SpritePreview::new(SpriteGenerator::new(
            config,
            ImageRasterizer::new(SpriteFormat::Png),
            registry.clone(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_source_is_idempotent() {
        let registry = HandleRegistry::new();
        let mut preview = preview(&registry);
        let video = SharedVideo::new(SyntheticVideo::new("a.mp4", 6.0));

        assert_eq!(preview.request(&video).await, RequestOutcome::Started);
        assert_eq!(preview.request(&video).await, RequestOutcome::AlreadyRunning);
        assert!(preview.wait().await.unwrap().is_some());
        assert_eq!(preview.request(&video).await, RequestOutcome::AlreadyBuilt);
        assert_eq!(registry.live_count(), 2);

        let cache = preview.cache().unwrap();
        assert!(!cache.in_flight);
        assert_eq!(cache.progress.tiles_done, 6);
        assert!(cache.sprite.is_some());

        preview.shutdown().await;
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_change_releases_previous() {
        let registry = HandleRegistry::new();
        let mut preview = preview(&registry);
        let first = SharedVideo::new(SyntheticVideo::new("a.mp4", 6.0));
        let second = SharedVideo::new(SyntheticVideo::new("b.mp4", 3.0));

        preview.request(&first).await;
        preview.wait().await.unwrap();
        let old = preview.cache().unwrap();

        assert_eq!(preview.request(&second).await, RequestOutcome::Started);
        assert!(!registry.is_live(old.sprite.unwrap()));
        assert!(!registry.is_live(old.cues.unwrap()));

        let sheet = preview.wait().await.unwrap().unwrap();
        assert_eq!(sheet.source.as_str(), "b.mp4");
        assert_eq!(registry.live_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_change_cancels_in_flight_run() {
        let registry = HandleRegistry::new();
        let mut preview = preview(&registry);
        let stalled = SyntheticVideo::new("slow.mp4", 6.0).stall_seeks_after(1);
        let probe = stalled.listener_probe();
        let first = SharedVideo::new(stalled);
        let second = SharedVideo::new(SyntheticVideo::new("b.mp4", 3.0));

        preview.request(&first).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(first.is_leased());

        preview.request(&second).await;
        assert!(!first.is_leased());
        assert_eq!(probe.attached(), 0);

        assert!(preview.wait().await.unwrap().is_some());
        assert_eq!(registry.live_count(), 2);
        drop(preview);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_run_is_visible_without_wait() {
        let registry = HandleRegistry::new();
        let mut preview = preview(&registry);
        let video = SharedVideo::new(SyntheticVideo::new("a.mp4", 6.0));

        preview.request(&video).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let cache = preview.cache().unwrap();
        assert!(!cache.in_flight);
        assert!(cache.sprite.is_some());
        assert!(cache.cues.is_some());
        assert_eq!(preview.request(&video).await, RequestOutcome::AlreadyBuilt);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_unclaimed_sheet() {
        let registry = HandleRegistry::new();
        let mut preview = preview(&registry);
        let video = SharedVideo::new(SyntheticVideo::new("a.mp4", 6.0));

        preview.request(&video).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(registry.live_count(), 2);

        drop(preview);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_sheet_reports_full_progress() {
        let registry = HandleRegistry::new();
        let mut preview = SpritePreview::new(SpriteGenerator::new(
            SpriteConfig {
                count: 300,
                tile_width: 2,
                tile_height: 2,
                settle_delay: Duration::from_millis(1),
                ..SpriteConfig::default()
            },
            ImageRasterizer::new(SpriteFormat::Png),
            registry.clone(),
        ));
        let video = SharedVideo::new(SyntheticVideo::new("long.mp4", 30.0));

        preview.request(&video).await;
        let sheet = preview.wait().await.unwrap().unwrap();
        assert_eq!(sheet.cues.len(), 300);

        let expected = SpriteProgress {
            tiles_done: 300,
            total_tiles: 300,
        };
        assert_eq!(preview.cache().unwrap().progress, expected);
        assert_eq!(preview.progress(), expected);
        assert_eq!(preview.progress().fraction(), 1.0);
    }
}
