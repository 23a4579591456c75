//! Progress reporting for long-running engine tasks.
//!
//! Tasks emit [`ProgressEvent`]s through a [`ProgressSender`] without being
//! coupled to whoever listens (player UI, CLI logging, tests). Sending never
//! blocks: when the channel is full the event is dropped.

use tokio::sync::mpsc;

use swing_models::sprite::SpriteLayout;

/// Progress event emitted by sprite generation and FPS detection.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Sprite generation acquired the video and read its duration
    SpriteStarted {
        total_tiles: u32,
        duration: f64,
        layout: SpriteLayout,
    },

    /// Tile `index` (1-based) has been rasterized
    TileRendered { index: u32, total_tiles: u32 },

    /// Sprite sheet and cue file are ready
    SpriteComplete { total_tiles: u32 },

    /// Generation stopped because of a cancel request
    SpriteCancelled { tiles_done: u32 },

    /// Generation failed
    SpriteFailed { error: String },

    /// FPS detection finished
    FpsDetected { fps: u32, detected: bool },
}

/// Sender half handed to tasks.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<ProgressEvent>,
    label: String,
}

impl ProgressSender {
    pub fn new(tx: mpsc::Sender<ProgressEvent>, label: impl Into<String>) -> Self {
        Self {
            tx,
            label: label.into(),
        }
    }

    /// Label identifying the task (usually the source identity).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Send a progress event (non-blocking).
    pub fn send(&self, event: ProgressEvent) {
        // try_send drops the event when the receiver lags
        let _ = self.tx.try_send(event);
    }

    pub fn sprite_started(&self, total_tiles: u32, duration: f64, layout: SpriteLayout) {
        self.send(ProgressEvent::SpriteStarted {
            total_tiles,
            duration,
            layout,
        });
    }

    pub fn tile_rendered(&self, index: u32, total_tiles: u32) {
        self.send(ProgressEvent::TileRendered { index, total_tiles });
    }

    pub fn sprite_complete(&self, total_tiles: u32) {
        self.send(ProgressEvent::SpriteComplete { total_tiles });
    }

    pub fn sprite_cancelled(&self, tiles_done: u32) {
        self.send(ProgressEvent::SpriteCancelled { tiles_done });
    }

    pub fn sprite_failed(&self, error: impl Into<String>) {
        self.send(ProgressEvent::SpriteFailed {
            error: error.into(),
        });
    }

    pub fn fps_detected(&self, fps: u32, detected: bool) {
        self.send(ProgressEvent::FpsDetected { fps, detected });
    }
}

/// Receiver half for collecting events.
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::Receiver<ProgressEvent>,
}

impl ProgressReceiver {
    /// Receive the next progress event.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Try to receive a progress event without blocking.
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.rx.try_recv().ok()
    }
}

/// Create a progress channel pair.
pub fn channel(label: impl Into<String>) -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::channel(256);
    (ProgressSender::new(tx, label), ProgressReceiver { rx })
}

/// A sender whose events go nowhere.
pub fn noop_sender() -> ProgressSender {
    let (tx, _rx) = mpsc::channel(1);
    ProgressSender::new(tx, "noop")
}

/// Tile counters folded from progress events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpriteProgress {
    pub tiles_done: u32,
    pub total_tiles: u32,
}

impl SpriteProgress {
    /// Fold one event into the counters.
    pub fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::SpriteStarted { total_tiles, .. } => {
                self.total_tiles = *total_tiles;
                self.tiles_done = 0;
            }
            ProgressEvent::TileRendered { index, total_tiles } => {
                self.total_tiles = *total_tiles;
                self.tiles_done = self.tiles_done.max(*index);
            }
            ProgressEvent::SpriteComplete { total_tiles } => {
                self.total_tiles = *total_tiles;
                self.tiles_done = *total_tiles;
            }
            _ => {}
        }
    }

    /// Completion in [0, 1].
    pub fn fraction(&self) -> f64 {
        if self.total_tiles == 0 {
            return 0.0;
        }
        f64::from(self.tiles_done) / f64::from(self.total_tiles)
    }
}
