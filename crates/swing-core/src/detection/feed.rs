//! Producer side of a detection stream.
//!
//! Inference runs on its own schedule and may burst faster than the
//! display refreshes. A feed is a `watch` channel: publishing overwrites
//! the previous value and never blocks, so the consumer only ever sees the
//! latest message when it polls.

use tokio::sync::watch;

use swing_models::{DetectionKind, FrameDetection};

use crate::error::{EngineError, EngineResult};

/// Message carried by a feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    Result(FrameDetection),
    /// The producer failed or stopped; the overlay for this kind goes away
    Unavailable(String),
}

/// Handle given to an inference collaborator.
#[derive(Debug)]
pub struct DetectionFeed {
    kind: DetectionKind,
    tx: watch::Sender<Option<FeedMessage>>,
}

impl DetectionFeed {
    pub(crate) fn channel(kind: DetectionKind) -> (Self, watch::Receiver<Option<FeedMessage>>) {
        let (tx, rx) = watch::channel(None);
        (Self { kind, tx }, rx)
    }

    pub fn kind(&self) -> DetectionKind {
        self.kind
    }

    /// Publish a result, replacing any result the consumer has not read yet.
    pub fn publish(&self, detection: FrameDetection) -> EngineResult<()> {
        if detection.kind() != self.kind {
            return Err(EngineError::FeedKindMismatch {
                expected: self.kind,
                actual: detection.kind(),
            });
        }
        self.tx.send_replace(Some(FeedMessage::Result(detection)));
        Ok(())
    }

    /// Report that the stream is unavailable.
    pub fn report_unavailable(&self, reason: impl Into<String>) {
        self.tx
            .send_replace(Some(FeedMessage::Unavailable(reason.into())));
    }

    /// Whether the consuming multiplexer still exists.
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}
