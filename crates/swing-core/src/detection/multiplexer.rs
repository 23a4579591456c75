//! Latest-wins snapshot store for the three detection streams.

use std::collections::BTreeMap;

use tokio::sync::watch;
use tracing::{debug, warn};

use swing_models::{
    Detection, DetectionKind, FrameDetection, ObjectResult, PoseResult, ProjectileResult,
};

use super::aggregate::{ConfidenceAggregates, TrackIdentity};
use super::feed::{DetectionFeed, FeedMessage};
use crate::metrics;

/// Latest result for one detection kind.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSnapshot {
    pub frame: u64,
    pub detection: Detection,
}

/// What happened to an ingested result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// New frame for this kind; snapshot and aggregates updated
    Accepted,
    /// Same frame delivered again; snapshot replaced, aggregates untouched
    Duplicate,
    /// The kind is switched off; result dropped
    Disabled,
}

#[derive(Debug)]
struct Slot {
    enabled: bool,
    snapshot: Option<DetectionSnapshot>,
    degraded: Option<String>,
    feed: Option<watch::Receiver<Option<FeedMessage>>>,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            enabled: true,
            snapshot: None,
            degraded: None,
            feed: None,
        }
    }
}

/// Unifies pose, object and projectile results into per-kind snapshots.
#[derive(Debug)]
pub struct DetectionMultiplexer {
    slots: BTreeMap<DetectionKind, Slot>,
    aggregates: ConfidenceAggregates,
}

impl Default for DetectionMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionMultiplexer {
    pub fn new() -> Self {
        let slots = DetectionKind::ALL
            .into_iter()
            .map(|kind| (kind, Slot::default()))
            .collect();
        Self {
            slots,
            aggregates: ConfidenceAggregates::new(),
        }
    }

    fn slot(&self, kind: DetectionKind) -> Option<&Slot> {
        self.slots.get(&kind)
    }

    fn slot_mut(&mut self, kind: DetectionKind) -> &mut Slot {
        self.slots.entry(kind).or_default()
    }

    /// Accept a result delivered directly on the consumer's task.
    pub fn ingest(&mut self, result: FrameDetection) -> IngestOutcome {
        let kind = result.kind();
        let slot = self.slot_mut(kind);
        if !slot.enabled {
            return IngestOutcome::Disabled;
        }
        slot.degraded = None;

        let duplicate = slot
            .snapshot
            .as_ref()
            .is_some_and(|previous| previous.frame == result.frame);

        // Stale frames still replace the snapshot: latest arrival wins
        slot.snapshot = Some(DetectionSnapshot {
            frame: result.frame,
            detection: result.detection,
        });

        if duplicate {
            metrics::record_duplicate_detection(kind.as_str());
            return IngestOutcome::Duplicate;
        }

        if let Some(snapshot) = self.slots.get(&kind).and_then(|s| s.snapshot.as_ref()) {
            self.aggregates.record_detection(&snapshot.detection);
        }
        metrics::record_detection(kind.as_str());
        IngestOutcome::Accepted
    }

    /// Create a feed for a producer running on another task.
    ///
    /// A second call for the same kind replaces the earlier feed; the old
    /// producer's handle reports disconnected from then on.
    pub fn feed(&mut self, kind: DetectionKind) -> DetectionFeed {
        let (feed, rx) = DetectionFeed::channel(kind);
        self.slot_mut(kind).feed = Some(rx);
        feed
    }

    /// Drain every feed's latest message into the snapshots.
    ///
    /// Returns the kinds whose snapshot was updated.
    pub fn poll(&mut self) -> Vec<DetectionKind> {
        let mut pending = Vec::new();
        for (kind, slot) in self.slots.iter_mut() {
            let Some(rx) = slot.feed.as_mut() else {
                continue;
            };
            // A dropped producer may still have left an unseen message
            let latest = rx.borrow_and_update();
            if !latest.has_changed() {
                continue;
            }
            if let Some(message) = latest.clone() {
                pending.push((*kind, message));
            }
        }

        let mut updated = Vec::new();
        for (kind, message) in pending {
            match message {
                FeedMessage::Result(result) => {
                    if self.ingest(result) == IngestOutcome::Accepted {
                        updated.push(kind);
                    }
                }
                FeedMessage::Unavailable(reason) => self.mark_unavailable(kind, reason),
            }
        }
        updated
    }

    /// Degrade a kind to "no overlay" after its producer failed.
    pub fn mark_unavailable(&mut self, kind: DetectionKind, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(kind = %kind, reason = %reason, "Detection stream unavailable, hiding overlay");
        metrics::record_stream_degraded(kind.as_str());
        let slot = self.slot_mut(kind);
        slot.snapshot = None;
        slot.degraded = Some(reason);
    }

    /// Switch a kind on or off. Switching off tears down its state.
    pub fn set_enabled(&mut self, kind: DetectionKind, enabled: bool) {
        let slot = self.slot_mut(kind);
        if slot.enabled == enabled {
            return;
        }
        slot.enabled = enabled;
        if !enabled {
            slot.snapshot = None;
            slot.degraded = None;
            self.aggregates.clear_kind(kind);
        }
        debug!(kind = %kind, enabled, "Detection stream toggled");
    }

    pub fn is_enabled(&self, kind: DetectionKind) -> bool {
        self.slot(kind).is_some_and(|slot| slot.enabled)
    }

    /// Reason the kind was degraded, if its producer reported unavailable.
    pub fn degraded_reason(&self, kind: DetectionKind) -> Option<&str> {
        self.slot(kind).and_then(|slot| slot.degraded.as_deref())
    }

    pub fn snapshot(&self, kind: DetectionKind) -> Option<&DetectionSnapshot> {
        self.slot(kind).and_then(|slot| slot.snapshot.as_ref())
    }

    pub fn pose(&self) -> Option<(u64, &PoseResult)> {
        match self.snapshot(DetectionKind::Pose)? {
            DetectionSnapshot {
                frame,
                detection: Detection::Pose(pose),
            } => Some((*frame, pose)),
            _ => None,
        }
    }

    pub fn objects(&self) -> Option<(u64, &ObjectResult)> {
        match self.snapshot(DetectionKind::Object)? {
            DetectionSnapshot {
                frame,
                detection: Detection::Object(objects),
            } => Some((*frame, objects)),
            _ => None,
        }
    }

    pub fn projectile(&self) -> Option<(u64, &ProjectileResult)> {
        match self.snapshot(DetectionKind::Projectile)? {
            DetectionSnapshot {
                frame,
                detection: Detection::Projectile(projectile),
            } => Some((*frame, projectile)),
            _ => None,
        }
    }

    /// Whether the kind's snapshot was computed for a frame other than `current_frame`.
    pub fn is_stale(&self, kind: DetectionKind, current_frame: u64) -> bool {
        self.snapshot(kind)
            .is_some_and(|snapshot| snapshot.frame != current_frame)
    }

    pub fn aggregates(&self) -> &ConfidenceAggregates {
        &self.aggregates
    }

    pub fn average_confidence(&self, identity: &TrackIdentity) -> Option<f64> {
        self.aggregates.average(identity)
    }

    /// Drop all snapshots and aggregates, keeping feeds and enabled flags.
    pub fn clear(&mut self) {
        for slot in self.slots.values_mut() {
            slot.snapshot = None;
            slot.degraded = None;
        }
        self.aggregates.clear();
    }
}
