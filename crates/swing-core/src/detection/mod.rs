//! Detection multiplexing.
//!
//! Pose, object and projectile inference run at their own irregular
//! cadence. The multiplexer keeps only the most recent result per kind
//! (no queueing, no backpressure) together with running confidence
//! aggregates. Producers on other tasks publish through a
//! [`DetectionFeed`]; the consumer drains feeds with
//! [`DetectionMultiplexer::poll`] once per display tick.

mod aggregate;
mod feed;
mod multiplexer;

pub use aggregate::{ConfidenceAggregates, RunningConfidence, TrackIdentity};
pub use feed::{DetectionFeed, FeedMessage};
pub use multiplexer::{DetectionMultiplexer, DetectionSnapshot, IngestOutcome};
