//! Timeline events and boundary adjustments.
//!
//! Events are produced by upstream swing analysis and are immutable here.
//! Edits made by the user are stored as [`BoundaryAdjustment`]s and merged
//! on read into [`EffectiveBoundaries`].

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Stable identifier of a timeline event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Create an event ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Whether an event marks an instant or a span of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A single instant (e.g. ball contact). `start == end`.
    Point,
    /// A span with draggable start and end boundaries (e.g. a full swing).
    #[default]
    Range,
}

/// One boundary of a range event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Start,
    End,
}

impl Edge {
    /// The boundary on the other side of the event.
    pub fn opposite(self) -> Self {
        match self {
            Edge::Start => Edge::End,
            Edge::End => Edge::Start,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Edge::Start => "start",
            Edge::End => "end",
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A labeled event on the analysis timeline.
///
/// Boundaries are stored in seconds of media time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: EventId,
    pub label: String,
    #[serde(default)]
    pub kind: EventKind,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Sport-specific metadata (club type, swing phase scores, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TimelineEvent {
    /// Create a range event.
    pub fn range(id: impl Into<EventId>, label: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: EventKind::Range,
            start,
            end,
            metadata: BTreeMap::new(),
        }
    }

    /// Create a point event.
    pub fn point(id: impl Into<EventId>, label: impl Into<String>, at: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: EventKind::Point,
            start: at,
            end: at,
            metadata: BTreeMap::new(),
        }
    }

    /// Create a range event from frame indices at the given frame rate.
    pub fn from_frames(
        id: impl Into<EventId>,
        label: impl Into<String>,
        start_frame: u64,
        end_frame: u64,
        fps: u32,
    ) -> Self {
        let fps = f64::from(fps.max(1));
        Self::range(id, label, start_frame as f64 / fps, end_frame as f64 / fps)
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Original (unadjusted) time of a boundary.
    pub fn boundary(&self, edge: Edge) -> f64 {
        match edge {
            Edge::Start => self.start,
            Edge::End => self.end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_range(&self) -> bool {
        self.kind == EventKind::Range
    }
}

/// A committed user edit of one event boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryAdjustment {
    pub event_id: EventId,
    pub edge: Edge,
    /// Adjusted time in seconds
    pub adjusted_time: f64,
}

/// Event boundaries after merging any committed adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveBoundaries {
    pub start: f64,
    pub end: f64,
    /// True when at least one edge carries an adjustment
    pub is_adjusted: bool,
}

impl EffectiveBoundaries {
    /// Merge an event with optional per-edge adjustments.
    pub fn merge(event: &TimelineEvent, start: Option<f64>, end: Option<f64>) -> Self {
        Self {
            start: start.unwrap_or(event.start),
            end: end.unwrap_or(event.end),
            is_adjusted: start.is_some() || end.is_some(),
        }
    }

    pub fn get(&self, edge: Edge) -> f64 {
        match edge {
            Edge::Start => self.start,
            Edge::End => self.end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `time` falls inside `[start, end]`.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_adjustment() {
        let event = TimelineEvent::range("e1", "Swing", 1.0, 2.0);

        let untouched = EffectiveBoundaries::merge(&event, None, None);
        assert_eq!(untouched.start, 1.0);
        assert_eq!(untouched.end, 2.0);
        assert!(!untouched.is_adjusted);

        let adjusted = EffectiveBoundaries::merge(&event, None, Some(2.4));
        assert_eq!(adjusted.start, 1.0);
        assert_eq!(adjusted.end, 2.4);
        assert!(adjusted.is_adjusted);
    }

    #[test]
    fn test_from_frames() {
        let event = TimelineEvent::from_frames("e2", "Backswing", 30, 90, 30);
        assert!((event.start - 1.0).abs() < 1e-9);
        assert!((event.end - 3.0).abs() < 1e-9);
        assert!(event.is_range());
    }

    #[test]
    fn test_event_json_shape() {
        let event = TimelineEvent::range("e1", "Swing", 1.0, 2.0)
            .with_metadata("club", serde_json::json!("driver"));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["id"], "e1");
        assert_eq!(json["kind"], "range");
        assert_eq!(json["metadata"]["club"], "driver");

        let adjustment = BoundaryAdjustment {
            event_id: EventId::new("e1"),
            edge: Edge::End,
            adjusted_time: 2.4,
        };
        let json = serde_json::to_value(&adjustment).unwrap();
        assert_eq!(json["eventId"], "e1");
        assert_eq!(json["edge"], "end");
        assert_eq!(json["adjustedTime"], 2.4);
    }

    #[test]
    fn test_edge_opposite() {
        assert_eq!(Edge::Start.opposite(), Edge::End);
        assert_eq!(Edge::End.opposite(), Edge::Start);
    }
}
