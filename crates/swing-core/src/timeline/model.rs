//! Event boundaries and the adjustment overlay.

use std::collections::BTreeMap;

use tracing::{debug, info};

use swing_models::timestamp::format_short;
use swing_models::{BoundaryAdjustment, Edge, EffectiveBoundaries, EventId, TimelineEvent};

use super::drag::Gesture;
use crate::config::TimelineConfig;
use crate::error::{EngineError, EngineResult};
use crate::metrics;

const NAV_EPSILON: f64 = 1e-6;

/// Mapping between track pixels and media time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackGeometry {
    /// Pixel x of time zero
    pub origin_px: f64,
    pub px_per_second: f64,
    /// Media duration once known; bounds previews and the track
    pub duration: Option<f64>,
    /// Half-width of a boundary handle's hit area
    pub handle_px: f64,
}

impl Default for TrackGeometry {
    fn default() -> Self {
        Self {
            origin_px: 0.0,
            px_per_second: 100.0,
            duration: None,
            handle_px: 6.0,
        }
    }
}

impl TrackGeometry {
    pub fn new(origin_px: f64, px_per_second: f64, duration: Option<f64>) -> Self {
        Self {
            origin_px,
            px_per_second,
            duration,
            ..Self::default()
        }
    }

    pub fn time_to_x(&self, time: f64) -> f64 {
        self.origin_px + time * self.px_per_second
    }

    pub fn x_to_time(&self, x: f64) -> f64 {
        if self.px_per_second <= 0.0 {
            return 0.0;
        }
        (x - self.origin_px) / self.px_per_second
    }

    /// Pull a pointer position back onto the track.
    pub fn clamp_x(&self, x: f64) -> f64 {
        let x = x.max(self.origin_px);
        match self.duration {
            Some(duration) => x.min(self.time_to_x(duration)),
            None => x,
        }
    }
}

/// Labeled events plus user boundary adjustments.
///
/// Original events are never mutated. Every read goes through the
/// adjustment overlay, and every write is clamped so a range event keeps at
/// least `min_duration` between its effective boundaries.
#[derive(Debug)]
pub struct TimelineModel {
    pub(super) config: TimelineConfig,
    pub(super) geometry: TrackGeometry,
    pub(super) events: Vec<TimelineEvent>,
    pub(super) index: BTreeMap<EventId, usize>,
    pub(super) adjustments: BTreeMap<(EventId, Edge), f64>,
    pub(super) gesture: Option<Gesture>,
}

impl TimelineModel {
    /// Validate and load the upstream events.
    pub fn load(mut events: Vec<TimelineEvent>, config: TimelineConfig) -> EngineResult<Self> {
        let mut index = BTreeMap::new();
        for event in &events {
            validate_event(event, config.min_duration)?;
            if index.insert(event.id.clone(), 0).is_some() {
                return Err(EngineError::DuplicateEvent(event.id.clone()));
            }
        }

        events.sort_by(|a, b| a.start.total_cmp(&b.start));
        for (position, event) in events.iter().enumerate() {
            index.insert(event.id.clone(), position);
        }

        info!(events = events.len(), "Timeline events loaded");
        Ok(Self {
            config,
            geometry: TrackGeometry::default(),
            events,
            index,
            adjustments: BTreeMap::new(),
            gesture: None,
        })
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn geometry(&self) -> &TrackGeometry {
        &self.geometry
    }

    /// Update the track layout (zoom, resize, metadata arrival).
    pub fn set_geometry(&mut self, geometry: TrackGeometry) {
        self.geometry = geometry;
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn event(&self, id: &EventId) -> Option<&TimelineEvent> {
        self.index.get(id).and_then(|position| self.events.get(*position))
    }

    /// Boundaries after merging adjustments.
    pub fn effective(&self, id: &EventId) -> Option<EffectiveBoundaries> {
        let event = self.event(id)?;
        Some(self.merge(event))
    }

    pub(super) fn merge(&self, event: &TimelineEvent) -> EffectiveBoundaries {
        let start = self.adjustments.get(&(event.id.clone(), Edge::Start)).copied();
        let end = self.adjustments.get(&(event.id.clone(), Edge::End)).copied();
        EffectiveBoundaries::merge(event, start, end)
    }

    /// Effective boundaries of every event, ordered by original start.
    pub fn effective_all(&self) -> Vec<(EventId, EffectiveBoundaries)> {
        self.events
            .iter()
            .map(|event| (event.id.clone(), self.merge(event)))
            .collect()
    }

    /// Committed adjustments, for the save collaborator.
    pub fn adjustments(&self) -> Vec<BoundaryAdjustment> {
        self.adjustments
            .iter()
            .map(|((event_id, edge), time)| BoundaryAdjustment {
                event_id: event_id.clone(),
                edge: *edge,
                adjusted_time: *time,
            })
            .collect()
    }

    pub fn is_adjusted(&self, id: &EventId) -> bool {
        self.adjustments.contains_key(&(id.clone(), Edge::Start))
            || self.adjustments.contains_key(&(id.clone(), Edge::End))
    }

    /// Re-apply previously saved adjustments.
    ///
    /// Both edges of an event are checked together, so a saved pair that was
    /// valid when exported comes back unchanged. A pair that is not valid as a
    /// whole falls back to clamping each edge like a drag commit. Unknown
    /// events and point events are skipped. Returns how many were applied.
    pub fn restore(&mut self, adjustments: &[BoundaryAdjustment]) -> usize {
        let mut pairs: BTreeMap<EventId, (Option<f64>, Option<f64>)> = BTreeMap::new();
        for adjustment in adjustments {
            let pair = pairs.entry(adjustment.event_id.clone()).or_default();
            match adjustment.edge {
                Edge::Start => pair.0 = Some(adjustment.adjusted_time),
                Edge::End => pair.1 = Some(adjustment.adjusted_time),
            }
        }

        let mut applied = 0;
        for (id, (start, end)) in pairs {
            let Some(event) = self.event(&id).filter(|event| event.is_range()) else {
                continue;
            };
            let current = self.merge(event);
            let candidate = EffectiveBoundaries::merge(
                event,
                start.or(Some(current.start)),
                end.or(Some(current.end)),
            );
            if self.is_legal(&candidate) {
                for (edge, time) in [(Edge::Start, start), (Edge::End, end)] {
                    if let Some(time) = time {
                        self.adjustments.insert((id.clone(), edge), time);
                        applied += 1;
                    }
                }
                continue;
            }
            for (edge, time) in [(Edge::End, end), (Edge::Start, start)] {
                if let Some(time) = time {
                    if self.write_adjustment(&id, edge, time).is_some() {
                        applied += 1;
                    }
                }
            }
        }
        debug!(applied, offered = adjustments.len(), "Adjustments restored");
        applied
    }

    fn is_legal(&self, boundaries: &EffectiveBoundaries) -> bool {
        let upper = self.geometry.duration.unwrap_or(f64::INFINITY);
        boundaries.start.is_finite()
            && boundaries.end.is_finite()
            && boundaries.start >= 0.0
            && boundaries.end <= upper
            && boundaries.duration() >= self.config.min_duration
    }

    /// Clamp `time` to the legal range for one boundary.
    ///
    /// Start stays in `[0, end − min]`; end stays in `[start + min, duration]`.
    /// The minimum-duration bound wins if the two conflict.
    pub fn clamp_edge(&self, id: &EventId, edge: Edge, time: f64) -> Option<f64> {
        let event = self.event(id)?;
        let effective = self.merge(event);
        if !time.is_finite() {
            return Some(effective.get(edge));
        }
        let min = self.config.min_duration;
        let clamped = match edge {
            Edge::Start => time.min(latest_start(effective.end, min)).max(0.0),
            Edge::End => {
                let upper = self.geometry.duration.unwrap_or(f64::INFINITY);
                time.min(upper).max(earliest_end(effective.start, min))
            }
        };
        Some(clamped)
    }

    /// Clamp and store an adjustment, overwriting any earlier one for the edge.
    pub(super) fn write_adjustment(
        &mut self,
        id: &EventId,
        edge: Edge,
        time: f64,
    ) -> Option<BoundaryAdjustment> {
        if !self.event(id)?.is_range() {
            return None;
        }
        let adjusted_time = self.clamp_edge(id, edge, time)?;
        self.adjustments.insert((id.clone(), edge), adjusted_time);
        metrics::record_boundary_commit(edge.as_str());
        debug!(
            event_id = %id,
            edge = %edge,
            at = %format_short(adjusted_time),
            "Boundary adjusted"
        );
        Some(BoundaryAdjustment {
            event_id: id.clone(),
            edge,
            adjusted_time,
        })
    }

    /// Move a boundary by whole frames (keyboard editing).
    ///
    /// Ignored while a gesture is active, for unknown ids and for point events.
    pub fn nudge(
        &mut self,
        id: &EventId,
        edge: Edge,
        frames: i64,
        fps: u32,
    ) -> Option<BoundaryAdjustment> {
        if self.gesture.is_some() || fps == 0 {
            return None;
        }
        let current = self.effective(id)?.get(edge);
        let target = current + frames as f64 / f64::from(fps);
        self.write_adjustment(id, edge, target)
    }

    /// Drop adjustments for one event. Returns whether any existed.
    pub fn reset_event(&mut self, id: &EventId) -> bool {
        let start = self.adjustments.remove(&(id.clone(), Edge::Start)).is_some();
        let end = self.adjustments.remove(&(id.clone(), Edge::End)).is_some();
        start || end
    }

    pub fn reset_all(&mut self) {
        self.adjustments.clear();
    }

    /// First event whose effective span contains `time`.
    pub fn event_at(&self, time: f64) -> Option<&TimelineEvent> {
        self.events
            .iter()
            .find(|event| self.merge(event).contains(time))
    }

    /// Event with the earliest effective start after `time`.
    pub fn next_event(&self, time: f64) -> Option<&TimelineEvent> {
        self.events
            .iter()
            .map(|event| (event, self.merge(event).start))
            .filter(|(_, start)| *start > time + NAV_EPSILON)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(event, _)| event)
    }

    /// Event with the latest effective start before `time`.
    pub fn previous_event(&self, time: f64) -> Option<&TimelineEvent> {
        self.events
            .iter()
            .map(|event| (event, self.merge(event).start))
            .filter(|(_, start)| *start < time - NAV_EPSILON)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(event, _)| event)
    }
}

/// Latest start for which `end - start >= min` holds in f64.
fn latest_start(end: f64, min: f64) -> f64 {
    let mut start = end - min;
    while end - start < min {
        start = start.next_down();
    }
    start
}

/// Earliest end for which `end - start >= min` holds in f64.
fn earliest_end(start: f64, min: f64) -> f64 {
    let mut end = start + min;
    while end - start < min {
        end = end.next_up();
    }
    end
}

fn validate_event(event: &TimelineEvent, min_duration: f64) -> EngineResult<()> {
    if !event.start.is_finite() || !event.end.is_finite() {
        return Err(EngineError::invalid_event(&event.id, "boundaries must be finite"));
    }
    if event.start < 0.0 {
        return Err(EngineError::invalid_event(&event.id, "start is negative"));
    }
    if event.end < event.start {
        return Err(EngineError::invalid_event(&event.id, "end precedes start"));
    }
    if event.is_range() && event.duration() < min_duration {
        return Err(EngineError::invalid_event(
            &event.id,
            format!("range shorter than {min_duration}s"),
        ));
    }
    Ok(())
}
