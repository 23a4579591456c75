//! Drag gesture state machine.
//!
//! ```text
//! IDLE --press(handle)--> DRAGGING --move past threshold--> PREVIEW
//!   ^                        |                                 |
//!   |                        +--release--> seek to event start |
//!   +------------------- release: COMMIT / cancel: no write <--+
//! ```
//!
//! Only handle drags edit boundaries. Body presses and presses on point
//! events never move anything; released without moving they become a
//! "seek to event start" click.

use tracing::debug;

use swing_models::{BoundaryAdjustment, Edge, EffectiveBoundaries, EventId};

use super::model::TimelineModel;
use crate::metrics;

/// What the pointer went down on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Handle { event_id: EventId, edge: Edge },
    Body { event_id: EventId },
}

impl HitTarget {
    pub fn event_id(&self) -> &EventId {
        match self {
            HitTarget::Handle { event_id, .. } | HitTarget::Body { event_id } => event_id,
        }
    }
}

/// The live boundary drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub event_id: EventId,
    pub edge: Edge,
    /// Effective boundary time when the press happened
    pub original_time: f64,
    /// Clamped time the boundary would commit to
    pub preview_time: f64,
    press_x: f64,
    moved: bool,
}

impl DragSession {
    /// Whether the pointer travelled past the drag threshold.
    pub fn is_moved(&self) -> bool {
        self.moved
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Gesture {
    Handle(DragSession),
    Body {
        event_id: EventId,
        press_x: f64,
        moved: bool,
    },
}

/// Externally visible state of the gesture machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    /// Pointer down, not yet past the threshold (or dragging a body)
    Dragging,
    /// A handle is being moved and a preview is live
    Preview,
}

/// Why a press did not start a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressRejection {
    SessionActive,
    UnknownEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    Started,
    Rejected(PressRejection),
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome {
    /// Click without drag: move playback to the event start
    Seek { event_id: EventId, time: f64 },
    /// A handle drag wrote an adjustment
    Committed(BoundaryAdjustment),
    /// A body drag; nothing written
    Cancelled,
    /// No gesture was active
    Idle,
}

impl TimelineModel {
    pub fn phase(&self) -> DragPhase {
        match &self.gesture {
            None => DragPhase::Idle,
            Some(Gesture::Handle(session)) if session.moved => DragPhase::Preview,
            Some(_) => DragPhase::Dragging,
        }
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        match &self.gesture {
            Some(Gesture::Handle(session)) => Some(session),
            _ => None,
        }
    }

    /// What lies under pointer `x`: the closest handle within reach, else a body.
    pub fn hit_test(&self, x: f64) -> Option<HitTarget> {
        let reach = self.geometry.handle_px;
        let mut candidates: Vec<(f64, HitTarget)> = Vec::new();

        for event in &self.events {
            let effective = self.merge(event);
            if !event.is_range() {
                let distance = (self.geometry.time_to_x(effective.start) - x).abs();
                candidates.push((
                    distance,
                    HitTarget::Body {
                        event_id: event.id.clone(),
                    },
                ));
                continue;
            }
            for edge in [Edge::Start, Edge::End] {
                let distance = (self.geometry.time_to_x(effective.get(edge)) - x).abs();
                candidates.push((
                    distance,
                    HitTarget::Handle {
                        event_id: event.id.clone(),
                        edge,
                    },
                ));
            }
        }

        let closest = candidates
            .into_iter()
            .filter(|(distance, _)| *distance <= reach)
            .min_by(|a, b| a.0.total_cmp(&b.0));
        if let Some((_, target)) = closest {
            return Some(target);
        }

        let time = self.geometry.x_to_time(x);
        self.event_at(time).map(|event| HitTarget::Body {
            event_id: event.id.clone(),
        })
    }

    /// Pointer down. At most one gesture exists; a second press is a no-op.
    pub fn press(&mut self, target: HitTarget, x: f64) -> PressOutcome {
        if self.gesture.is_some() {
            metrics::record_drag_rejected();
            debug!(event_id = %target.event_id(), "Press ignored, gesture already active");
            return PressOutcome::Rejected(PressRejection::SessionActive);
        }
        let Some(event) = self.event(target.event_id()) else {
            metrics::record_drag_rejected();
            return PressOutcome::Rejected(PressRejection::UnknownEvent);
        };
        let effective = self.merge(event);

        let gesture = match target {
            HitTarget::Handle { event_id, edge } if event.is_range() => {
                let original_time = effective.get(edge);
                Gesture::Handle(DragSession {
                    event_id,
                    edge,
                    original_time,
                    preview_time: original_time,
                    press_x: x,
                    moved: false,
                })
            }
            HitTarget::Handle { event_id, .. } | HitTarget::Body { event_id } => Gesture::Body {
                event_id,
                press_x: x,
                moved: false,
            },
        };
        self.gesture = Some(gesture);
        PressOutcome::Started
    }

    /// Pointer moved. Returns the clamped preview time while a handle drag is live.
    pub fn pointer_move(&mut self, x: f64) -> Option<f64> {
        let mut gesture = self.gesture.take()?;
        let threshold = self.config.drag_threshold_px;

        let preview = match &mut gesture {
            Gesture::Handle(session) => {
                if !session.moved && (x - session.press_x).abs() >= threshold {
                    session.moved = true;
                }
                if session.moved {
                    session.preview_time = self.preview_for(session, x);
                    Some(session.preview_time)
                } else {
                    None
                }
            }
            Gesture::Body { press_x, moved, .. } => {
                if (x - *press_x).abs() >= threshold {
                    *moved = true;
                }
                None
            }
        };
        self.gesture = Some(gesture);
        preview
    }

    fn preview_for(&self, session: &DragSession, x: f64) -> f64 {
        let x = self.geometry.clamp_x(x);
        let delta = if self.geometry.px_per_second > 0.0 {
            (x - self.geometry.clamp_x(session.press_x)) / self.geometry.px_per_second
        } else {
            0.0
        };
        self.clamp_edge(&session.event_id, session.edge, session.original_time + delta)
            .unwrap_or(session.original_time)
    }

    /// Pointer up at `x`. An off-track pointer is pulled back onto the track
    /// and the resulting clamped time is committed.
    pub fn release(&mut self, x: f64) -> ReleaseOutcome {
        self.pointer_move(x);
        let Some(gesture) = self.gesture.take() else {
            return ReleaseOutcome::Idle;
        };

        match gesture {
            Gesture::Handle(session) if session.moved => {
                match self.write_adjustment(&session.event_id, session.edge, session.preview_time) {
                    Some(adjustment) => ReleaseOutcome::Committed(adjustment),
                    None => ReleaseOutcome::Cancelled,
                }
            }
            Gesture::Handle(DragSession { event_id, .. })
            | Gesture::Body {
                event_id,
                moved: false,
                ..
            } => self.seek_outcome(event_id),
            Gesture::Body { .. } => ReleaseOutcome::Cancelled,
        }
    }

    fn seek_outcome(&self, event_id: EventId) -> ReleaseOutcome {
        match self.effective(&event_id) {
            Some(effective) => ReleaseOutcome::Seek {
                event_id,
                time: effective.start,
            },
            None => ReleaseOutcome::Cancelled,
        }
    }

    /// Abort the gesture without writing anything (Escape, pointer capture lost).
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.gesture.take().is_some();
        if cancelled {
            debug!("Drag cancelled");
        }
        cancelled
    }

    /// Effective boundaries with the live preview overlaid, for drawing.
    pub fn preview_boundaries(&self, id: &EventId) -> Option<EffectiveBoundaries> {
        let mut boundaries = self.effective(id)?;
        if let Some(session) = self.drag_session() {
            if &session.event_id == id && session.moved {
                match session.edge {
                    Edge::Start => boundaries.start = session.preview_time,
                    Edge::End => boundaries.end = session.preview_time,
                }
                boundaries.is_adjusted = true;
            }
        }
        Some(boundaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimelineConfig;
    use crate::timeline::TrackGeometry;
    use swing_models::TimelineEvent;

    fn model() -> TimelineModel {
        let mut model = TimelineModel::load(
            vec![
                TimelineEvent::range("e1", "Swing", 1.0, 2.0),
                TimelineEvent::point("impact", "Contact", 3.0),
            ],
            TimelineConfig::default(),
        )
        .unwrap();
        model.set_geometry(TrackGeometry::new(0.0, 100.0, Some(10.0)));
        model
    }

    fn e1() -> EventId {
        "e1".into()
    }

    fn handle(edge: Edge) -> HitTarget {
        HitTarget::Handle {
            event_id: e1(),
            edge,
        }
    }

    #[test]
    fn test_end_drag_commits_then_start_clamps() {
        let mut model = model();

        assert_eq!(model.press(handle(Edge::End), 200.0), PressOutcome::Started);
        assert_eq!(model.phase(), DragPhase::Dragging);
        let preview = model.pointer_move(240.0).unwrap();
        assert!((preview - 2.4).abs() < 1e-9);
        assert_eq!(model.phase(), DragPhase::Preview);

        let ReleaseOutcome::Committed(adjustment) = model.release(240.0) else {
            panic!("expected commit");
        };
        assert_eq!(adjustment.edge, Edge::End);
        let effective = model.effective(&e1()).unwrap();
        assert_eq!(effective.start, 1.0);
        assert!((effective.end - 2.4).abs() < 1e-9);
        assert!(effective.is_adjusted);
        assert_eq!(model.phase(), DragPhase::Idle);

        model.press(handle(Edge::Start), 100.0);
        let preview = model.pointer_move(250.0).unwrap();
        assert!((preview - 2.35).abs() < 1e-9);
        model.release(250.0);
        let effective = model.effective(&e1()).unwrap();
        assert!((effective.start - 2.35).abs() < 1e-9);
        assert!(effective.duration() >= 0.05);
    }

    #[test]
    fn test_click_without_movement_seeks() {
        let mut model = model();
        model.press(handle(Edge::End), 200.0);
        model.pointer_move(202.0);
        assert_eq!(model.phase(), DragPhase::Dragging);
        assert_eq!(
            model.release(203.0),
            ReleaseOutcome::Seek {
                event_id: e1(),
                time: 1.0
            }
        );
        assert!(model.adjustments().is_empty());
    }

    #[test]
    fn test_second_press_is_rejected() {
        let mut model = model();
        model.press(handle(Edge::End), 200.0);
        model.pointer_move(260.0);

        assert_eq!(
            model.press(handle(Edge::Start), 100.0),
            PressOutcome::Rejected(PressRejection::SessionActive)
        );
        assert_eq!(model.drag_session().unwrap().edge, Edge::End);
        assert_eq!(
            model.press(
                HitTarget::Body {
                    event_id: "nope".into()
                },
                0.0
            ),
            PressOutcome::Rejected(PressRejection::SessionActive)
        );
    }

    #[test]
    fn test_unknown_event_rejected() {
        let mut model = model();
        assert_eq!(
            model.press(
                HitTarget::Body {
                    event_id: "nope".into()
                },
                0.0
            ),
            PressOutcome::Rejected(PressRejection::UnknownEvent)
        );
        assert_eq!(model.phase(), DragPhase::Idle);
    }

    #[test]
    fn test_body_drag_never_moves_event() {
        let mut model = model();
        model.press(HitTarget::Body { event_id: e1() }, 150.0);
        model.pointer_move(400.0);
        assert_eq!(model.release(400.0), ReleaseOutcome::Cancelled);
        assert!(!model.effective(&e1()).unwrap().is_adjusted);
    }

    #[test]
    fn test_point_event_handle_only_seeks() {
        let mut model = model();
        model.press(
            HitTarget::Handle {
                event_id: "impact".into(),
                edge: Edge::Start,
            },
            300.0,
        );
        assert!(model.pointer_move(301.0).is_none());
        assert_eq!(
            model.release(301.0),
            ReleaseOutcome::Seek {
                event_id: "impact".into(),
                time: 3.0
            }
        );
    }

    #[test]
    fn test_cancel_writes_nothing() {
        let mut model = model();
        model.press(handle(Edge::End), 200.0);
        model.pointer_move(500.0);
        let preview = model.preview_boundaries(&e1()).unwrap();
        assert!((preview.end - 5.0).abs() < 1e-9);
        assert!(!model.effective(&e1()).unwrap().is_adjusted);

        assert!(model.cancel());
        assert!(!model.cancel());
        assert_eq!(model.effective(&e1()).unwrap().end, 2.0);
        assert_eq!(model.release(500.0), ReleaseOutcome::Idle);
    }

    #[test]
    fn test_off_track_release_commits_clamped_time() {
        let mut model = model();
        model.press(handle(Edge::End), 200.0);
        model.pointer_move(5000.0);
        let ReleaseOutcome::Committed(adjustment) = model.release(5000.0) else {
            panic!("expected commit");
        };
        assert_eq!(adjustment.adjusted_time, 10.0);

        model.press(handle(Edge::Start), 100.0);
        model.pointer_move(-800.0);
        let ReleaseOutcome::Committed(adjustment) = model.release(-800.0) else {
            panic!("expected commit");
        };
        assert_eq!(adjustment.adjusted_time, 0.0);
    }

    #[test]
    fn test_hit_test() {
        let model = model();
        assert_eq!(model.hit_test(198.0), Some(handle(Edge::End)));
        assert_eq!(model.hit_test(103.0), Some(handle(Edge::Start)));
        assert_eq!(model.hit_test(150.0), Some(HitTarget::Body { event_id: e1() }));
        assert_eq!(
            model.hit_test(302.0),
            Some(HitTarget::Body {
                event_id: "impact".into()
            })
        );
        assert_eq!(model.hit_test(700.0), None);
    }
}
