//! Bounded per-point position history.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use swing_models::{
    Detection, Keypoint, PoseResult, ProjectileResult, TrackedPoint, TrajectoryPoint,
};

use super::ring::RingBuffer;
use crate::config::TrackerConfig;

/// Whether an observation was appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Appended,
    /// Not selected, or tracking is off
    Ignored,
    /// Confidence at or below the gate
    LowConfidence,
    /// Frame equals the last recorded frame for the point
    SameFrame,
}

/// Builds trajectories for the selected tracked points.
///
/// The output is a pure function of the observed stream, the selection and
/// the confidence gate. Storage is an arena of ring buffers; each selected
/// point owns one slot.
#[derive(Debug)]
pub struct TrajectoryTracker {
    config: TrackerConfig,
    enabled: bool,
    selection: BTreeSet<TrackedPoint>,
    slots: BTreeMap<TrackedPoint, usize>,
    arena: Vec<RingBuffer<TrajectoryPoint>>,
}

impl TrajectoryTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            enabled: true,
            selection: BTreeSet::new(),
            slots: BTreeMap::new(),
            arena: Vec::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Replace the tracked selection. Any change clears every trajectory.
    pub fn select<I>(&mut self, points: I)
    where
        I: IntoIterator<Item = TrackedPoint>,
    {
        let selection: BTreeSet<TrackedPoint> = points.into_iter().collect();
        if selection == self.selection {
            return;
        }
        debug!(points = selection.len(), "Trajectory selection changed");
        self.selection = selection;
        self.rebuild_arena();
    }

    pub fn selection(&self) -> impl Iterator<Item = &TrackedPoint> {
        self.selection.iter()
    }

    /// Toggle the trajectory feature. Any change clears every trajectory.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn rebuild_arena(&mut self) {
        self.slots.clear();
        self.arena.clear();
        for point in &self.selection {
            self.slots.insert(*point, self.arena.len());
            self.arena
                .push(RingBuffer::with_capacity(self.config.max_points));
        }
    }

    /// Record a position for one point.
    pub fn observe_point(
        &mut self,
        point: TrackedPoint,
        frame: u64,
        x: f64,
        y: f64,
        score: f64,
    ) -> Observation {
        if !self.enabled {
            return Observation::Ignored;
        }
        let Some(&slot) = self.slots.get(&point) else {
            return Observation::Ignored;
        };
        if score.is_nan() || score <= self.config.confidence_gate {
            return Observation::LowConfidence;
        }
        let Some(buffer) = self.arena.get_mut(slot) else {
            return Observation::Ignored;
        };
        if buffer.last().is_some_and(|last| last.frame == frame) {
            return Observation::SameFrame;
        }
        buffer.push(TrajectoryPoint::new(x, y, frame));
        Observation::Appended
    }

    /// Record the selected joints of the primary person.
    pub fn observe_pose(&mut self, frame: u64, pose: &PoseResult) {
        let Some(person) = pose.primary() else {
            return;
        };
        let joints: Vec<(TrackedPoint, Keypoint)> = self
            .selection
            .iter()
            .filter_map(|point| match point {
                TrackedPoint::Joint(joint) => person
                    .keypoint(*joint)
                    .map(|keypoint| (*point, *keypoint)),
                TrackedPoint::Projectile => None,
            })
            .collect();
        for (point, keypoint) in joints {
            self.observe_point(point, frame, keypoint.x, keypoint.y, keypoint.score);
        }
    }

    pub fn observe_projectile(&mut self, frame: u64, projectile: &ProjectileResult) {
        if let Some(position) = projectile.position {
            self.observe_point(
                TrackedPoint::Projectile,
                frame,
                position.x,
                position.y,
                position.score,
            );
        }
    }

    /// Route a detection to the matching observer; object results carry no
    /// tracked points.
    pub fn observe(&mut self, frame: u64, detection: &Detection) {
        match detection {
            Detection::Pose(pose) => self.observe_pose(frame, pose),
            Detection::Projectile(projectile) => self.observe_projectile(frame, projectile),
            Detection::Object(_) => {}
        }
    }

    /// Points recorded for `point`, oldest first.
    pub fn points(&self, point: TrackedPoint) -> Vec<TrajectoryPoint> {
        self.buffer(point)
            .map(RingBuffer::to_vec)
            .unwrap_or_default()
    }

    pub fn len(&self, point: TrackedPoint) -> usize {
        self.buffer(point).map_or(0, RingBuffer::len)
    }

    pub fn last(&self, point: TrackedPoint) -> Option<TrajectoryPoint> {
        self.buffer(point).and_then(|buffer| buffer.last().copied())
    }

    fn buffer(&self, point: TrackedPoint) -> Option<&RingBuffer<TrajectoryPoint>> {
        self.slots
            .get(&point)
            .and_then(|slot| self.arena.get(*slot))
    }

    /// Empty every trajectory, keeping the selection.
    pub fn clear(&mut self) {
        for buffer in &mut self.arena {
            buffer.clear();
        }
    }
}
