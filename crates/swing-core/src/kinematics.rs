//! Velocity and peak-speed derivation.
//!
//! Speed is `distance / elapsed × meters_per_pixel`, converted to the
//! configured unit. The running peak per point only grows until
//! [`KinematicsEngine::reset`]. Duplicate or regressing timestamps are
//! skipped rather than producing infinite or negative speeds.

use std::collections::BTreeMap;

use tracing::debug;

use swing_models::{SpeedUnit, TrackedPoint, TrajectoryPoint, VelocitySample};

use crate::config::KinematicsConfig;

/// One positional sample with its presentation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub x: f64,
    pub y: f64,
    /// Playback time in seconds
    pub time: f64,
    pub confidence: f64,
}

impl MotionSample {
    pub fn new(x: f64, y: f64, time: f64, confidence: f64) -> Self {
        Self {
            x,
            y,
            time,
            confidence,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PointState {
    last: Option<MotionSample>,
    velocity: VelocitySample,
}

/// Per-point current and peak speeds.
#[derive(Debug)]
pub struct KinematicsEngine {
    config: KinematicsConfig,
    points: BTreeMap<TrackedPoint, PointState>,
}

impl KinematicsEngine {
    pub fn new(config: KinematicsConfig) -> Self {
        Self {
            config,
            points: BTreeMap::new(),
        }
    }

    pub fn unit(&self) -> SpeedUnit {
        self.config.unit
    }

    pub fn set_unit(&mut self, unit: SpeedUnit) {
        if self.config.unit != unit {
            self.config.unit = unit;
            // Stored speeds are in the old unit
            self.reset();
        }
    }

    /// Feed one sample. Returns the updated velocity when it changed.
    pub fn update(&mut self, point: TrackedPoint, sample: MotionSample) -> Option<VelocitySample> {
        if sample.confidence.is_nan() || sample.confidence <= self.config.confidence_gate {
            return None;
        }
        if !(sample.x.is_finite() && sample.y.is_finite() && sample.time.is_finite()) {
            return None;
        }

        let scale = self.config.meters_per_pixel * self.config.unit.mps_factor();
        let state = self.points.entry(point).or_default();
        let Some(previous) = state.last else {
            state.last = Some(sample);
            return None;
        };

        let dt = sample.time - previous.time;
        if dt == 0.0 {
            return None;
        }
        if dt < 0.0 {
            // Time went backwards; start measuring again from here
            state.last = Some(sample);
            return None;
        }

        let distance = (sample.x - previous.x).hypot(sample.y - previous.y);
        let current = distance / dt * scale;
        state.velocity.current = current;
        state.velocity.peak = state.velocity.peak.max(current);
        state.last = Some(sample);
        Some(state.velocity)
    }

    pub fn velocity(&self, point: TrackedPoint) -> Option<VelocitySample> {
        self.points.get(&point).map(|state| state.velocity)
    }

    pub fn velocities(&self) -> impl Iterator<Item = (TrackedPoint, VelocitySample)> + '_ {
        self.points
            .iter()
            .map(|(point, state)| (*point, state.velocity))
    }

    /// Clear current speeds, peaks and anchors.
    pub fn reset(&mut self) {
        if !self.points.is_empty() {
            debug!(points = self.points.len(), "Kinematics reset");
        }
        self.points.clear();
    }

    /// React to a seek. A seek to the start resets peaks; any other seek only
    /// drops the anchors so the jump is not measured as motion.
    pub fn on_seek(&mut self, time: f64) {
        if time <= self.config.seek_reset_epsilon {
            self.reset();
            return;
        }
        for state in self.points.values_mut() {
            state.last = None;
            state.velocity.current = 0.0;
        }
    }
}

/// Speed between consecutive trajectory points, keyed by the later frame.
pub fn velocities_from_trajectory(
    points: &[TrajectoryPoint],
    fps: u32,
    meters_per_pixel: f64,
    unit: SpeedUnit,
) -> Vec<(u64, f64)> {
    if fps == 0 {
        return Vec::new();
    }
    let scale = meters_per_pixel * unit.mps_factor();
    points
        .windows(2)
        .filter_map(|pair| {
            let (a, b) = (&pair[0], &pair[1]);
            if b.frame <= a.frame {
                return None;
            }
            let dt = (b.frame - a.frame) as f64 / f64::from(fps);
            Some((b.frame, a.distance_to(b) / dt * scale))
        })
        .collect()
}
