//! Playback-driven motion analysis session.
//!
//! Wires the frame clock, detection multiplexer, trajectory tracker and
//! kinematics engine together the way the player drives them: once per
//! display tick the session drains detection feeds, feeds any new pose or
//! projectile snapshot into the tracker and the kinematics engine, and
//! reports the current frame.

use swing_models::{
    DetectionKind, Keypoint, TrackedPoint, TrajectoryPoint, VelocitySample,
};
use tracing::debug;

use crate::config::EngineConfig;
use crate::detection::DetectionMultiplexer;
use crate::frame_clock::{FpsDetection, FrameClock};
use crate::kinematics::{KinematicsEngine, MotionSample};
use crate::trajectory::TrajectoryTracker;

/// What one tick observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Frame presented at the tick's playback time
    pub frame: u64,
    /// Kinds whose feed delivered a new frame during this tick
    pub updated: Vec<DetectionKind>,
}

/// Motion analysis state for one video.
#[derive(Debug)]
pub struct MotionSession {
    clock: FrameClock,
    detections: DetectionMultiplexer,
    tracker: TrajectoryTracker,
    kinematics: KinematicsEngine,
    last_pose_frame: Option<u64>,
    last_projectile_frame: Option<u64>,
}

impl MotionSession {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            clock: FrameClock::fixed(config.frame_clock.default_fps),
            detections: DetectionMultiplexer::new(),
            tracker: TrajectoryTracker::new(config.tracker.clone()),
            kinematics: KinematicsEngine::new(config.kinematics.clone()),
            last_pose_frame: None,
            last_projectile_frame: None,
        }
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Adopt a detected frame rate.
    pub fn apply_fps(&mut self, detection: &FpsDetection) {
        self.clock.apply(detection);
    }

    pub fn detections(&self) -> &DetectionMultiplexer {
        &self.detections
    }

    /// Mutable access for creating feeds, ingesting results and toggling kinds.
    pub fn detections_mut(&mut self) -> &mut DetectionMultiplexer {
        &mut self.detections
    }

    pub fn tracker(&self) -> &TrajectoryTracker {
        &self.tracker
    }

    pub fn kinematics(&self) -> &KinematicsEngine {
        &self.kinematics
    }

    /// Advance to playback position `time`.
    pub fn tick(&mut self, time: f64) -> TickReport {
        let updated = self.detections.poll();
        self.process_pose();
        self.process_projectile();
        TickReport {
            frame: self.clock.frame_at(time),
            updated,
        }
    }

    fn process_pose(&mut self) {
        let Some((frame, pose)) = self.detections.pose() else {
            return;
        };
        if self.last_pose_frame == Some(frame) {
            return;
        }
        self.last_pose_frame = Some(frame);
        self.tracker.observe_pose(frame, pose);

        let Some(person) = pose.primary() else {
            return;
        };
        let time = self.clock.time_for_frame(frame);
        let samples: Vec<(TrackedPoint, Keypoint)> = self
            .tracker
            .selection()
            .filter_map(|point| match point {
                TrackedPoint::Joint(joint) => person.keypoint(*joint).map(|k| (*point, *k)),
                TrackedPoint::Projectile => None,
            })
            .collect();
        for (point, keypoint) in samples {
            self.kinematics.update(
                point,
                MotionSample::new(keypoint.x, keypoint.y, time, keypoint.score),
            );
        }
    }

    fn process_projectile(&mut self) {
        let Some((frame, projectile)) = self.detections.projectile() else {
            return;
        };
        if self.last_projectile_frame == Some(frame) {
            return;
        }
        self.last_projectile_frame = Some(frame);
        self.tracker.observe_projectile(frame, projectile);

        if let Some(position) = projectile.position {
            let time = self.clock.time_for_frame(frame);
            self.kinematics.update(
                TrackedPoint::Projectile,
                MotionSample::new(position.x, position.y, time, position.score),
            );
        }
    }

    /// React to the user seeking.
    pub fn on_seek(&mut self, time: f64) {
        debug!(time, "Session seek");
        self.kinematics.on_seek(time);
        self.last_pose_frame = None;
        self.last_projectile_frame = None;
    }

    /// Toggle trajectory and velocity tracking; any change clears both.
    pub fn set_tracking_enabled(&mut self, enabled: bool) {
        if self.tracker.is_enabled() != enabled {
            self.tracker.set_enabled(enabled);
            self.kinematics.reset();
        }
    }

    /// Choose which points to track; a different selection clears history.
    pub fn select_points<I>(&mut self, points: I)
    where
        I: IntoIterator<Item = TrackedPoint>,
    {
        let points: Vec<TrackedPoint> = points.into_iter().collect();
        let unchanged = points.len() == self.tracker.selection().count()
            && points.iter().all(|p| self.tracker.selection().any(|s| s == p));
        if !unchanged {
            self.tracker.select(points);
            self.kinematics.reset();
        }
    }

    pub fn trajectory(&self, point: TrackedPoint) -> Vec<TrajectoryPoint> {
        self.tracker.points(point)
    }

    pub fn velocity(&self, point: TrackedPoint) -> Option<VelocitySample> {
        self.kinematics.velocity(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swing_models::{
        Detection, FrameDetection, JointId, PosePerson, PoseResult, ProjectileResult,
    };

    fn pose_at(frame: u64, x: f64) -> FrameDetection {
        FrameDetection::new(
            frame,
            Detection::Pose(PoseResult {
                people: vec![PosePerson::new(
                    vec![Keypoint::new(x, 100.0, 0.9); JointId::COUNT as usize],
                    0.9,
                )],
            }),
        )
    }

    #[tokio::test]
    async fn test_feed_to_trajectory_and_velocity() {
        let mut session = MotionSession::new(&EngineConfig::default());
        let wrist = TrackedPoint::Joint(JointId::RIGHT_WRIST);
        session.select_points([wrist, TrackedPoint::Projectile]);

        let pose_feed = session.detections_mut().feed(DetectionKind::Pose);
        let ball_feed = session.detections_mut().feed(DetectionKind::Projectile);

        let producer = tokio::spawn(async move {
            for frame in 0..3u64 {
                pose_feed.publish(pose_at(frame, frame as f64 * 10.0)).unwrap();
            }
            ball_feed
                .publish(FrameDetection::new(
                    2,
                    Detection::Projectile(ProjectileResult {
                        position: Some(Keypoint::new(1.0, 1.0, 0.95)),
                    }),
                ))
                .unwrap();
        });
        producer.await.unwrap();

        let report = session.tick(2.0 / 30.0);
        assert_eq!(report.frame, 2);
        assert_eq!(report.updated, vec![DetectionKind::Pose, DetectionKind::Projectile]);
        assert_eq!(session.trajectory(wrist).len(), 1);
        assert_eq!(session.trajectory(TrackedPoint::Projectile).len(), 1);

        session
            .detections_mut()
            .ingest(pose_at(5, 40.0));
        session.tick(5.0 / 30.0);
        assert_eq!(session.trajectory(wrist).len(), 2);
        let velocity = session.velocity(wrist).unwrap();
        assert!(velocity.current > 0.0);

        // Re-ticking the same snapshot records nothing new
        session.tick(6.0 / 30.0);
        assert_eq!(session.trajectory(wrist).len(), 2);
    }

    #[test]
    fn test_toggle_clears_state() {
        let mut session = MotionSession::new(&EngineConfig::default());
        let knee = TrackedPoint::Joint(JointId::LEFT_KNEE);
        session.select_points([knee]);
        session.detections_mut().ingest(pose_at(1, 0.0));
        session.tick(0.0);
        session.detections_mut().ingest(pose_at(2, 30.0));
        session.tick(0.1);
        assert!(session.velocity(knee).is_some());

        session.set_tracking_enabled(false);
        assert!(session.trajectory(knee).is_empty());
        assert!(session.velocity(knee).is_none());

        session.set_tracking_enabled(true);
        session.select_points([knee]);
        session.on_seek(0.0);
        assert!(session.velocity(knee).is_none());
    }
}
