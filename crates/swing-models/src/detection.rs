//! Detection payloads delivered by the inference collaborators.
//!
//! Each model emits results for one frame at a time, at its own cadence.
//! The payloads are a tagged union so consumers match on the variant
//! instead of probing loosely-typed fields.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::joint::JointId;

/// The three detection streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DetectionKind {
    Pose,
    Object,
    Projectile,
}

impl DetectionKind {
    pub const ALL: [DetectionKind; 3] = [
        DetectionKind::Pose,
        DetectionKind::Object,
        DetectionKind::Projectile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionKind::Pose => "pose",
            DetectionKind::Object => "object",
            DetectionKind::Projectile => "projectile",
        }
    }
}

impl fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single pose keypoint in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    /// Model confidence in [0, 1]
    pub score: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, score: f64) -> Self {
        Self { x, y, score }
    }
}

/// Keypoints of one detected person, indexed by [`JointId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PosePerson {
    pub keypoints: Vec<Keypoint>,
    /// Overall person score
    pub score: f64,
}

impl PosePerson {
    pub fn new(keypoints: Vec<Keypoint>, score: f64) -> Self {
        Self { keypoints, score }
    }

    pub fn keypoint(&self, joint: JointId) -> Option<&Keypoint> {
        self.keypoints.get(joint.index())
    }
}

/// Pose estimation output for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PoseResult {
    pub people: Vec<PosePerson>,
}

impl PoseResult {
    /// The person the analysis follows: the highest-scoring detection.
    pub fn primary(&self) -> Option<&PosePerson> {
        self.people
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// Axis-aligned box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// One detected object (racket, club, bat, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectedObject {
    pub label: String,
    pub bbox: BoundingBox,
    pub score: f64,
}

/// Object detection output for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectResult {
    pub objects: Vec<DetectedObject>,
}

/// Projectile position for one frame; `None` when the ball is not visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectileResult {
    pub position: Option<Keypoint>,
}

/// A detection result of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detection {
    Pose(PoseResult),
    Object(ObjectResult),
    Projectile(ProjectileResult),
}

impl Detection {
    pub fn kind(&self) -> DetectionKind {
        match self {
            Detection::Pose(_) => DetectionKind::Pose,
            Detection::Object(_) => DetectionKind::Object,
            Detection::Projectile(_) => DetectionKind::Projectile,
        }
    }
}

/// A detection result stamped with the frame it was computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameDetection {
    pub frame: u64,
    pub detection: Detection,
}

impl FrameDetection {
    pub fn new(frame: u64, detection: Detection) -> Self {
        Self { frame, detection }
    }

    pub fn kind(&self) -> DetectionKind {
        self.detection.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_person_is_highest_score() {
        let pose = PoseResult {
            people: vec![
                PosePerson::new(vec![], 0.4),
                PosePerson::new(vec![], 0.9),
                PosePerson::new(vec![], 0.7),
            ],
        };
        assert_eq!(pose.primary().map(|p| p.score), Some(0.9));
        assert!(PoseResult::default().primary().is_none());
    }

    #[test]
    fn test_detection_tagging() {
        let detection = Detection::Projectile(ProjectileResult {
            position: Some(Keypoint::new(10.0, 20.0, 0.8)),
        });
        assert_eq!(detection.kind(), DetectionKind::Projectile);

        let json = serde_json::to_value(&detection).unwrap();
        assert_eq!(json["kind"], "projectile");
    }
}
