//! Running confidence aggregates.
//!
//! Keeps `(sum, count)` per tracked identity so the UI can show trailing
//! average accuracy without storing any history.

use std::collections::BTreeMap;

use swing_models::{Detection, DetectionKind, JointId};

/// What a confidence value is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackIdentity {
    /// A keypoint of the primary athlete
    Joint(JointId),
    /// An object class (club, racket, bat)
    Object(String),
    /// The projectile
    Projectile,
}

impl TrackIdentity {
    pub fn kind(&self) -> DetectionKind {
        match self {
            TrackIdentity::Joint(_) => DetectionKind::Pose,
            TrackIdentity::Object(_) => DetectionKind::Object,
            TrackIdentity::Projectile => DetectionKind::Projectile,
        }
    }
}

/// Running sum and count of confidence scores.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningConfidence {
    pub sum: f64,
    pub count: u64,
}

impl RunningConfidence {
    pub fn push(&mut self, score: f64) {
        self.sum += score;
        self.count += 1;
    }

    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Confidence aggregates for every identity seen so far.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceAggregates {
    entries: BTreeMap<TrackIdentity, RunningConfidence>,
}

impl ConfidenceAggregates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, identity: TrackIdentity, score: f64) {
        if !score.is_finite() {
            return;
        }
        self.entries.entry(identity).or_default().push(score);
    }

    /// Record every confidence carried by a detection result.
    pub fn record_detection(&mut self, detection: &Detection) {
        match detection {
            Detection::Pose(pose) => {
                if let Some(person) = pose.primary() {
                    for (index, keypoint) in person.keypoints.iter().enumerate() {
                        let joint = JointId(index as u16);
                        self.record(TrackIdentity::Joint(joint), keypoint.score);
                    }
                }
            }
            Detection::Object(objects) => {
                for object in &objects.objects {
                    self.record(TrackIdentity::Object(object.label.clone()), object.score);
                }
            }
            Detection::Projectile(projectile) => {
                if let Some(position) = projectile.position {
                    self.record(TrackIdentity::Projectile, position.score);
                }
            }
        }
    }

    pub fn get(&self, identity: &TrackIdentity) -> Option<RunningConfidence> {
        self.entries.get(identity).copied()
    }

    /// Trailing average confidence for an identity.
    pub fn average(&self, identity: &TrackIdentity) -> Option<f64> {
        self.entries.get(identity).and_then(RunningConfidence::average)
    }

    /// Average over all identities of one detection kind.
    pub fn kind_average(&self, kind: DetectionKind) -> Option<f64> {
        let total = self
            .entries
            .iter()
            .filter(|(identity, _)| identity.kind() == kind)
            .fold(RunningConfidence::default(), |mut acc, (_, running)| {
                acc.sum += running.sum;
                acc.count += running.count;
                acc
            });
        total.average()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TrackIdentity, &RunningConfidence)> {
        self.entries.iter()
    }

    /// Drop aggregates belonging to one detection kind.
    pub fn clear_kind(&mut self, kind: DetectionKind) {
        self.entries.retain(|identity, _| identity.kind() != kind);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swing_models::{BoundingBox, DetectedObject, ObjectResult};

    #[test]
    fn test_running_average() {
        let mut aggregates = ConfidenceAggregates::new();
        aggregates.record(TrackIdentity::Projectile, 0.5);
        aggregates.record(TrackIdentity::Projectile, 0.9);
        aggregates.record(TrackIdentity::Projectile, f64::NAN);

        let running = aggregates.get(&TrackIdentity::Projectile).unwrap();
        assert_eq!(running.count, 2);
        assert!((aggregates.average(&TrackIdentity::Projectile).unwrap() - 0.7).abs() < 1e-9);
        assert!(aggregates.average(&TrackIdentity::Joint(JointId::NOSE)).is_none());
    }

    #[test]
    fn test_object_labels_and_clear_kind() {
        let mut aggregates = ConfidenceAggregates::new();
        aggregates.record_detection(&Detection::Object(ObjectResult {
            objects: vec![
                DetectedObject {
                    label: "club".into(),
                    bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                    score: 0.8,
                },
                DetectedObject {
                    label: "ball".into(),
                    bbox: BoundingBox::new(5.0, 5.0, 2.0, 2.0),
                    score: 0.4,
                },
            ],
        }));
        aggregates.record(TrackIdentity::Projectile, 1.0);

        assert!((aggregates.kind_average(DetectionKind::Object).unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(aggregates.len(), 3);

        aggregates.clear_kind(DetectionKind::Object);
        assert_eq!(aggregates.len(), 1);
        assert!(aggregates.kind_average(DetectionKind::Object).is_none());
    }
}
