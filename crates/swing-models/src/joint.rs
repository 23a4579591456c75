//! Body joints and other trackable points.
//!
//! Joint indices follow the COCO-17 keypoint layout emitted by the pose
//! models upstream.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Index of a pose keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JointId(pub u16);

impl JointId {
    pub const NOSE: JointId = JointId(0);
    pub const LEFT_EYE: JointId = JointId(1);
    pub const RIGHT_EYE: JointId = JointId(2);
    pub const LEFT_EAR: JointId = JointId(3);
    pub const RIGHT_EAR: JointId = JointId(4);
    pub const LEFT_SHOULDER: JointId = JointId(5);
    pub const RIGHT_SHOULDER: JointId = JointId(6);
    pub const LEFT_ELBOW: JointId = JointId(7);
    pub const RIGHT_ELBOW: JointId = JointId(8);
    pub const LEFT_WRIST: JointId = JointId(9);
    pub const RIGHT_WRIST: JointId = JointId(10);
    pub const LEFT_HIP: JointId = JointId(11);
    pub const RIGHT_HIP: JointId = JointId(12);
    pub const LEFT_KNEE: JointId = JointId(13);
    pub const RIGHT_KNEE: JointId = JointId(14);
    pub const LEFT_ANKLE: JointId = JointId(15);
    pub const RIGHT_ANKLE: JointId = JointId(16);

    /// Number of joints in the COCO layout.
    pub const COUNT: u16 = 17;

    const NAMES: [&'static str; 17] = [
        "nose",
        "left_eye",
        "right_eye",
        "left_ear",
        "right_ear",
        "left_shoulder",
        "right_shoulder",
        "left_elbow",
        "right_elbow",
        "left_wrist",
        "right_wrist",
        "left_hip",
        "right_hip",
        "left_knee",
        "right_knee",
        "left_ankle",
        "right_ankle",
    ];

    /// Keypoint index into a pose result.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// COCO name, or `None` for indices outside the layout.
    pub fn name(self) -> Option<&'static str> {
        Self::NAMES.get(self.index()).copied()
    }

    /// Body side, if the joint has one.
    pub fn side(self) -> Option<Side> {
        match self.0 {
            0 => None,
            n if n < Self::COUNT && n % 2 == 1 => Some(Side::Left),
            n if n < Self::COUNT => Some(Side::Right),
            _ => None,
        }
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "joint_{}", self.0),
        }
    }
}

impl FromStr for JointId {
    type Err = JointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if let Some(pos) = Self::NAMES.iter().position(|name| *name == lower) {
            return Ok(JointId(pos as u16));
        }
        lower
            .parse::<u16>()
            .map(JointId)
            .map_err(|_| JointParseError(s.to_string()))
    }
}

#[derive(Debug, Error)]
#[error("Unknown joint: {0}")]
pub struct JointParseError(String);

/// Left or right side of the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// Anything the trajectory tracker can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "joint", rename_all = "snake_case")]
pub enum TrackedPoint {
    /// A pose keypoint of the primary athlete.
    Joint(JointId),
    /// The projectile (ball, shuttle, puck) path.
    Projectile,
}

impl From<JointId> for TrackedPoint {
    fn from(joint: JointId) -> Self {
        TrackedPoint::Joint(joint)
    }
}

impl fmt::Display for TrackedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackedPoint::Joint(joint) => write!(f, "{}", joint),
            TrackedPoint::Projectile => f.write_str("projectile"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_names() {
        assert_eq!(JointId::LEFT_KNEE.name(), Some("left_knee"));
        assert_eq!(JointId(13).to_string(), "left_knee");
        assert_eq!(JointId(40).to_string(), "joint_40");
    }

    #[test]
    fn test_joint_parse() {
        assert_eq!("right_wrist".parse::<JointId>().unwrap(), JointId::RIGHT_WRIST);
        assert_eq!("13".parse::<JointId>().unwrap(), JointId(13));
        assert!("tail".parse::<JointId>().is_err());
    }

    #[test]
    fn test_joint_side() {
        assert_eq!(JointId::NOSE.side(), None);
        assert_eq!(JointId::LEFT_WRIST.side(), Some(Side::Left));
        assert_eq!(JointId::RIGHT_WRIST.side(), Some(Side::Right));
    }
}
