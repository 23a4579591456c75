//! Motion analytics exposed to the overlay renderer.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One recorded position of a tracked point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrajectoryPoint {
    pub x: f64,
    pub y: f64,
    pub frame: u64,
}

impl TrajectoryPoint {
    pub fn new(x: f64, y: f64, frame: u64) -> Self {
        Self { x, y, frame }
    }

    /// Euclidean distance to another point, in the same units as `x`/`y`.
    pub fn distance_to(&self, other: &TrajectoryPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Current and peak speed of a tracked limb.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VelocitySample {
    pub current: f64,
    /// Highest `current` since the last reset
    pub peak: f64,
}

/// Unit used when reporting speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeedUnit {
    MetersPerSecond,
    KilometersPerHour,
    #[default]
    MilesPerHour,
}

impl SpeedUnit {
    /// Multiplier converting meters per second into this unit.
    pub fn mps_factor(&self) -> f64 {
        match self {
            SpeedUnit::MetersPerSecond => 1.0,
            SpeedUnit::KilometersPerHour => 3.6,
            SpeedUnit::MilesPerHour => 2.236_936_292_054_402,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedUnit::MetersPerSecond => "m/s",
            SpeedUnit::KilometersPerHour => "km/h",
            SpeedUnit::MilesPerHour => "mph",
        }
    }
}

impl fmt::Display for SpeedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeedUnit {
    type Err = SpeedUnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m/s" | "mps" | "meters_per_second" => Ok(SpeedUnit::MetersPerSecond),
            "km/h" | "kph" | "kmh" | "kilometers_per_hour" => Ok(SpeedUnit::KilometersPerHour),
            "mph" | "miles_per_hour" => Ok(SpeedUnit::MilesPerHour),
            _ => Err(SpeedUnitParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown speed unit: {0}")]
pub struct SpeedUnitParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = TrajectoryPoint::new(0.0, 0.0, 1);
        let b = TrajectoryPoint::new(3.0, 4.0, 2);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_speed_unit_parse() {
        assert_eq!("mph".parse::<SpeedUnit>().unwrap(), SpeedUnit::MilesPerHour);
        assert_eq!("KM/H".parse::<SpeedUnit>().unwrap(), SpeedUnit::KilometersPerHour);
        assert!("knots".parse::<SpeedUnit>().is_err());
    }

    #[test]
    fn test_speed_unit_factor() {
        assert!((SpeedUnit::KilometersPerHour.mps_factor() * 10.0 - 36.0).abs() < 1e-9);
        assert!((SpeedUnit::MilesPerHour.mps_factor() * 44.704 - 100.0).abs() < 1e-6);
    }
}
