//! Trajectory tracking for selected joints and the projectile.

mod ring;
mod tracker;

pub use ring::RingBuffer;
pub use tracker::{Observation, TrajectoryTracker};
