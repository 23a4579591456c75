//! Engine configuration.
//!
//! Every section has sensible defaults and can be overridden from
//! `SWING_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use swing_models::SpeedUnit;

/// Read and parse an environment variable, falling back to `default`.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// FPS auto-detection settings.
#[derive(Debug, Clone)]
pub struct FrameClockConfig {
    /// Frame callbacks collected before estimating
    pub sample_count: usize,
    /// Distinct media-time deltas needed before refining with media time
    pub min_media_samples: usize,
    /// Rate used when detection is unavailable or does not finish
    pub default_fps: u32,
}

impl Default for FrameClockConfig {
    fn default() -> Self {
        Self {
            sample_count: 30,
            min_media_samples: 10,
            default_fps: 30,
        }
    }
}

impl FrameClockConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sample_count: env_or("SWING_FPS_SAMPLES", defaults.sample_count).max(2),
            min_media_samples: env_or("SWING_FPS_MIN_MEDIA_SAMPLES", defaults.min_media_samples),
            default_fps: env_or("SWING_DEFAULT_FPS", defaults.default_fps).max(1),
        }
    }
}

/// Trajectory history settings.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Maximum points kept per tracked point
    pub max_points: usize,
    /// Keypoints at or below this confidence are ignored
    pub confidence_gate: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_points: 300,
            confidence_gate: 0.3,
        }
    }
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_points: env_or("SWING_MAX_TRAJECTORY_POINTS", defaults.max_points),
            confidence_gate: env_or("SWING_CONFIDENCE_GATE", defaults.confidence_gate),
        }
    }
}

/// Velocity derivation settings.
#[derive(Debug, Clone)]
pub struct KinematicsConfig {
    /// Scene calibration in meters per pixel
    pub meters_per_pixel: f64,
    /// Unit for reported speeds
    pub unit: SpeedUnit,
    /// Samples at or below this confidence do not update velocity
    pub confidence_gate: f64,
    /// Seeks to a time at or below this count as "seek to start" and reset peaks
    pub seek_reset_epsilon: f64,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            // ~1.8 m athlete spanning ~720 px in a 1080p frame
            meters_per_pixel: 0.0025,
            unit: SpeedUnit::MilesPerHour,
            confidence_gate: 0.3,
            seek_reset_epsilon: 0.05,
        }
    }
}

impl KinematicsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            meters_per_pixel: env_or("SWING_METERS_PER_PIXEL", defaults.meters_per_pixel),
            unit: env_or("SWING_SPEED_UNIT", defaults.unit),
            confidence_gate: env_or("SWING_CONFIDENCE_GATE", defaults.confidence_gate),
            seek_reset_epsilon: defaults.seek_reset_epsilon,
        }
    }
}

/// Event editing settings.
#[derive(Debug, Clone)]
pub struct TimelineConfig {
    /// Minimum effective duration of a range event, in seconds
    pub min_duration: f64,
    /// Pointer travel needed before a press becomes a drag
    pub drag_threshold_px: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            min_duration: 0.05,
            drag_threshold_px: 4.0,
        }
    }
}

impl TimelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_duration: env_or("SWING_MIN_EVENT_DURATION", defaults.min_duration),
            drag_threshold_px: env_or("SWING_DRAG_THRESHOLD_PX", defaults.drag_threshold_px),
        }
    }
}

/// Scrub-preview sprite settings.
#[derive(Debug, Clone)]
pub struct SpriteConfig {
    /// Number of tiles (N)
    pub count: u32,
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Bounded wait for duration metadata
    pub metadata_timeout: Duration,
    /// Bounded wait for each seek-completed signal
    pub seek_timeout: Duration,
    /// Delay after a seek so the decoder presents the new frame
    pub settle_delay: Duration,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            count: 100,
            tile_width: 160,
            tile_height: 90,
            metadata_timeout: Duration::from_secs(10),
            seek_timeout: Duration::from_secs(5),
            settle_delay: Duration::from_millis(50),
            jpeg_quality: 80,
        }
    }
}

impl SpriteConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            count: env_or("SWING_SPRITE_COUNT", defaults.count).max(1),
            tile_width: env_or("SWING_TILE_WIDTH", defaults.tile_width).max(1),
            tile_height: env_or("SWING_TILE_HEIGHT", defaults.tile_height).max(1),
            metadata_timeout: Duration::from_millis(env_or(
                "SWING_METADATA_TIMEOUT_MS",
                defaults.metadata_timeout.as_millis() as u64,
            )),
            seek_timeout: Duration::from_millis(env_or(
                "SWING_SEEK_TIMEOUT_MS",
                defaults.seek_timeout.as_millis() as u64,
            )),
            settle_delay: Duration::from_millis(env_or(
                "SWING_SETTLE_DELAY_MS",
                defaults.settle_delay.as_millis() as u64,
            )),
            jpeg_quality: env_or("SWING_SPRITE_QUALITY", defaults.jpeg_quality).clamp(1, 100),
        }
    }
}

/// Configuration for the whole engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub frame_clock: FrameClockConfig,
    pub tracker: TrackerConfig,
    pub kinematics: KinematicsConfig,
    pub timeline: TimelineConfig,
    pub sprite: SpriteConfig,
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            frame_clock: FrameClockConfig::from_env(),
            tracker: TrackerConfig::from_env(),
            kinematics: KinematicsConfig::from_env(),
            timeline: TimelineConfig::from_env(),
            sprite: SpriteConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.frame_clock.sample_count, 30);
        assert_eq!(config.frame_clock.default_fps, 30);
        assert_eq!(config.tracker.max_points, 300);
        assert!((config.tracker.confidence_gate - 0.3).abs() < 1e-9);
        assert!((config.timeline.min_duration - 0.05).abs() < 1e-9);
        assert_eq!(config.sprite.count, 100);
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("SWING_TEST_ONLY_VALUE", "42");
        assert_eq!(env_or("SWING_TEST_ONLY_VALUE", 7u32), 42);
        std::env::set_var("SWING_TEST_ONLY_VALUE", "not a number");
        assert_eq!(env_or("SWING_TEST_ONLY_VALUE", 7u32), 7);
        std::env::remove_var("SWING_TEST_ONLY_VALUE");
        assert_eq!(env_or("SWING_TEST_ONLY_VALUE", 7u32), 7);
    }
}
