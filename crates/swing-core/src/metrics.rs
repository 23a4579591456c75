//! Engine metrics.
//!
//! Recorded through the `metrics` facade; the embedding binary decides
//! which exporter (if any) is installed.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    // Detection metrics
    pub const DETECTIONS_INGESTED_TOTAL: &str = "swing_detections_ingested_total";
    pub const DETECTIONS_DUPLICATE_TOTAL: &str = "swing_detections_duplicate_total";
    pub const DETECTION_STREAMS_DEGRADED_TOTAL: &str = "swing_detection_streams_degraded_total";

    // Frame clock metrics
    pub const FPS_DETECTED: &str = "swing_fps_detected";
    pub const FPS_FALLBACKS_TOTAL: &str = "swing_fps_fallbacks_total";

    // Timeline editing metrics
    pub const BOUNDARY_COMMITS_TOTAL: &str = "swing_boundary_commits_total";
    pub const DRAG_REJECTED_TOTAL: &str = "swing_drag_rejected_total";

    // Sprite metrics
    pub const SPRITES_GENERATED_TOTAL: &str = "swing_sprites_generated_total";
    pub const SPRITES_CANCELLED_TOTAL: &str = "swing_sprites_cancelled_total";
    pub const SPRITES_FAILED_TOTAL: &str = "swing_sprites_failed_total";
    pub const SPRITE_GENERATION_SECONDS: &str = "swing_sprite_generation_seconds";
    pub const SPRITE_TILES_TOTAL: &str = "swing_sprite_tiles_total";
}

/// Record an accepted detection result.
pub fn record_detection(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::DETECTIONS_INGESTED_TOTAL, &labels).increment(1);
}

/// Record a re-delivered detection for an already seen frame.
pub fn record_duplicate_detection(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::DETECTIONS_DUPLICATE_TOTAL, &labels).increment(1);
}

/// Record a detection stream going unavailable.
pub fn record_stream_degraded(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::DETECTION_STREAMS_DEGRADED_TOTAL, &labels).increment(1);
}

/// Record the outcome of FPS detection.
pub fn record_fps(fps: u32, detected: bool) {
    gauge!(names::FPS_DETECTED).set(f64::from(fps));
    if !detected {
        counter!(names::FPS_FALLBACKS_TOTAL).increment(1);
    }
}

/// Record a committed boundary edit.
pub fn record_boundary_commit(edge: &str) {
    let labels = [("edge", edge.to_string())];
    counter!(names::BOUNDARY_COMMITS_TOTAL, &labels).increment(1);
}

/// Record a drag start rejected because a session was already active.
pub fn record_drag_rejected() {
    counter!(names::DRAG_REJECTED_TOTAL).increment(1);
}

/// Record a finished sprite sheet.
pub fn record_sprite_generated(tiles: u32, duration_secs: f64) {
    counter!(names::SPRITES_GENERATED_TOTAL).increment(1);
    counter!(names::SPRITE_TILES_TOTAL).increment(u64::from(tiles));
    histogram!(names::SPRITE_GENERATION_SECONDS).record(duration_secs);
}

/// Record a cancelled sprite generation.
pub fn record_sprite_cancelled() {
    counter!(names::SPRITES_CANCELLED_TOTAL).increment(1);
}

/// Record a failed sprite generation.
pub fn record_sprite_failed(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::SPRITES_FAILED_TOTAL, &labels).increment(1);
}
