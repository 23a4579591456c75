//! Timestamp formatting for cue files and logs.

/// Format seconds as a WebVTT timestamp, always `HH:MM:SS.mmm`.
///
/// Negative and non-finite inputs clamp to zero.
///
/// # Examples
/// ```
/// use swing_models::timestamp::format_vtt_timestamp;
/// assert_eq!(format_vtt_timestamp(0.0), "00:00:00.000");
/// assert_eq!(format_vtt_timestamp(3725.5), "01:02:05.500");
/// ```
pub fn format_vtt_timestamp(total_secs: f64) -> String {
    let total_ms = if total_secs.is_finite() && total_secs > 0.0 {
        (total_secs * 1000.0).round() as u64
    } else {
        0
    };

    let hours = total_ms / 3_600_000;
    let mins = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
}

/// Format seconds compactly for log lines (`M:SS.mmm`).
pub fn format_short(total_secs: f64) -> String {
    let total_secs = if total_secs.is_finite() { total_secs.max(0.0) } else { 0.0 };
    let mins = (total_secs / 60.0).floor() as u64;
    let secs = total_secs - (mins as f64) * 60.0;
    format!("{}:{:06.3}", mins, secs)
}
