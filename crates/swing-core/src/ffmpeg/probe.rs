//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::command::check_ffprobe;
use crate::error::{EngineError, EngineResult};

/// Video file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Container-reported frame rate
    pub fps: f64,
    /// Video codec
    pub codec: String,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

async fn run_ffprobe(path: &Path, args: &[&str]) -> EngineResult<Vec<u8>> {
    if !path.exists() {
        return Err(EngineError::FileNotFound(path.to_path_buf()));
    }
    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(EngineError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }
    Ok(output.stdout)
}

/// Probe a video file for information.
pub async fn probe_video(path: impl AsRef<Path>) -> EngineResult<VideoInfo> {
    let stdout = run_ffprobe(
        path.as_ref(),
        &[
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ],
    )
    .await?;
    parse_probe_output(&stdout)
}

fn parse_probe_output(stdout: &[u8]) -> EngineResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| EngineError::InvalidVideo("No video stream found".to_string()))?;

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .or(video_stream.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(30.0);

    Ok(VideoInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
    })
}

/// Presentation timestamps of the first `count` video frames.
pub async fn probe_frame_times(path: impl AsRef<Path>, count: usize) -> EngineResult<Vec<f64>> {
    let interval = format!("%+#{}", count.max(1));
    let stdout = run_ffprobe(
        path.as_ref(),
        &[
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-read_intervals",
            &interval,
            "-show_entries",
            "frame=best_effort_timestamp_time",
            "-of",
            "csv=p=0",
        ],
    )
    .await?;
    Ok(parse_frame_times(&String::from_utf8_lossy(&stdout)))
}

/// Parse one timestamp per line, skipping `N/A` and blank lines.
fn parse_frame_times(output: &str) -> Vec<f64> {
    output
        .lines()
        .filter_map(|line| line.trim().trim_end_matches(',').parse::<f64>().ok())
        .collect()
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "format": {"duration": "12.480000"},
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
                 "r_frame_rate": "60/1", "avg_frame_rate": "60/1"}
            ]
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!((info.duration - 12.48).abs() < 1e-9);
        assert_eq!((info.width, info.height), (1920, 1080));
        assert_eq!(info.fps, 60.0);
        assert_eq!(info.codec, "h264");

        let audio_only = br#"{"format": {}, "streams": [{"codec_type": "audio"}]}"#;
        assert!(matches!(
            parse_probe_output(audio_only),
            Err(EngineError::InvalidVideo(_))
        ));
    }

    #[test]
    fn test_parse_frame_times() {
        let times = parse_frame_times("0.000000\n0.016667\nN/A\n\n0.033333,\n");
        assert_eq!(times.len(), 3);
        assert!((times[2] - 0.033333).abs() < 1e-9);
    }
}
