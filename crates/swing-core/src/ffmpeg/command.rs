//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, debug_span, warn, Instrument};

use crate::cancel::CancelToken;
use crate::error::{EngineError, EngineResult};

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output target (file path or `pipe:1`)
    output: String,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl Into<String>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.into(),
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }

    /// A command writing its result to stdout.
    pub fn to_stdout(input: impl AsRef<Path>) -> Self {
        Self::new(input, "pipe:1")
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set seek position (before input, fast keyframe seek then decode).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Extract single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    /// Encode frames as PNG images on the output pipe.
    pub fn png_pipe(self) -> Self {
        self.output_args(["-f", "image2pipe", "-vcodec", "png"])
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-nostdin".to_string(),
            "-v".to_string(),
            "error".to_string(),
        ];
        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.clone());
        args
    }
}

/// Runs FFmpeg with an optional timeout and cancellation.
///
/// The child is killed when the run is abandoned.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    cancel: Option<CancelToken>,
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run the command and return everything it wrote to stdout.
    pub async fn output(&self, cmd: &FfmpegCommand) -> EngineResult<Vec<u8>> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let timeout = self.timeout;
        let wait = async move {
            let output = child.wait_with_output();
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, output).await {
                    Ok(result) => result.map_err(EngineError::from),
                    Err(_) => {
                        warn!("FFmpeg timed out after {}ms, killing process", limit.as_millis());
                        Err(EngineError::ffmpeg_failed(
                            format!("timed out after {}ms", limit.as_millis()),
                            None,
                            None,
                        ))
                    }
                },
                None => output.await.map_err(EngineError::from),
            }
        };

        let span = debug_span!("ffmpeg", input = %cmd.input.display());
        let wait = wait.instrument(span);
        let output = match &self.cancel {
            Some(cancel) => cancel.run(wait).await.ok_or(EngineError::Cancelled)??,
            None => wait.await?,
        };

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(EngineError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
                output.status.code(),
            ))
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> EngineResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| EngineError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> EngineResult<PathBuf> {
    which::which("ffprobe").map_err(|_| EngineError::FfprobeNotFound)
}
