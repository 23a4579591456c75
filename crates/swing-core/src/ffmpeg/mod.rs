//! FFmpeg-backed frame source for local files.

mod command;
mod probe;
mod source;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use probe::{parse_frame_rate, probe_frame_times, probe_video, VideoInfo};
pub use source::{FfmpegSource, ProbedFrameCallbacks};
