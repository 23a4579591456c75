//! Sprite sheet generation for local video files.
//!
//! Argument parsing, logging setup and output writing for the
//! `swing-sprites` binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use swing_core::{HandleRegistry, SpriteConfig, SpriteFormat, SpriteSheet};

/// Name of the cue file written next to the sprite.
pub const CUES_FILE_NAME: &str = "thumbnails.vtt";

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a scrub-preview sprite sheet and WebVTT cues", long_about = None)]
pub struct Args {
    /// Input video file
    pub input: PathBuf,

    /// Directory for the sprite and cue file
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Number of tiles (overrides SWING_SPRITE_COUNT)
    #[arg(short = 'n', long)]
    pub count: Option<u32>,

    /// Tile width in pixels
    #[arg(long)]
    pub tile_width: Option<u32>,

    /// Tile height in pixels
    #[arg(long)]
    pub tile_height: Option<u32>,

    /// Sprite encoding
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Jpeg)]
    pub format: OutputFormat,

    /// Probe frame timestamps and log the detected playback rate first
    #[arg(long)]
    pub detect_fps: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl Args {
    /// Apply command-line overrides on top of the environment config.
    pub fn sprite_config(&self, base: SpriteConfig) -> SpriteConfig {
        SpriteConfig {
            count: self.count.unwrap_or(base.count).max(1),
            tile_width: self.tile_width.unwrap_or(base.tile_width).max(1),
            tile_height: self.tile_height.unwrap_or(base.tile_height).max(1),
            ..base
        }
    }

    pub fn sprite_format(&self, jpeg_quality: u8) -> SpriteFormat {
        match self.format {
            OutputFormat::Jpeg => SpriteFormat::Jpeg {
                quality: jpeg_quality,
            },
            OutputFormat::Png => SpriteFormat::Png,
        }
    }
}

/// Initialize tracing: colored output for dev, JSON when `LOG_FORMAT=json`.
pub fn init_tracing() -> Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("swing_core=info".parse()?)
        .add_directive("swing_cli=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .try_init()?;
    }
    Ok(())
}

/// Files written for one sprite sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub sprite: PathBuf,
    pub cues: PathBuf,
}

/// Write the sprite image and a cue file that references it by file name.
///
/// The sheet's handles must still be live; releasing them is up to the caller.
pub async fn write_outputs(
    sheet: &SpriteSheet,
    registry: &HandleRegistry,
    out_dir: &Path,
) -> Result<WrittenFiles> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let sprite_name = format!("sprite.{}", sheet.extension);
    let image = registry
        .get(sheet.sprite)
        .with_context(|| format!("sprite handle {} is no longer live", sheet.sprite))?;

    let sprite = out_dir.join(&sprite_name);
    tokio::fs::write(&sprite, &image.bytes)
        .await
        .with_context(|| format!("writing {}", sprite.display()))?;

    let cues = out_dir.join(CUES_FILE_NAME);
    tokio::fs::write(&cues, sheet.vtt_for(&sprite_name))
        .await
        .with_context(|| format!("writing {}", cues.display()))?;

    Ok(WrittenFiles { sprite, cues })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use swing_core::progress::noop_sender;
    use swing_core::source::synthetic::SyntheticVideo;
    use swing_core::{CancelToken, ImageRasterizer, SharedVideo, SpriteGenerator};

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from([
            "swing-sprites",
            "clip.mp4",
            "--count",
            "25",
            "--tile-width",
            "120",
            "--format",
            "png",
        ]);
        let config = args.sprite_config(SpriteConfig::default());
        assert_eq!(config.count, 25);
        assert_eq!(config.tile_width, 120);
        assert_eq!(config.tile_height, 90);
        assert_eq!(args.sprite_format(80), SpriteFormat::Png);
        assert_eq!(args.out_dir, PathBuf::from("."));
        assert!(!args.detect_fps);
    }

    #[tokio::test]
    async fn test_write_outputs() {
        let registry = HandleRegistry::new();
        let generator = SpriteGenerator::new(
            SpriteConfig {
                count: 4,
                tile_width: 8,
                tile_height: 6,
                settle_delay: Duration::ZERO,
                ..SpriteConfig::default()
            },
            ImageRasterizer::new(SpriteFormat::Png),
            registry.clone(),
        );
        let video = SharedVideo::new(SyntheticVideo::new("swing.mp4", 4.0));
        let outcome = generator
            .generate(&video, &CancelToken::new(), &noop_sender())
            .await
            .unwrap();
        let sheet = outcome.sheet().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("previews");
        let files = write_outputs(sheet, &registry, &out_dir).await.unwrap();

        assert_eq!(files.sprite, out_dir.join("sprite.png"));
        let png = std::fs::read(&files.sprite).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");

        let vtt = std::fs::read_to_string(&files.cues).unwrap();
        assert!(vtt.starts_with("WEBVTT"));
        assert!(vtt.contains("sprite.png#xywh=8,0,8,6"));
        assert!(!vtt.contains("blob:"));

        sheet.release(&registry);
        assert!(write_outputs(sheet, &registry, &out_dir).await.is_err());
    }
}
