//! Scrub-preview sprite generator binary.

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, info, warn};

use swing_cli::{init_tracing, write_outputs, Args};
use swing_core::ffmpeg::{check_ffmpeg, check_ffprobe, FfmpegSource, ProbedFrameCallbacks};
use swing_core::progress::{self, noop_sender};
use swing_core::{
    detect_fps, CancelToken, EngineConfig, GenerationOutcome, HandleRegistry, ImageRasterizer,
    ProgressEvent, SharedVideo, SpriteGenerator, SpriteProgress,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing()?;

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    let config = EngineConfig::from_env();
    debug!("Engine config: {:?}", config);

    check_ffmpeg()?;
    check_ffprobe()?;

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            on_signal.cancel();
        }
    });

    if args.detect_fps {
        let mut callbacks =
            ProbedFrameCallbacks::probe(&args.input, config.frame_clock.sample_count + 1).await?;
        let detection =
            detect_fps(&mut callbacks, &config.frame_clock, &cancel, &noop_sender()).await;
        info!(
            fps = detection.fps,
            source = ?detection.source,
            raw = ?detection.raw_estimate,
            "Playback frame rate"
        );
    }

    let source = FfmpegSource::open(&args.input)?.with_cancel(cancel.clone());
    let video = SharedVideo::new(source);

    let sprite_config = args.sprite_config(config.sprite);
    let rasterizer = ImageRasterizer::new(args.sprite_format(sprite_config.jpeg_quality));
    let registry = HandleRegistry::new();
    let generator = SpriteGenerator::new(sprite_config, rasterizer, registry.clone());

    let (progress, mut events) = progress::channel(args.input.display().to_string());
    let reporter = tokio::spawn(async move {
        let mut state = SpriteProgress::default();
        while let Some(event) = events.recv().await {
            state.apply(&event);
            if let ProgressEvent::TileRendered { .. } = event {
                debug!(
                    done = state.tiles_done,
                    total = state.total_tiles,
                    percent = (state.fraction() * 100.0).round(),
                    "Sprite progress"
                );
            }
        }
    });

    let outcome = generator.generate(&video, &cancel, &progress).await;
    drop(progress);
    reporter.await.ok();

    match outcome? {
        GenerationOutcome::Complete(sheet) => {
            let written = write_outputs(&sheet, &registry, &args.out_dir).await;
            sheet.release(&registry);
            let files = written?;
            info!(
                sprite = %files.sprite.display(),
                cues = %files.cues.display(),
                tiles = sheet.cues.len(),
                "Wrote sprite sheet"
            );
        }
        GenerationOutcome::Cancelled => warn!("Sprite generation cancelled, nothing written"),
    }

    debug!(metrics = %metrics.render(), "Metrics snapshot");
    Ok(())
}
