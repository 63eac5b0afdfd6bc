use anyhow::{anyhow, Context, Result};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use viddir_core::PipelineConfig;
use viddir_db::{create_pool, PgVideoRepository};
use viddir_processing::FfmpegTranscoder;
use viddir_services::HttpTranscriber;
use viddir_storage::{IpfsContentStore, WorkingStorage};
use viddir_worker::{JobEvent, Stage, StageContext};

/// Initialize tracing for CLI binaries. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Wire the production collaborators from configuration.
pub async fn build_context(config: &PipelineConfig) -> Result<(StageContext, PgPool)> {
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;

    let storage = WorkingStorage::new(
        &config.videos_dir,
        &config.thumbnails_dir,
        &config.audio_dir,
    )
    .await
    .context("Failed to prepare working storage")?;
    let content_store =
        IpfsContentStore::new(&config.content_store_url, &config.content_gateway_url)
            .context("Failed to create content store client")?;
    let transcoder = FfmpegTranscoder::new(&config.ffmpeg_path, &config.ffprobe_path)?;
    let transcriber =
        HttpTranscriber::new(&config.transcription_url, config.transcription_timeout())?;

    let ctx = StageContext {
        videos: Arc::new(PgVideoRepository::new(pool.clone())),
        transcoder: Arc::new(transcoder),
        content_store: Arc::new(content_store),
        transcriber: Arc::new(transcriber),
        storage,
        overlay_font_path: config.overlay_font_path.clone(),
    };
    Ok((ctx, pool))
}

/// Block until `stage` reports on `video_url`. A failed job becomes an error.
pub async fn wait_for_stage(
    events: &mut broadcast::Receiver<JobEvent>,
    stage: Stage,
    video_url: &str,
) -> Result<()> {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped = skipped, "Missed job events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                return Err(anyhow!("Job event channel closed"));
            }
        };
        if event.stage() != stage || event.video_url() != video_url {
            continue;
        }
        return match event {
            JobEvent::Completed { .. } => Ok(()),
            JobEvent::Failed { error, .. } => Err(anyhow!("{} job failed: {}", stage, error)),
        };
    }
}

/// Parse `W:H` (or `W/H`) into an aspect ratio.
pub fn parse_aspect(value: &str) -> Result<(u32, u32)> {
    let (numerator, denominator) = value
        .split_once(':')
        .or_else(|| value.split_once('/'))
        .ok_or_else(|| anyhow!("Aspect ratio must look like 16:9, got '{}'", value))?;
    let numerator: u32 = numerator
        .trim()
        .parse()
        .with_context(|| format!("Invalid aspect numerator in '{}'", value))?;
    let denominator: u32 = denominator
        .trim()
        .parse()
        .with_context(|| format!("Invalid aspect denominator in '{}'", value))?;
    if numerator == 0 || denominator == 0 {
        return Err(anyhow!("Aspect ratio terms must be non-zero"));
    }
    Ok((numerator, denominator))
}

/// Fractional seconds to a [`Duration`].
pub fn parse_seconds(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| anyhow!("'{}' is not a valid number of seconds", seconds))
}
