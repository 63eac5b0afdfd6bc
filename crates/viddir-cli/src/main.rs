//! Viddir CLI: run pipeline stages against a configured deployment.
//!
//! Reads configuration from the environment (see `PipelineConfig`). Each stage
//! command queues the job on an in-process pipeline and waits for it to finish.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use viddir_cli::{build_context, init_tracing, parse_aspect, parse_seconds, wait_for_stage};
use viddir_core::models::{EditRequest, FilterRequest, TintFilter, ToneFilter, VideoLink};
use viddir_core::PipelineConfig;
use viddir_db::{run_migrations, PgRecommendationSource};
use viddir_services::RecommendationService;
use viddir_worker::{Pipeline, PublicationToggle, Stage, StageContext};

#[derive(Parser)]
#[command(name = "viddir", about = "Viddir media pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Normalize a freshly uploaded master
    Normalize {
        /// Video short URL
        url: String,
    },
    /// Encode the publish ladder, mark the video published and transcribe it
    Publish {
        /// Video short URL
        url: String,
    },
    /// Publish an unpublished video, or unpublish a published one
    Toggle {
        /// Video short URL
        url: String,
    },
    /// Trim, rotate, reshape or caption a video
    Edit {
        /// Video short URL
        url: String,
        /// Start of the kept window, in seconds
        #[arg(long, default_value = "0")]
        trim_from: f64,
        /// End of the kept window, in seconds (defaults to the full length)
        #[arg(long)]
        trim_to: Option<f64>,
        /// ffmpeg transpose code 0-3
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        rotation: i32,
        /// Target aspect ratio, e.g. 16:9
        #[arg(long)]
        aspect: Option<String>,
        /// Caption drawn in the top right corner
        #[arg(long, default_value = "")]
        overlay: String,
    },
    /// Run pixel filters over every frame
    Filter {
        /// Video short URL
        url: String,
        /// G grayscale, S sepia, N none
        #[arg(long, default_value = "N")]
        tone: char,
        /// R red, G green, B blue, N none
        #[arg(long, default_value = "N")]
        tint: char,
        /// Percent, 100 leaves the frame unchanged
        #[arg(long, default_value = "100")]
        brightness: i32,
        #[arg(long, default_value = "100")]
        contrast: i32,
        #[arg(long, default_value = "100")]
        saturation: i32,
    },
    /// Extract audio and store a fresh transcript
    Transcribe {
        /// Video short URL
        url: String,
    },
    /// Print published resolution links
    Links {
        /// Video short URL
        url: String,
    },
    /// Rank videos for a viewer
    Recommend {
        /// Viewer UUID
        viewer: Uuid,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Remove renditions, records and files of a video being deleted
    Purge {
        /// Video short URL
        url: String,
    },
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

async fn published_links(ctx: &StageContext, gateway: &str, url: &str) -> Result<Vec<VideoLink>> {
    let video = ctx.load_video(url).await?;
    let records = ctx.videos.resolutions(video.id).await?;
    Ok(records.iter().map(|record| record.to_link(gateway)).collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env().context("Invalid configuration")?;
    let (ctx, pool) = build_context(&config).await?;

    if let Commands::Migrate = cli.command {
        return run_migrations(&pool).await;
    }

    let pipeline = Pipeline::new(ctx.clone(), config.worker_poll_interval());
    let mut events = pipeline.subscribe();

    match cli.command {
        Commands::Migrate => {}
        Commands::Normalize { url } => {
            pipeline.submit_upload(&url)?;
            wait_for_stage(&mut events, Stage::Normalize, &url).await?;
            print_json(&ctx.load_video(&url).await?)?;
        }
        Commands::Publish { url } => {
            pipeline.submit_publish(&url)?;
            wait_for_stage(&mut events, Stage::Publish, &url).await?;
            wait_for_stage(&mut events, Stage::Transcribe, &url).await?;
            print_json(&published_links(&ctx, &config.content_gateway_url, &url).await?)?;
        }
        Commands::Toggle { url } => match pipeline.toggle_publication(&url).await? {
            PublicationToggle::Unpublished => {
                print_json(&serde_json::json!({ "url": url, "published": false }))?;
            }
            PublicationToggle::PublishQueued => {
                wait_for_stage(&mut events, Stage::Publish, &url).await?;
                wait_for_stage(&mut events, Stage::Transcribe, &url).await?;
                print_json(&serde_json::json!({ "url": url, "published": true }))?;
            }
        },
        Commands::Edit {
            url,
            trim_from,
            trim_to,
            rotation,
            aspect,
            overlay,
        } => {
            let trim_to = match trim_to {
                Some(seconds) => parse_seconds(seconds)?,
                None => {
                    let video = ctx.load_video(&url).await?;
                    ctx.transcoder.probe(&ctx.working_path(&video)?).await?.duration
                }
            };
            let (aspect_numerator, aspect_denominator) = match aspect.as_deref() {
                Some(value) => parse_aspect(value)?,
                None => (0, 0),
            };
            let request = EditRequest {
                video_url: url.clone(),
                trim_from: parse_seconds(trim_from)?,
                trim_to,
                rotation,
                aspect_numerator,
                aspect_denominator,
                overlay_text: overlay,
            };
            pipeline.submit_edit(request).await?;
            wait_for_stage(&mut events, Stage::Edit, &url).await?;
            print_json(&ctx.load_video(&url).await?)?;
        }
        Commands::Filter {
            url,
            tone,
            tint,
            brightness,
            contrast,
            saturation,
        } => {
            let request = FilterRequest {
                video_url: url.clone(),
                tone: ToneFilter::from_code(tone),
                tint: TintFilter::from_code(tint),
                brightness,
                contrast,
                saturation,
            };
            pipeline.submit_filter(request).await?;
            wait_for_stage(&mut events, Stage::Filter, &url).await?;
            print_json(&ctx.load_video(&url).await?)?;
        }
        Commands::Transcribe { url } => {
            pipeline.submit_transcription(&url)?;
            wait_for_stage(&mut events, Stage::Transcribe, &url).await?;
            let video = ctx.load_video(&url).await?;
            print_json(&ctx.videos.transcript(video.id).await?)?;
        }
        Commands::Links { url } => {
            print_json(&published_links(&ctx, &config.content_gateway_url, &url).await?)?;
        }
        Commands::Recommend { viewer, limit } => {
            let service = RecommendationService::new(
                Arc::new(PgRecommendationSource::new(pool.clone())),
                limit.unwrap_or(config.recommendation_limit),
            );
            print_json(&service.recommend(viewer).await?)?;
        }
        Commands::Purge { url } => {
            let report = pipeline.purge(&url).await?;
            print_json(&serde_json::json!({
                "url": url,
                "unpinned": report.unpinned,
                "records_deleted": report.records_deleted,
                "transcript_deleted": report.transcript_deleted,
                "files_deleted": report.files_deleted,
            }))?;
        }
    }

    Ok(())
}
