use anyhow::{Context, Result};
use async_trait::async_trait;
use image::RgbaImage;

use viddir_core::models::FilterRequest;
use viddir_processing::{resolution_label, EncodeOptions, FrameGeometry, FramePlan};
use viddir_storage::remove_if_exists;

use super::{audio_name, derived_name};
use crate::context::StageContext;
use crate::queue::{JobHandler, Stage};

/// Runs pixel filters over every decoded frame, restores the original audio
/// and re-encodes back to the source's size, rate and bitrates.
pub struct FilterHandler {
    ctx: StageContext,
}

impl FilterHandler {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl JobHandler for FilterHandler {
    type Job = FilterRequest;

    fn stage(&self) -> Stage {
        Stage::Filter
    }

    #[tracing::instrument(skip(self, request), fields(stage = "filter", video_url = %request.video_url))]
    async fn handle(&self, request: FilterRequest) -> Result<()> {
        let ctx = &self.ctx;
        let mut video = ctx.load_video(&request.video_url).await?;
        let Some(working) = ctx.existing_working_path(&video).await? else {
            return Ok(());
        };
        let probe = ctx.transcoder.probe(&working).await?;

        let plan = FramePlan::from_request(&request);
        tracing::debug!(ops = ?plan.ops(), "Frame filter plan");

        let filtered = ctx
            .storage
            .video_path(&derived_name(&video.working_file, "filtered"))?;
        let apply = |frame: &mut RgbaImage| plan.apply(frame);
        let frames = ctx
            .transcoder
            .filter_frames(&working, &filtered, &FrameGeometry::from_probe(&probe), &apply)
            .await
            .context("Frame filtering failed")?;

        if probe.has_audio {
            let audio = ctx.storage.audio_path(&audio_name(&video.working_file))?;
            let muxed = ctx
                .storage
                .video_path(&derived_name(&video.working_file, "muxed"))?;

            ctx.transcoder
                .extract_audio(&working, &audio)
                .await
                .context("Audio extraction failed")?;
            ctx.transcoder
                .replace_audio(&filtered, &audio, &muxed)
                .await
                .context("Audio re-mux failed")?;
            ctx.storage.replace(&muxed, &filtered).await?;
            remove_if_exists(&audio).await?;
        } else {
            tracing::debug!("Source has no audio stream, skipping re-mux");
        }

        let mut options = EncodeOptions::fast_start()
            .scale(probe.width, probe.height)
            .frame_rate(probe.frame_rate);
        if let Some(kbps) = probe.video_bitrate_kbps {
            options = options.video_bitrate(kbps);
        }
        if let Some(kbps) = probe.audio_bitrate_kbps {
            options = options.audio_bitrate(kbps);
        }
        ctx.transcoder
            .encode(&filtered, &working, &options)
            .await
            .context("Final filter encode failed")?;
        remove_if_exists(&filtered).await?;

        let result = ctx.transcoder.probe(&working).await?;
        let label = resolution_label(result.width, result.height);
        let content_hash = ctx.upload(&working).await?;
        ctx.videos
            .replace_resolution(video.id, &label, &content_hash)
            .await?;

        let working_file = video.working_file.clone();
        video.replace_working_file(working_file);
        ctx.save_video(&mut video).await?;

        tracing::info!(
            frames = frames,
            label = %label,
            content_hash = %content_hash,
            "Video filtered"
        );
        Ok(())
    }
}
