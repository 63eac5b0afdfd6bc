use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

use viddir_core::constants::{AUDIO_QUALITY_GOOD_KBPS, NORMALIZED_FRAME_RATE};
use viddir_core::models::EditRequest;
use viddir_processing::{fit_aspect, resolution_label, EncodeOptions, TextOverlay};
use viddir_storage::remove_if_exists;

use super::derived_name;
use crate::context::StageContext;
use crate::queue::{JobHandler, Stage};

/// Applies trim, transpose, aspect and overlay steps in that order. Each
/// requested step re-encodes into a temp file that then replaces the working
/// file. The publication flag is left as the caller set it.
pub struct EditHandler {
    ctx: StageContext,
}

impl EditHandler {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    async fn apply_step(
        &self,
        working: &Path,
        temp: &Path,
        options: &EncodeOptions,
        step: &str,
    ) -> Result<()> {
        let encoded = self.ctx.transcoder.encode(working, temp, options).await;
        if let Err(e) = encoded {
            if let Err(cleanup) = remove_if_exists(temp).await {
                tracing::warn!(temp = %temp.display(), error = %cleanup, "Failed to delete edit output");
            }
            return Err(e).with_context(|| format!("Edit step '{}' failed", step));
        }
        self.ctx.storage.replace(temp, working).await?;
        tracing::debug!(step = step, "Edit step applied");
        Ok(())
    }
}

#[async_trait]
impl JobHandler for EditHandler {
    type Job = EditRequest;

    fn stage(&self) -> Stage {
        Stage::Edit
    }

    #[tracing::instrument(skip(self, request), fields(stage = "edit", video_url = %request.video_url))]
    async fn handle(&self, request: EditRequest) -> Result<()> {
        let ctx = &self.ctx;
        let mut video = ctx.load_video(&request.video_url).await?;
        let Some(working) = ctx.existing_working_path(&video).await? else {
            return Ok(());
        };
        let temp = ctx
            .storage
            .video_path(&derived_name(&video.working_file, "edited"))?;

        let probe = ctx.transcoder.probe(&working).await?;
        let frame_rate = probe.frame_rate.min(NORMALIZED_FRAME_RATE);
        let audio_bitrate = probe
            .audio_bitrate_kbps
            .map_or(AUDIO_QUALITY_GOOD_KBPS, |kbps| kbps.min(AUDIO_QUALITY_GOOD_KBPS));
        let base = EncodeOptions::fast_start()
            .frame_rate(frame_rate)
            .audio_bitrate(audio_bitrate);

        // The published label follows the last computed target size, which is
        // the probed size unless the aspect step ran.
        let (mut width, mut height) = (probe.width, probe.height);
        let mut steps = 0usize;

        if let Some((from, to)) = request.trim_window(probe.duration) {
            self.apply_step(&working, &temp, &base.clone().seek(from, to), "trim")
                .await?;
            steps += 1;
        }

        if let Some(code) = request.transpose() {
            self.apply_step(&working, &temp, &base.clone().transpose(code), "transpose")
                .await?;
            steps += 1;
        }

        if let Some((numerator, denominator)) = request.aspect_ratio() {
            let current = ctx.transcoder.probe(&working).await?;
            (width, height) = fit_aspect(current.width, current.height, numerator, denominator);
            self.apply_step(&working, &temp, &base.clone().scale(width, height), "aspect")
                .await?;
            steps += 1;
        }

        if let Some(text) = request.overlay() {
            let overlay = TextOverlay::new(text, ctx.overlay_font_path.as_str());
            self.apply_step(&working, &temp, &base.clone().overlay(overlay), "overlay")
                .await?;
            steps += 1;
        }

        let label = resolution_label(width, height);
        let content_hash = ctx.upload(&working).await?;
        ctx.videos
            .replace_resolution(video.id, &label, &content_hash)
            .await?;

        video.touch();
        ctx.save_video(&mut video).await?;

        tracing::info!(
            steps_applied = steps,
            label = %label,
            content_hash = %content_hash,
            "Video edited"
        );
        Ok(())
    }
}
