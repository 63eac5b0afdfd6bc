use anyhow::{Context, Result};
use async_trait::async_trait;

use viddir_processing::{EncodeOptions, NORMALIZATION_RUNG};
use viddir_storage::Bucket;

use super::derived_name;
use crate::context::StageContext;
use crate::queue::{JobHandler, Stage};

/// Caps a freshly uploaded master to the normalization rung and publishes it
/// as the video's only resolution.
pub struct NormalizeHandler {
    ctx: StageContext,
}

impl NormalizeHandler {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl JobHandler for NormalizeHandler {
    type Job = String;

    fn stage(&self) -> Stage {
        Stage::Normalize
    }

    #[tracing::instrument(skip(self), fields(stage = "normalize"))]
    async fn handle(&self, video_url: String) -> Result<()> {
        let ctx = &self.ctx;
        let mut video = ctx.load_video(&video_url).await?;
        let source_name = video.working_file.clone();
        let Some(source) = ctx.existing_working_path(&video).await? else {
            return Ok(());
        };

        let probe = ctx.transcoder.probe(&source).await?;
        let target = NORMALIZATION_RUNG.target_for(&probe);
        let label = target.label();

        let output_name = derived_name(&source_name, &label);
        let output = ctx.storage.video_path(&output_name)?;
        let options = EncodeOptions::fast_start()
            .scale(target.width, target.height)
            .frame_rate(target.frame_rate)
            .audio_bitrate(target.audio_bitrate_kbps);
        ctx.transcoder
            .encode(&source, &output, &options)
            .await
            .context("Normalization encode failed")?;

        video.replace_working_file(output_name.clone());
        ctx.save_video(&mut video).await?;

        let content_hash = ctx.upload(&output).await?;
        ctx.videos
            .replace_all_resolutions(video.id, &label, &content_hash)
            .await?;

        if output_name != source_name {
            ctx.storage.remove(Bucket::Videos, &source_name).await?;
        }

        tracing::info!(
            label = %label,
            width = target.width,
            height = target.height,
            content_hash = %content_hash,
            "Video normalized"
        );
        Ok(())
    }
}
