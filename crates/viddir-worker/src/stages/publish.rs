use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use viddir_core::models::Video;
use viddir_processing::{EncodeOptions, Rung, PUBLISH_LADDER};
use viddir_storage::remove_if_exists;

use super::ladder_name;
use crate::context::StageContext;
use crate::queue::{JobHandler, JobSink, Stage};

/// Encodes every ladder rung from the working file, publishes the video and
/// hands it to transcription.
///
/// A failing rung is logged and skipped; the video is published with
/// whatever rungs succeeded.
pub struct PublishHandler {
    ctx: StageContext,
    transcription: Arc<dyn JobSink<String>>,
}

impl PublishHandler {
    pub fn new(ctx: StageContext, transcription: Arc<dyn JobSink<String>>) -> Self {
        Self { ctx, transcription }
    }

    async fn publish_rung(&self, video: &Video, source: &Path, rung: &Rung) -> Result<String> {
        let ctx = &self.ctx;
        let probe = ctx.transcoder.probe(source).await?;
        let target = rung.target_for(&probe);
        let label = target.label();

        let output = ctx
            .storage
            .video_path(&ladder_name(&video.working_file, &label))?;
        let options = EncodeOptions::fast_start()
            .scale(target.width, target.height)
            .frame_rate(target.frame_rate)
            .audio_bitrate(target.audio_bitrate_kbps);

        let published = async {
            ctx.transcoder
                .encode(source, &output, &options)
                .await
                .with_context(|| format!("Encoding {} failed", label))?;
            let content_hash = ctx.upload(&output).await?;
            ctx.videos
                .replace_resolution(video.id, &label, &content_hash)
                .await?;
            Ok::<_, anyhow::Error>(content_hash)
        }
        .await;

        if let Err(e) = remove_if_exists(&output).await {
            tracing::warn!(output = %output.display(), error = %e, "Failed to delete rung output");
        }

        let content_hash = published?;
        tracing::info!(label = %label, content_hash = %content_hash, "Rung published");
        Ok(label)
    }
}

#[async_trait]
impl JobHandler for PublishHandler {
    type Job = String;

    fn stage(&self) -> Stage {
        Stage::Publish
    }

    #[tracing::instrument(skip(self), fields(stage = "publish"))]
    async fn handle(&self, video_url: String) -> Result<()> {
        let ctx = &self.ctx;
        let mut video = ctx.load_video(&video_url).await?;
        let Some(source) = ctx.existing_working_path(&video).await? else {
            return Ok(());
        };

        let mut published = Vec::new();
        for (index, rung) in PUBLISH_LADDER.iter().enumerate() {
            match self.publish_rung(&video, &source, rung).await {
                Ok(label) => published.push(label),
                Err(e) => tracing::error!(
                    rung = index,
                    max_width = rung.max_width,
                    max_height = rung.max_height,
                    error = %e,
                    "Rung failed, continuing with the next one"
                ),
            }
        }

        video.mark_published();
        ctx.save_video(&mut video).await?;

        tracing::info!(
            rungs_published = published.len(),
            rungs_total = PUBLISH_LADDER.len(),
            labels = ?published,
            "Video published"
        );

        self.transcription
            .submit(video_url)
            .context("Failed to queue transcription")?;
        Ok(())
    }
}
