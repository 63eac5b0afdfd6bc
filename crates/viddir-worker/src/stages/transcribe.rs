use anyhow::{Context, Result};
use async_trait::async_trait;

use viddir_storage::Bucket;

use super::audio_name;
use crate::context::StageContext;
use crate::queue::{JobHandler, Stage};

/// Extracts the working file's audio, sends it to speech-to-text and stores
/// the result as the video's only transcript.
pub struct TranscribeHandler {
    ctx: StageContext,
}

impl TranscribeHandler {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl JobHandler for TranscribeHandler {
    type Job = String;

    fn stage(&self) -> Stage {
        Stage::Transcribe
    }

    #[tracing::instrument(skip(self), fields(stage = "transcribe"))]
    async fn handle(&self, video_url: String) -> Result<()> {
        let ctx = &self.ctx;
        let mut video = ctx.load_video(&video_url).await?;
        let Some(working) = ctx.existing_working_path(&video).await? else {
            return Ok(());
        };

        let audio_file = audio_name(&video.working_file);
        let audio = ctx.storage.audio_path(&audio_file)?;
        ctx.transcoder
            .extract_audio(&working, &audio)
            .await
            .context("Audio extraction failed")?;

        let result = ctx.transcriber.transcribe(&audio_file).await?;
        ctx.videos
            .replace_transcript(video.id, &result.language, &result.transcript)
            .await?;

        video.touch();
        ctx.save_video(&mut video).await?;

        ctx.storage.remove(Bucket::Audio, &audio_file).await?;

        tracing::info!(language = %result.language, "Transcript stored");
        Ok(())
    }
}
