//! Submission facade used by request handlers.
//!
//! Owns one [`StageWorker`] per stage. Every submit enqueues and then starts
//! the stage's loop if it is not running yet.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use viddir_core::models::{EditRequest, FilterRequest};

use crate::context::StageContext;
use crate::maintenance::{purge_video_artifacts, PurgeReport};
use crate::queue::{event_channel, JobEvent, JobSink, StageWorker};
use crate::stages::{EditHandler, FilterHandler, NormalizeHandler, PublishHandler, TranscribeHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationToggle {
    /// The video was published and is now hidden. Its renditions and
    /// transcript are kept.
    Unpublished,
    /// The video was unpublished and a publish job was queued.
    PublishQueued,
}

pub struct Pipeline {
    ctx: StageContext,
    normalize: Arc<StageWorker<NormalizeHandler>>,
    publish: Arc<StageWorker<PublishHandler>>,
    edit: Arc<StageWorker<EditHandler>>,
    filter: Arc<StageWorker<FilterHandler>>,
    transcribe: Arc<StageWorker<TranscribeHandler>>,
    events: broadcast::Sender<JobEvent>,
}

impl Pipeline {
    pub fn new(ctx: StageContext, poll_interval: Duration) -> Self {
        let events = event_channel();

        let transcribe = Arc::new(StageWorker::new(
            Arc::new(TranscribeHandler::new(ctx.clone())),
            poll_interval,
            events.clone(),
        ));
        let publish = Arc::new(StageWorker::new(
            Arc::new(PublishHandler::new(ctx.clone(), transcribe.clone())),
            poll_interval,
            events.clone(),
        ));
        let normalize = Arc::new(StageWorker::new(
            Arc::new(NormalizeHandler::new(ctx.clone())),
            poll_interval,
            events.clone(),
        ));
        let edit = Arc::new(StageWorker::new(
            Arc::new(EditHandler::new(ctx.clone())),
            poll_interval,
            events.clone(),
        ));
        let filter = Arc::new(StageWorker::new(
            Arc::new(FilterHandler::new(ctx.clone())),
            poll_interval,
            events.clone(),
        ));

        Self {
            ctx,
            normalize,
            publish,
            edit,
            filter,
            transcribe,
            events,
        }
    }

    /// Job outcomes from every stage.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Queue normalization of a freshly uploaded master.
    pub fn submit_upload(&self, video_url: &str) -> Result<()> {
        self.normalize.submit(video_url.to_string())
    }

    /// Queue publishing regardless of the current flag. Rungs are replaced
    /// by label, so republishing is safe.
    pub fn submit_publish(&self, video_url: &str) -> Result<()> {
        self.publish.submit(video_url.to_string())
    }

    /// Hide a published video, or queue publishing for an unpublished one.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_publication(&self, video_url: &str) -> Result<PublicationToggle> {
        let mut video = self.ctx.load_video(video_url).await?;
        if video.is_published {
            video.mark_unpublished();
            self.ctx.save_video(&mut video).await?;
            tracing::info!("Video unpublished");
            Ok(PublicationToggle::Unpublished)
        } else {
            self.submit_publish(video_url)?;
            Ok(PublicationToggle::PublishQueued)
        }
    }

    /// Unpublish the video, then queue the edit. Publishing again is a
    /// separate request.
    #[tracing::instrument(skip(self, request), fields(video_url = %request.video_url))]
    pub async fn submit_edit(&self, request: EditRequest) -> Result<()> {
        self.unpublish_for_rework(&request.video_url).await?;
        self.edit.submit(request)
    }

    #[tracing::instrument(skip(self, request), fields(video_url = %request.video_url))]
    pub async fn submit_filter(&self, request: FilterRequest) -> Result<()> {
        self.unpublish_for_rework(&request.video_url).await?;
        self.filter.submit(request)
    }

    pub fn submit_transcription(&self, video_url: &str) -> Result<()> {
        self.transcribe.submit(video_url.to_string())
    }

    /// Remove the pipeline artifacts of a video that is being deleted.
    pub async fn purge(&self, video_url: &str) -> Result<PurgeReport> {
        let video = self.ctx.load_video(video_url).await?;
        purge_video_artifacts(&self.ctx, &video).await
    }

    async fn unpublish_for_rework(&self, video_url: &str) -> Result<()> {
        let mut video = self.ctx.load_video(video_url).await?;
        video.mark_unpublished();
        self.ctx.save_video(&mut video).await
    }

    pub fn normalize_worker(&self) -> &Arc<StageWorker<NormalizeHandler>> {
        &self.normalize
    }

    pub fn publish_worker(&self) -> &Arc<StageWorker<PublishHandler>> {
        &self.publish
    }

    pub fn edit_worker(&self) -> &Arc<StageWorker<EditHandler>> {
        &self.edit
    }

    pub fn filter_worker(&self) -> &Arc<StageWorker<FilterHandler>> {
        &self.filter
    }

    pub fn transcribe_worker(&self) -> &Arc<StageWorker<TranscribeHandler>> {
        &self.transcribe
    }
}
