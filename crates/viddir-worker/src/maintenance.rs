//! Removing a video's pipeline artifacts when the video itself is deleted.

use anyhow::{Context, Result};

use viddir_core::models::Video;
use viddir_storage::Bucket;

use crate::context::StageContext;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub unpinned: usize,
    pub records_deleted: u64,
    pub transcript_deleted: bool,
    pub files_deleted: usize,
}

/// Unpin every published rendition, garbage-collect the content store once,
/// drop resolution records and transcript, then delete the working file and
/// thumbnail. Files that are already gone are skipped.
///
/// Content store failures are logged and do not stop the purge.
#[tracing::instrument(skip(ctx, video), fields(video_url = %video.url))]
pub async fn purge_video_artifacts(ctx: &StageContext, video: &Video) -> Result<PurgeReport> {
    let mut report = PurgeReport::default();

    let records = ctx
        .videos
        .resolutions(video.id)
        .await
        .context("Failed to load resolution records")?;
    for record in &records {
        match ctx.content_store.unpin(&record.content_hash).await {
            Ok(()) => report.unpinned += 1,
            Err(e) => tracing::warn!(
                content_hash = %record.content_hash,
                resolution = %record.resolution,
                error = %e,
                "Failed to unpin content"
            ),
        }
    }
    if let Err(e) = ctx.content_store.collect_garbage().await {
        tracing::warn!(error = %e, "Content store garbage collection failed");
    }

    report.records_deleted = ctx.videos.delete_resolutions(video.id, None).await?;
    report.transcript_deleted = ctx.videos.delete_transcript(video.id).await?;

    if ctx.storage.remove(Bucket::Videos, &video.working_file).await? {
        report.files_deleted += 1;
    }
    if let Some(thumbnail) = &video.thumbnail {
        if ctx.storage.remove(Bucket::Thumbnails, thumbnail).await? {
            report.files_deleted += 1;
        }
    }

    tracing::info!(
        unpinned = report.unpinned,
        records_deleted = report.records_deleted,
        transcript_deleted = report.transcript_deleted,
        files_deleted = report.files_deleted,
        "Video artifacts purged"
    );
    Ok(report)
}
