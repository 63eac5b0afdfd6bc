//! Collaborators shared by every stage handler.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use viddir_core::models::Video;
use viddir_core::AppError;
use viddir_db::VideoRepository;
use viddir_processing::Transcoder;
use viddir_services::Transcriber;
use viddir_storage::{ContentStore, WorkingStorage};

/// Everything a stage needs to read a video, run the media tools and write
/// results back. Cheap to clone.
#[derive(Clone)]
pub struct StageContext {
    pub videos: Arc<dyn VideoRepository>,
    pub transcoder: Arc<dyn Transcoder>,
    pub content_store: Arc<dyn ContentStore>,
    pub transcriber: Arc<dyn Transcriber>,
    pub storage: WorkingStorage,
    pub overlay_font_path: String,
}

impl StageContext {
    pub async fn load_video(&self, url: &str) -> Result<Video> {
        self.videos
            .find_video_by_url(url)
            .await
            .context("Failed to load video")?
            .ok_or_else(|| AppError::video_not_found(url).into())
    }

    /// Persist `video`, warning when another pass wrote it since it was read.
    pub async fn save_video(&self, video: &mut Video) -> Result<()> {
        let read_revision = video.revision;
        let stored_revision = self
            .videos
            .update_video(video)
            .await
            .context("Failed to update video")?;

        if stored_revision != read_revision {
            tracing::warn!(
                video_url = %video.url,
                read_revision = read_revision,
                stored_revision = stored_revision,
                "concurrent modification detected"
            );
        }
        video.revision = stored_revision + 1;
        Ok(())
    }

    pub fn working_path(&self, video: &Video) -> Result<PathBuf> {
        self.storage
            .video_path(&video.working_file)
            .context("Invalid working file name")
    }

    /// Resolve the working file of `video`, or `None` when it is no longer
    /// on disk. Stages drop the job in that case without touching the record.
    pub async fn existing_working_path(&self, video: &Video) -> Result<Option<PathBuf>> {
        let path = self.working_path(video)?;
        let exists = tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("Failed to check {}", path.display()))?;
        if !exists {
            tracing::info!(
                video_url = %video.url,
                working_file = %video.working_file,
                "Working file missing, dropping job"
            );
            return Ok(None);
        }
        Ok(Some(path))
    }

    /// Add `path` to the content store and return its content address.
    pub async fn upload(&self, path: &std::path::Path) -> Result<String> {
        self.content_store
            .add(path)
            .await
            .with_context(|| format!("Failed to add {} to content store", path.display()))
    }
}
