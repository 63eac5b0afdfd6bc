//! Video repository: videos, their resolution records and transcripts.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use viddir_core::models::{ResolutionRecord, Transcript, Video};
use viddir_core::AppError;

/// Record operations the pipeline depends on.
///
/// Replacements are delete-then-insert, so a reader can briefly observe a
/// video with the replaced rung or transcript missing.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn find_video_by_url(&self, url: &str) -> Result<Option<Video>, AppError>;

    async fn find_video_by_id(&self, id: Uuid) -> Result<Option<Video>, AppError>;

    /// Persist the mutable fields of `video` and bump its stored revision.
    /// Returns the revision that was stored before this write.
    async fn update_video(&self, video: &Video) -> Result<i64, AppError>;

    async fn resolutions(&self, video_id: Uuid) -> Result<Vec<ResolutionRecord>, AppError>;

    async fn insert_resolution(&self, record: &ResolutionRecord) -> Result<(), AppError>;

    /// Delete records for `video_id`, limited to one label when given.
    async fn delete_resolutions(
        &self,
        video_id: Uuid,
        resolution: Option<&str>,
    ) -> Result<u64, AppError>;

    async fn transcript(&self, video_id: Uuid) -> Result<Option<Transcript>, AppError>;

    async fn insert_transcript(&self, transcript: &Transcript) -> Result<(), AppError>;

    async fn delete_transcript(&self, video_id: Uuid) -> Result<bool, AppError>;

    /// Upsert by label: drop any record sharing `resolution`, then insert.
    async fn replace_resolution(
        &self,
        video_id: Uuid,
        resolution: &str,
        content_hash: &str,
    ) -> Result<ResolutionRecord, AppError> {
        self.delete_resolutions(video_id, Some(resolution)).await?;
        let record = ResolutionRecord::new(video_id, resolution, content_hash);
        self.insert_resolution(&record).await?;
        Ok(record)
    }

    /// Drop every record of the video and insert a single one.
    async fn replace_all_resolutions(
        &self,
        video_id: Uuid,
        resolution: &str,
        content_hash: &str,
    ) -> Result<ResolutionRecord, AppError> {
        self.delete_resolutions(video_id, None).await?;
        let record = ResolutionRecord::new(video_id, resolution, content_hash);
        self.insert_resolution(&record).await?;
        Ok(record)
    }

    async fn replace_transcript(
        &self,
        video_id: Uuid,
        language: &str,
        content: &str,
    ) -> Result<Transcript, AppError> {
        self.delete_transcript(video_id).await?;
        let transcript = Transcript::new(video_id, language, content);
        self.insert_transcript(&transcript).await?;
        Ok(transcript)
    }
}

const VIDEO_COLUMNS: &str = r#"
    v.id, v.url, v.channel_id, v.title, v.description, v.working_file, v.thumbnail,
    v.is_published, v.published_at, v.revision, v.created_at, v.updated_at,
    ARRAY(
        SELECT t.name FROM video_tags vt
        JOIN tags t ON t.id = vt.tag_id
        WHERE vt.video_id = v.id
        ORDER BY t.name
    ) AS tags
"#;

/// PostgreSQL implementation of [`VideoRepository`].
#[derive(Clone)]
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    #[tracing::instrument(skip(self), fields(db.table = "videos"))]
    async fn find_video_by_url(&self, url: &str) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<Postgres, Video>(&format!(
            "SELECT {} FROM videos v WHERE v.url = $1",
            VIDEO_COLUMNS
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(video)
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos", db.record_id = %id))]
    async fn find_video_by_id(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<Postgres, Video>(&format!(
            "SELECT {} FROM videos v WHERE v.id = $1",
            VIDEO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(video)
    }

    #[tracing::instrument(skip(self, video), fields(db.table = "videos", db.record_id = %video.id))]
    async fn update_video(&self, video: &Video) -> Result<i64, AppError> {
        let previous: Option<i64> = sqlx::query_scalar(
            r#"
            WITH previous AS (
                SELECT id, revision FROM videos WHERE id = $1 FOR UPDATE
            )
            UPDATE videos
            SET title = $2,
                description = $3,
                working_file = $4,
                thumbnail = $5,
                is_published = $6,
                published_at = $7,
                updated_at = $8,
                revision = previous.revision + 1
            FROM previous
            WHERE videos.id = previous.id
            RETURNING previous.revision
            "#,
        )
        .bind(video.id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.working_file)
        .bind(&video.thumbnail)
        .bind(video.is_published)
        .bind(video.published_at)
        .bind(video.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        previous.ok_or_else(|| AppError::NotFound(format!("video {}", video.id)))
    }

    #[tracing::instrument(skip(self), fields(db.table = "resolution_records", db.record_id = %video_id))]
    async fn resolutions(&self, video_id: Uuid) -> Result<Vec<ResolutionRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, ResolutionRecord>(
            r#"
            SELECT id, video_id, resolution, content_hash, created_at, updated_at
            FROM resolution_records
            WHERE video_id = $1
            ORDER BY resolution
            "#,
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    #[tracing::instrument(skip(self, record), fields(db.table = "resolution_records", resolution = %record.resolution))]
    async fn insert_resolution(&self, record: &ResolutionRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO resolution_records (id, video_id, resolution, content_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id)
        .bind(record.video_id)
        .bind(&record.resolution)
        .bind(&record.content_hash)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "resolution_records", db.record_id = %video_id))]
    async fn delete_resolutions(
        &self,
        video_id: Uuid,
        resolution: Option<&str>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM resolution_records
            WHERE video_id = $1 AND ($2::TEXT IS NULL OR resolution = $2)
            "#,
        )
        .bind(video_id)
        .bind(resolution)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self), fields(db.table = "transcripts", db.record_id = %video_id))]
    async fn transcript(&self, video_id: Uuid) -> Result<Option<Transcript>, AppError> {
        let transcript = sqlx::query_as::<Postgres, Transcript>(
            "SELECT id, video_id, language, content, created_at FROM transcripts WHERE video_id = $1",
        )
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(transcript)
    }

    #[tracing::instrument(skip(self, transcript), fields(db.table = "transcripts", db.record_id = %transcript.video_id))]
    async fn insert_transcript(&self, transcript: &Transcript) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO transcripts (id, video_id, language, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(transcript.id)
        .bind(transcript.video_id)
        .bind(&transcript.language)
        .bind(&transcript.content)
        .bind(transcript.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "transcripts", db.record_id = %video_id))]
    async fn delete_transcript(&self, video_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM transcripts WHERE video_id = $1")
            .bind(video_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
