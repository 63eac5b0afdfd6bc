//! Read-only queries backing the recommendation engine.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use std::collections::HashSet;
use uuid::Uuid;

use viddir_core::models::{CatalogVideo, ViewedVideo};
use viddir_core::AppError;

#[async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Videos the viewer has watched, most watched first.
    async fn view_history(&self, viewer_id: Uuid) -> Result<Vec<ViewedVideo>, AppError>;

    /// Every published video with its total view count, most viewed first.
    async fn published_catalog(&self) -> Result<Vec<CatalogVideo>, AppError>;

    async fn followed_channels(&self, viewer_id: Uuid) -> Result<HashSet<Uuid>, AppError>;
}

#[derive(Debug, sqlx::FromRow)]
struct ViewedVideoRow {
    video_id: Uuid,
    title: String,
    view_count: i64,
    tags: Vec<String>,
}

impl From<ViewedVideoRow> for ViewedVideo {
    fn from(row: ViewedVideoRow) -> Self {
        ViewedVideo {
            video_id: row.video_id,
            title: row.title,
            view_count: row.view_count,
            tags: row.tags,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CatalogVideoRow {
    id: Uuid,
    url: String,
    title: String,
    channel_id: Uuid,
    tags: Vec<String>,
    total_views: i64,
}

impl From<CatalogVideoRow> for CatalogVideo {
    fn from(row: CatalogVideoRow) -> Self {
        CatalogVideo {
            id: row.id,
            url: row.url,
            title: row.title,
            channel_id: row.channel_id,
            tags: row.tags,
            total_views: row.total_views,
        }
    }
}

/// PostgreSQL implementation of [`RecommendationSource`].
#[derive(Clone)]
pub struct PgRecommendationSource {
    pool: PgPool,
}

impl PgRecommendationSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecommendationSource for PgRecommendationSource {
    #[tracing::instrument(skip(self), fields(db.table = "video_views"))]
    async fn view_history(&self, viewer_id: Uuid) -> Result<Vec<ViewedVideo>, AppError> {
        let rows = sqlx::query_as::<Postgres, ViewedVideoRow>(
            r#"
            SELECT v.id AS video_id,
                   v.title,
                   SUM(vv.view_count)::BIGINT AS view_count,
                   ARRAY(
                       SELECT t.name FROM video_tags vt
                       JOIN tags t ON t.id = vt.tag_id
                       WHERE vt.video_id = v.id
                   ) AS tags
            FROM video_views vv
            JOIN videos v ON v.id = vv.video_id
            WHERE vv.user_id = $1
            GROUP BY v.id, v.title
            ORDER BY view_count DESC
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ViewedVideo::from).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "videos"))]
    async fn published_catalog(&self) -> Result<Vec<CatalogVideo>, AppError> {
        let rows = sqlx::query_as::<Postgres, CatalogVideoRow>(
            r#"
            SELECT v.id,
                   v.url,
                   v.title,
                   v.channel_id,
                   ARRAY(
                       SELECT t.name FROM video_tags vt
                       JOIN tags t ON t.id = vt.tag_id
                       WHERE vt.video_id = v.id
                   ) AS tags,
                   COALESCE(SUM(vv.view_count), 0)::BIGINT AS total_views
            FROM videos v
            LEFT JOIN video_views vv ON vv.video_id = v.id
            WHERE v.is_published
            GROUP BY v.id
            ORDER BY total_views DESC, v.published_at DESC NULLS LAST
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CatalogVideo::from).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "channel_followers"))]
    async fn followed_channels(&self, viewer_id: Uuid) -> Result<HashSet<Uuid>, AppError> {
        let channels: Vec<Uuid> =
            sqlx::query_scalar("SELECT channel_id FROM channel_followers WHERE user_id = $1")
                .bind(viewer_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(channels.into_iter().collect())
    }
}
