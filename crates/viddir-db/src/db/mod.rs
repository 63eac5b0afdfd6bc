//! Database repositories for data access layer
//!
//! `video` covers the records the pipeline mutates (videos, resolution records,
//! transcripts). `recommendation` covers the read-only view history, catalog
//! and follow queries used for ranking.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub mod recommendation;
pub mod video;

pub use recommendation::{PgRecommendationSource, RecommendationSource};
pub use video::{PgVideoRepository, VideoRepository};

const ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Open a connection pool against `database_url`.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
        .connect(database_url)
        .await
        .context("Failed to connect to database")
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}
