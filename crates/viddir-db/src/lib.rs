//! Viddir database layer
//!
//! Repository traits consumed by the pipeline stages and the recommendation
//! engine, with their PostgreSQL implementations.

pub mod db;

pub use db::{
    create_pool, run_migrations, PgRecommendationSource, PgVideoRepository,
    RecommendationSource, VideoRepository,
};
