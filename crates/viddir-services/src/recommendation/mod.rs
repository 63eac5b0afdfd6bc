//! Recommendation engine.
//!
//! Ranking is a pure function over already loaded rows ([`engine`]); the
//! service wraps it with the reads from a [`viddir_db::RecommendationSource`].

pub mod engine;
pub mod service;

pub use engine::{rank_recommendations, tag_similarity};
pub use service::RecommendationService;
