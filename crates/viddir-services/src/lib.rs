//! Viddir Services Library
//!
//! Collaborators the pipeline calls out to: the speech-to-text service used by
//! transcription and the recommendation engine.

pub mod recommendation;
pub mod transcription;

pub use recommendation::{rank_recommendations, RecommendationService};
pub use transcription::{HttpTranscriber, TranscriptResult, Transcriber};
