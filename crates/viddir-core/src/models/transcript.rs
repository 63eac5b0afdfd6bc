use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Speech-to-text output attached to a video. At most one per video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transcript {
    pub id: Uuid,
    pub video_id: Uuid,
    pub language: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Transcript {
    pub fn new(video_id: Uuid, language: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            video_id,
            language: language.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
