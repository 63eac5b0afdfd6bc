use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A hosted video as seen by the pipeline.
///
/// `working_file` names the file in the videos bucket that the next stage reads.
/// Every stage that replaces it, or otherwise writes the record, bumps
/// `revision` so overlapping passes on the same video can be noticed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Video {
    pub id: Uuid,
    pub url: String,
    pub channel_id: Uuid,
    pub title: String,
    pub description: String,
    pub working_file: String,
    pub thumbnail: Option<String>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Create an unpublished video pointing at a freshly uploaded master.
    pub fn new(
        url: impl Into<String>,
        channel_id: Uuid,
        title: impl Into<String>,
        working_file: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            channel_id,
            title: title.into(),
            description: String::new(),
            working_file: working_file.into(),
            thumbnail: None,
            is_published: false,
            published_at: None,
            tags: Vec::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn replace_working_file(&mut self, file_name: impl Into<String>) {
        self.working_file = file_name.into();
        self.touch();
    }

    pub fn mark_published(&mut self) {
        self.is_published = true;
        self.published_at = Some(Utc::now());
        self.touch();
    }

    /// Clear the publication flag. Published resolutions and the transcript stay.
    pub fn mark_unpublished(&mut self) {
        self.is_published = false;
        self.touch();
    }
}

/// A published rung: one content address per resolution label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ResolutionRecord {
    pub id: Uuid,
    pub video_id: Uuid,
    pub resolution: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResolutionRecord {
    pub fn new(video_id: Uuid, resolution: impl Into<String>, content_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            video_id,
            resolution: resolution.into(),
            content_hash: content_hash.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn link(&self, gateway: &str) -> String {
        gateway_link(gateway, &self.content_hash)
    }

    pub fn to_link(&self, gateway: &str) -> VideoLink {
        VideoLink {
            resolution: self.resolution.clone(),
            link: self.link(gateway),
        }
    }
}

/// Client-facing link to one published resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoLink {
    pub resolution: String,
    pub link: String,
}

/// Join a gateway prefix and a content address.
pub fn gateway_link(gateway: &str, content_hash: &str) -> String {
    format!("{}/{}", gateway.trim_end_matches('/'), content_hash)
}
