use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One video from a viewer's history, with how often they watched it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewedVideo {
    pub video_id: Uuid,
    pub title: String,
    pub view_count: i64,
    pub tags: Vec<String>,
}

/// A published video that can be recommended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogVideo {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub channel_id: Uuid,
    pub tags: Vec<String>,
    /// Views summed over every viewer.
    pub total_views: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStrategy {
    /// Ranked from the viewer's own history.
    Personalized,
    /// Most viewed published videos overall.
    Popular,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedVideo {
    #[serde(flatten)]
    pub video: CatalogVideo,
    /// Tag similarity to the viewer, only set for personalized results.
    pub similarity: Option<f64>,
    pub following_channel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendations {
    pub strategy: RecommendationStrategy,
    pub videos: Vec<RankedVideo>,
}
