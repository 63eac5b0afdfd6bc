use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use viddir_core::models::{
    CatalogVideo, RankedVideo, RecommendationStrategy, Recommendations, ViewedVideo,
};

/// Minimum distinct viewed videos, and minimum matching candidates, needed
/// for a personalized ranking.
const MIN_PERSONALIZED: usize = 2;

/// Viewer tag profile: distinct lowercased tags in first-seen order and how
/// many viewed videos carry each.
struct TagProfile {
    universe: Vec<String>,
    counts: HashMap<String, f64>,
}

impl TagProfile {
    fn from_history(history: &[&ViewedVideo]) -> Self {
        let mut universe = Vec::new();
        let mut counts: HashMap<String, f64> = HashMap::new();
        for viewed in history {
            let distinct: HashSet<String> = viewed.tags.iter().map(|t| t.to_lowercase()).collect();
            for tag in viewed.tags.iter().map(|t| t.to_lowercase()) {
                if !counts.contains_key(&tag) {
                    universe.push(tag.clone());
                    counts.insert(tag, 0.0);
                }
            }
            for tag in distinct {
                if let Some(count) = counts.get_mut(&tag) {
                    *count += 1.0;
                }
            }
        }
        Self { universe, counts }
    }

    fn contains(&self, tag: &str) -> bool {
        self.counts.contains_key(tag)
    }
}

/// Similarity in `(0, 1]` between the viewer's tag frequencies and a
/// candidate's tags, over the viewer's tag universe.
pub fn tag_similarity(viewer_tags: &[(String, f64)], candidate_tags: &[String]) -> f64 {
    let candidate: HashSet<String> = candidate_tags.iter().map(|t| t.to_lowercase()).collect();
    let distance = viewer_tags
        .iter()
        .map(|(tag, count)| {
            let other = if candidate.contains(tag) { 1.0 } else { 0.0 };
            (count - other).powi(2)
        })
        .sum::<f64>()
        .sqrt();
    1.0 / (1.0 + distance)
}

fn popular(catalog: &[CatalogVideo], followed: &HashSet<Uuid>, limit: usize) -> Recommendations {
    let mut videos: Vec<&CatalogVideo> = catalog.iter().collect();
    videos.sort_by(|a, b| b.total_views.cmp(&a.total_views));
    Recommendations {
        strategy: RecommendationStrategy::Popular,
        videos: videos
            .into_iter()
            .take(limit)
            .map(|video| RankedVideo {
                following_channel: followed.contains(&video.channel_id),
                video: video.clone(),
                similarity: None,
            })
            .collect(),
    }
}

/// Rank published videos for one viewer.
///
/// With fewer than two distinct viewed videos, or fewer than two matching
/// candidates, the most viewed published videos are returned instead.
/// Candidates match a viewed title (case-insensitive) or share a tag, and
/// exclude anything already viewed. They are ordered by total views
/// descending, with videos from followed channels after unfollowed ones at
/// equal views; similarity order is kept for remaining ties.
pub fn rank_recommendations(
    history: &[ViewedVideo],
    catalog: &[CatalogVideo],
    followed: &HashSet<Uuid>,
    limit: usize,
) -> Recommendations {
    let mut seen = HashSet::new();
    let mut distinct: Vec<&ViewedVideo> = history
        .iter()
        .filter(|v| seen.insert(v.video_id))
        .collect();
    if distinct.len() < MIN_PERSONALIZED {
        return popular(catalog, followed, limit);
    }
    distinct.sort_by(|a, b| b.view_count.cmp(&a.view_count));

    let mut titles: Vec<String> = Vec::new();
    for viewed in &distinct {
        let title = viewed.title.to_lowercase();
        if !titles.contains(&title) {
            titles.push(title);
        }
    }
    let profile = TagProfile::from_history(&distinct);
    let viewer_vector: Vec<(String, f64)> = profile
        .universe
        .iter()
        .map(|tag| (tag.clone(), profile.counts.get(tag).copied().unwrap_or(0.0)))
        .collect();

    let mut candidates: Vec<RankedVideo> = catalog
        .iter()
        .filter(|video| !seen.contains(&video.id))
        .filter(|video| {
            titles.contains(&video.title.to_lowercase())
                || video.tags.iter().any(|t| profile.contains(&t.to_lowercase()))
        })
        .map(|video| RankedVideo {
            similarity: Some(tag_similarity(&viewer_vector, &video.tags)),
            following_channel: followed.contains(&video.channel_id),
            video: video.clone(),
        })
        .collect();

    if candidates.len() < MIN_PERSONALIZED {
        return popular(catalog, followed, limit);
    }

    candidates.sort_by(|a, b| {
        b.similarity
            .unwrap_or(0.0)
            .total_cmp(&a.similarity.unwrap_or(0.0))
    });
    candidates.sort_by(|a, b| {
        b.video
            .total_views
            .cmp(&a.video.total_views)
            .then(a.following_channel.cmp(&b.following_channel))
    });
    candidates.truncate(limit);

    Recommendations {
        strategy: RecommendationStrategy::Personalized,
        videos: candidates,
    }
}
