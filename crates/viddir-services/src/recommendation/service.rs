use anyhow::{Context, Result};
use std::sync::Arc;
use uuid::Uuid;

use viddir_core::models::Recommendations;
use viddir_db::RecommendationSource;

use super::engine::rank_recommendations;

#[derive(Clone)]
pub struct RecommendationService {
    source: Arc<dyn RecommendationSource>,
    limit: usize,
}

impl RecommendationService {
    pub fn new(source: Arc<dyn RecommendationSource>, limit: usize) -> Self {
        Self { source, limit }
    }

    #[tracing::instrument(skip(self))]
    pub async fn recommend(&self, viewer_id: Uuid) -> Result<Recommendations> {
        let history = self
            .source
            .view_history(viewer_id)
            .await
            .context("Failed to load view history")?;
        let catalog = self
            .source
            .published_catalog()
            .await
            .context("Failed to load published catalog")?;
        let followed = self
            .source
            .followed_channels(viewer_id)
            .await
            .context("Failed to load followed channels")?;

        let recommendations = rank_recommendations(&history, &catalog, &followed, self.limit);
        tracing::info!(
            strategy = ?recommendations.strategy,
            count = recommendations.videos.len(),
            "Recommendations ranked"
        );
        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use viddir_core::models::{CatalogVideo, RecommendationStrategy, ViewedVideo};
    use viddir_core::AppError;

    struct FixedSource {
        history: Vec<ViewedVideo>,
        catalog: Vec<CatalogVideo>,
        followed: HashSet<Uuid>,
        fail_catalog: bool,
    }

    #[async_trait]
    impl RecommendationSource for FixedSource {
        async fn view_history(&self, _viewer_id: Uuid) -> Result<Vec<ViewedVideo>, AppError> {
            Ok(self.history.clone())
        }

        async fn published_catalog(&self) -> Result<Vec<CatalogVideo>, AppError> {
            if self.fail_catalog {
                return Err(AppError::Internal("catalog unavailable".to_string()));
            }
            Ok(self.catalog.clone())
        }

        async fn followed_channels(&self, _viewer_id: Uuid) -> Result<HashSet<Uuid>, AppError> {
            Ok(self.followed.clone())
        }
    }

    fn catalog(n: i64) -> Vec<CatalogVideo> {
        (0..n)
            .map(|i| CatalogVideo {
                id: Uuid::new_v4(),
                url: format!("url{i}"),
                title: format!("video {i}"),
                channel_id: Uuid::new_v4(),
                tags: vec!["music".to_string()],
                total_views: i,
            })
            .collect()
    }

    #[tokio::test]
    async fn new_viewer_gets_popular_list_capped_at_limit() {
        let service = RecommendationService::new(
            Arc::new(FixedSource {
                history: Vec::new(),
                catalog: catalog(12),
                followed: HashSet::new(),
                fail_catalog: false,
            }),
            10,
        );

        let recs = service.recommend(Uuid::new_v4()).await.unwrap();
        assert_eq!(recs.strategy, RecommendationStrategy::Popular);
        assert_eq!(recs.videos.len(), 10);
        assert_eq!(recs.videos[0].video.total_views, 11);
    }

    #[tokio::test]
    async fn source_errors_propagate() {
        let service = RecommendationService::new(
            Arc::new(FixedSource {
                history: Vec::new(),
                catalog: Vec::new(),
                followed: HashSet::new(),
                fail_catalog: true,
            }),
            10,
        );

        let err = service.recommend(Uuid::new_v4()).await.unwrap_err();
        assert!(err.to_string().contains("published catalog"));
    }
}
