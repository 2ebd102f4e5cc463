use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{MovieRecord, Recommendations},
    services::catalog::Catalog,
};

/// Generates personalized recommendations from rated favourites
///
/// Item-based collaborative filtering: every favourite votes for the catalog
/// movies the community rates similarly, weighted by similarity and by how far
/// the favourite's rating sits from the user's average rating.
pub struct RecommendationEngine {
    catalog: Option<Arc<Catalog>>,
    limit: usize,
    min_common_raters: usize,
}

#[derive(Debug)]
struct Candidate {
    predicted: f32,
    similarity_mass: f32,
    movie_id: i64,
    position: usize,
}

impl RecommendationEngine {
    pub fn new(catalog: Option<Arc<Catalog>>, limit: usize, min_common_raters: usize) -> Self {
        Self {
            catalog,
            limit,
            min_common_raters,
        }
    }

    pub fn is_available(&self) -> bool {
        self.catalog.is_some()
    }

    /// Recommends catalog movies not already among `favourites`
    ///
    /// Unrated records in `favourites` carry no signal and are ignored.
    pub async fn recommend(&self, favourites: &[MovieRecord]) -> AppResult<Recommendations> {
        let mut rated: Vec<(i64, f32)> = favourites
            .iter()
            .filter_map(|r| r.rating.map(|rating| (r.movie_id, rating)))
            .collect();

        if rated.is_empty() {
            return Ok(Recommendations::no_signal());
        }

        let Some(catalog) = self.catalog.clone() else {
            tracing::warn!(
                favourites = rated.len(),
                "Recommendations requested without a loaded catalog"
            );
            return Ok(Recommendations::unavailable());
        };

        // Accumulation order must not depend on favourites order
        rated.sort_by_key(|(movie_id, _)| *movie_id);

        let limit = self.limit;
        let min_common_raters = self.min_common_raters;
        let movies = tokio::task::spawn_blocking(move || {
            rank_candidates(&catalog, &rated, min_common_raters, limit)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Recommendation worker failed: {}", e)))?;

        tracing::info!(
            favourites = favourites.len(),
            recommendations = movies.len(),
            "Recommendations computed"
        );

        Ok(Recommendations::ready(movies))
    }
}

fn rank_candidates(
    catalog: &Catalog,
    favourites: &[(i64, f32)],
    min_common_raters: usize,
    limit: usize,
) -> Vec<MovieRecord> {
    let mean = favourites.iter().map(|(_, r)| r).sum::<f32>() / favourites.len() as f32;
    let excluded: HashSet<i64> = favourites.iter().map(|(id, _)| *id).collect();

    // position -> (similarity-weighted deviation, similarity mass)
    let mut scores: BTreeMap<usize, (f32, f32)> = BTreeMap::new();
    for &(movie_id, rating) in favourites {
        let Some(position) = catalog.position_of(movie_id) else {
            tracing::debug!(movie_id, "Favourite not in catalog");
            continue;
        };

        let deviation = rating - mean;
        for (other, similarity) in catalog.similar_items(position, min_common_raters) {
            let entry = scores.entry(other).or_insert((0.0, 0.0));
            entry.0 += similarity * deviation;
            entry.1 += similarity;
        }
    }

    let mut candidates: Vec<Candidate> = scores
        .into_iter()
        .filter_map(|(position, (weighted, mass))| {
            let movie_id = catalog.movie_at(position)?.movie.movie_id;
            if excluded.contains(&movie_id) || mass <= 0.0 {
                return None;
            }
            Some(Candidate {
                predicted: mean + weighted / mass,
                similarity_mass: mass,
                movie_id,
                position,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.predicted
            .total_cmp(&a.predicted)
            .then_with(|| b.similarity_mass.total_cmp(&a.similarity_mass))
            .then_with(|| a.movie_id.cmp(&b.movie_id))
    });
    candidates.truncate(limit);

    candidates
        .iter()
        .filter_map(|c| catalog.movie_at(c.position))
        .map(|indexed| indexed.to_record())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecommendationStatus;
    use crate::services::catalog::{CatalogMovie, CommunityRating};

    fn catalog() -> Arc<Catalog> {
        let movies = vec![
            CatalogMovie::new(1, Some(862), "Toy Story (1995)"),
            CatalogMovie::new(2, Some(863), "Toy Story 2 (1999)"),
            CatalogMovie::new(3, Some(949), "Heat (1995)"),
            CatalogMovie::new(4, Some(524), "Casino (1995)"),
            CatalogMovie::new(5, Some(8844), "Jumanji (1995)"),
        ];
        let ratings = vec![
            CommunityRating::new(1, 1, 5.0),
            CommunityRating::new(1, 2, 5.0),
            CommunityRating::new(1, 3, 1.0),
            CommunityRating::new(1, 4, 1.0),
            CommunityRating::new(2, 1, 4.5),
            CommunityRating::new(2, 2, 4.0),
            CommunityRating::new(2, 3, 2.0),
            CommunityRating::new(2, 4, 1.5),
            CommunityRating::new(3, 1, 4.0),
            CommunityRating::new(3, 2, 4.5),
            CommunityRating::new(3, 3, 1.0),
            CommunityRating::new(3, 4, 2.0),
            CommunityRating::new(3, 5, 3.0),
            CommunityRating::new(4, 1, 1.0),
            CommunityRating::new(4, 2, 1.5),
            CommunityRating::new(4, 3, 5.0),
            CommunityRating::new(4, 4, 5.0),
        ];
        Arc::new(Catalog::new(movies, ratings))
    }

    fn favourite(movie_id: i64, rating: f32) -> MovieRecord {
        MovieRecord {
            movie_id,
            tmdb_id: None,
            title: format!("Movie {}", movie_id),
            rating: Some(rating),
        }
    }

    fn ids(recommendations: &Recommendations) -> Vec<i64> {
        recommendations.movies.iter().map(|r| r.movie_id).collect()
    }

    #[tokio::test]
    async fn test_recommend_empty_favourites() {
        let engine = RecommendationEngine::new(Some(catalog()), 10, 2);
        let result = engine.recommend(&[]).await.unwrap();
        assert_eq!(result.status, RecommendationStatus::NoSignal);
        assert!(result.movies.is_empty());
    }

    #[tokio::test]
    async fn test_recommend_ignores_unrated_records() {
        let engine = RecommendationEngine::new(Some(catalog()), 10, 2);
        let unrated = MovieRecord::new(1, Some(862), "Toy Story (1995)");
        let result = engine.recommend(&[unrated]).await.unwrap();
        assert_eq!(result.status, RecommendationStatus::NoSignal);
    }

    #[tokio::test]
    async fn test_recommend_without_catalog_is_unavailable() {
        let engine = RecommendationEngine::new(None, 10, 2);
        assert!(!engine.is_available());

        let result = engine.recommend(&[favourite(1, 5.0)]).await.unwrap();
        assert_eq!(result.status, RecommendationStatus::Unavailable);
        assert!(result.movies.is_empty());
    }

    #[tokio::test]
    async fn test_recommend_ranks_by_predicted_affinity() {
        let engine = RecommendationEngine::new(Some(catalog()), 10, 2);
        let result = engine
            .recommend(&[favourite(1, 5.0), favourite(3, 1.0)])
            .await
            .unwrap();

        assert_eq!(result.status, RecommendationStatus::Ready);
        // Toy Story 2 is co-liked with a loved favourite, Casino with a disliked one.
        // Jumanji shares a single rater with the favourites and is filtered out.
        assert_eq!(ids(&result), vec![2, 4]);
        assert!(result.movies.iter().all(|r| r.rating.is_none()));
    }

    #[tokio::test]
    async fn test_recommend_breaks_prediction_ties_by_similarity() {
        let engine = RecommendationEngine::new(Some(catalog()), 10, 1);
        let result = engine
            .recommend(&[favourite(1, 5.0), favourite(3, 1.0)])
            .await
            .unwrap();

        assert_eq!(ids(&result), vec![2, 5, 4]);
    }

    #[tokio::test]
    async fn test_recommend_excludes_favourites() {
        let engine = RecommendationEngine::new(Some(catalog()), 10, 1);
        let favourites = vec![favourite(1, 5.0), favourite(2, 4.0), favourite(3, 1.0)];
        let result = engine.recommend(&favourites).await.unwrap();

        let recommended = ids(&result);
        assert!(recommended.iter().all(|id| ![1, 2, 3].contains(id)));
    }

    #[tokio::test]
    async fn test_recommend_is_deterministic_across_orderings() {
        let engine = RecommendationEngine::new(Some(catalog()), 10, 1);
        let forward = engine
            .recommend(&[favourite(1, 5.0), favourite(3, 1.0), favourite(5, 3.0)])
            .await
            .unwrap();
        let backward = engine
            .recommend(&[favourite(5, 3.0), favourite(3, 1.0), favourite(1, 5.0)])
            .await
            .unwrap();

        assert_eq!(forward, backward);
    }

    #[tokio::test]
    async fn test_recommend_respects_limit() {
        let engine = RecommendationEngine::new(Some(catalog()), 1, 2);
        let result = engine
            .recommend(&[favourite(1, 5.0), favourite(3, 1.0)])
            .await
            .unwrap();
        assert_eq!(ids(&result), vec![2]);
    }

    #[tokio::test]
    async fn test_recommend_unknown_favourites_yield_empty_ready_list() {
        let engine = RecommendationEngine::new(Some(catalog()), 10, 2);
        let result = engine.recommend(&[favourite(404, 4.0)]).await.unwrap();
        assert_eq!(result.status, RecommendationStatus::Ready);
        assert!(result.movies.is_empty());
    }
}
