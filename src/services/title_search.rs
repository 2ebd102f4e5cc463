use std::cmp::Reverse;
use std::ops::Range;
use std::sync::Arc;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::MovieRecord,
    services::catalog::{normalize, Catalog, IndexedMovie},
};

/// How well a title matches a query, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    Exact,
    Prefix,
    WordPrefix,
    Substring,
    AllWords,
}

/// Classifies a normalized title against a normalized query
pub fn match_tier(search_key: &str, query: &str) -> Option<MatchTier> {
    if search_key == query {
        return Some(MatchTier::Exact);
    }
    if search_key.starts_with(query) {
        return Some(MatchTier::Prefix);
    }

    let mut found = false;
    for (index, _) in search_key.match_indices(query) {
        found = true;
        if search_key[..index].ends_with(' ') {
            return Some(MatchTier::WordPrefix);
        }
    }
    if found {
        return Some(MatchTier::Substring);
    }

    let mut words = query.split(' ').peekable();
    if words.peek().is_some() && words.all(|word| search_key.contains(word)) {
        return Some(MatchTier::AllWords);
    }

    None
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SearchHit {
    tier: MatchTier,
    popularity: Reverse<usize>,
    movie_id: i64,
    position: usize,
}

fn scan_range(catalog: &Catalog, range: Range<usize>, query: &str) -> Vec<SearchHit> {
    let offset = range.start;
    catalog.movies()[range]
        .iter()
        .enumerate()
        .filter_map(|(i, indexed)| {
            match_tier(&indexed.search_key, query).map(|tier| SearchHit {
                tier,
                popularity: Reverse(indexed.rating_count),
                movie_id: indexed.movie.movie_id,
                position: offset + i,
            })
        })
        .collect()
}

/// Title search over the catalog snapshot
///
/// A scan is split into contiguous chunks, one blocking worker per chunk, and
/// the partial hit lists are merged before ranking.
pub struct SearchEngine {
    catalog: Option<Arc<Catalog>>,
    cache: Option<Cache>,
    cache_ttl: u64,
    limit: usize,
    workers: usize,
}

impl SearchEngine {
    pub fn new(catalog: Option<Arc<Catalog>>, limit: usize, workers: usize) -> Self {
        Self {
            catalog,
            cache: None,
            cache_ttl: 0,
            limit,
            workers: workers.max(1),
        }
    }

    /// Caches results in Redis for `ttl` seconds
    pub fn with_cache(mut self, cache: Cache, ttl: u64) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    /// Searches catalog titles, best matches first
    ///
    /// Queries with no searchable characters return no results.
    pub async fn search(&self, query: &str) -> AppResult<Vec<MovieRecord>> {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        let Some(catalog) = self.catalog.clone() else {
            tracing::warn!(query = %query, "Search requested without a loaded catalog");
            return Ok(Vec::new());
        };

        match &self.cache {
            Some(cache) => cached!(
                cache,
                CacheKey::TitleSearch {
                    query: normalized.clone(),
                    limit: self.limit,
                    catalog: catalog.fingerprint(),
                },
                self.cache_ttl,
                self.scan(catalog, normalized)
            ),
            None => self.scan(catalog, normalized).await,
        }
    }

    async fn scan(&self, catalog: Arc<Catalog>, query: String) -> AppResult<Vec<MovieRecord>> {
        let total = catalog.len();
        let chunk_size = total.div_ceil(self.workers).max(1);
        let query = Arc::new(query);

        let mut tasks = Vec::new();
        for start in (0..total).step_by(chunk_size) {
            let end = (start + chunk_size).min(total);
            let catalog = catalog.clone();
            let query = query.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                scan_range(&catalog, start..end, &query)
            }));
        }

        let mut hits = Vec::new();
        for task in tasks {
            let partial = task
                .await
                .map_err(|e| AppError::Internal(format!("Search worker failed: {}", e)))?;
            hits.extend(partial);
        }

        hits.sort();
        hits.truncate(self.limit);

        let results: Vec<MovieRecord> = hits
            .iter()
            .filter_map(|hit| catalog.movie_at(hit.position))
            .map(IndexedMovie::to_record)
            .collect();

        tracing::info!(
            query = %query,
            results = results.len(),
            workers = self.workers,
            "Title search completed"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_redis_client;
    use crate::services::catalog::{CatalogMovie, CommunityRating};

    fn catalog() -> Arc<Catalog> {
        let movies = vec![
            CatalogMovie::new(1, Some(862), "Toy Story (1995)"),
            CatalogMovie::new(2, Some(863), "Toy Story 2 (1999)"),
            CatalogMovie::new(3, Some(10193), "Toy Story 3 (2010)"),
            CatalogMovie::new(4, Some(11), "Star Wars: Episode IV - A New Hope (1977)"),
            CatalogMovie::new(5, Some(1891), "Star Wars: Episode V - The Empire Strikes Back (1980)"),
            CatalogMovie::new(6, Some(9487), "Bug's Life, A (1998)"),
            CatalogMovie::new(7, Some(27205), "Inception (2010)"),
            CatalogMovie::new(8, None, "Lost in the Story"),
        ];
        let ratings = vec![
            CommunityRating::new(1, 2, 4.0),
            CommunityRating::new(2, 2, 3.5),
            CommunityRating::new(1, 3, 4.0),
        ];
        Arc::new(Catalog::new(movies, ratings))
    }

    fn ids(results: &[MovieRecord]) -> Vec<i64> {
        results.iter().map(|r| r.movie_id).collect()
    }

    #[test]
    fn test_match_tier_ordering() {
        assert_eq!(match_tier("toy story", "toy story"), Some(MatchTier::Exact));
        assert_eq!(match_tier("toy story 2", "toy story"), Some(MatchTier::Prefix));
        assert_eq!(match_tier("lost in the story", "story"), Some(MatchTier::WordPrefix));
        assert_eq!(match_tier("inception", "cept"), Some(MatchTier::Substring));
        assert_eq!(
            match_tier("star wars episode iv a new hope", "hope star"),
            Some(MatchTier::AllWords)
        );
        assert_eq!(match_tier("inception", "matrix"), None);
    }

    #[tokio::test]
    async fn test_search_ranks_exact_then_prefix_by_popularity() {
        let engine = SearchEngine::new(Some(catalog()), 10, 3);
        let results = engine.search("toy story").await.unwrap();

        // Exact match first, then prefixes ordered by rating count, then id
        assert_eq!(ids(&results), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_search_is_case_and_punctuation_insensitive() {
        let engine = SearchEngine::new(Some(catalog()), 10, 2);
        let results = engine.search("STAR WARS:").await.unwrap();
        assert_eq!(ids(&results), vec![4, 5]);
    }

    #[tokio::test]
    async fn test_search_word_prefix_after_prefix() {
        let engine = SearchEngine::new(Some(catalog()), 10, 4);
        let results = engine.search("story").await.unwrap();
        assert_eq!(ids(&results), vec![2, 3, 1, 8]);
    }

    #[tokio::test]
    async fn test_search_ignores_year_in_title() {
        let engine = SearchEngine::new(Some(catalog()), 10, 1);
        assert!(engine.search("2010").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_returns_unrated_records() {
        let engine = SearchEngine::new(Some(catalog()), 10, 1);
        let results = engine.search("inception").await.unwrap();
        assert_eq!(results, vec![MovieRecord::new(7, Some(27205), "Inception (2010)")]);
        assert!(results.iter().all(|r| r.rating.is_none()));
    }

    #[tokio::test]
    async fn test_search_empty_query_returns_nothing() {
        let engine = SearchEngine::new(Some(catalog()), 10, 2);
        assert!(engine.search("").await.unwrap().is_empty());
        assert!(engine.search("   ").await.unwrap().is_empty());
        assert!(engine.search("?!").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_without_catalog_returns_nothing() {
        let engine = SearchEngine::new(None, 10, 2);
        assert!(engine.search("toy").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let engine = SearchEngine::new(Some(catalog()), 2, 2);
        assert_eq!(ids(&engine.search("toy").await.unwrap()), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_search_falls_through_when_cache_is_unreachable() {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, _handle) = Cache::new(client);
        let engine = SearchEngine::new(Some(catalog()), 10, 2).with_cache(cache, 60);

        let results = engine.search("toy").await.unwrap();
        assert_eq!(ids(&results), vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_search_result_independent_of_worker_count() {
        let single = SearchEngine::new(Some(catalog()), 10, 1);
        let many = SearchEngine::new(Some(catalog()), 10, 16);
        assert_eq!(
            single.search("s").await.unwrap(),
            many.search("s").await.unwrap()
        );
    }
}
