use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    db::FavouritesStore,
    error::AppResult,
    models::{MovieRecord, Rating, Recommendations, Sequenced},
    services::{recommendations::RecommendationEngine, title_search::SearchEngine},
};

/// Facade over favourites storage, title search and recommendations
///
/// Search and recommendation results are stamped with a sequence number taken
/// when the request is submitted. Requests are never cancelled; a client that
/// only cares about its latest request discards results with a lower number.
pub struct FavouritesService {
    store: Arc<dyn FavouritesStore>,
    search: SearchEngine,
    recommender: RecommendationEngine,
    sequence: AtomicU64,
}

impl FavouritesService {
    pub fn new(
        store: Arc<dyn FavouritesStore>,
        search: SearchEngine,
        recommender: RecommendationEngine,
    ) -> Self {
        Self {
            store,
            search,
            recommender,
            sequence: AtomicU64::new(0),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the saved favourites
    ///
    /// Storage failures degrade to an empty list so the client stays usable.
    pub async fn get_favourites(&self) -> Vec<MovieRecord> {
        match self.store.load().await {
            Ok(records) => records,
            Err(e) if e.is_storage_failure() => {
                tracing::warn!(
                    error = %e,
                    store = self.store.name(),
                    "Failed to load favourites, returning empty list"
                );
                Vec::new()
            }
            Err(e) => {
                tracing::error!(error = %e, "Unexpected error loading favourites");
                Vec::new()
            }
        }
    }

    pub async fn search_for(&self, query: &str) -> AppResult<Sequenced<Vec<MovieRecord>>> {
        let sequence = self.next_sequence();
        let value = self.search.search(query).await?;
        Ok(Sequenced { sequence, value })
    }

    pub async fn get_recommendations(&self) -> AppResult<Sequenced<Recommendations>> {
        let sequence = self.next_sequence();
        let value = self.recommend_from_store().await?;
        Ok(Sequenced { sequence, value })
    }

    /// Unreadable favourites make recommendations unavailable rather than
    /// reporting that nothing is saved
    async fn recommend_from_store(&self) -> AppResult<Recommendations> {
        match self.store.load().await {
            Ok(favourites) => self.recommender.recommend(&favourites).await,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    store = self.store.name(),
                    "Failed to load favourites, recommendations unavailable"
                );
                Ok(Recommendations::unavailable())
            }
        }
    }

    /// Deletes a favourite; deleting an id that is not saved is not an error
    pub async fn delete_favourite(&self, movie_id: i64) -> AppResult<()> {
        self.store.remove(movie_id).await?;
        tracing::info!(movie_id, "Favourite deleted");
        Ok(())
    }

    /// Attaches `rating` to `record` and saves it, replacing any earlier
    /// rating of the same movie
    pub async fn rate_and_save(&self, record: MovieRecord, rating: f32) -> AppResult<MovieRecord> {
        let rating = Rating::new(rating)?;
        let rated = record.rated(rating);

        self.store.upsert(rated.clone()).await?;

        tracing::info!(
            movie_id = rated.movie_id,
            rating = %rating,
            "Favourite saved"
        );

        Ok(rated)
    }

    /// Runs a search on its own task
    ///
    /// The sequence number is assigned before this returns, so submission
    /// order is reflected even if the tasks complete out of order.
    pub fn submit_search(
        self: &Arc<Self>,
        query: impl Into<String>,
    ) -> JoinHandle<AppResult<Sequenced<Vec<MovieRecord>>>> {
        let service = self.clone();
        let query = query.into();
        let sequence = self.next_sequence();

        tokio::spawn(async move {
            let value = service.search.search(&query).await?;
            Ok(Sequenced { sequence, value })
        })
    }

    /// Computes recommendations on their own task
    pub fn submit_recommendations(
        self: &Arc<Self>,
    ) -> JoinHandle<AppResult<Sequenced<Recommendations>>> {
        let service = self.clone();
        let sequence = self.next_sequence();

        tokio::spawn(async move {
            let value = service.recommend_from_store().await?;
            Ok(Sequenced { sequence, value })
        })
    }
}
