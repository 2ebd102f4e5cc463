use std::sync::Arc;

use movie_favourites_api::{
    config::Config,
    db::{create_pool, create_redis_client, load_catalog, Cache, RedisFavouritesStore},
    routes::{create_router, AppState},
    services::{Catalog, FavouritesService, RecommendationEngine, SearchEngine},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("movie_favourites_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let redis_client = create_redis_client(&config.redis_url)?;
    let store = RedisFavouritesStore::new(redis_client.clone(), config.favourites_key.clone()).await?;
    let (cache, cache_handle) = Cache::new(redis_client);

    let catalog = load_catalog_snapshot(&config).await;
    if catalog.is_none() {
        tracing::warn!("Starting without a catalog: search is empty and recommendations are unavailable");
    }

    let search = SearchEngine::new(catalog.clone(), config.search_limit, config.search_workers)
        .with_cache(cache, config.search_cache_ttl);
    let recommender = RecommendationEngine::new(
        catalog,
        config.recommendation_limit,
        config.min_common_raters,
    );
    let service = FavouritesService::new(Arc::new(store), search, recommender);

    let app = create_router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_handle.shutdown().await;
    Ok(())
}

/// Loads the catalog, or `None` when the database cannot be reached
async fn load_catalog_snapshot(config: &Config) -> Option<Arc<Catalog>> {
    let pool = match create_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to catalog database");
            return None;
        }
    };

    match load_catalog(&pool).await {
        Ok(catalog) => {
            tracing::info!(
                movies = catalog.len(),
                raters = catalog.rater_count(),
                "Catalog snapshot ready"
            );
            Some(Arc::new(catalog))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load catalog");
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
