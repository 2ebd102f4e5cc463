use axum::{
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::FavouritesService,
};

pub mod favourites;
pub mod movies;
pub mod recommendations;

/// Shared application state
pub struct AppState {
    pub favourites: Arc<FavouritesService>,
}

impl AppState {
    pub fn new(favourites: FavouritesService) -> Arc<Self> {
        Arc::new(Self {
            favourites: Arc::new(favourites),
        })
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/favourites",
            get(favourites::list).post(favourites::rate),
        )
        .route("/favourites/:movie_id", delete(favourites::remove))
        .route("/movies/search", get(movies::search))
        .route("/recommendations", get(recommendations::recommend))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
