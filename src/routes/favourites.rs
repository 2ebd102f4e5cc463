use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{MovieView, RateRequest},
    routes::AppState,
};

/// Handler listing saved favourites
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<MovieView>> {
    let favourites = state.favourites.get_favourites().await;
    Json(favourites.into_iter().map(MovieView::from).collect())
}

/// Handler rating a movie into the favourites list
///
/// Responds with the updated favourites.
pub async fn rate(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<RateRequest>, JsonRejection>,
) -> AppResult<Json<Vec<MovieView>>> {
    let Json(request) = payload?;

    tracing::info!(
        request_id = %request_id,
        movie_id = request.movie.movie_id,
        rating = request.rating,
        "Processing rating request"
    );

    state
        .favourites
        .rate_and_save(request.movie.into(), request.rating)
        .await?;

    let favourites = state.favourites.get_favourites().await;
    Ok(Json(favourites.into_iter().map(MovieView::from).collect()))
}

/// Handler deleting a favourite
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    movie_id: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(movie_id) = movie_id?;

    tracing::info!(request_id = %request_id, movie_id, "Processing delete request");

    state.favourites.delete_favourite(movie_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
