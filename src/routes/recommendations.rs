use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::RecommendationResponse,
    routes::AppState,
};

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<RecommendationResponse>> {
    let recommendations = state.favourites.get_recommendations().await?;

    tracing::info!(
        request_id = %request_id,
        sequence = recommendations.sequence,
        status = ?recommendations.value.status,
        count = recommendations.value.movies.len(),
        "Recommendations served"
    );

    Ok(Json(recommendations.into()))
}
