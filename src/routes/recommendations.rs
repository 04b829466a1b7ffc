use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{RecommendationRequest, RecommendationResponse},
    routes::AppState,
};

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    tracing::info!(
        request_id = %request_id,
        occasion = %request.occasion,
        season = %request.season,
        max_outfits = request.max_outfits,
        "Processing recommendation request"
    );

    let response = state.recommender.recommend(&request).await?;

    tracing::info!(
        request_id = %request_id,
        outfits = response.outfits.len(),
        render_failures = response.render_failures,
        "Recommendation completed"
    );

    Ok(Json(response))
}

/// Summary grid of the ranked flat-lays as a PNG
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Response> {
    tracing::info!(
        request_id = %request_id,
        occasion = %request.occasion,
        season = %request.season,
        "Processing summary grid request"
    );

    let png = state.recommender.summary_grid(&request).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}
