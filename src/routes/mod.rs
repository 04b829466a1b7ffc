use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::{OutfitStore, WardrobeCatalog},
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{ItemAnalyzer, RecommendationService},
};

pub mod outfits;
pub mod recommendations;
pub mod wardrobe;

/// Shared handles built once at start-up
pub struct AppState {
    pub catalog: Arc<dyn WardrobeCatalog>,
    pub outfits: Arc<dyn OutfitStore>,
    pub recommender: Arc<RecommendationService>,
    pub item_analyzer: Arc<ItemAnalyzer>,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/wardrobe/items",
            get(wardrobe::list_items).post(wardrobe::create_item),
        )
        .route("/wardrobe/items/:id/favorite", post(wardrobe::toggle_favorite))
        .route("/wardrobe/items/:id/worn", post(wardrobe::mark_worn))
        .route("/wardrobe/items/:id/analyze", post(wardrobe::analyze_item))
        .route("/recommendations", post(recommendations::recommend))
        .route("/recommendations/summary", post(recommendations::summary))
        .route("/outfits", get(outfits::list).post(outfits::save))
        .route("/outfits/:id", get(outfits::get))
        .route("/outfits/:id/rating", post(outfits::rate))
        .route("/outfits/:id/worn", post(outfits::mark_worn))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
