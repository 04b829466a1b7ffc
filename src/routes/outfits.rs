use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{NewSavedOutfit, SavedOutfit},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: u8,
}

/// Persists a recommended outfit after checking every item exists
pub async fn save(
    State(state): State<Arc<AppState>>,
    Json(outfit): Json<NewSavedOutfit>,
) -> AppResult<(StatusCode, Json<SavedOutfit>)> {
    let mut items = Vec::with_capacity(outfit.item_ids.len());
    for id in &outfit.item_ids {
        items.push(state.catalog.get_item(*id).await?);
    }

    let saved = state.outfits.save(outfit, &items).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<SavedOutfit>>> {
    Ok(Json(state.outfits.list().await?))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SavedOutfit>> {
    Ok(Json(state.outfits.get(id).await?))
}

pub async fn rate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<RatingRequest>,
) -> AppResult<Json<SavedOutfit>> {
    Ok(Json(state.outfits.rate(id, request.rating).await?))
}

/// Records a wear for the outfit and every item in it
pub async fn mark_worn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SavedOutfit>> {
    let outfit = state.outfits.mark_worn(id).await?;
    let item_ids: Vec<_> = outfit.items.iter().map(|link| link.item_id).collect();
    state.catalog.mark_worn(&item_ids).await?;

    tracing::info!(outfit_id = %id, items = item_ids.len(), wear_count = outfit.wear_count, "Outfit worn");
    Ok(Json(outfit))
}
