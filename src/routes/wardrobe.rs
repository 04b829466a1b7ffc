use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Category, ItemFilter, ItemId, NewWardrobeItem, Occasion, Season, WardrobeItem},
    routes::AppState,
    services::item_analysis::ItemAnalysisOutcome,
};

/// Query string for item listing; every field is optional
#[derive(Debug, Deserialize)]
pub struct ItemQuery {
    pub category: Option<Category>,
    pub occasion: Option<Occasion>,
    pub season: Option<Season>,
    pub favorite: Option<bool>,
}

impl From<ItemQuery> for ItemFilter {
    fn from(query: ItemQuery) -> Self {
        ItemFilter {
            category: query.category,
            occasions: query.occasion.into_iter().collect(),
            season: query.season,
            favorite: query.favorite,
        }
    }
}

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<Vec<WardrobeItem>>> {
    let items = state.catalog.list_items(&query.into()).await?;
    Ok(Json(items))
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(item): Json<NewWardrobeItem>,
) -> AppResult<(StatusCode, Json<WardrobeItem>)> {
    let item = state.catalog.add_item(item).await?;
    tracing::info!(item_id = item.id, category = %item.category, "Registered wardrobe item");
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ItemId>,
) -> AppResult<Json<WardrobeItem>> {
    let item = state.catalog.toggle_favorite(id).await?;
    Ok(Json(item))
}

pub async fn mark_worn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ItemId>,
) -> AppResult<Json<WardrobeItem>> {
    state
        .catalog
        .mark_worn(&[id])
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Wardrobe item {} not found", id)))
}

/// Runs vision analysis on the item's photo and stores the result on the item
pub async fn analyze_item(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<ItemId>,
) -> AppResult<Json<ItemAnalysisOutcome>> {
    tracing::info!(request_id = %request_id, item_id = id, "Analyzing wardrobe item");
    let outcome = state
        .item_analyzer
        .analyze_and_update(state.catalog.as_ref(), id)
        .await?;
    Ok(Json(outcome))
}
