use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{ItemFilter, ItemId, NewWardrobeItem, WardrobeItem},
};

/// The user's wardrobe.
///
/// The recommendation pipeline only reads through this trait; writes come
/// from the wardrobe routes (registration, favorites, wear tracking and
/// item analysis).
#[async_trait::async_trait]
pub trait WardrobeCatalog: Send + Sync {
    /// Items matching the filter, in ascending id order
    async fn list_items(&self, filter: &ItemFilter) -> AppResult<Vec<WardrobeItem>>;

    async fn get_item(&self, id: ItemId) -> AppResult<WardrobeItem>;

    async fn add_item(&self, item: NewWardrobeItem) -> AppResult<WardrobeItem>;

    /// Flips the favorite flag and returns the updated item
    async fn toggle_favorite(&self, id: ItemId) -> AppResult<WardrobeItem>;

    /// Replaces a stored item, keyed by its id
    async fn update_item(&self, item: WardrobeItem) -> AppResult<WardrobeItem>;

    /// Records one wear for every listed item.
    ///
    /// Fails without touching anything if any id is unknown.
    async fn mark_worn(&self, ids: &[ItemId]) -> AppResult<Vec<WardrobeItem>>;

    /// Total number of items regardless of tagging
    async fn count(&self) -> AppResult<usize>;
}

/// Process-local catalog keyed by item id
#[derive(Default)]
pub struct InMemoryCatalog {
    items: RwLock<BTreeMap<ItemId, WardrobeItem>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = WardrobeItem>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().map(|item| (item.id, item)).collect()),
        }
    }

    /// Seeds the catalog from a JSON array of wardrobe items
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let items: Vec<WardrobeItem> = serde_json::from_str(&data)?;

        tracing::info!(
            path = %path.display(),
            items = items.len(),
            "Loaded wardrobe catalog"
        );

        Ok(Self::with_items(items))
    }
}

#[async_trait::async_trait]
impl WardrobeCatalog for InMemoryCatalog {
    async fn list_items(&self, filter: &ItemFilter) -> AppResult<Vec<WardrobeItem>> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect())
    }

    async fn get_item(&self, id: ItemId) -> AppResult<WardrobeItem> {
        self.items
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Wardrobe item {} not found", id)))
    }

    async fn add_item(&self, item: NewWardrobeItem) -> AppResult<WardrobeItem> {
        if item.name.trim().is_empty() {
            return Err(AppError::InvalidInput("Item name cannot be empty".to_string()));
        }

        let mut items = self.items.write().await;
        let id = items.keys().next_back().map_or(1, |last| last + 1);
        let item = item.into_item(id);
        items.insert(id, item.clone());

        tracing::info!(item_id = id, category = %item.category, "Wardrobe item added");

        Ok(item)
    }

    async fn toggle_favorite(&self, id: ItemId) -> AppResult<WardrobeItem> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Wardrobe item {} not found", id)))?;
        item.is_favorite = !item.is_favorite;
        Ok(item.clone())
    }

    async fn update_item(&self, item: WardrobeItem) -> AppResult<WardrobeItem> {
        let mut items = self.items.write().await;
        let stored = items
            .get_mut(&item.id)
            .ok_or_else(|| AppError::NotFound(format!("Wardrobe item {} not found", item.id)))?;
        *stored = item;
        Ok(stored.clone())
    }

    async fn mark_worn(&self, ids: &[ItemId]) -> AppResult<Vec<WardrobeItem>> {
        let mut items = self.items.write().await;
        if let Some(missing) = ids.iter().find(|id| !items.contains_key(id)) {
            return Err(AppError::NotFound(format!(
                "Wardrobe item {} not found",
                missing
            )));
        }

        let now = Utc::now();
        let mut worn = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = items.get_mut(id) {
                item.wear_count += 1;
                item.last_worn = Some(now);
                worn.push(item.clone());
            }
        }

        tracing::info!(items = worn.len(), "Recorded wear");
        Ok(worn)
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.items.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::wardrobe::fixtures::{item, tagged};
    use crate::models::{Category, Occasion, Season};

    #[tokio::test]
    async fn test_list_items_is_ordered_by_id() {
        let catalog = InMemoryCatalog::with_items(vec![
            item(7, Category::Top, "white"),
            item(2, Category::Top, "black"),
            item(5, Category::Bottom, "blue"),
        ]);

        let ids: Vec<ItemId> = catalog
            .list_items(&ItemFilter::default())
            .await
            .unwrap()
            .iter()
            .map(|i| i.id)
            .collect();

        assert_eq!(ids, vec![2, 5, 7]);
    }

    #[tokio::test]
    async fn test_list_items_applies_filter() {
        let catalog = InMemoryCatalog::with_items(vec![
            tagged(1, Category::Dress, Occasion::Formal, Season::Winter),
            tagged(2, Category::Dress, Occasion::Sport, Season::Winter),
        ]);

        let filter = ItemFilter::for_context(vec![Occasion::Formal], Season::Winter);
        let items = catalog.list_items(&filter).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 1);
    }

    #[tokio::test]
    async fn test_add_item_assigns_next_id() {
        let catalog = InMemoryCatalog::with_items(vec![item(4, Category::Shoes, "black")]);
        let new_item: NewWardrobeItem = serde_json::from_value(serde_json::json!({
            "name": "Linen Shirt",
            "category": "top",
            "color": "white"
        }))
        .unwrap();

        let added = catalog.add_item(new_item).await.unwrap();

        assert_eq!(added.id, 5);
        assert_eq!(added.season, Season::All);
        assert_eq!(catalog.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_missing_item_is_not_found() {
        let catalog = InMemoryCatalog::new();
        let err = catalog.get_item(42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_mark_worn_updates_every_item() {
        let catalog = InMemoryCatalog::with_items(vec![
            item(1, Category::Top, "white"),
            item(2, Category::Bottom, "black"),
        ]);

        catalog.mark_worn(&[1]).await.unwrap();
        let worn = catalog.mark_worn(&[1, 2]).await.unwrap();

        assert_eq!(worn.len(), 2);
        assert_eq!(worn[0].wear_count, 2);
        assert_eq!(worn[1].wear_count, 1);
        assert!(worn.iter().all(|i| i.last_worn.is_some()));
    }

    #[tokio::test]
    async fn test_mark_worn_with_unknown_id_changes_nothing() {
        let catalog = InMemoryCatalog::with_items(vec![item(1, Category::Top, "white")]);

        let err = catalog.mark_worn(&[1, 9]).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(catalog.get_item(1).await.unwrap().wear_count, 0);
    }

    #[tokio::test]
    async fn test_update_item_replaces_stored_item() {
        let catalog = InMemoryCatalog::with_items(vec![item(1, Category::Top, "white")]);
        let mut shirt = catalog.get_item(1).await.unwrap();
        shirt.style_tags = vec!["minimal".to_string()];

        catalog.update_item(shirt).await.unwrap();

        assert_eq!(catalog.get_item(1).await.unwrap().style_tags, vec!["minimal"]);
        assert!(matches!(
            catalog.update_item(item(5, Category::Top, "red")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_favorite() {
        let catalog = InMemoryCatalog::with_items(vec![item(1, Category::Top, "red")]);

        assert!(catalog.toggle_favorite(1).await.unwrap().is_favorite);
        assert!(!catalog.toggle_favorite(1).await.unwrap().is_favorite);
    }
}
