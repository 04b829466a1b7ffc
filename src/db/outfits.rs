use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{NewSavedOutfit, OutfitItemLink, SavedOutfit, WardrobeItem},
};

/// Storage for outfits the user chose to keep.
///
/// Saving happens after a recommendation run has returned; the pipeline itself
/// never writes here.
#[async_trait::async_trait]
pub trait OutfitStore: Send + Sync {
    /// Stores the outfit and one item link per constituent item
    async fn save(
        &self,
        outfit: NewSavedOutfit,
        items: &[WardrobeItem],
    ) -> AppResult<SavedOutfit>;

    /// Saved outfits, newest first
    async fn list(&self) -> AppResult<Vec<SavedOutfit>>;

    async fn get(&self, id: Uuid) -> AppResult<SavedOutfit>;

    async fn rate(&self, id: Uuid, rating: u8) -> AppResult<SavedOutfit>;

    /// Bumps the wear count and stamps `last_worn`
    async fn mark_worn(&self, id: Uuid) -> AppResult<SavedOutfit>;
}

#[derive(Default)]
pub struct InMemoryOutfitStore {
    outfits: RwLock<HashMap<Uuid, SavedOutfit>>,
}

impl InMemoryOutfitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl OutfitStore for InMemoryOutfitStore {
    async fn save(
        &self,
        outfit: NewSavedOutfit,
        items: &[WardrobeItem],
    ) -> AppResult<SavedOutfit> {
        if items.is_empty() {
            return Err(AppError::InvalidInput(
                "An outfit must contain at least one item".to_string(),
            ));
        }

        let confidence = outfit.confidence_score.clamp(0.0, 1.0);
        let links = items
            .iter()
            .map(|item| OutfitItemLink {
                item_id: item.id,
                category: item.category,
                match_score: confidence,
                style_notes: outfit.style_notes.clone(),
            })
            .collect();

        let saved = SavedOutfit {
            id: Uuid::new_v4(),
            name: outfit.name,
            occasion: outfit.occasion,
            season: outfit.season,
            style_description: outfit.style_description,
            color_scheme: outfit.color_scheme,
            style_tags: outfit.style_tags,
            confidence_score: confidence,
            items: links,
            rating: None,
            wear_count: 0,
            last_worn: None,
            created_at: Utc::now(),
        };

        self.outfits.write().await.insert(saved.id, saved.clone());

        tracing::info!(
            outfit_id = %saved.id,
            items = saved.items.len(),
            "Outfit saved"
        );

        Ok(saved)
    }

    async fn list(&self) -> AppResult<Vec<SavedOutfit>> {
        let mut outfits: Vec<SavedOutfit> = self.outfits.read().await.values().cloned().collect();
        outfits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(outfits)
    }

    async fn get(&self, id: Uuid) -> AppResult<SavedOutfit> {
        self.outfits
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Outfit {} not found", id)))
    }

    async fn rate(&self, id: Uuid, rating: u8) -> AppResult<SavedOutfit> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::InvalidInput(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let mut outfits = self.outfits.write().await;
        let outfit = outfits
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Outfit {} not found", id)))?;
        outfit.rating = Some(rating);
        Ok(outfit.clone())
    }

    async fn mark_worn(&self, id: Uuid) -> AppResult<SavedOutfit> {
        let mut outfits = self.outfits.write().await;
        let outfit = outfits
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Outfit {} not found", id)))?;
        outfit.wear_count += 1;
        outfit.last_worn = Some(Utc::now());
        Ok(outfit.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::wardrobe::fixtures::item;
    use crate::models::{Category, Occasion, Season};

    fn new_outfit(confidence: f64) -> NewSavedOutfit {
        NewSavedOutfit {
            name: "White Top & Black Bottom".to_string(),
            occasion: Occasion::Business,
            season: Season::Fall,
            item_ids: vec![1, 2],
            style_description: "Clean office look".to_string(),
            color_scheme: vec!["white".to_string(), "black".to_string()],
            style_tags: vec!["minimal".to_string()],
            confidence_score: confidence,
            style_notes: "Balanced contrast".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_creates_item_links() {
        let store = InMemoryOutfitStore::new();
        let items = vec![item(1, Category::Top, "white"), item(2, Category::Bottom, "black")];

        let saved = store.save(new_outfit(0.9), &items).await.unwrap();

        assert_eq!(saved.items.len(), 2);
        assert_eq!(saved.items[1].category, Category::Bottom);
        assert_eq!(saved.items[0].match_score, 0.9);
        assert_eq!(saved.items[0].style_notes, "Balanced contrast");
        assert_eq!(store.get(saved.id).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_save_clamps_confidence() {
        let store = InMemoryOutfitStore::new();
        let saved = store
            .save(new_outfit(1.7), &[item(1, Category::Dress, "red")])
            .await
            .unwrap();
        assert_eq!(saved.confidence_score, 1.0);
    }

    #[tokio::test]
    async fn test_save_without_items_is_rejected() {
        let store = InMemoryOutfitStore::new();
        let result = store.save(new_outfit(0.5), &[]).await;
        tokio_test::assert_err!(result);
    }

    #[tokio::test]
    async fn test_rate_validates_range() {
        let store = InMemoryOutfitStore::new();
        let saved = store
            .save(new_outfit(0.5), &[item(1, Category::Top, "white")])
            .await
            .unwrap();

        assert!(matches!(
            store.rate(saved.id, 6).await,
            Err(AppError::InvalidInput(_))
        ));
        let rated = tokio_test::assert_ok!(store.rate(saved.id, 4).await);
        assert_eq!(rated.rating, Some(4));
    }

    #[tokio::test]
    async fn test_mark_worn_counts_wears() {
        let store = InMemoryOutfitStore::new();
        let saved = store
            .save(new_outfit(0.5), &[item(1, Category::Top, "white")])
            .await
            .unwrap();
        assert_eq!(saved.wear_count, 0);
        assert!(saved.last_worn.is_none());

        store.mark_worn(saved.id).await.unwrap();
        let worn = store.mark_worn(saved.id).await.unwrap();

        assert_eq!(worn.wear_count, 2);
        assert!(worn.last_worn.is_some());
        assert!(matches!(
            store.mark_worn(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rate_unknown_outfit() {
        let store = InMemoryOutfitStore::new();
        assert!(matches!(
            store.rate(Uuid::new_v4(), 3).await,
            Err(AppError::NotFound(_))
        ));
    }
}
