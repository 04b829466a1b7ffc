use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, Occasion, Season};

pub type ItemId = u64;

/// A digitized clothing item from the user's wardrobe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WardrobeItem {
    pub id: ItemId,
    pub name: String,
    pub category: Category,
    /// Primary color name (e.g. "navy")
    pub color: String,
    pub occasion: Occasion,
    pub season: Season,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub style_description: Option<String>,
    #[serde(default)]
    pub style_tags: Vec<String>,
    #[serde(default)]
    pub color_palette: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    /// Background-removed product photo, relative to the media root
    #[serde(default)]
    pub processed_image: Option<String>,
    /// Photo as uploaded, relative to the media root
    #[serde(default)]
    pub original_image: Option<String>,
    #[serde(default)]
    pub wear_count: u32,
    #[serde(default)]
    pub last_worn: Option<DateTime<Utc>>,
}

impl WardrobeItem {
    /// Image paths in the order they should be tried
    pub fn image_candidates(&self) -> impl Iterator<Item = &str> {
        self.processed_image
            .as_deref()
            .into_iter()
            .chain(self.original_image.as_deref())
    }
}

/// Item metadata submitted by a client; the catalog assigns the id
#[derive(Debug, Clone, Deserialize)]
pub struct NewWardrobeItem {
    pub name: String,
    pub category: Category,
    pub color: String,
    #[serde(default)]
    pub occasion: Occasion,
    #[serde(default)]
    pub season: Season,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub style_description: Option<String>,
    #[serde(default)]
    pub style_tags: Vec<String>,
    #[serde(default)]
    pub color_palette: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub processed_image: Option<String>,
    #[serde(default)]
    pub original_image: Option<String>,
}

impl NewWardrobeItem {
    pub fn into_item(self, id: ItemId) -> WardrobeItem {
        WardrobeItem {
            id,
            name: self.name,
            category: self.category,
            color: self.color,
            occasion: self.occasion,
            season: self.season,
            brand: self.brand,
            size: self.size,
            material: self.material,
            style_description: self.style_description,
            style_tags: self.style_tags,
            color_palette: self.color_palette,
            is_favorite: self.is_favorite,
            processed_image: self.processed_image,
            original_image: self.original_image,
            wear_count: 0,
            last_worn: None,
        }
    }
}

/// Catalog query.
///
/// Items tagged `all` for occasion or season always match, and a requested
/// season of `all` (or an occasion list containing `all`) matches everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    #[serde(default)]
    pub category: Option<Category>,
    /// Accepted occasions; empty means any
    #[serde(default)]
    pub occasions: Vec<Occasion>,
    #[serde(default)]
    pub season: Option<Season>,
    #[serde(default)]
    pub favorite: Option<bool>,
}

impl ItemFilter {
    pub fn for_context(occasions: Vec<Occasion>, season: Season) -> Self {
        Self {
            occasions,
            season: Some(season),
            ..Self::default()
        }
    }

    pub fn matches(&self, item: &WardrobeItem) -> bool {
        if self.category.is_some_and(|c| c != item.category) {
            return false;
        }
        if self.favorite.is_some_and(|f| f != item.is_favorite) {
            return false;
        }

        let occasion_ok = self.occasions.is_empty()
            || item.occasion == Occasion::All
            || self.occasions.contains(&Occasion::All)
            || self.occasions.contains(&item.occasion);

        let season_ok = match self.season {
            None | Some(Season::All) => true,
            Some(season) => item.season == season || item.season == Season::All,
        };

        occasion_ok && season_ok
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{item, tagged};
    use super::*;

    #[test]
    fn test_filter_matches_all_tagged_items() {
        let filter = ItemFilter::for_context(vec![Occasion::Formal], Season::Winter);

        assert!(filter.matches(&tagged(1, Category::Top, Occasion::Formal, Season::Winter)));
        assert!(filter.matches(&tagged(2, Category::Top, Occasion::All, Season::All)));
        assert!(!filter.matches(&tagged(3, Category::Top, Occasion::Casual, Season::Winter)));
        assert!(!filter.matches(&tagged(4, Category::Top, Occasion::Formal, Season::Summer)));
    }

    #[test]
    fn test_requested_all_season_is_wildcard() {
        let filter = ItemFilter::for_context(vec![Occasion::Casual], Season::All);
        assert!(filter.matches(&tagged(1, Category::Shoes, Occasion::Casual, Season::Summer)));
    }

    #[test]
    fn test_filter_by_category_and_favorite() {
        let mut favorite = item(1, Category::Dress, "red");
        favorite.is_favorite = true;
        let filter = ItemFilter {
            category: Some(Category::Dress),
            favorite: Some(true),
            ..ItemFilter::default()
        };

        assert!(filter.matches(&favorite));
        assert!(!filter.matches(&item(2, Category::Dress, "blue")));
        assert!(!filter.matches(&item(3, Category::Top, "red")));
    }

    #[test]
    fn test_image_candidates_prefer_processed() {
        let mut shirt = item(1, Category::Top, "white");
        shirt.processed_image = Some("processed/shirt.png".to_string());
        shirt.original_image = Some("originals/shirt.jpg".to_string());

        let paths: Vec<&str> = shirt.image_candidates().collect();
        assert_eq!(paths, vec!["processed/shirt.png", "originals/shirt.jpg"]);
    }
}
