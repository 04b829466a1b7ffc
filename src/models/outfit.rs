use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{Category, ItemId, Occasion, Season, WardrobeItem};

/// An unranked proposed outfit. Items are shared with the catalog snapshot the
/// candidate was generated from and are never mutated.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutfitCandidate {
    pub name: String,
    pub occasion: Occasion,
    pub season: Season,
    pub items: Vec<Arc<WardrobeItem>>,
}

impl OutfitCandidate {
    pub fn new(
        name: String,
        occasion: Occasion,
        season: Season,
        items: Vec<Arc<WardrobeItem>>,
    ) -> Self {
        Self {
            name,
            occasion,
            season,
            items,
        }
    }

    /// Items filling the given role
    pub fn role(&self, category: Category) -> impl Iterator<Item = &Arc<WardrobeItem>> {
        self.items.iter().filter(move |item| item.category == category)
    }

    /// Items grouped by role: tops, bottoms, shoes, accessories, outerwear, dresses
    pub fn layout_order(&self) -> Vec<Arc<WardrobeItem>> {
        Category::LAYOUT_ORDER
            .iter()
            .flat_map(|&category| self.role(category).cloned())
            .collect()
    }

    pub fn colors(&self) -> Vec<String> {
        self.items.iter().map(|item| item.color.clone()).collect()
    }
}

/// Stylist annotations for one outfit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StyleAnalysis {
    pub style_description: String,
    pub color_scheme: Vec<String>,
    pub style_tags: Vec<String>,
    /// Always within [0, 1]
    pub confidence_score: f64,
    pub style_notes: String,
    pub improvement_suggestions: Vec<String>,
}

/// A candidate after batch ranking; `ranking_position` 1 is the best outfit
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankedOutfit {
    #[serde(flatten)]
    pub candidate: OutfitCandidate,
    #[serde(flatten)]
    pub analysis: StyleAnalysis,
    pub ranking_position: u32,
}

/// Outcome of rendering one outfit, produced inside a single render task
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderResult {
    /// Position of the outfit in the coordinator's input
    pub index: usize,
    pub flatlay_image: Option<Vec<u8>>,
    pub mannequin_image: Option<Vec<u8>>,
    pub mannequin_analysis: Option<String>,
    pub error: Option<String>,
}

impl RenderResult {
    pub fn failed(index: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.flatlay_image.is_some() && self.mannequin_image.is_some()
    }
}

/// A ranked outfit merged with its render outcome. Missing images serialize as
/// `null`; `render_error` explains why.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedOutfit {
    #[serde(flatten)]
    pub outfit: RankedOutfit,
    #[serde(with = "image_data")]
    pub flatlay_image_data: Option<Vec<u8>>,
    #[serde(with = "image_data")]
    pub mannequin_image_data: Option<Vec<u8>>,
    pub mannequin_analysis: Option<String>,
    pub render_error: Option<String>,
}

impl RenderedOutfit {
    pub fn merge(outfit: RankedOutfit, result: RenderResult) -> Self {
        Self {
            outfit,
            flatlay_image_data: result.flatlay_image,
            mannequin_image_data: result.mannequin_image,
            mannequin_analysis: result.mannequin_analysis,
            render_error: result.error,
        }
    }
}

/// Base64 encoding for optional image payloads in JSON responses
mod image_data {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::Serializer;

    pub fn serialize<S>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match data {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }
}

/// Request to persist a recommended outfit
#[derive(Debug, Clone, Deserialize)]
pub struct NewSavedOutfit {
    pub name: String,
    pub occasion: Occasion,
    pub season: Season,
    pub item_ids: Vec<ItemId>,
    #[serde(default)]
    pub style_description: String,
    #[serde(default)]
    pub color_scheme: Vec<String>,
    #[serde(default)]
    pub style_tags: Vec<String>,
    #[serde(default = "default_confidence")]
    pub confidence_score: f64,
    #[serde(default)]
    pub style_notes: String,
}

fn default_confidence() -> f64 {
    0.5
}

/// Link between a saved outfit and one of its items
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutfitItemLink {
    pub item_id: ItemId,
    pub category: Category,
    pub match_score: f64,
    pub style_notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedOutfit {
    pub id: Uuid,
    pub name: String,
    pub occasion: Occasion,
    pub season: Season,
    pub style_description: String,
    pub color_scheme: Vec<String>,
    pub style_tags: Vec<String>,
    pub confidence_score: f64,
    pub items: Vec<OutfitItemLink>,
    /// User rating, 1 to 5
    pub rating: Option<u8>,
    #[serde(default)]
    pub wear_count: u32,
    #[serde(default)]
    pub last_worn: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
