use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod outfit;
pub mod recommendation;
pub mod wardrobe;

pub use outfit::{
    NewSavedOutfit, OutfitCandidate, OutfitItemLink, RankedOutfit, RenderResult, RenderedOutfit,
    SavedOutfit, StyleAnalysis,
};
pub use recommendation::{BatchRanking, RecommendationRequest, RecommendationResponse};
pub use wardrobe::{ItemFilter, ItemId, NewWardrobeItem, WardrobeItem};

/// Garment role within an outfit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Top,
    Bottom,
    Shoes,
    Accessories,
    Outerwear,
    Dress,
}

impl Category {
    /// Order in which garments are laid out on a flat-lay
    pub const LAYOUT_ORDER: [Category; 6] = [
        Category::Top,
        Category::Bottom,
        Category::Shoes,
        Category::Accessories,
        Category::Outerwear,
        Category::Dress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Top => "top",
            Category::Bottom => "bottom",
            Category::Shoes => "shoes",
            Category::Accessories => "accessories",
            Category::Outerwear => "outerwear",
            Category::Dress => "dress",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occasion {
    #[default]
    Casual,
    Formal,
    Business,
    Party,
    Sport,
    Evening,
    Weekend,
    Travel,
    Date,
    Work,
    All,
}

impl Occasion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Occasion::Casual => "casual",
            Occasion::Formal => "formal",
            Occasion::Business => "business",
            Occasion::Party => "party",
            Occasion::Sport => "sport",
            Occasion::Evening => "evening",
            Occasion::Weekend => "weekend",
            Occasion::Travel => "travel",
            Occasion::Date => "date",
            Occasion::Work => "work",
            Occasion::All => "all",
        }
    }
}

impl Display for Occasion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
    #[default]
    All,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
            Season::All => "all",
        }
    }

    /// Seasons in which outerwear is added to generated outfits
    pub fn wants_outerwear(&self) -> bool {
        matches!(self, Season::Fall | Season::Winter)
    }
}

impl Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper-cases the first character of every word ("navy blue" -> "Navy Blue")
pub fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enums_use_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&Category::Accessories).unwrap(), "\"accessories\"");
        assert_eq!(serde_json::from_str::<Season>("\"fall\"").unwrap(), Season::Fall);
        assert!(serde_json::from_str::<Season>("\"autumn\"").is_err());
        assert_eq!(serde_json::from_str::<Occasion>("\"all\"").unwrap(), Occasion::All);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("navy"), "Navy");
        assert_eq!(title_case("navy BLUE"), "Navy Blue");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_wants_outerwear() {
        assert!(Season::Winter.wants_outerwear());
        assert!(Season::Fall.wants_outerwear());
        assert!(!Season::Summer.wants_outerwear());
        assert!(!Season::All.wants_outerwear());
    }
}
