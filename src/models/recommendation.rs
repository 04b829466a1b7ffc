use serde::{Deserialize, Serialize};

use super::{Occasion, RankedOutfit, RenderedOutfit, Season};

pub const MAX_OUTFITS_LIMIT: usize = 20;

/// Request to recommend and render outfits
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub occasion: Occasion,
    #[serde(default)]
    pub season: Season,
    #[serde(default = "default_max_outfits")]
    pub max_outfits: usize,
}

fn default_max_outfits() -> usize {
    5
}

/// Output of the batch ranking stage
#[derive(Debug, Clone)]
pub struct BatchRanking {
    /// Sorted by ranking position, at most the requested count
    pub outfits: Vec<RankedOutfit>,
    pub overall_analysis: String,
    pub total_analyzed: usize,
    /// True when the language model call failed and rankings were synthesized
    pub fallback: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub success: bool,
    pub occasion: Occasion,
    pub season: Season,
    pub outfits: Vec<RenderedOutfit>,
    /// Number of candidate outfits generated from the wardrobe
    pub total_combinations: usize,
    pub total_analyzed: usize,
    pub overall_analysis: String,
    /// True when the exact occasion/season filter was widened
    pub pool_widened: bool,
    /// Outfits missing at least one image
    pub render_failures: usize,
}
