/// Vision analysis of a single wardrobe item.
///
/// The item's photo is sent to the language model together with an analysis
/// prompt. The structured answer is written back onto the item, which is
/// where the style description, tags and palette used by the batch ranker
/// come from.
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::ImageFormat;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    db::WardrobeCatalog,
    error::{AppError, AppResult},
    models::{ItemId, Occasion, Season, WardrobeItem},
    services::{
        compositor::AssetLoader,
        providers::{ChatRequest, StyleModel},
        structured::{parse_structured, StructuredOutput},
    },
};

const ANALYSIS_TEMPERATURE: f32 = 0.1;
const ANALYSIS_MAX_TOKENS: u32 = 800;

/// Confidence reported when the answer was not valid JSON
pub const TEXT_FALLBACK_CONFIDENCE: f64 = 0.5;

const SYSTEM_PROMPT: &str =
    "You are a fashion expert who catalogs clothing items from product photos.";

/// What the model reports about one item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemAnalysis {
    #[serde(default)]
    pub primary_color: String,
    #[serde(default)]
    pub secondary_colors: Vec<String>,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub suitable_occasions: Vec<String>,
    #[serde(default)]
    pub suitable_seasons: Vec<String>,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub style_tags: Vec<String>,
    #[serde(default)]
    pub color_palette: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
    /// Raw model text, present only when the answer could not be parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_analysis: Option<String>,
}

impl ItemAnalysis {
    /// Generic analysis carrying the unparsed answer
    pub fn from_text(raw: &str) -> Self {
        Self {
            primary_color: "other".to_string(),
            secondary_colors: Vec::new(),
            style: "casual".to_string(),
            suitable_occasions: vec!["casual".to_string()],
            suitable_seasons: vec!["all".to_string()],
            material: "unknown".to_string(),
            style_tags: vec!["basic".to_string()],
            color_palette: Vec::new(),
            confidence: TEXT_FALLBACK_CONFIDENCE,
            raw_analysis: Some(raw.to_string()),
        }
    }

    /// Writes the findings onto `item`.
    ///
    /// Tags and palette are replaced. Occasion and season take the first
    /// suggestion that names a known value and are kept otherwise. Color and
    /// material are only overwritten by a concrete answer.
    pub fn apply_to(&self, item: &mut WardrobeItem) {
        let color = self.primary_color.trim().to_lowercase();
        if !color.is_empty() && color != "other" {
            item.color = color;
        }
        if !self.style.trim().is_empty() {
            item.style_description = Some(self.style.trim().to_string());
        }
        item.style_tags = self.style_tags.clone();
        item.color_palette = self.color_palette.clone();

        if let Some(occasion) = first_known::<Occasion>(&self.suitable_occasions) {
            item.occasion = occasion;
        }
        if let Some(season) = first_known::<Season>(&self.suitable_seasons) {
            item.season = season;
        }

        let material = self.material.trim();
        if item.material.is_none() && !material.is_empty() && material != "unknown" {
            item.material = Some(material.to_string());
        }
    }
}

/// First entry that deserializes as a lowercase enum value
fn first_known<T: DeserializeOwned>(values: &[String]) -> Option<T> {
    values.iter().find_map(|value| {
        serde_json::from_value(serde_json::Value::String(value.trim().to_lowercase())).ok()
    })
}

fn analysis_prompt(item: &WardrobeItem) -> String {
    format!(
        r##"Analyze this {category} clothing item and provide detailed style information:

1. PRIMARY COLOR: Identify the exact primary color (black, white, navy, etc.)
2. SECONDARY COLORS: List any secondary colors or patterns
3. STYLE: Describe the style (casual, formal, sporty, elegant, etc.)
4. OCCASION: What occasions is this suitable for? (casual, formal, business, party, sport, evening, weekend, travel, date, work)
5. SEASON: What season(s) is this suitable for? (spring, summer, fall, winter, all)
6. MATERIAL: What material or fabric does this appear to be made of?
7. STYLE TAGS: Provide 3-5 style tags that describe this item (e.g. "minimalist", "vintage", "preppy")
8. COLOR PALETTE: Extract the main colors in hex format if possible

Respond in JSON format:
{{
    "primary_color": "color_name",
    "secondary_colors": ["color1", "color2"],
    "style": "style_description",
    "suitable_occasions": ["occasion1", "occasion2"],
    "suitable_seasons": ["season1", "season2"],
    "material": "material_description",
    "style_tags": ["tag1", "tag2", "tag3"],
    "color_palette": ["#hex1", "#hex2"],
    "confidence": 0.85
}}"##,
        category = item.category
    )
}

/// Result of analyzing and updating one item
#[derive(Debug, Clone, Serialize)]
pub struct ItemAnalysisOutcome {
    pub item: WardrobeItem,
    pub analysis: ItemAnalysis,
}

pub struct ItemAnalyzer {
    model: Arc<dyn StyleModel>,
    assets: AssetLoader,
    timeout: Duration,
}

impl ItemAnalyzer {
    pub fn new(model: Arc<dyn StyleModel>, assets: AssetLoader, timeout: Duration) -> Self {
        Self {
            model,
            assets,
            timeout,
        }
    }

    /// Analyzes the item's photo. An unparseable answer yields
    /// [`ItemAnalysis::from_text`] rather than an error.
    pub async fn analyze(&self, item: &WardrobeItem) -> AppResult<ItemAnalysis> {
        let png = self.load_png(item).await?;

        let request = ChatRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: analysis_prompt(item),
            temperature: ANALYSIS_TEMPERATURE,
            max_tokens: ANALYSIS_MAX_TOKENS,
            json_response: true,
            image: Some(png),
        };

        let raw = match tokio::time::timeout(self.timeout, self.model.complete(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(AppError::Timeout(format!(
                    "{} item analysis timed out after {}s",
                    self.model.name(),
                    self.timeout.as_secs_f64()
                )))
            }
        };

        match parse_structured::<ItemAnalysis>(&raw) {
            StructuredOutput::Parsed(mut analysis) => {
                analysis.confidence = analysis.confidence.clamp(0.0, 1.0);
                Ok(analysis)
            }
            StructuredOutput::Unparsed { raw, reason } => {
                tracing::warn!(item_id = item.id, reason = %reason, "Item analysis was not JSON");
                Ok(ItemAnalysis::from_text(&raw))
            }
        }
    }

    /// Analyzes a stored item and saves the findings back to the catalog
    pub async fn analyze_and_update(
        &self,
        catalog: &dyn WardrobeCatalog,
        id: ItemId,
    ) -> AppResult<ItemAnalysisOutcome> {
        let mut item = catalog.get_item(id).await?;
        let analysis = self.analyze(&item).await?;

        analysis.apply_to(&mut item);
        let item = catalog.update_item(item).await?;

        tracing::info!(
            item_id = id,
            provider = self.model.name(),
            confidence = analysis.confidence,
            parsed = analysis.raw_analysis.is_none(),
            "Wardrobe item analyzed"
        );

        Ok(ItemAnalysisOutcome { item, analysis })
    }

    /// The item's photo re-encoded as PNG, decoded off the async runtime
    async fn load_png(&self, item: &WardrobeItem) -> AppResult<Vec<u8>> {
        let assets = self.assets.clone();
        let item = item.clone();

        tokio::task::spawn_blocking(move || -> AppResult<Vec<u8>> {
            let image = assets.load(&item).ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "No image available for analysis of item {}",
                    item.id
                ))
            })?;
            let mut png = Vec::new();
            image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
            Ok(png)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?
    }
}
