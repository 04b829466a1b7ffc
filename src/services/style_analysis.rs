use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::{
    models::{
        BatchRanking, Category, Occasion, OutfitCandidate, RankedOutfit, Season, StyleAnalysis,
        WardrobeItem,
    },
    services::{
        providers::{ChatRequest, StyleModel},
        structured::parse_structured,
    },
};

/// Confidence assigned to every outfit when the ranking call fails
pub const FALLBACK_CONFIDENCE: f64 = 0.6;

const SYSTEM_PROMPT: &str = "You are a professional fashion stylist and outfit analyst. \
Analyze multiple outfits and provide detailed rankings and feedback. Consider all available \
information including colors, clothing types, materials, style descriptions, occasions, \
seasons, and style tags.";

const FORMAT_INSTRUCTIONS: &str = r#"Respond with a single JSON object of this shape:
{
  "outfit_rankings": [
    {
      "outfit_id": <index of the outfit as numbered above>,
      "style_description": "<one or two sentences>",
      "color_scheme": ["<color>", ...],
      "style_tags": ["<short label>", ...],
      "confidence_score": <number between 0 and 1>,
      "style_notes": "<styling notes>",
      "improvement_suggestions": ["<suggestion>", ...],
      "ranking_position": <1 = best, unique across all outfits>
    }
  ],
  "overall_analysis": "<summary of the whole collection>"
}"#;

/// Wire shape of the batch ranking answer.
///
/// Rankings stay untyped here so one malformed entry is dropped on its own
/// instead of failing the whole answer.
#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    outfit_rankings: Vec<Value>,
    #[serde(default)]
    overall_analysis: String,
}

#[derive(Debug, Deserialize)]
struct OutfitRanking {
    outfit_id: i64,
    #[serde(default)]
    style_description: String,
    #[serde(default)]
    color_scheme: Vec<String>,
    #[serde(default)]
    style_tags: Vec<String>,
    #[serde(default)]
    confidence_score: f64,
    #[serde(default)]
    style_notes: String,
    #[serde(default)]
    improvement_suggestions: Vec<String>,
    ranking_position: u32,
}

/// Ranks a whole candidate batch with one language model call
pub struct BatchStyleAnalyzer {
    model: Arc<dyn StyleModel>,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl BatchStyleAnalyzer {
    pub fn new(
        model: Arc<dyn StyleModel>,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            temperature,
            max_tokens,
            timeout,
        }
    }

    /// Returns at most `max_outfits` ranked outfits, best first.
    ///
    /// Never fails: any provider, timeout or parse failure produces the
    /// fallback ranking instead.
    pub async fn analyze(
        &self,
        candidates: &[OutfitCandidate],
        occasion: Occasion,
        season: Season,
        max_outfits: usize,
    ) -> BatchRanking {
        if candidates.is_empty() {
            return BatchRanking {
                outfits: Vec::new(),
                overall_analysis: "No outfits to analyze".to_string(),
                total_analyzed: 0,
                fallback: false,
            };
        }

        match self.rank(candidates, occasion, season, max_outfits).await {
            Ok(ranking) => ranking,
            Err(reason) => {
                tracing::error!(
                    provider = self.model.name(),
                    candidates = candidates.len(),
                    error = %reason,
                    "Batch outfit analysis failed, using fallback ranking"
                );
                fallback_ranking(candidates, occasion, season, max_outfits, &reason)
            }
        }
    }

    async fn rank(
        &self,
        candidates: &[OutfitCandidate],
        occasion: Occasion,
        season: Season,
        max_outfits: usize,
    ) -> Result<BatchRanking, String> {
        let request = ChatRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: build_batch_prompt(candidates, occasion, season, max_outfits),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_response: true,
            image: None,
        };

        let raw = match tokio::time::timeout(self.timeout, self.model.complete(&request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(e.to_string()),
            Err(_) => {
                return Err(format!(
                    "{} ranking timed out after {}s",
                    self.model.name(),
                    self.timeout.as_secs_f64()
                ))
            }
        };

        let response = parse_structured::<BatchResponse>(&raw).into_result()?;
        let outfits = select_rankings(response.outfit_rankings, candidates, max_outfits);
        if outfits.is_empty() {
            return Err("Response referenced no valid outfits".to_string());
        }

        tracing::info!(
            provider = self.model.name(),
            analyzed = candidates.len(),
            selected = outfits.len(),
            "Batch outfit analysis complete"
        );

        Ok(BatchRanking {
            outfits,
            overall_analysis: response.overall_analysis,
            total_analyzed: candidates.len(),
            fallback: false,
        })
    }
}

/// Drops rankings that point at no candidate, orders the rest and truncates.
///
/// Order is ranking position, then confidence descending, then outfit id.
/// Positions are renumbered 1..=k afterwards so they are always unique.
fn select_rankings(
    rankings: Vec<Value>,
    candidates: &[OutfitCandidate],
    max_outfits: usize,
) -> Vec<RankedOutfit> {
    let mut seen = HashSet::new();
    let mut valid: Vec<(usize, OutfitRanking)> = Vec::with_capacity(rankings.len());

    for entry in rankings {
        let ranking = match serde_json::from_value::<OutfitRanking>(entry) {
            Ok(ranking) => ranking,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed outfit ranking");
                continue;
            }
        };
        let index = usize::try_from(ranking.outfit_id)
            .ok()
            .filter(|&index| index < candidates.len());
        match index {
            Some(index) if seen.insert(index) => valid.push((index, ranking)),
            Some(index) => {
                tracing::warn!(outfit_id = index, "Dropping duplicate outfit ranking");
            }
            None => {
                tracing::warn!(
                    outfit_id = ranking.outfit_id,
                    candidates = candidates.len(),
                    "Dropping ranking for unknown outfit"
                );
            }
        }
    }

    for (_, ranking) in valid.iter_mut() {
        ranking.confidence_score = clamp_confidence(ranking.confidence_score);
    }

    valid.sort_by(|(a_index, a), (b_index, b)| {
        a.ranking_position
            .cmp(&b.ranking_position)
            .then(b.confidence_score.total_cmp(&a.confidence_score))
            .then(a_index.cmp(b_index))
    });
    valid.truncate(max_outfits);

    valid
        .into_iter()
        .zip(1u32..)
        .map(|((index, ranking), position)| RankedOutfit {
            candidate: candidates[index].clone(),
            analysis: StyleAnalysis {
                style_description: ranking.style_description,
                color_scheme: ranking.color_scheme,
                style_tags: ranking.style_tags,
                confidence_score: ranking.confidence_score,
                style_notes: ranking.style_notes,
                improvement_suggestions: ranking.improvement_suggestions,
            },
            ranking_position: position,
        })
        .collect()
}

fn clamp_confidence(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Degenerate ranking in input order, used when the model call fails
pub fn fallback_ranking(
    candidates: &[OutfitCandidate],
    occasion: Occasion,
    season: Season,
    max_outfits: usize,
    reason: &str,
) -> BatchRanking {
    let outfits = candidates
        .iter()
        .take(max_outfits)
        .zip(1u32..)
        .map(|(candidate, position)| RankedOutfit {
            candidate: candidate.clone(),
            analysis: StyleAnalysis {
                style_description: format!("Stylish {} outfit for {}", occasion, season),
                color_scheme: candidate.colors(),
                style_tags: vec![occasion.to_string(), season.to_string()],
                confidence_score: FALLBACK_CONFIDENCE,
                style_notes: format!("Error during analysis: {}", reason),
                improvement_suggestions: Vec::new(),
            },
            ranking_position: position,
        })
        .collect();

    BatchRanking {
        outfits,
        overall_analysis: format!("Analysis failed: {}", reason),
        total_analyzed: candidates.len(),
        fallback: true,
    }
}

fn build_batch_prompt(
    candidates: &[OutfitCandidate],
    occasion: Occasion,
    season: Season,
    max_outfits: usize,
) -> String {
    let mut prompt = format!(
        "Analyze these {} outfit combinations for a {} occasion in {} season:\n\n",
        candidates.len(),
        occasion,
        season
    );

    for (index, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!(
            "OUTFIT {}:\n{}\n",
            index,
            describe_outfit(candidate)
        ));
    }

    prompt.push_str(&format!(
        "For each outfit, evaluate:\n\
         1. OCCASION APPROPRIATENESS: Is this suitable for a {occasion} occasion? This is critical.\n\
         2. SEASON SUITABILITY: Is this appropriate for {season}? Check materials, colors and styles.\n\
         3. STYLE COHESION: Do the pieces work together?\n\
         4. COLOR HARMONY: Do the colors and palettes complement each other?\n\
         5. MATERIAL COMPATIBILITY: Do the fabrics go together?\n\
         6. OVERALL CONFIDENCE: Rate the outfit from 0 to 1.\n\n\
         Rank all outfits from best to worst (1 = best), analyze each one, identify the top \
         {max_outfits} recommendations and give an overall analysis of the collection.\n\n\
         {FORMAT_INSTRUCTIONS}"
    ));

    prompt
}

/// One line per item, grouped by role
pub fn describe_outfit(candidate: &OutfitCandidate) -> String {
    let order = [
        Category::Top,
        Category::Bottom,
        Category::Dress,
        Category::Outerwear,
        Category::Shoes,
        Category::Accessories,
    ];

    order
        .iter()
        .flat_map(|&category| candidate.role(category))
        .map(|item| format!("- {}", describe_item(item)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_item(item: &WardrobeItem) -> String {
    let mut details = vec![format!("{} {} ({})", item.color, item.category, item.name)];

    if let Some(brand) = &item.brand {
        details.push(format!("by {}", brand));
    }
    if let Some(material) = &item.material {
        details.push(format!("in {}", material));
    }
    if let Some(size) = &item.size {
        details.push(format!("size {}", size));
    }
    if let Some(style) = &item.style_description {
        details.push(format!("- Style: {}", style));
    }
    if !item.style_tags.is_empty() {
        details.push(format!("- Tags: {}", item.style_tags.join(", ")));
    }
    details.push(format!(
        "- Occasion: {}, Season: {}",
        item.occasion, item.season
    ));
    if !item.color_palette.is_empty() {
        details.push(format!("- Color palette: {}", item.color_palette.join(", ")));
    }

    details.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::wardrobe::fixtures::item;
    use crate::services::providers::MockStyleModel;
    use serde_json::json;

    fn candidates(count: usize) -> Vec<OutfitCandidate> {
        (0..count)
            .map(|i| {
                OutfitCandidate::new(
                    format!("Outfit {}", i),
                    Occasion::Work,
                    Season::Fall,
                    vec![
                        Arc::new(item(i as u64 * 2 + 1, Category::Top, "white")),
                        Arc::new(item(i as u64 * 2 + 2, Category::Bottom, "grey")),
                    ],
                )
            })
            .collect()
    }

    fn ranking(outfit_id: i64, position: u32, confidence: f64) -> serde_json::Value {
        json!({
            "outfit_id": outfit_id,
            "style_description": format!("look {}", outfit_id),
            "color_scheme": ["white", "grey"],
            "style_tags": ["smart"],
            "confidence_score": confidence,
            "style_notes": "tuck the shirt",
            "improvement_suggestions": ["add a belt"],
            "ranking_position": position
        })
    }

    fn analyzer_returning(result: Result<String, String>) -> BatchStyleAnalyzer {
        let mut model = MockStyleModel::new();
        model.expect_name().return_const("mock");
        model.expect_complete().times(1).returning(move |request| {
            assert!(request.json_response);
            result.clone().map_err(AppError::ExternalApi)
        });
        BatchStyleAnalyzer::new(Arc::new(model), 0.3, 2000, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_sorts_by_position_and_truncates() {
        let body = json!({
            "outfit_rankings": [
                ranking(0, 3, 0.7),
                ranking(1, 1, 0.9),
                ranking(2, 4, 0.4),
                ranking(3, 2, 0.8)
            ],
            "overall_analysis": "Strong neutral basics"
        });
        let analyzer = analyzer_returning(Ok(body.to_string()));

        let result = analyzer
            .analyze(&candidates(4), Occasion::Work, Season::Fall, 2)
            .await;

        assert!(!result.fallback);
        assert_eq!(result.total_analyzed, 4);
        assert_eq!(result.overall_analysis, "Strong neutral basics");
        let names: Vec<_> = result.outfits.iter().map(|o| o.candidate.name.as_str()).collect();
        assert_eq!(names, vec!["Outfit 1", "Outfit 3"]);
        let positions: Vec<_> = result.outfits.iter().map(|o| o.ranking_position).collect();
        assert_eq!(positions, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_invalid_and_duplicate_ids_are_dropped() {
        let body = json!({
            "outfit_rankings": [
                ranking(7, 1, 0.9),
                ranking(-1, 1, 0.9),
                ranking(1, 2, 0.5),
                ranking(1, 1, 0.95),
                ranking(0, 2, 0.6)
            ],
            "overall_analysis": ""
        });
        let analyzer = analyzer_returning(Ok(body.to_string()));

        let result = analyzer
            .analyze(&candidates(2), Occasion::Work, Season::Fall, 5)
            .await;

        assert_eq!(result.outfits.len(), 2);
        // Equal positions fall back to confidence, then id
        assert_eq!(result.outfits[0].candidate.name, "Outfit 0");
        assert_eq!(result.outfits[1].candidate.name, "Outfit 1");
        assert_eq!(result.outfits[1].analysis.confidence_score, 0.5);
    }

    #[tokio::test]
    async fn test_malformed_entries_are_dropped_individually() {
        let mut negative_position = ranking(2, 1, 0.9);
        negative_position["ranking_position"] = json!(-3);
        let mut missing_position = ranking(3, 1, 0.9);
        missing_position
            .as_object_mut()
            .unwrap()
            .remove("ranking_position");
        let body = json!({
            "outfit_rankings": [
                ranking(1, 2, 0.6),
                {"outfit_id": null, "ranking_position": 1, "confidence_score": 0.9},
                {"outfit_id": "0", "ranking_position": 1},
                negative_position,
                missing_position,
                "not an object",
                ranking(0, 1, 0.8)
            ],
            "overall_analysis": "two usable rankings"
        });
        let analyzer = analyzer_returning(Ok(body.to_string()));

        let result = analyzer
            .analyze(&candidates(4), Occasion::Work, Season::Fall, 5)
            .await;

        assert!(!result.fallback);
        assert_eq!(result.overall_analysis, "two usable rankings");
        let names: Vec<_> = result.outfits.iter().map(|o| o.candidate.name.as_str()).collect();
        assert_eq!(names, vec!["Outfit 0", "Outfit 1"]);
        assert_eq!(result.outfits[0].analysis.style_description, "look 0");
    }

    #[tokio::test]
    async fn test_positions_are_unique_and_confidence_clamped() {
        let body = json!({
            "outfit_rankings": [
                ranking(0, 1, 1.7),
                ranking(1, 1, -0.2),
                ranking(2, 1, 0.3)
            ],
            "overall_analysis": "ties"
        });
        let analyzer = analyzer_returning(Ok(body.to_string()));

        let result = analyzer
            .analyze(&candidates(3), Occasion::Work, Season::Fall, 5)
            .await;

        let positions: Vec<_> = result.outfits.iter().map(|o| o.ranking_position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert!(result
            .outfits
            .iter()
            .all(|o| (0.0..=1.0).contains(&o.analysis.confidence_score)));
        assert_eq!(result.outfits[0].analysis.confidence_score, 1.0);
    }

    #[tokio::test]
    async fn test_accepts_fenced_response() {
        let body = json!({"outfit_rankings": [ranking(0, 1, 0.8)], "overall_analysis": "ok"});
        let raw = format!("Sure!\n```json\n{}\n```", body);
        let analyzer = analyzer_returning(Ok(raw));

        let result = analyzer
            .analyze(&candidates(1), Occasion::Work, Season::Fall, 5)
            .await;

        assert!(!result.fallback);
        assert_eq!(result.outfits.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_uses_fallback() {
        let analyzer = analyzer_returning(Err("quota exceeded".to_string()));

        let result = analyzer
            .analyze(&candidates(4), Occasion::Work, Season::Fall, 3)
            .await;

        assert!(result.fallback);
        assert_eq!(result.outfits.len(), 3);
        assert_eq!(result.total_analyzed, 4);
        assert!(result.overall_analysis.starts_with("Analysis failed:"));
        for (i, outfit) in result.outfits.iter().enumerate() {
            assert_eq!(outfit.ranking_position, i as u32 + 1);
            assert_eq!(outfit.analysis.confidence_score, FALLBACK_CONFIDENCE);
            assert_eq!(outfit.analysis.style_tags, vec!["work", "fall"]);
            assert!(outfit.analysis.style_notes.contains("quota exceeded"));
        }
    }

    #[tokio::test]
    async fn test_malformed_response_uses_fallback() {
        let analyzer = analyzer_returning(Ok("I would pick the second one.".to_string()));

        let result = analyzer
            .analyze(&candidates(2), Occasion::Work, Season::Fall, 5)
            .await;

        assert!(result.fallback);
        assert_eq!(result.outfits.len(), 2);
        assert_eq!(result.outfits[0].analysis.color_scheme, vec!["white", "grey"]);
    }

    #[tokio::test]
    async fn test_all_invalid_ids_use_fallback() {
        let body = json!({"outfit_rankings": [ranking(9, 1, 0.8)], "overall_analysis": "?"});
        let analyzer = analyzer_returning(Ok(body.to_string()));

        let result = analyzer
            .analyze(&candidates(2), Occasion::Work, Season::Fall, 1)
            .await;

        assert!(result.fallback);
        assert_eq!(result.outfits.len(), 1);
    }

    struct HangingModel;

    #[async_trait::async_trait]
    impl StyleModel for HangingModel {
        async fn complete(&self, _request: &ChatRequest) -> crate::error::AppResult<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(String::new())
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    #[tokio::test]
    async fn test_timeout_uses_fallback() {
        let analyzer =
            BatchStyleAnalyzer::new(Arc::new(HangingModel), 0.3, 2000, Duration::from_millis(20));

        let result = analyzer
            .analyze(&candidates(2), Occasion::Work, Season::Fall, 5)
            .await;

        assert!(result.fallback);
        assert!(result.overall_analysis.contains("timed out"));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_model() {
        let mut model = MockStyleModel::new();
        model.expect_complete().never();
        let analyzer = BatchStyleAnalyzer::new(Arc::new(model), 0.3, 2000, Duration::from_secs(1));

        let result = analyzer.analyze(&[], Occasion::Work, Season::Fall, 5).await;

        assert!(result.outfits.is_empty());
        assert_eq!(result.total_analyzed, 0);
    }

    #[test]
    fn test_prompt_numbers_every_outfit() {
        let prompt = build_batch_prompt(&candidates(3), Occasion::Work, Season::Fall, 2);

        assert!(prompt.starts_with("Analyze these 3 outfit combinations for a work occasion in fall season"));
        assert!(prompt.contains("OUTFIT 0:"));
        assert!(prompt.contains("OUTFIT 2:"));
        assert!(prompt.contains("top 2 recommendations"));
        assert!(prompt.contains("\"outfit_rankings\""));
    }

    #[test]
    fn test_item_description_includes_metadata() {
        let mut shirt = item(1, Category::Top, "navy");
        shirt.brand = Some("Uniqlo".to_string());
        shirt.material = Some("linen".to_string());
        shirt.style_tags = vec!["relaxed".to_string(), "breathable".to_string()];

        let line = describe_item(&shirt);

        assert!(line.starts_with("navy top (navy top)"));
        assert!(line.contains("by Uniqlo"));
        assert!(line.contains("in linen"));
        assert!(line.contains("- Tags: relaxed, breathable"));
        assert!(line.contains("- Occasion: casual, Season: all"));
    }
}
