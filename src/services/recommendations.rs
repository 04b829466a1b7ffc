use std::sync::Arc;

use crate::{
    db::WardrobeCatalog,
    error::{AppError, AppResult},
    models::{
        recommendation::MAX_OUTFITS_LIMIT, BatchRanking, RecommendationRequest,
        RecommendationResponse,
    },
    services::{
        candidates::{generate_candidates, select_item_pool},
        compositor::ImageCompositor,
        render::RenderCoordinator,
        style_analysis::BatchStyleAnalyzer,
    },
};

/// Runs the recommendation pipeline: pool, candidates, batch ranking, rendering
pub struct RecommendationService {
    catalog: Arc<dyn WardrobeCatalog>,
    analyzer: BatchStyleAnalyzer,
    coordinator: RenderCoordinator,
    compositor: Arc<ImageCompositor>,
}

impl RecommendationService {
    pub fn new(
        catalog: Arc<dyn WardrobeCatalog>,
        analyzer: BatchStyleAnalyzer,
        coordinator: RenderCoordinator,
        compositor: Arc<ImageCompositor>,
    ) -> Self {
        Self {
            catalog,
            analyzer,
            coordinator,
            compositor,
        }
    }

    /// Ranked and rendered outfits for the request.
    ///
    /// Fails only on invalid input or an empty pool; ranking and render
    /// failures are reported inside the response.
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> AppResult<RecommendationResponse> {
        validate_request(request)?;
        let (occasion, season) = (request.occasion, request.season);

        let (ranking, total_combinations, pool_widened) = self.rank(request).await?;

        let outfits = self
            .coordinator
            .render_all(ranking.outfits, occasion, season)
            .await;
        let render_failures = outfits
            .iter()
            .filter(|o| o.flatlay_image_data.is_none() || o.mannequin_image_data.is_none())
            .count();

        tracing::info!(
            occasion = %occasion,
            season = %season,
            total_combinations,
            returned = outfits.len(),
            render_failures,
            fallback_ranking = ranking.fallback,
            "Recommendation complete"
        );

        Ok(RecommendationResponse {
            success: true,
            occasion,
            season,
            outfits,
            total_combinations,
            total_analyzed: ranking.total_analyzed,
            overall_analysis: ranking.overall_analysis,
            pool_widened,
            render_failures,
        })
    }

    /// PNG grid of the ranked outfits' flat-lays, without mannequin renders
    pub async fn summary_grid(&self, request: &RecommendationRequest) -> AppResult<Vec<u8>> {
        validate_request(request)?;
        let (ranking, _, _) = self.rank(request).await?;

        let outfits: Vec<_> = ranking.outfits.into_iter().map(|o| o.candidate).collect();
        let compositor = self.compositor.clone();
        let (occasion, season) = (request.occasion, request.season);

        tokio::task::spawn_blocking(move || compositor.compose_grid(&outfits, occasion, season))
            .await
            .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?
    }

    /// Ranking plus the candidate count and whether the pool was widened
    async fn rank(
        &self,
        request: &RecommendationRequest,
    ) -> AppResult<(BatchRanking, usize, bool)> {
        let pool =
            select_item_pool(self.catalog.as_ref(), request.occasion, request.season).await?;
        let candidates = generate_candidates(&pool.items, request.occasion, request.season);

        let ranking = self
            .analyzer
            .analyze(&candidates, request.occasion, request.season, request.max_outfits)
            .await;

        Ok((ranking, candidates.len(), pool.widened))
    }
}

fn validate_request(request: &RecommendationRequest) -> AppResult<()> {
    if request.max_outfits == 0 || request.max_outfits > MAX_OUTFITS_LIMIT {
        return Err(AppError::InvalidInput(format!(
            "max_outfits must be between 1 and {}",
            MAX_OUTFITS_LIMIT
        )));
    }
    Ok(())
}
