/// Per-outfit rendering and the bounded fan-out across a ranked batch.
///
/// Every outfit gets its own task in a `JoinSet`. A semaphore caps how many
/// run at once, and each result lands in the slot of its input index, so the
/// output order never depends on completion time.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::{
    models::{Occasion, OutfitCandidate, RankedOutfit, RenderResult, RenderedOutfit, Season},
    services::{
        compositor::{normalize_png, ImageCompositor},
        providers::{ImageGenerationRequest, ImageGenerator},
    },
};

/// Worker cap used when none is configured
pub const DEFAULT_MAX_WORKERS: usize = 5;

fn mannequin_prompt(occasion: Occasion, season: Season) -> String {
    format!(
        "I have an outfit combination for a {occasion} occasion in {season} season. \
         Place the combination's clothes on a mannequin. Remove the background and display \
         the garments on a pure white backdrop. Make it look professional and stylish for \
         the {occasion} occasion."
    )
}

/// Turns one outfit into a flat-lay and a mannequin render
pub struct OutfitRenderer {
    compositor: Arc<ImageCompositor>,
    generator: Arc<dyn ImageGenerator>,
    timeout: Duration,
}

impl OutfitRenderer {
    pub fn new(
        compositor: Arc<ImageCompositor>,
        generator: Arc<dyn ImageGenerator>,
        timeout: Duration,
    ) -> Self {
        Self {
            compositor,
            generator,
            timeout,
        }
    }

    /// Never fails; whatever could not be produced is `None` with `error` set
    pub async fn render(
        &self,
        index: usize,
        outfit: &OutfitCandidate,
        occasion: Occasion,
        season: Season,
    ) -> RenderResult {
        let compositor = self.compositor.clone();
        let candidate = outfit.clone();
        let flatlay = tokio::task::spawn_blocking(move || compositor.flatlay_for(&candidate))
            .await
            .map_err(|e| format!("Flat-lay task failed: {}", e))
            .and_then(|result| result.map_err(|e| e.to_string()));

        let flatlay = match flatlay {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(index, outfit = %outfit.name, error = %error, "Flat-lay failed");
                return RenderResult::failed(index, error);
            }
        };

        let request = ImageGenerationRequest {
            prompt: mannequin_prompt(occasion, season),
            source_image: flatlay.clone(),
            label: outfit.name.clone(),
        };

        let mannequin = match tokio::time::timeout(self.timeout, self.generator.generate(&request))
            .await
        {
            Ok(Ok(Some(bytes))) => normalize_png(&bytes).map_err(|e| e.to_string()),
            Ok(Ok(None)) => Err("No mannequin image returned".to_string()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "{} mannequin render timed out after {}s",
                self.generator.name(),
                self.timeout.as_secs_f64()
            )),
        };

        match mannequin {
            Ok(image) => {
                tracing::info!(index, outfit = %outfit.name, "Rendered outfit");
                RenderResult {
                    index,
                    flatlay_image: Some(flatlay),
                    mannequin_image: Some(image),
                    mannequin_analysis: Some(format!(
                        "Generated mannequin image for {} occasion in {} season",
                        occasion, season
                    )),
                    error: None,
                }
            }
            Err(error) => {
                tracing::warn!(
                    index,
                    outfit = %outfit.name,
                    provider = self.generator.name(),
                    error = %error,
                    "Mannequin render failed"
                );
                RenderResult {
                    index,
                    flatlay_image: Some(flatlay),
                    error: Some(error),
                    ..RenderResult::default()
                }
            }
        }
    }
}

/// Renders a ranked batch with at most `max_workers` outfits in flight
pub struct RenderCoordinator {
    renderer: Arc<OutfitRenderer>,
    max_workers: usize,
}

impl RenderCoordinator {
    pub fn new(renderer: Arc<OutfitRenderer>, max_workers: usize) -> Self {
        Self {
            renderer,
            max_workers: max_workers.max(1),
        }
    }

    /// One output per input, in input order
    pub async fn render_all(
        &self,
        outfits: Vec<RankedOutfit>,
        occasion: Occasion,
        season: Season,
    ) -> Vec<RenderedOutfit> {
        if outfits.is_empty() {
            return Vec::new();
        }

        let workers = outfits.len().min(self.max_workers);
        let semaphore = Arc::new(Semaphore::new(workers));
        let started = std::time::Instant::now();

        tracing::info!(outfits = outfits.len(), workers, "Starting concurrent outfit rendering");

        // Dropping the set aborts every task still queued or running
        let mut tasks = JoinSet::new();
        for (index, outfit) in outfits.iter().enumerate() {
            let renderer = self.renderer.clone();
            let semaphore = semaphore.clone();
            let candidate = outfit.candidate.clone();

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (index, RenderResult::failed(index, "Render pool closed")),
                };
                (index, renderer.render(index, &candidate, occasion, season).await)
            });
        }

        let mut slots: Vec<Option<RenderResult>> = vec![None; outfits.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "Render task panicked"),
            }
        }

        let results: Vec<RenderResult> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| RenderResult::failed(index, "Render task failed"))
            })
            .collect();

        let failures = results.iter().filter(|r| !r.is_complete()).count();
        tracing::info!(
            outfits = results.len(),
            failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Concurrent outfit rendering complete"
        );

        outfits
            .into_iter()
            .zip(results)
            .map(|(outfit, result)| RenderedOutfit::merge(outfit, result))
            .collect()
    }
}
