use std::sync::Arc;

use crate::{
    db::WardrobeCatalog,
    error::{AppError, AppResult},
    models::{title_case, Category, ItemFilter, Occasion, OutfitCandidate, Season, WardrobeItem},
};

/// Below this many exact matches the pool is widened to related occasions
pub const MIN_EXACT_MATCHES: usize = 3;

/// Catalog subset a recommendation run draws from
#[derive(Debug, Clone)]
pub struct ItemPool {
    /// Ascending item id
    pub items: Vec<Arc<WardrobeItem>>,
    /// True when the exact occasion filter matched too few items
    pub widened: bool,
}

/// Occasions accepted once the exact filter is widened.
///
/// Items tagged `all` match any filter, so `All` is never listed here: a
/// requested `All` would turn the filter into a wildcard.
fn widened_occasions(occasion: Occasion) -> Vec<Occasion> {
    let mut occasions = vec![occasion];
    for related in [Occasion::Casual, Occasion::Business] {
        if !occasions.contains(&related) {
            occasions.push(related);
        }
    }
    occasions
}

/// Selects the items to combine for an occasion and season.
///
/// Uses the exact occasion filter when it yields at least
/// [`MIN_EXACT_MATCHES`] items and the widened casual/business filter
/// otherwise. The season filter is never relaxed.
pub async fn select_item_pool(
    catalog: &dyn WardrobeCatalog,
    occasion: Occasion,
    season: Season,
) -> AppResult<ItemPool> {
    if catalog.count().await? == 0 {
        return Err(AppError::NoItemsAvailable(
            "No wardrobe items available for recommendations".to_string(),
        ));
    }

    let exact = catalog
        .list_items(&ItemFilter::for_context(vec![occasion], season))
        .await?;

    tracing::info!(
        occasion = %occasion,
        season = %season,
        exact_matches = exact.len(),
        "Filtered wardrobe for recommendation"
    );

    let (items, widened) = if exact.len() >= MIN_EXACT_MATCHES {
        (exact, false)
    } else {
        let wider = catalog
            .list_items(&ItemFilter::for_context(widened_occasions(occasion), season))
            .await?;
        tracing::info!(items = wider.len(), "Using widened occasion filter");
        (wider, true)
    };

    if items.is_empty() {
        return Err(AppError::NoItemsAvailable(format!(
            "No items suitable for {} occasion and {} season",
            occasion, season
        )));
    }

    Ok(ItemPool {
        items: items.into_iter().map(Arc::new).collect(),
        widened,
    })
}

/// Pool partitioned by category, each bucket in ascending id order
struct Buckets {
    tops: Vec<Arc<WardrobeItem>>,
    bottoms: Vec<Arc<WardrobeItem>>,
    shoes: Vec<Arc<WardrobeItem>>,
    accessories: Vec<Arc<WardrobeItem>>,
    outerwear: Vec<Arc<WardrobeItem>>,
    dresses: Vec<Arc<WardrobeItem>>,
}

impl Buckets {
    fn partition(pool: &[Arc<WardrobeItem>]) -> Self {
        let mut sorted = pool.to_vec();
        sorted.sort_by_key(|item| item.id);

        let bucket = |category: Category| -> Vec<Arc<WardrobeItem>> {
            sorted
                .iter()
                .filter(|item| item.category == category)
                .cloned()
                .collect()
        };

        Self {
            tops: bucket(Category::Top),
            bottoms: bucket(Category::Bottom),
            shoes: bucket(Category::Shoes),
            accessories: bucket(Category::Accessories),
            outerwear: bucket(Category::Outerwear),
            dresses: bucket(Category::Dress),
        }
    }

    /// First shoe, first accessory and, in cold seasons, first outerwear
    fn extras(&self, season: Season) -> Vec<Arc<WardrobeItem>> {
        let mut extras: Vec<_> = self
            .shoes
            .first()
            .into_iter()
            .chain(self.accessories.first())
            .cloned()
            .collect();
        if season.wants_outerwear() {
            extras.extend(self.outerwear.first().cloned());
        }
        extras
    }
}

/// Builds every viable outfit from the pool.
///
/// Dress outfits come first, then the full top x bottom cross product. Only
/// when neither branch yields anything does every pool item become its own
/// outfit. Output depends only on the pool contents, not their order.
pub fn generate_candidates(
    pool: &[Arc<WardrobeItem>],
    occasion: Occasion,
    season: Season,
) -> Vec<OutfitCandidate> {
    let buckets = Buckets::partition(pool);
    let extras = buckets.extras(season);
    let mut candidates = Vec::new();

    for dress in &buckets.dresses {
        let mut items = vec![dress.clone()];
        items.extend(extras.iter().cloned());
        candidates.push(OutfitCandidate::new(
            format!("Elegant {} Dress", title_case(&dress.color)),
            occasion,
            season,
            items,
        ));
    }

    for top in &buckets.tops {
        for bottom in &buckets.bottoms {
            let mut items = vec![top.clone(), bottom.clone()];
            items.extend(extras.iter().cloned());
            candidates.push(OutfitCandidate::new(
                format!(
                    "{} Top & {} Bottom",
                    title_case(&top.color),
                    title_case(&bottom.color)
                ),
                occasion,
                season,
                items,
            ));
        }
    }

    if candidates.is_empty() {
        let mut sorted = pool.to_vec();
        sorted.sort_by_key(|item| item.id);

        for item in sorted {
            let mut items = vec![item.clone()];
            if item.category != Category::Shoes {
                items.extend(buckets.shoes.first().cloned());
            }
            if item.category != Category::Accessories {
                items.extend(buckets.accessories.first().cloned());
            }
            candidates.push(OutfitCandidate::new(
                format!(
                    "Stylish {} {}",
                    title_case(&item.color),
                    title_case(item.category.as_str())
                ),
                occasion,
                season,
                items,
            ));
        }
    }

    tracing::debug!(candidates = candidates.len(), "Generated outfit candidates");
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryCatalog;
    use crate::models::wardrobe::fixtures::{item, tagged};

    fn pool(items: Vec<WardrobeItem>) -> Vec<Arc<WardrobeItem>> {
        items.into_iter().map(Arc::new).collect()
    }

    fn ids(candidate: &OutfitCandidate) -> Vec<u64> {
        candidate.items.iter().map(|item| item.id).collect()
    }

    #[test]
    fn test_tops_and_bottoms_cross_product() {
        let items = pool(vec![
            item(1, Category::Top, "white"),
            item(2, Category::Top, "navy"),
            item(3, Category::Top, "red"),
            item(4, Category::Bottom, "black"),
            item(5, Category::Bottom, "khaki"),
            item(6, Category::Shoes, "brown"),
        ]);

        let candidates = generate_candidates(&items, Occasion::Casual, Season::Summer);

        assert!(candidates.len() >= 3 * 2);
        assert_eq!(candidates[0].name, "White Top & Black Bottom");
        assert_eq!(ids(&candidates[0]), vec![1, 4, 6]);
        assert!(candidates
            .iter()
            .all(|c| c.role(Category::Dress).next().is_none()));
    }

    #[test]
    fn test_dress_with_shoes_in_winter() {
        let items = pool(vec![
            tagged(1, Category::Dress, Occasion::Formal, Season::Winter),
            tagged(2, Category::Shoes, Occasion::Formal, Season::Winter),
        ]);

        let candidates = generate_candidates(&items, Occasion::Formal, Season::Winter);

        assert_eq!(candidates.len(), 1);
        assert_eq!(ids(&candidates[0]), vec![1, 2]);
        assert_eq!(candidates[0].name, "Elegant Black Dress");
    }

    #[test]
    fn test_outerwear_only_in_cold_seasons() {
        let items = pool(vec![
            item(1, Category::Dress, "green"),
            item(2, Category::Outerwear, "camel"),
        ]);

        let winter = generate_candidates(&items, Occasion::Casual, Season::Winter);
        assert_eq!(ids(&winter[0]), vec![1, 2]);

        let summer = generate_candidates(&items, Occasion::Casual, Season::Summer);
        assert_eq!(ids(&summer[0]), vec![1]);
    }

    #[test]
    fn test_dress_and_separates_stay_disjoint() {
        let items = pool(vec![
            item(1, Category::Dress, "red"),
            item(2, Category::Top, "white"),
            item(3, Category::Bottom, "blue"),
        ]);

        let candidates = generate_candidates(&items, Occasion::Casual, Season::All);

        assert_eq!(candidates.len(), 2);
        assert_eq!(ids(&candidates[0]), vec![1]);
        assert_eq!(ids(&candidates[1]), vec![2, 3]);
    }

    #[test]
    fn test_single_item_fallback() {
        let items = pool(vec![
            item(1, Category::Top, "white"),
            item(2, Category::Shoes, "black"),
            item(3, Category::Accessories, "gold"),
        ]);

        let candidates = generate_candidates(&items, Occasion::Casual, Season::All);

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].name, "Stylish White Top");
        assert_eq!(ids(&candidates[0]), vec![1, 2, 3]);
        // Shoes are not paired with themselves
        assert_eq!(ids(&candidates[1]), vec![2, 3]);
        assert_eq!(ids(&candidates[2]), vec![3, 2]);
    }

    #[test]
    fn test_first_means_lowest_id() {
        let forward = pool(vec![
            item(1, Category::Top, "white"),
            item(2, Category::Bottom, "black"),
            item(7, Category::Shoes, "red"),
            item(4, Category::Shoes, "brown"),
        ]);
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = generate_candidates(&forward, Occasion::Casual, Season::All);
        let b = generate_candidates(&reversed, Occasion::Casual, Season::All);

        assert_eq!(a, b);
        assert_eq!(ids(&a[0]), vec![1, 2, 4]);
    }

    #[test]
    fn test_empty_pool_yields_nothing() {
        assert!(generate_candidates(&[], Occasion::Casual, Season::All).is_empty());
    }

    #[tokio::test]
    async fn test_pool_uses_exact_matches() {
        let catalog = InMemoryCatalog::with_items(vec![
            tagged(1, Category::Top, Occasion::Formal, Season::Winter),
            tagged(2, Category::Bottom, Occasion::Formal, Season::All),
            tagged(3, Category::Shoes, Occasion::All, Season::Winter),
            tagged(4, Category::Top, Occasion::Casual, Season::Winter),
        ]);

        let pool = select_item_pool(&catalog, Occasion::Formal, Season::Winter)
            .await
            .unwrap();

        assert!(!pool.widened);
        let ids: Vec<_> = pool.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_pool_widens_when_sparse() {
        let catalog = InMemoryCatalog::with_items(vec![
            tagged(1, Category::Dress, Occasion::Party, Season::Summer),
            tagged(2, Category::Top, Occasion::Casual, Season::Summer),
            tagged(3, Category::Bottom, Occasion::Business, Season::Summer),
            tagged(4, Category::Top, Occasion::Sport, Season::Summer),
            tagged(5, Category::Top, Occasion::Casual, Season::Winter),
        ]);

        let pool = select_item_pool(&catalog, Occasion::Party, Season::Summer)
            .await
            .unwrap();

        assert!(pool.widened);
        let ids: Vec<_> = pool.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_widened_pool_keeps_all_tagged_and_excludes_unrelated() {
        let catalog = InMemoryCatalog::with_items(vec![
            tagged(1, Category::Top, Occasion::Formal, Season::Fall),
            tagged(2, Category::Shoes, Occasion::All, Season::Fall),
            tagged(3, Category::Bottom, Occasion::Party, Season::Fall),
            tagged(4, Category::Top, Occasion::Sport, Season::All),
            tagged(5, Category::Bottom, Occasion::Business, Season::All),
        ]);

        let pool = select_item_pool(&catalog, Occasion::Formal, Season::Fall)
            .await
            .unwrap();

        assert!(pool.widened);
        let ids: Vec<_> = pool.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 5]);
    }

    #[test]
    fn test_widened_occasions_never_list_all() {
        assert_eq!(
            widened_occasions(Occasion::Party),
            vec![Occasion::Party, Occasion::Casual, Occasion::Business]
        );
        assert_eq!(
            widened_occasions(Occasion::Casual),
            vec![Occasion::Casual, Occasion::Business]
        );
    }

    #[tokio::test]
    async fn test_empty_catalog_is_no_items() {
        let catalog = InMemoryCatalog::new();
        let err = select_item_pool(&catalog, Occasion::Casual, Season::All)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NoItemsAvailable(_)));
        assert_eq!(err.to_string(), "No wardrobe items available for recommendations");
    }

    #[tokio::test]
    async fn test_no_suitable_items() {
        let catalog = InMemoryCatalog::with_items(vec![tagged(
            1,
            Category::Top,
            Occasion::Sport,
            Season::Summer,
        )]);

        let err = select_item_pool(&catalog, Occasion::Formal, Season::Winter)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "No items suitable for formal occasion and winter season"
        );
    }
}
