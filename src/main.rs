use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wardrobe_stylist::{
    config::Config,
    db::{InMemoryCatalog, InMemoryOutfitStore, WardrobeCatalog},
    routes::{create_router, AppState},
    services::{
        providers::{GeminiImageGenerator, OpenAiStyleModel},
        AssetLoader, BatchStyleAnalyzer, ImageCompositor, ItemAnalyzer, OutfitRenderer,
        RecommendationService, RenderCoordinator,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wardrobe_stylist=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let timeout = config.provider_timeout();

    let catalog: Arc<dyn WardrobeCatalog> = match &config.catalog_path {
        Some(path) => Arc::new(InMemoryCatalog::from_json_file(Path::new(path))?),
        None => Arc::new(InMemoryCatalog::new()),
    };

    let style_model = Arc::new(OpenAiStyleModel::new(
        config.openai_api_key.clone(),
        config.openai_api_url.clone(),
        config.style_model.clone(),
        timeout,
    )?);
    let image_generator = Arc::new(GeminiImageGenerator::new(
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.image_model.clone(),
        timeout,
    )?);

    let assets = AssetLoader::new(&config.media_root);
    let item_analyzer = Arc::new(ItemAnalyzer::new(
        style_model.clone(),
        assets.clone(),
        timeout,
    ));
    let compositor = Arc::new(ImageCompositor::new(assets));
    let analyzer = BatchStyleAnalyzer::new(
        style_model,
        config.style_temperature,
        config.style_max_tokens,
        timeout,
    );
    let renderer = OutfitRenderer::new(compositor.clone(), image_generator, timeout);
    let coordinator = RenderCoordinator::new(Arc::new(renderer), config.max_render_workers);
    let recommender = Arc::new(RecommendationService::new(
        catalog.clone(),
        analyzer,
        coordinator,
        compositor,
    ));

    let state = Arc::new(AppState {
        catalog,
        outfits: Arc::new(InMemoryOutfitStore::new()),
        recommender,
        item_analyzer,
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        address = %addr,
        style_model = %config.style_model,
        image_model = %config.image_model,
        max_render_workers = config.max_render_workers,
        "Server listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
