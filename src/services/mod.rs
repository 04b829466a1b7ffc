pub mod candidates;
pub mod compositor;
pub mod item_analysis;
pub mod providers;
pub mod recommendations;
pub mod render;
pub mod structured;
pub mod style_analysis;
pub mod text;

pub use compositor::{AssetLoader, ImageCompositor};
pub use item_analysis::ItemAnalyzer;
pub use recommendations::RecommendationService;
pub use render::{OutfitRenderer, RenderCoordinator};
pub use style_analysis::BatchStyleAnalyzer;
