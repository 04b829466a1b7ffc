pub mod catalog;
pub mod outfits;

pub use catalog::{InMemoryCatalog, WardrobeCatalog};
pub use outfits::{InMemoryOutfitStore, OutfitStore};
