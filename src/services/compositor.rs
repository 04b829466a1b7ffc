use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use image::{imageops, imageops::FilterType, DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::{
    error::{AppError, AppResult},
    models::{title_case, Occasion, OutfitCandidate, Season, WardrobeItem},
    services::text::{draw_text, fit_font_size, Anchor, TextLine},
};

pub const FLATLAY_WIDTH: u32 = 400;
pub const FLATLAY_HEIGHT: u32 = 300;

/// Outfits shown on one summary grid
pub const MAX_GRID_OUTFITS: usize = 6;

const GRID_PADDING: u32 = 15;
const GRID_MARGIN: u32 = 20;
const GRID_TITLE_HEIGHT: u32 = 35;
const GRID_BORDER_WIDTH: u32 = 2;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PLACEHOLDER_FILL: Rgba<u8> = Rgba([0xf0, 0xf0, 0xf0, 0xff]);
const PLACEHOLDER_TEXT: Rgba<u8> = Rgba([0x99, 0x99, 0x99, 0xff]);
const TITLE_TEXT: Rgba<u8> = Rgba([0x33, 0x33, 0x33, 0xff]);
const BORDER: Rgba<u8> = Rgba([0xcc, 0xcc, 0xcc, 0xff]);

const PLACEHOLDER_LABEL_CHARS: usize = 8;
const TITLE_FONT_SIZE: f32 = 20.0;
const PLACEHOLDER_MAX_FONT_SIZE: f32 = 24.0;
const CLUSTER_SEED: u64 = 42;

/// Top-left corner and edge length of one square item slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

/// An outfit item ready for layout: its picture, or nothing if none could be loaded
#[derive(Debug, Clone)]
pub struct ItemTile {
    pub label: String,
    pub image: Option<DynamicImage>,
}

impl ItemTile {
    pub fn placeholder(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            image: None,
        }
    }
}

/// Fixed-seed generator for the 5+ item cluster
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed.wrapping_add(1))
    }

    /// Uniform in [0, 1)
    fn next_unit(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) as f64 / (1u64 << 31) as f64
    }
}

/// Slots for `count` items on a `width` x `height` canvas.
///
/// The layout depends only on the count. Every slot lies fully inside the
/// canvas.
pub fn flatlay_positions(count: usize, width: u32, height: u32) -> Vec<Placement> {
    let short = width.min(height) as i64;
    let (w, h) = (width as i64, height as i64);
    let (cx, cy) = (w / 2, h / 2);

    let raw: Vec<(i64, i64, i64)> = match count {
        0 => Vec::new(),
        1 => {
            let size = short * 9 / 10;
            vec![((w - size) / 2, (h - size) / 2, size)]
        }
        2 => {
            let size = short * 3 / 7;
            let y = (h - size) / 2;
            vec![(cx - size - 10, y, size), (cx + 10, y, size)]
        }
        3 => {
            let size = short * 2 / 5;
            vec![
                (cx - size / 2, cy - size - 5, size),
                (cx - size - 5, cy + 5, size),
                (cx + 5, cy + 5, size),
            ]
        }
        4 => {
            let size = short * 2 / 7;
            let (left, right) = (cx - size - 5, cx + 5);
            let (top, bottom) = (cy - size - 5, cy + 5);
            vec![
                (left, top, size),
                (right, top, size),
                (left, bottom, size),
                (right, bottom, size),
            ]
        }
        n => {
            let size = short * 2 / 9;
            let radius = (short - size) as f64 / 2.0 * 0.8;
            let mut rng = Lcg::new(CLUSTER_SEED);

            (0..n)
                .map(|i| {
                    let jitter = (rng.next_unit() - 0.5) * 0.3;
                    let angle = i as f64 * std::f64::consts::TAU / n as f64 + jitter;
                    let r = radius * (0.85 + 0.15 * rng.next_unit());
                    let x = cx + (r * angle.cos()).round() as i64 - size / 2;
                    let y = cy + (r * angle.sin()).round() as i64 - size / 2;
                    (x, y, size)
                })
                .collect()
        }
    };

    raw.into_iter()
        .map(|(x, y, size)| Placement {
            x: x.clamp(0, (w - size).max(0)) as u32,
            y: y.clamp(0, (h - size).max(0)) as u32,
            size: size as u32,
        })
        .collect()
}

/// Columns and rows of the summary grid
pub fn grid_dimensions(count: usize) -> (u32, u32) {
    match count {
        0 | 1 => (1, 1),
        2 => (2, 1),
        3 | 4 => (2, 2),
        5 | 6 => (3, 2),
        _ => (3, 3),
    }
}

/// Resolves wardrobe image references against the media root
#[derive(Debug, Clone)]
pub struct AssetLoader {
    media_root: PathBuf,
}

impl AssetLoader {
    pub fn new(media_root: impl Into<PathBuf>) -> Self {
        Self {
            media_root: media_root.into(),
        }
    }

    /// First decodable image for the item, processed photo preferred
    pub fn load(&self, item: &WardrobeItem) -> Option<DynamicImage> {
        for relative in item.image_candidates() {
            let Some(path) = self.resolve(relative) else {
                tracing::warn!(item_id = item.id, path = %relative, "Rejected image path outside media root");
                continue;
            };
            if !path.exists() {
                continue;
            }
            match image::open(&path) {
                Ok(img) => return Some(img),
                Err(e) => {
                    tracing::warn!(
                        item_id = item.id,
                        path = %path.display(),
                        error = %e,
                        "Failed to decode item image, trying next source"
                    );
                }
            }
        }
        None
    }

    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        let contained = path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        contained.then(|| self.media_root.join(path))
    }
}

/// Deterministic local layout engine for flat-lays and summary grids
#[derive(Debug, Clone)]
pub struct ImageCompositor {
    assets: AssetLoader,
}

impl ImageCompositor {
    pub fn new(assets: AssetLoader) -> Self {
        Self { assets }
    }

    /// Loads every item's picture; unloadable items become placeholders
    pub fn resolve_items(&self, items: &[Arc<WardrobeItem>]) -> Vec<ItemTile> {
        items
            .iter()
            .map(|item| ItemTile {
                label: item.name.clone(),
                image: self.assets.load(item),
            })
            .collect()
    }

    /// PNG flat-lay of one outfit
    pub fn flatlay_for(&self, candidate: &OutfitCandidate) -> AppResult<Vec<u8>> {
        let tiles = self.resolve_items(&candidate.layout_order());
        self.compose_flatlay(&tiles)
    }

    /// PNG flat-lay of the given tiles, in order
    pub fn compose_flatlay(&self, tiles: &[ItemTile]) -> AppResult<Vec<u8>> {
        let canvas = flatlay_canvas(tiles)?;
        encode_png(&DynamicImage::ImageRgba8(canvas).to_rgb8().into())
    }

    /// Labeled grid of up to six outfit flat-lays under a title bar
    pub fn compose_grid(
        &self,
        outfits: &[OutfitCandidate],
        occasion: Occasion,
        season: Season,
    ) -> AppResult<Vec<u8>> {
        if outfits.is_empty() {
            return Err(AppError::InvalidInput(
                "No outfits provided for composite image generation".to_string(),
            ));
        }

        let shown = &outfits[..outfits.len().min(MAX_GRID_OUTFITS)];
        let (cols, rows) = grid_dimensions(shown.len());
        let total_width = FLATLAY_WIDTH * cols + GRID_PADDING * (cols - 1) + GRID_MARGIN * 2;
        let total_height = FLATLAY_HEIGHT * rows
            + GRID_PADDING * (rows - 1)
            + GRID_MARGIN * 2
            + GRID_TITLE_HEIGHT;

        let mut grid = RgbaImage::from_pixel(total_width, total_height, BACKGROUND);

        let title = format!(
            "Outfit Recommendations - {} {}",
            title_case(occasion.as_str()),
            title_case(season.as_str())
        );
        let font_size = fit_font_size(&title, TITLE_FONT_SIZE, total_width - GRID_MARGIN * 2);
        let title_line = TextLine {
            text: &title,
            x: total_width as f32 / 2.0,
            baseline: (GRID_MARGIN + GRID_TITLE_HEIGHT) as f32 / 2.0 + font_size / 2.0,
            font_size,
            anchor: Anchor::Middle,
            color: TITLE_TEXT,
        };
        if let Err(e) = draw_text(&mut grid, &title_line) {
            tracing::warn!(error = %e, "Grid title could not be drawn");
        }

        for (index, outfit) in shown.iter().enumerate() {
            let (col, row) = (index as u32 % cols, index as u32 / cols);
            let x = GRID_MARGIN + col * (FLATLAY_WIDTH + GRID_PADDING);
            let y = GRID_MARGIN + GRID_TITLE_HEIGHT + row * (FLATLAY_HEIGHT + GRID_PADDING);

            let tiles = self.resolve_items(&outfit.layout_order());
            let cell = flatlay_canvas(&tiles).unwrap_or_else(|e| {
                tracing::warn!(outfit = %outfit.name, error = %e, "Flat-lay failed, drawing placeholder");
                placeholder_tile(FLATLAY_WIDTH, FLATLAY_HEIGHT, &format!("Outfit {}", index + 1))
            });

            imageops::replace(&mut grid, &cell, x as i64, y as i64);
            draw_border(&mut grid, x, y, FLATLAY_WIDTH, FLATLAY_HEIGHT);
        }

        encode_png(&DynamicImage::ImageRgba8(grid).to_rgb8().into())
    }
}

fn flatlay_canvas(tiles: &[ItemTile]) -> AppResult<RgbaImage> {
    if tiles.is_empty() {
        return Err(AppError::InvalidInput("No items found in outfit".to_string()));
    }

    let mut canvas = RgbaImage::from_pixel(FLATLAY_WIDTH, FLATLAY_HEIGHT, BACKGROUND);
    let positions = flatlay_positions(tiles.len(), FLATLAY_WIDTH, FLATLAY_HEIGHT);

    for (tile, slot) in tiles.iter().zip(positions) {
        let (x, y) = (slot.x as i64, slot.y as i64);
        match &tile.image {
            Some(source) => {
                let resized = source.resize_exact(slot.size, slot.size, FilterType::Lanczos3);
                if resized.color().has_alpha() {
                    imageops::overlay(&mut canvas, &resized.to_rgba8(), x, y);
                } else {
                    imageops::replace(&mut canvas, &resized.to_rgba8(), x, y);
                }
            }
            None => {
                let label: String = tile.label.chars().take(PLACEHOLDER_LABEL_CHARS).collect();
                let placeholder = placeholder_tile(slot.size, slot.size, &label);
                imageops::replace(&mut canvas, &placeholder, x, y);
            }
        }
    }

    Ok(canvas)
}

/// Light-gray tile with a centered gray label
fn placeholder_tile(width: u32, height: u32, label: &str) -> RgbaImage {
    let mut tile = RgbaImage::from_pixel(width, height, PLACEHOLDER_FILL);
    let font_size = fit_font_size(label, PLACEHOLDER_MAX_FONT_SIZE, width.saturating_sub(width / 8));
    let line = TextLine {
        text: label,
        x: width as f32 / 2.0,
        baseline: height as f32 / 2.0 + font_size * 0.35,
        font_size,
        anchor: Anchor::Middle,
        color: PLACEHOLDER_TEXT,
    };
    if let Err(e) = draw_text(&mut tile, &line) {
        tracing::warn!(label, error = %e, "Placeholder label could not be drawn");
    }
    tile
}

fn draw_border(canvas: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32) {
    let (canvas_w, canvas_h) = canvas.dimensions();
    let right = (x + width).min(canvas_w - 1);
    let bottom = (y + height).min(canvas_h - 1);

    for px in x..=right {
        for t in 0..GRID_BORDER_WIDTH {
            canvas.put_pixel(px, (y + t).min(bottom), BORDER);
            canvas.put_pixel(px, bottom.saturating_sub(t), BORDER);
        }
    }
    for py in y..=bottom {
        for t in 0..GRID_BORDER_WIDTH {
            canvas.put_pixel((x + t).min(right), py, BORDER);
            canvas.put_pixel(right.saturating_sub(t), py, BORDER);
        }
    }
}

fn encode_png(image: &DynamicImage) -> AppResult<Vec<u8>> {
    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}

/// Re-encodes provider image bytes as PNG, rejecting anything undecodable
pub fn normalize_png(bytes: &[u8]) -> AppResult<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)?;
    encode_png(&decoded)
}
