//! Labels burned into composites.
//!
//! Each line is laid out as a one-element SVG and rasterized with resvg. The
//! font is embedded, so output never depends on what the host has installed.

use std::sync::{Arc, OnceLock};

use image::{Pixel, Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use usvg::fontdb;

use crate::error::{AppError, AppResult};

const FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const FONT_FAMILY: &str = "DejaVu Sans";

/// Mean glyph advance of the embedded face, in ems
const AVERAGE_ADVANCE_EM: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
}

impl Anchor {
    fn as_svg(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
        }
    }
}

/// One line of text positioned by its baseline
#[derive(Debug, Clone, Copy)]
pub struct TextLine<'a> {
    pub text: &'a str,
    pub x: f32,
    pub baseline: f32,
    pub font_size: f32,
    pub anchor: Anchor,
    pub color: Rgba<u8>,
}

fn font_database() -> Arc<fontdb::Database> {
    static DATABASE: OnceLock<Arc<fontdb::Database>> = OnceLock::new();
    DATABASE
        .get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_font_data(FONT_DATA.to_vec());
            db.set_sans_serif_family(FONT_FAMILY);
            Arc::new(db)
        })
        .clone()
}

/// Largest size up to `max_size` at which `text` should fit in `width` pixels
pub fn fit_font_size(text: &str, max_size: f32, width: u32) -> f32 {
    let chars = text.chars().count().max(1) as f32;
    max_size.min(width as f32 / (chars * AVERAGE_ADVANCE_EM))
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Blends `line` onto the canvas; anything past the edges is clipped
pub fn draw_text(canvas: &mut RgbaImage, line: &TextLine<'_>) -> AppResult<()> {
    if line.text.trim().is_empty() {
        return Ok(());
    }

    let (width, height) = canvas.dimensions();
    let svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><text x="{x}" y="{y}" font-family="{FONT_FAMILY}" font-size="{size}" text-anchor="{anchor}" fill="black">{text}</text></svg>"#,
        x = line.x,
        y = line.baseline,
        size = line.font_size,
        anchor = line.anchor.as_svg(),
        text = escape_xml(line.text),
    );

    let options = usvg::Options {
        font_family: FONT_FAMILY.to_string(),
        fontdb: font_database(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(svg.as_bytes(), &options)
        .map_err(|e| AppError::Internal(format!("Text layout failed: {}", e)))?;

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| AppError::Internal(format!("Cannot draw text on {}x{}", width, height)))?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());

    // Fill is black, so each pixel's alpha is the glyph coverage
    let [r, g, b, a] = line.color.0;
    for (pixel, rendered) in canvas.pixels_mut().zip(pixmap.data().chunks_exact(4)) {
        let coverage = rendered[3];
        if coverage == 0 {
            continue;
        }
        let alpha = (u16::from(coverage) * u16::from(a) / 255) as u8;
        pixel.blend(&Rgba([r, g, b, alpha]));
    }

    Ok(())
}
