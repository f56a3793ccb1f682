use super::output_path;
use super::raster::{rasterize_for_print, Raster};
use crate::model::{ExportKind, GeneratedResult};
use anyhow::{anyhow, Context, Result};
use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument};
use std::path::{Path, PathBuf};

const A4_SHORT_MM: f64 = 210.0;
const A4_LONG_MM: f64 = 297.0;
const MARGIN_MM: f64 = 10.0;
const DESCRIPTION_MAX_CHARS: usize = 100;

/// Placement of the raster on the page, in millimeters with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub landscape: bool,
    pub page_width: f64,
    pub page_height: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Fit a `width`x`height` raster on A4: landscape when wider than tall,
/// scaled by aspect ratio into the page less a 10 mm margin on every side,
/// centered.
pub fn layout_on_a4(width: u32, height: u32) -> PageLayout {
    let landscape = width > height;
    let (page_width, page_height) = if landscape {
        (A4_LONG_MM, A4_SHORT_MM)
    } else {
        (A4_SHORT_MM, A4_LONG_MM)
    };
    let ratio = width.max(1) as f64 / height.max(1) as f64;

    let box_width = page_width - MARGIN_MM * 2.0;
    let box_height = page_height - MARGIN_MM * 2.0;
    let (print_width, print_height) = if box_width / ratio > box_height {
        (box_height * ratio, box_height)
    } else {
        (box_width, box_width / ratio)
    };

    PageLayout {
        landscape,
        page_width,
        page_height,
        x: (page_width - print_width) / 2.0,
        y: (page_height - print_height) / 2.0,
        width: print_width,
        height: print_height,
    }
}

/// Title line printed at the top of the page.
fn page_title(date: &str) -> String {
    format!("LaserCraft AI - {date}")
}

/// First 100 characters of the description, with an ellipsis when cut.
pub fn truncate_description(description: &str) -> String {
    let mut chars = description.chars();
    let head: String = chars.by_ref().take(DESCRIPTION_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn local_date() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(time::macros::format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "today".into())
}

/// Assemble the A4 preview document and return its bytes.
pub fn build_pdf(result: &GeneratedResult, raster: &Raster) -> Result<Vec<u8>> {
    let layout = layout_on_a4(raster.width, raster.height);
    let page_w = layout.page_width as f32;
    let page_h = layout.page_height as f32;

    let (doc, page, layer) = PdfDocument::new("LaserCraft preview", Mm(page_w), Mm(page_h), "Design");
    let layer = doc.get_page(page).get_layer(layer);

    let decoded = image::load_from_memory_with_format(&raster.jpeg, image::ImageFormat::Jpeg)
        .context("decode preview raster")?;
    let dpi = (raster.width as f64 * 25.4 / layout.width) as f32;
    tracing::debug!(landscape = layout.landscape, dpi, "PDF page laid out");
    Image::from_dynamic_image(&decoded).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(layout.x as f32)),
            // PDF space has its origin at the bottom-left corner.
            translate_y: Some(Mm((layout.page_height - layout.y - layout.height) as f32)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );

    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("load PDF font: {e}"))?;
    layer.use_text(
        page_title(&local_date()),
        10.0,
        Mm(MARGIN_MM as f32),
        Mm(page_h - MARGIN_MM as f32),
        &font,
    );
    layer.use_text(
        truncate_description(&result.description),
        8.0,
        Mm(MARGIN_MM as f32),
        Mm(MARGIN_MM as f32),
        &font,
    );

    doc.save_to_bytes().map_err(|e| anyhow!("write PDF: {e}"))
}

/// Rasterize the design and write `lasercraft-preview-<millis>.pdf` into `out_dir`.
pub fn export_pdf(result: &GeneratedResult, out_dir: &Path) -> Result<PathBuf> {
    let raster = rasterize_for_print(&result.svg_content)?;
    tracing::debug!(width = raster.width, height = raster.height, "design rasterized");
    let bytes = build_pdf(result, &raster)?;
    let path = output_path(out_dir, ExportKind::Pdf)?;
    std::fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), "PDF exported");
    Ok(path)
}
