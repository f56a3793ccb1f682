use anyhow::{anyhow, Context, Result};
use resvg::{tiny_skia, usvg};
use std::sync::{Arc, OnceLock};

/// Supersampling factor for the PDF raster.
pub const PDF_SCALE: f32 = 3.0;
/// Largest raster side we are willing to allocate.
pub const MAX_RASTER_SIDE: f32 = 12_000.0;

static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();

fn options() -> usvg::Options<'static> {
    let fontdb = FONTS
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            Arc::new(db)
        })
        .clone();
    let mut opt = usvg::Options::default();
    opt.fontdb = fontdb;
    opt
}

pub fn parse_svg(svg: &str) -> Result<usvg::Tree> {
    usvg::Tree::from_str(svg, &options()).context("parse SVG")
}

/// A flattened, opaque raster of the design.
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

/// Scale that keeps the longest side within [`MAX_RASTER_SIDE`].
pub fn clamp_scale(width: f32, height: f32, wanted: f32) -> f32 {
    let longest = width.max(height).max(1.0);
    wanted.min(MAX_RASTER_SIDE / longest)
}

/// Render the SVG at `scale` onto a white background.
pub fn rasterize(tree: &usvg::Tree, scale: f32) -> Result<tiny_skia::Pixmap> {
    let size = tree.size();
    let scale = clamp_scale(size.width(), size.height(), scale);
    let width = (size.width() * scale).ceil().max(1.0) as u32;
    let height = (size.height() * scale).ceil().max(1.0) as u32;
    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("cannot allocate a {width}x{height} raster"))?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(
        tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap)
}

/// Encode an opaque pixmap as JPEG.
pub fn encode_jpeg(pixmap: &tiny_skia::Pixmap, quality: u8) -> Result<Vec<u8>> {
    // The background is opaque, so premultiplied RGBA equals straight RGB here.
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality)
        .encode(&rgb, pixmap.width(), pixmap.height(), image::ColorType::Rgb8)
        .context("encode JPEG")?;
    Ok(out)
}

/// Parse, rasterize at [`PDF_SCALE`] and encode as JPEG (quality 95).
pub fn rasterize_for_print(svg: &str) -> Result<Raster> {
    let tree = parse_svg(svg)?;
    let pixmap = rasterize(&tree, PDF_SCALE)?;
    let jpeg = encode_jpeg(&pixmap, 95)?;
    Ok(Raster {
        width: pixmap.width(),
        height: pixmap.height(),
        jpeg,
    })
}
