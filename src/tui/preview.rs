//! Terminal preview of the generated design.
//!
//! The SVG is rasterized with resvg at two pixels per cell and printed with
//! upper half blocks (`▀`): foreground carries the top pixel, background the
//! bottom one. The design sits on a "sheet" the size of its bounding box,
//! which in turn sits on a skin-dependent backdrop.

use super::state::{Focus, PreviewSkin, UiState};
use crate::export::raster;
use anyhow::{anyhow, Result};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use resvg::tiny_skia;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub type Rgb = [u8; 3];

const GRID_BACKDROP: Rgb = [0xe5, 0xe5, 0xe5];
const GRID_LINE: Rgb = [0xd0, 0xd0, 0xd0];
const GRID_SPACING: u32 = 8;
const PAPER: Rgb = [0xff, 0xff, 0xff];
const WOOD_DARK: Rgb = [0x5c, 0x3d, 0x2e];
const WOOD_GRAIN: Rgb = [0x6b, 0x48, 0x36];
const WOOD_LIGHT: Rgb = [0xe6, 0xcc, 0xa6];
const SIMULATION_OPACITY: f32 = 0.9;
/// Share of the pane the design fills at 100% zoom.
const FIT_MARGIN: f32 = 0.9;

/// Opaque RGB pixels, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    pub width: u32,
    pub height: u32,
    pub data: Vec<Rgb>,
}

impl PixelGrid {
    pub fn get(&self, x: u32, y: u32) -> Rgb {
        self.data[(y * self.width + x) as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PreviewKey {
    svg_hash: u64,
    width: u32,
    height: u32,
    zoom_pct: u32,
    skin: PreviewSkin,
}

pub struct PreviewCache {
    key: PreviewKey,
    pixels: Result<PixelGrid, String>,
}

fn backdrop(skin: PreviewSkin, x: u32, y: u32) -> Rgb {
    match skin {
        PreviewSkin::Technical => {
            if x % GRID_SPACING == 0 || y % GRID_SPACING == 0 {
                GRID_LINE
            } else {
                GRID_BACKDROP
            }
        }
        PreviewSkin::Simulation => {
            if (y / 3 + x / 17) % 5 == 0 {
                WOOD_GRAIN
            } else {
                WOOD_DARK
            }
        }
    }
}

fn sheet(skin: PreviewSkin) -> Rgb {
    match skin {
        PreviewSkin::Technical => PAPER,
        PreviewSkin::Simulation => WOOD_LIGHT,
    }
}

/// Blend one premultiplied design pixel onto an opaque base.
fn composite(base: Rgb, src: tiny_skia::PremultipliedColorU8, skin: PreviewSkin) -> Rgb {
    let alpha = src.alpha() as f32 / 255.0;
    if src.alpha() == 0 {
        return base;
    }
    let premul = [src.red(), src.green(), src.blue()];
    let mut out = [0u8; 3];
    for i in 0..3 {
        let d = base[i] as f32;
        let s = premul[i] as f32;
        let v = match skin {
            PreviewSkin::Technical => s + d * (1.0 - alpha),
            PreviewSkin::Simulation => {
                let multiplied = d * (s / alpha) / 255.0;
                let k = alpha * SIMULATION_OPACITY;
                d * (1.0 - k) + multiplied * k
            }
        };
        out[i] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Rasterize `svg` into a `width` x `height` pixel grid, fitted and centered,
/// then scaled by `zoom`.
pub fn render_pixels(
    svg: &str,
    width: u32,
    height: u32,
    zoom: f32,
    skin: PreviewSkin,
) -> Result<PixelGrid> {
    let tree = raster::parse_svg(svg)?;
    let size = tree.size();
    let fit = (width as f32 / size.width()).min(height as f32 / size.height()) * FIT_MARGIN;
    let scale = fit * zoom;
    let (dw, dh) = (size.width() * scale, size.height() * scale);
    let (ox, oy) = ((width as f32 - dw) / 2.0, (height as f32 - dh) / 2.0);

    let mut layer = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("cannot allocate a {width}x{height} preview"))?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_row(scale, 0.0, 0.0, scale, ox, oy),
        &mut layer.as_mut(),
    );

    let sheet = sheet(skin);
    let mut data = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let (cx, cy) = (x as f32 + 0.5, y as f32 + 0.5);
            let on_sheet = cx >= ox && cx < ox + dw && cy >= oy && cy < oy + dh;
            let base = if on_sheet { sheet } else { backdrop(skin, x, y) };
            data.push(match layer.pixel(x, y) {
                Some(px) => composite(base, px, skin),
                None => base,
            });
        }
    }
    Ok(PixelGrid {
        width,
        height,
        data,
    })
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb[0], rgb[1], rgb[2])
}

/// One line per pair of pixel rows.
pub fn half_block_lines(grid: &PixelGrid) -> Vec<Line<'static>> {
    (0..grid.height)
        .step_by(2)
        .map(|y| {
            let spans: Vec<Span<'static>> = (0..grid.width)
                .map(|x| {
                    let top = grid.get(x, y);
                    let bottom = if y + 1 < grid.height {
                        grid.get(x, y + 1)
                    } else {
                        top
                    };
                    Span::styled("▀", Style::default().fg(color(top)).bg(color(bottom)))
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

fn svg_hash(svg: &str) -> u64 {
    let mut h = DefaultHasher::new();
    svg.hash(&mut h);
    h.finish()
}

fn centered_message(area: Rect, f: &mut Frame, lines: Vec<Line<'static>>) {
    let height = lines.len() as u16;
    let top = area.height.saturating_sub(height) / 2;
    let target = Rect {
        x: area.x,
        y: area.y + top,
        width: area.width,
        height: height.min(area.height),
    };
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        target,
    );
}

pub fn draw_preview(area: Rect, f: &mut Frame, state: &UiState) {
    let mut title = vec![
        Span::raw(" Preview "),
        Span::styled(
            format!("[{}]", state.skin.label()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(format!(" {}% ", state.zoom_percent())),
    ];
    if state.exporting {
        title.push(Span::styled(
            "exporting PDF… ",
            Style::default().fg(Color::Yellow),
        ));
    }
    let border = if state.focus == Focus::Preview {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Line::from(title));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if state.session.is_loading() {
        let elapsed = state
            .loading_since
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0);
        centered_message(
            inner,
            f,
            vec![
                Line::styled(
                    "Generating design…",
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Line::from(format!("{} · {elapsed}s", state.model)),
                Line::styled(
                    "Thinking about geometry, kerf and joints.",
                    Style::default().fg(Color::Gray),
                ),
            ],
        );
        return;
    }

    let Some(result) = state.session.result() else {
        centered_message(
            inner,
            f,
            vec![
                Line::styled("No design yet", Style::default().add_modifier(Modifier::BOLD)),
                Line::styled(
                    "Describe an object and press Ctrl-G to generate.",
                    Style::default().fg(Color::Gray),
                ),
            ],
        );
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(2)].as_ref())
        .split(inner);
    let canvas = rows[0];

    if canvas.width > 0 && canvas.height > 0 {
        let key = PreviewKey {
            svg_hash: svg_hash(&result.svg_content),
            width: canvas.width as u32,
            height: canvas.height as u32 * 2,
            zoom_pct: state.zoom_percent(),
            skin: state.skin,
        };
        let mut cache = state.preview_cache.borrow_mut();
        if cache.as_ref().map(|c| &c.key) != Some(&key) {
            let pixels = render_pixels(
                &result.svg_content,
                key.width,
                key.height,
                state.zoom,
                state.skin,
            )
            .map_err(|e| {
                tracing::warn!(error = %format!("{e:#}"), "preview render failed");
                format!("{e:#}")
            });
            *cache = Some(PreviewCache { key, pixels });
        }
        if let Some(entry) = cache.as_ref() {
            match &entry.pixels {
                Ok(grid) => f.render_widget(Paragraph::new(half_block_lines(grid)), canvas),
                Err(msg) => centered_message(
                    canvas,
                    f,
                    vec![Line::styled(
                        format!("Preview unavailable: {msg}"),
                        Style::default().fg(Color::Red),
                    )],
                ),
            }
        }
    }

    let footer = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Dimensions: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{} x {}", result.width, result.height)),
        ]),
        Line::styled(
            result.description.clone(),
            Style::default().fg(Color::Gray),
        ),
    ]);
    f.render_widget(footer, rows[1]);
}
