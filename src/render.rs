use crate::config::AppConfig;
use crate::error::MapError;
use crate::palette::{gray, hex_to_rgba};
use crate::processing::Bins;
use crate::projection::{km_to_degrees_lon, PixelRect, Viewport};
use crate::types::{DensityRow, RegionShape};
use anyhow::{anyhow, Context, Result};
use geo::{LineString, Polygon};
use image::{imageops, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use tiny_skia::{FillRule, Mask, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform};
use tracing::{debug, info, warn};

const FONT_REGULAR: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
const FONT_BOLD: &[u8] = include_bytes!("../assets/DejaVuSans-Bold.ttf");

// Figure fractions [left, bottom, width, height] from the bottom-left corner.
const MAP_AXES: [f32; 4] = [0.125, 0.11, 0.775, 0.77];
const LEGEND_AXES: [f32; 4] = [0.87, 0.1, 0.03, 0.8];

// Sizes in points.
const EDGE_WIDTH: f32 = 0.1;
const FRAME_WIDTH: f32 = 1.0;
const FURNITURE_WIDTH: f32 = 0.8;
const TITLE_SIZE: f32 = 12.0;
const TICK_LABEL_SIZE: f32 = 10.0;
const SCALE_LABEL_SIZE: f32 = 9.0;
const TICK_LENGTH: f32 = 3.5;
const TICK_PAD: f32 = 3.5;

const FURNITURE_GRAY: f32 = 0.3;
const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const EDGE_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// What happened during a render, for the caller to log or assert on.
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub polygons: usize,
    pub matched: usize,
    /// Shape names with no table row, in source order.
    pub unmatched: Vec<String>,
    /// Table rows that no shape referenced.
    pub regions_without_shape: Vec<String>,
}

/// Fill color per shape, parallel to the shape slice.
#[derive(Debug, Clone)]
pub struct Join {
    pub fills: Vec<Rgba<u8>>,
    pub matched: usize,
    pub unmatched: Vec<String>,
    pub regions_without_shape: Vec<String>,
}

/// Matches shapes to rows by exact name. Every shape gets a color: its
/// class color when matched, `fallback` otherwise.
pub fn join_fills(
    rows: &[DensityRow],
    shapes: &[RegionShape],
    palette: &[Rgba<u8>],
    fallback: Rgba<u8>,
) -> Join {
    let by_name: HashMap<&str, &DensityRow> = rows.iter().map(|r| (r.name.as_str(), r)).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    let mut fills = Vec::with_capacity(shapes.len());
    let mut matched = 0;
    let mut unmatched = Vec::new();

    for shape in shapes {
        match by_name.get(shape.name.as_str()) {
            Some(row) => {
                matched += 1;
                seen.insert(row.name.as_str());
                fills.push(palette.get(row.bin_index).copied().unwrap_or(fallback));
            }
            None => {
                warn!(region = %shape.name, "No data row for shape, using fallback fill");
                unmatched.push(shape.name.clone());
                fills.push(fallback);
            }
        }
    }

    let regions_without_shape: Vec<String> = rows
        .iter()
        .filter(|r| !seen.contains(r.name.as_str()))
        .map(|r| r.name.clone())
        .collect();
    for name in &regions_without_shape {
        warn!(region = %name, "Data row has no matching shape");
    }

    Join { fills, matched, unmatched, regions_without_shape }
}

/// Vertical position of a legend tick as a fraction of the bar, from the
/// bottom: the middle of its slot.
pub fn tick_fraction(slot: usize, slots: usize) -> f32 {
    (slot as f32 + 0.5) / slots as f32
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum HAlign {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum VAlign {
    Top,
    Middle,
}

/// Text is laid down after rasterization, on top of the shapes.
#[derive(Debug, Clone)]
struct TextItem {
    text: String,
    x: f32,
    y: f32,
    size: f32,
    bold: bool,
    h: HAlign,
    v: VAlign,
}

struct TextPainter {
    regular: Font<'static>,
    bold: Font<'static>,
    color: Rgba<u8>,
}

impl TextPainter {
    fn new(color: Rgba<u8>) -> Result<Self, MapError> {
        let regular = Font::try_from_bytes(FONT_REGULAR)
            .ok_or_else(|| MapError::Font("failed to load regular font".to_string()))?;
        let bold = Font::try_from_bytes(FONT_BOLD)
            .ok_or_else(|| MapError::Font("failed to load bold font".to_string()))?;
        Ok(Self { regular, bold, color })
    }

    fn font(&self, bold: bool) -> &Font<'static> {
        if bold { &self.bold } else { &self.regular }
    }

    fn width(&self, text: &str, size: f32, bold: bool) -> f32 {
        text_size(Scale::uniform(size), self.font(bold), text).0 as f32
    }

    fn draw(&self, img: &mut RgbaImage, item: &TextItem) {
        let font = self.font(item.bold);
        let scale = Scale::uniform(item.size);

        let x = match item.h {
            HAlign::Left => item.x,
            HAlign::Center => item.x - self.width(&item.text, item.size, item.bold) / 2.0,
        };
        let y = match item.v {
            VAlign::Top => item.y,
            VAlign::Middle => item.y - item.size / 2.0,
        };

        draw_text_mut(img, self.color, x.round() as i32, y.round() as i32, scale, font, &item.text);
    }
}

fn paint(color: Rgba<u8>) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;
    paint
}

fn stroke(width: f32) -> Stroke {
    let mut stroke = Stroke::default();
    stroke.width = width;
    stroke
}

fn rect_path(r: PixelRect) -> Option<Path> {
    Rect::from_xywh(r.x, r.y, r.width, r.height).map(PathBuilder::from_rect)
}

/// One closed ring as its own path.
fn ring_path(ring: &LineString<f64>, vp: &Viewport) -> Option<Path> {
    if ring.0.len() < 3 {
        return None;
    }
    let mut pb = PathBuilder::new();
    for (i, coord) in ring.coords().enumerate() {
        let (x, y) = vp.to_pixel(coord.x, coord.y);
        if i == 0 {
            pb.move_to(x, y);
        } else {
            pb.line_to(x, y);
        }
    }
    pb.close();
    pb.finish()
}

/// Every ring of a polygon, exterior first. Interior rings are regions of
/// their own here, not holes.
fn ring_paths<'a>(polygon: &'a Polygon<f64>, vp: &'a Viewport) -> impl Iterator<Item = Path> + 'a {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .filter_map(move |ring| ring_path(ring, vp))
}

/// Where the configured extent lands on the untrimmed canvas.
pub fn map_viewport(config: &AppConfig) -> Viewport {
    let (width, height) = config.output.pixel_size();
    Viewport::fit(&config.map, PixelRect::from_figure_fraction(MAP_AXES, width, height))
}

/// Draws the choropleth, legend, scale bar and title and writes the PNG.
pub fn render_map(
    config: &AppConfig,
    rows: &[DensityRow],
    shapes: &[RegionShape],
    bins: &Bins,
    palette: &[Rgba<u8>],
) -> Result<RenderReport> {
    let output = &config.output;
    let (width, height) = output.pixel_size();
    let pt = |points: f32| output.points_to_pixels(points);

    let fallback = match &config.map.fallback_color {
        Some(hex) => hex_to_rgba(hex)?,
        None => palette.first().copied().unwrap_or(BACKGROUND),
    };
    let join = join_fills(rows, shapes, palette, fallback);

    let furniture = gray(FURNITURE_GRAY);
    let painter = TextPainter::new(furniture)?;

    // Legend labels may run past the figure's right edge; widen the canvas
    // so they survive, as a tight bounding box would.
    let legend_rect = PixelRect::from_figure_fraction(LEGEND_AXES, width, height);
    let legend_labels: Vec<String> = bins
        .labels()
        .into_iter()
        .map(|label| format!("{}{}", label, config.classification.unit))
        .collect();
    let label_x = legend_rect.right() + pt(TICK_LENGTH + TICK_PAD);
    let widest = legend_labels
        .iter()
        .map(|text| painter.width(text, pt(TICK_LABEL_SIZE), false))
        .fold(0.0f32, f32::max);
    let canvas_width = width.max((label_x + widest + pt(TICK_PAD)).ceil() as u32);

    let mut pixmap = Pixmap::new(canvas_width, height)
        .ok_or_else(|| anyhow!("Invalid canvas size {}x{}", canvas_width, height))?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let viewport = map_viewport(config);
    let frame = viewport.frame();
    let frame_path = rect_path(frame).ok_or_else(|| anyhow!("Map frame is empty"))?;

    let mut clip = Mask::new(canvas_width, height)
        .ok_or_else(|| anyhow!("Invalid clip mask size {}x{}", canvas_width, height))?;
    clip.fill_path(&frame_path, FillRule::Winding, false, Transform::identity());

    let edge_paint = paint(EDGE_COLOR);
    let edge_stroke = stroke(pt(EDGE_WIDTH));

    for (shape, fill) in shapes.iter().zip(&join.fills) {
        let fill_paint = paint(*fill);
        for polygon in &shape.geometry {
            for path in ring_paths(polygon, &viewport) {
                pixmap.fill_path(&path, &fill_paint, FillRule::Winding, Transform::identity(), Some(&clip));
                pixmap.stroke_path(&path, &edge_paint, &edge_stroke, Transform::identity(), Some(&clip));
            }
        }
    }
    debug!(polygons = shapes.len(), "Painted regions");

    pixmap.stroke_path(&frame_path, &edge_paint, &stroke(pt(FRAME_WIDTH)), Transform::identity(), None);

    let mut texts = Vec::new();

    if config.map.scale_bar.enabled {
        draw_scale_bar(&mut pixmap, &mut texts, config, &viewport, furniture);
    }

    draw_legend(&mut pixmap, &mut texts, config, legend_rect, &legend_labels, palette, furniture);

    let title_size = pt(TITLE_SIZE);
    let title_x = frame.x + 0.03 * frame.width;
    let title_y = frame.y + 0.05 * frame.height;
    for (i, line) in config.map.title.lines().enumerate() {
        texts.push(TextItem {
            text: line.to_string(),
            x: title_x,
            y: title_y + i as f32 * title_size * 1.2,
            size: title_size,
            bold: true,
            h: HAlign::Left,
            v: VAlign::Top,
        });
    }

    let mut img = pixmap_to_image(&pixmap)?;
    for item in &texts {
        painter.draw(&mut img, item);
    }

    if output.trim {
        let pad = pt(output.pad_inches * 72.0).round() as u32;
        img = trim_whitespace(&img, BACKGROUND, pad);
    }

    if let Some(parent) = output.path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }
    }
    img.save_with_format(&output.path, ImageFormat::Png)
        .with_context(|| format!("Failed to write map image {:?}", output.path))?;

    info!(
        path = ?output.path,
        width = img.width(),
        height = img.height(),
        matched = join.matched,
        unmatched = join.unmatched.len(),
        "Wrote map"
    );

    Ok(RenderReport {
        output: output.path.clone(),
        width: img.width(),
        height: img.height(),
        polygons: shapes.len(),
        matched: join.matched,
        unmatched: join.unmatched,
        regions_without_shape: join.regions_without_shape,
    })
}

/// Two-segment bar centred on the configured point, light then dark, with
/// distances above and the unit below.
fn draw_scale_bar(
    pixmap: &mut Pixmap,
    texts: &mut Vec<TextItem>,
    config: &AppConfig,
    viewport: &Viewport,
    color: Rgba<u8>,
) {
    let bar = &config.map.scale_bar;
    let pt = |points: f32| config.output.points_to_pixels(points);

    let span = km_to_degrees_lon(bar.length_km, bar.lat);
    let (x0, y) = viewport.to_pixel(bar.lon - span / 2.0, bar.lat);
    let (x1, _) = viewport.to_pixel(bar.lon + span / 2.0, bar.lat);
    let mid = (x0 + x1) / 2.0;
    let h = (viewport.frame().height * 0.01).max(2.0);
    let top = y - h / 2.0;

    let outline = stroke(pt(FURNITURE_WIDTH));
    let segments = [
        (PixelRect { x: x0, y: top, width: mid - x0, height: h }, BACKGROUND),
        (PixelRect { x: mid, y: top, width: x1 - mid, height: h }, color),
    ];
    for (rect, fill) in segments {
        if let Some(path) = rect_path(rect) {
            pixmap.fill_path(&path, &paint(fill), FillRule::Winding, Transform::identity(), None);
            pixmap.stroke_path(&path, &paint(color), &outline, Transform::identity(), None);
        }
    }

    let size = pt(SCALE_LABEL_SIZE);
    let ticks = [(x0, 0.0), (mid, bar.length_km / 2.0), (x1, bar.length_km)];
    for (x, km) in ticks {
        texts.push(TextItem {
            text: format!("{}", km),
            x,
            y: top - pt(2.0) - size / 2.0,
            size,
            bold: false,
            h: HAlign::Center,
            v: VAlign::Middle,
        });
    }
    texts.push(TextItem {
        text: "km".to_string(),
        x: mid,
        y: top + h + pt(2.0),
        size,
        bold: false,
        h: HAlign::Center,
        v: VAlign::Top,
    });
}

/// Vertical color bar, class 0 at the bottom, labels centred on each slot.
fn draw_legend(
    pixmap: &mut Pixmap,
    texts: &mut Vec<TextItem>,
    config: &AppConfig,
    rect: PixelRect,
    labels: &[String],
    palette: &[Rgba<u8>],
    color: Rgba<u8>,
) {
    let pt = |points: f32| config.output.points_to_pixels(points);
    let slots = palette.len();
    if slots == 0 {
        return;
    }
    let slot_h = rect.height / slots as f32;

    for (i, fill) in palette.iter().enumerate() {
        let swatch = PixelRect {
            x: rect.x,
            y: rect.bottom() - (i + 1) as f32 * slot_h,
            width: rect.width,
            height: slot_h,
        };
        if let Some(path) = rect_path(swatch) {
            pixmap.fill_path(&path, &paint(*fill), FillRule::Winding, Transform::identity(), None);
        }
    }

    let line_paint = paint(color);
    let line = stroke(pt(FURNITURE_WIDTH));
    if let Some(path) = rect_path(rect) {
        pixmap.stroke_path(&path, &line_paint, &line, Transform::identity(), None);
    }

    let size = pt(TICK_LABEL_SIZE);
    for i in 0..slots {
        let y = rect.bottom() - tick_fraction(i, slots) * rect.height;
        let mut pb = PathBuilder::new();
        pb.move_to(rect.right(), y);
        pb.line_to(rect.right() + pt(TICK_LENGTH), y);
        if let Some(path) = pb.finish() {
            pixmap.stroke_path(&path, &line_paint, &line, Transform::identity(), None);
        }

        texts.push(TextItem {
            text: labels.get(i).cloned().unwrap_or_default(),
            x: rect.right() + pt(TICK_LENGTH + TICK_PAD),
            y,
            size,
            bold: false,
            h: HAlign::Left,
            v: VAlign::Middle,
        });
    }
}

fn pixmap_to_image(pixmap: &Pixmap) -> Result<RgbaImage> {
    let mut raw = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        raw.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), raw)
        .ok_or_else(|| anyhow!("Pixel buffer does not match canvas size"))
}

/// Crops to the bounding box of non-background pixels plus `pad` on each
/// side. A blank image is returned unchanged.
pub fn trim_whitespace(img: &RgbaImage, background: Rgba<u8>, pad: u32) -> RgbaImage {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in img.enumerate_pixels() {
        if *pixel != background {
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }

    let Some((x0, y0, x1, y1)) = bounds else {
        return img.clone();
    };

    let left = x0.saturating_sub(pad);
    let top = y0.saturating_sub(pad);
    let right = (x1 + pad).min(img.width() - 1);
    let bottom = (y1 + pad).min(img.height() - 1);

    imageops::crop_imm(img, left, top, right - left + 1, bottom - top + 1).to_image()
}
