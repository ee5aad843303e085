//! Turns avoid marks into occupancy.
//!
//! Marks are drawn onto an alpha surface at real chart resolution, then every
//! covered pixel is sampled into the downsampled grids. When labels may sit
//! inside shapes, fills are drawn with a faint fixed alpha so outline pixels
//! can be told apart from interiors.

mod arc;
mod path;
mod surface;

pub use path::{flatten, parse_path, PathCommand, PathSegment, Subpath};
pub use surface::AlphaSurface;

use crate::bitmap::Bitmaps;
use crate::config::ChartSize;
use crate::mark::{MarkItem, Shape};

/// Alpha of an interior fill when labels may be placed inside shapes (opacity 0.0625).
pub const INSIDE_ALPHA: u8 = 0x10;
const OPAQUE: u8 = 0xff;
/// Stroke width forced onto filled shapes when labels may be placed inside.
const INSIDE_STROKE_WIDTH: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Paint {
    fill: Option<u8>,
    stroke: Option<f32>,
}

impl Paint {
    fn for_item(item: &MarkItem, label_inside: bool) -> Self {
        let stroke = item.stroke.then_some(item.stroke_width);
        if !label_inside {
            return Self {
                fill: item.fill.then_some(OPAQUE),
                stroke,
            };
        }
        if item.fill {
            Self {
                fill: Some(INSIDE_ALPHA),
                stroke: Some(INSIDE_STROKE_WIDTH),
            }
        } else {
            Self { fill: None, stroke }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rasterizer {
    size: ChartSize,
    padding: f32,
    label_inside: bool,
}

impl Rasterizer {
    pub fn new(size: ChartSize, padding: f32, label_inside: bool) -> Self {
        Self {
            size,
            padding,
            label_inside,
        }
    }

    /// Builds fresh bitmaps from `groups`. No groups at all means empty
    /// bitmaps without a border layer.
    pub fn rasterize(&self, groups: &[Vec<MarkItem>]) -> Bitmaps {
        let mut bitmaps = Bitmaps::empty(self.size.width, self.size.height, self.padding);
        if groups.is_empty() {
            return bitmaps;
        }
        if self.label_inside {
            bitmaps.ensure_border(self.size.width, self.size.height);
        }
        let surface = self.draw(groups);
        self.sample(&surface, &mut bitmaps);
        bitmaps
    }

    /// Adds `groups` to existing bitmaps without touching what they already hold.
    pub fn merge_into(&self, groups: &[Vec<MarkItem>], bitmaps: &mut Bitmaps) {
        if groups.is_empty() {
            return;
        }
        let surface = self.draw(groups);
        self.sample(&surface, bitmaps);
    }

    /// Draws every mark of every group onto a surface the size of the chart.
    pub fn draw(&self, groups: &[Vec<MarkItem>]) -> AlphaSurface {
        let mut surface = AlphaSurface::new(
            self.size.width.max(0.0) as usize,
            self.size.height.max(0.0) as usize,
        );
        for (index, group) in groups.iter().enumerate() {
            tracing::trace!(group = index, marks = group.len(), "rasterizing mark group");
            for item in group {
                self.draw_item(&mut surface, item, (0.0, 0.0));
            }
        }
        surface
    }

    fn draw_item(&self, surface: &mut AlphaSurface, item: &MarkItem, offset: (f32, f32)) {
        let tx = offset.0 + item.translate_x;
        let ty = offset.1 + item.translate_y;
        let paint = Paint::for_item(item, self.label_inside);

        match &item.shape {
            Shape::Rect {
                x,
                y,
                width,
                height,
            } => draw_box(surface, x + tx, y + ty, *width, *height, paint),
            Shape::Text(text) => draw_box(
                surface,
                text.x + tx - text.anchor_shift() + text.dx_px(),
                text.y + ty + text.dy_px(),
                text.width,
                text.height,
                paint,
            ),
            Shape::Circle { cx, cy, r } => {
                let (cx, cy) = (cx + tx, cy + ty);
                if let Some(width) = paint.stroke {
                    let ring = circle_ring(cx, cy, *r);
                    surface.stroke_polyline(&ring, true, width, OPAQUE);
                }
                if let Some(alpha) = paint.fill {
                    surface.fill_circle(cx, cy, *r, alpha);
                }
            }
            Shape::Line { x1, y1, x2, y2 } => {
                if let Some(width) = paint.stroke {
                    let points = [(x1 + tx, y1 + ty), (x2 + tx, y2 + ty)];
                    surface.stroke_polyline(&points, false, width, OPAQUE);
                }
            }
            Shape::Path(path) => {
                let commands = parse_path(&path.d);
                let scale = match path.r {
                    Some(r) if r != 0.0 => r,
                    _ => 1.0,
                };
                let subpaths = flatten(&commands, (path.x + tx, path.y + ty), scale);
                if let Some(width) = paint.stroke {
                    for subpath in &subpaths {
                        surface.stroke_polyline(&subpath.points, subpath.closed, width, OPAQUE);
                    }
                }
                if let Some(alpha) = paint.fill {
                    let rings: Vec<Vec<(f32, f32)>> =
                        subpaths.into_iter().map(|subpath| subpath.points).collect();
                    surface.fill_polygons(&rings, alpha);
                }
            }
            Shape::Group { items } => {
                for child in items {
                    self.draw_item(surface, child, (tx, ty));
                }
            }
        }
    }

    fn sample(&self, surface: &AlphaSurface, bitmaps: &mut Bitmaps) {
        if self.label_inside {
            bitmaps.ensure_border(self.size.width, self.size.height);
        }
        let Bitmaps { solid, border } = bitmaps;
        for (y, row) in surface.rows().enumerate() {
            for (x, &alpha) in row.iter().enumerate() {
                if alpha == 0 {
                    continue;
                }
                let (rx, ry) = (x as f32, y as f32);
                solid.mark(rx, ry);
                if self.label_inside
                    && alpha ^ INSIDE_ALPHA != 0
                    && let Some(border) = border.as_mut()
                {
                    border.mark(rx, ry);
                }
            }
        }
    }
}

fn draw_box(surface: &mut AlphaSurface, x: f32, y: f32, w: f32, h: f32, paint: Paint) {
    let corners = vec![(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
    if let Some(width) = paint.stroke {
        surface.stroke_polyline(&corners, true, width, OPAQUE);
    }
    if let Some(alpha) = paint.fill {
        surface.fill_polygons(&[corners], alpha);
    }
}

fn circle_ring(cx: f32, cy: f32, r: f32) -> Vec<(f32, f32)> {
    let r = r.abs();
    let steps = ((std::f32::consts::TAU * r / 2.0).ceil() as usize).clamp(12, 256);
    (0..steps)
        .map(|i| {
            let theta = std::f32::consts::TAU * i as f32 / steps as f32;
            (cx + r * theta.cos(), cy + r * theta.sin())
        })
        .collect()
}
