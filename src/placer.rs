//! Anchor search against the occupancy grid.
//!
//! Candidates are tried in caller order. The first box that stays on the grid
//! and misses every occupied cell is committed to the solid layer.

use std::f32::consts::FRAC_1_SQRT_2;

use serde::{Deserialize, Serialize};

use crate::bitmap::{Bitmaps, OccupancyGrid};
use crate::bounds::MarkBounds;
use crate::config::ChartSize;
use crate::label::{Align, AnchorPosition, Baseline, Commit, LabelItem};
use crate::text_metrics::FontMetrics;

/// Rows of slack cleared below each box when the committed candidate is unknown.
const PRIOR_UNPLACE_SLACK: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub anchor: AnchorPosition,
    pub offset: f32,
}

impl Candidate {
    pub fn new(anchor: AnchorPosition, offset: f32) -> Self {
        Self { anchor, offset }
    }
}

/// Inclusive cell rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellBox {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

/// Geometry of one candidate. The vertical extent is fixed by the text
/// height; the horizontal extent waits on the text width.
#[derive(Debug, Clone, Copy)]
struct CandidateBox {
    dx: i32,
    dy: i32,
    inside_factor: f32,
    x: f32,
    y_center: f32,
    y1: f32,
    y2: f32,
}

impl CandidateBox {
    fn new(bounds: &MarkBounds, candidate: &Candidate, text_height: f32) -> Self {
        let (dx, dy) = candidate.anchor.direction();
        let size_factor = if dx != 0 && dy != 0 { FRAC_1_SQRT_2 } else { 1.0 };
        let inside_factor = if candidate.offset < 0.0 { -1.0 } else { 1.0 };
        let y_center = bounds.y_at(dy)
            + inside_factor * text_height * dy as f32 / 2.0
            + candidate.offset * dy as f32 * size_factor;
        let x = bounds.x_at(dx) + candidate.offset * dx as f32 * size_factor;
        Self {
            dx,
            dy,
            inside_factor,
            x,
            y_center,
            y1: y_center - text_height / 2.0,
            y2: y_center + text_height / 2.0,
        }
    }

    fn is_center(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }

    /// `(x_center, x1, x2)` for a label of `text_width`.
    fn horizontal(&self, text_width: f32) -> (f32, f32, f32) {
        let x_center = self.x + self.inside_factor * text_width * self.dx as f32 / 2.0;
        (
            x_center,
            x_center - text_width / 2.0,
            x_center + text_width / 2.0,
        )
    }

    fn cells(&self, grid: &OccupancyGrid, x1: f32, x2: f32) -> CellBox {
        CellBox {
            x0: grid.scale_pixel(x1),
            y0: grid.scale_pixel(self.y1),
            x1: grid.scale_pixel(x2),
            y1: grid.scale_pixel(self.y2),
        }
    }

    /// Writes the text position, alignment and baseline this box implies.
    fn apply_to(&self, label: &mut LabelItem, x_center: f32, x1: f32, x2: f32) {
        let h = self.dx as f32 * self.inside_factor;
        let v = self.dy as f32 * self.inside_factor;
        label.x = if self.dx == 0 {
            x_center
        } else if h < 0.0 {
            x2
        } else {
            x1
        };
        label.y = if self.dy == 0 {
            self.y_center
        } else if v < 0.0 {
            self.y2
        } else {
            self.y1
        };
        label.align = Align::from_direction(h as i32);
        label.baseline = Baseline::from_direction(v as i32);
    }
}

fn check_collision(grid: Option<&OccupancyGrid>, cells: CellBox) -> bool {
    let Some(grid) = grid else {
        return true;
    };
    // bottom row first; it is the row most likely to touch the mark below
    grid.get_in_range_scaled(cells.x0, cells.y1, cells.x1, cells.y1)
        || grid.get_in_range_scaled(cells.x0, cells.y0, cells.x1, cells.y1 - 1)
}

fn is_placeable(
    solid: &OccupancyGrid,
    border: Option<&OccupancyGrid>,
    cells: CellBox,
    real: (f32, f32, f32, f32),
    bounds: &MarkBounds,
    is_inside: bool,
) -> bool {
    if solid.search_out_of_bound(cells.x0, cells.y0, cells.x1, cells.y1) {
        return false;
    }
    if is_inside {
        let (x1, y1, x2, y2) = real;
        !check_collision(border, cells) && bounds.contains_box(x1, y1, x2, y2)
    } else {
        !check_collision(Some(solid), cells)
    }
}

/// Places labels one at a time into a shared pair of bitmaps.
pub struct LabelPlacer<'a> {
    bitmaps: &'a mut Bitmaps,
    size: ChartSize,
    candidates: &'a [Candidate],
    metrics: &'a dyn FontMetrics,
}

impl<'a> LabelPlacer<'a> {
    pub fn new(
        bitmaps: &'a mut Bitmaps,
        size: ChartSize,
        candidates: &'a [Candidate],
        metrics: &'a dyn FontMetrics,
    ) -> Self {
        Self {
            bitmaps,
            size,
            candidates,
            metrics,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        self.candidates
    }

    pub fn bitmaps(&self) -> &Bitmaps {
        self.bitmaps
    }

    /// Tries every candidate in order and commits the first that fits.
    ///
    /// On failure the label keeps the geometry of the last candidate that got
    /// far enough to be measured, so a hidden label still has a stable spot.
    pub fn place(&mut self, label: &mut LabelItem) -> bool {
        let bounds = label.mark_bounds;
        if bounds.outside_chart(self.size.width, self.size.height) {
            tracing::trace!(text = %label.text, "mark lies outside the chart");
            label.visible = false;
            return false;
        }

        let Bitmaps { solid, border } = &mut *self.bitmaps;
        let border = border.as_ref();

        for (index, candidate) in self.candidates.iter().enumerate() {
            let geometry = CandidateBox::new(&bounds, candidate, label.text_height);
            let is_inside = border.is_some() && (geometry.is_center() || candidate.offset < 0.0);

            let text_width = match label.text_width {
                Some(width) if width > 0.0 => width,
                _ => {
                    let probe = geometry.cells(solid, geometry.x, geometry.x);
                    let real = (geometry.x, geometry.y1, geometry.x, geometry.y2);
                    if !is_placeable(solid, border, probe, real, &bounds, is_inside) {
                        continue;
                    }
                    let measured =
                        self.metrics
                            .measure(&label.text, label.font_size, &label.font_family);
                    label.text_width = Some(measured);
                    measured
                }
            };

            let (x_center, x1, x2) = geometry.horizontal(text_width);
            let cells = geometry.cells(solid, x1, x2);
            geometry.apply_to(label, x_center, x1, x2);

            let real = (x1, geometry.y1, x2, geometry.y2);
            if is_placeable(solid, border, cells, real, &bounds, is_inside) {
                solid.mark_in_range_scaled(cells.x0, cells.y0, cells.x1, cells.y1);
                label.commit = Commit::At(index);
                label.visible = true;
                tracing::trace!(
                    text = %label.text,
                    anchor = %candidate.anchor,
                    offset = candidate.offset,
                    x = label.x,
                    y = label.y,
                    "label placed"
                );
                return true;
            }
        }

        label.visible = false;
        false
    }

    /// Clears the label's committed box from the solid layer. A label that
    /// holds no box is left alone.
    pub fn unplace(&mut self, label: &mut LabelItem) {
        let targets: Vec<(usize, i32)> = match label.commit {
            Commit::None => return,
            Commit::At(index) => vec![(index, 0)],
            Commit::Prior => (0..self.candidates.len())
                .map(|index| (index, PRIOR_UNPLACE_SLACK))
                .collect(),
        };

        let text_width = match label.text_width {
            Some(width) => width,
            None => {
                let measured = self
                    .metrics
                    .measure(&label.text, label.font_size, &label.font_family);
                label.text_width = Some(measured);
                measured
            }
        };

        let solid = &mut self.bitmaps.solid;
        for (index, slack) in targets {
            let Some(candidate) = self.candidates.get(index) else {
                continue;
            };
            let geometry = CandidateBox::new(&label.mark_bounds, candidate, label.text_height);
            let (_, x1, x2) = geometry.horizontal(text_width);
            let cells = geometry.cells(solid, x1, x2);
            solid.unmark_in_range_scaled(cells.x0, cells.y0, cells.x1, cells.y1 + slack);
        }
        label.commit = Commit::None;
    }
}
