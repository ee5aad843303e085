//! Downsampled occupancy grid over chart pixel space.
//!
//! Every real pixel maps to a cell through [`OccupancyGrid::scale_pixel`]; large
//! charts are downsampled so the grid stays around one million cells. Range
//! operations touch whole 32-bit words per row instead of single cells.

mod words;

use words::BitWords;

/// Target number of cells before the grid starts downsampling.
const TARGET_CELLS: f32 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    pixel_ratio: f32,
    padding: f32,
    bits: BitWords,
}

impl OccupancyGrid {
    /// Builds an empty grid for a chart of `width` x `height` real pixels with
    /// `padding` pixels of slack around every edge.
    pub fn new(width: f32, height: f32, padding: f32) -> Self {
        let pixel_ratio = ((width * height) / TARGET_CELLS).sqrt().max(1.0);
        let cells = |real: f32| {
            ((real + 2.0 * padding + pixel_ratio) / pixel_ratio)
                .ceil()
                .max(0.0) as usize
        };
        let grid_width = cells(width);
        let grid_height = cells(height);
        Self {
            width: grid_width,
            height: grid_height,
            pixel_ratio,
            padding,
            bits: BitWords::with_bits(grid_width * grid_height),
        }
    }

    /// Width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Real pixels per cell, never below 1.
    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Maps a real coordinate to a cell coordinate. May be negative or past
    /// the grid edge; callers check with [`Self::search_out_of_bound`].
    pub fn scale_pixel(&self, real: f32) -> i32 {
        ((real + self.padding) / self.pixel_ratio).floor() as i32
    }

    fn contains_cell(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    fn cell_index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width + x as usize
    }

    pub fn mark_scaled(&mut self, x: i32, y: i32) {
        if self.contains_cell(x, y) {
            let index = self.cell_index(x, y);
            self.bits.set(index);
        }
    }

    pub fn mark(&mut self, x: f32, y: f32) {
        self.mark_scaled(self.scale_pixel(x), self.scale_pixel(y));
    }

    pub fn unmark_scaled(&mut self, x: i32, y: i32) {
        if self.contains_cell(x, y) {
            let index = self.cell_index(x, y);
            self.bits.clear(index);
        }
    }

    pub fn unmark(&mut self, x: f32, y: f32) {
        self.unmark_scaled(self.scale_pixel(x), self.scale_pixel(y));
    }

    /// Cells outside the grid read as occupied.
    pub fn get_scaled(&self, x: i32, y: i32) -> bool {
        if !self.contains_cell(x, y) {
            return true;
        }
        self.bits.test(self.cell_index(x, y))
    }

    pub fn get(&self, x: f32, y: f32) -> bool {
        self.get_scaled(self.scale_pixel(x), self.scale_pixel(y))
    }

    /// True if the cell rectangle `(x0, y0)..=(x1, y1)` leaves the grid.
    pub fn search_out_of_bound(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> bool {
        x0 < 0 || y0 < 0 || y1 >= self.height as i32 || x1 >= self.width as i32
    }

    /// Clips an inclusive cell rectangle to the grid, `None` when nothing is left.
    fn clip(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> Option<(usize, usize, usize, usize)> {
        if x0 > x1 || y0 > y1 || self.width == 0 || self.height == 0 {
            return None;
        }
        let max_x = self.width as i32 - 1;
        let max_y = self.height as i32 - 1;
        if x1 < 0 || y1 < 0 || x0 > max_x || y0 > max_y {
            return None;
        }
        Some((
            x0.max(0) as usize,
            y0.max(0) as usize,
            x1.min(max_x) as usize,
            y1.min(max_y) as usize,
        ))
    }

    /// Marks the inclusive cell rectangle, clipped to the grid.
    pub fn mark_in_range_scaled(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let Some((x0, y0, x1, y1)) = self.clip(x0, y0, x1, y1) else {
            return;
        };
        for row in y0..=y1 {
            let base = row * self.width;
            self.bits.set_span(base + x0, base + x1);
        }
    }

    pub fn mark_in_range(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        self.mark_in_range_scaled(
            self.scale_pixel(x0),
            self.scale_pixel(y0),
            self.scale_pixel(x1),
            self.scale_pixel(y1),
        );
    }

    /// Clears the inclusive cell rectangle, clipped to the grid.
    pub fn unmark_in_range_scaled(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let Some((x0, y0, x1, y1)) = self.clip(x0, y0, x1, y1) else {
            return;
        };
        for row in y0..=y1 {
            let base = row * self.width;
            self.bits.clear_span(base + x0, base + x1);
        }
    }

    pub fn unmark_in_range(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        self.unmark_in_range_scaled(
            self.scale_pixel(x0),
            self.scale_pixel(y0),
            self.scale_pixel(x1),
            self.scale_pixel(y1),
        );
    }

    /// True if any cell of the inclusive rectangle is occupied. A rectangle
    /// reaching outside the grid counts as occupied; an empty one does not.
    pub fn get_in_range_scaled(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> bool {
        if x0 > x1 || y0 > y1 {
            return false;
        }
        if self.search_out_of_bound(x0, y0, x1, y1) {
            return true;
        }
        let (x0, x1) = (x0 as usize, x1 as usize);
        (y0 as usize..=y1 as usize).any(|row| {
            let base = row * self.width;
            self.bits.any_in_span(base + x0, base + x1)
        })
    }

    pub fn get_in_range(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> bool {
        self.get_in_range_scaled(
            self.scale_pixel(x0),
            self.scale_pixel(y0),
            self.scale_pixel(x1),
            self.scale_pixel(y1),
        )
    }

    /// Number of occupied cells.
    pub fn count_marked(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.count_marked() == 0
    }

    pub fn clear(&mut self) {
        self.bits.reset();
    }

    /// Renders the grid one character per cell, `#` for occupied.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let occupied = self.bits.test(y * self.width + x);
                out.push(if occupied { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

/// The solid layer and, when labels may sit inside shapes, the outline layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmaps {
    pub solid: OccupancyGrid,
    pub border: Option<OccupancyGrid>,
}

impl Bitmaps {
    pub fn new(solid: OccupancyGrid, border: Option<OccupancyGrid>) -> Self {
        Self { solid, border }
    }

    /// Empty bitmaps without a border layer.
    pub fn empty(width: f32, height: f32, padding: f32) -> Self {
        Self {
            solid: OccupancyGrid::new(width, height, padding),
            border: None,
        }
    }

    /// Makes sure the border layer exists, sized like the solid one.
    pub(crate) fn ensure_border(&mut self, width: f32, height: f32) -> &mut OccupancyGrid {
        let padding = self.solid.padding();
        self.border
            .get_or_insert_with(|| OccupancyGrid::new(width, height, padding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_canvas_keeps_unit_pixel_ratio() {
        let grid = OccupancyGrid::new(100.0, 100.0, 0.0);
        assert_eq!(grid.pixel_ratio(), 1.0);
        assert_eq!(grid.width(), 101);
        assert_eq!(grid.height(), 101);
    }

    #[test]
    fn large_canvas_is_downsampled() {
        let grid = OccupancyGrid::new(2000.0, 2000.0, 0.0);
        assert!((grid.pixel_ratio() - 2.0).abs() < 1e-6);
        assert_eq!(grid.width(), 1001);
        assert_eq!(grid.scale_pixel(11.0), 5);
        assert_eq!(grid.scale_pixel(1999.0), 999);
    }

    #[test]
    fn padding_shifts_cells() {
        let grid = OccupancyGrid::new(100.0, 50.0, 1.0);
        assert_eq!(grid.width(), 103);
        assert_eq!(grid.height(), 53);
        assert_eq!(grid.scale_pixel(-1.0), 0);
        assert_eq!(grid.scale_pixel(0.0), 1);
        assert_eq!(grid.scale_pixel(-1.5), -1);
    }

    #[test]
    fn mark_is_idempotent_and_unmark_clears() {
        let mut grid = OccupancyGrid::new(100.0, 100.0, 0.0);
        grid.mark(5.0, 7.0);
        let once = grid.clone();
        grid.mark(5.0, 7.0);
        assert_eq!(grid, once);
        assert!(grid.get(5.0, 7.0));
        grid.mark(5.0, 7.0);
        grid.unmark(5.0, 7.0);
        assert!(!grid.get(5.0, 7.0));
        assert!(grid.is_empty());
    }

    #[test]
    fn range_query_hits_inside_and_misses_disjoint() {
        let mut grid = OccupancyGrid::new(100.0, 100.0, 0.0);
        grid.mark_in_range(10.0, 10.0, 20.0, 20.0);
        assert!(grid.get_in_range(15.0, 15.0, 16.0, 16.0));
        assert!(!grid.get_in_range(30.0, 30.0, 31.0, 31.0));
        assert_eq!(grid.count_marked(), 11 * 11);
    }

    #[test]
    fn disjoint_rectangles_do_not_interfere() {
        let mut grid = OccupancyGrid::new(100.0, 100.0, 0.0);
        // spans straddle word boundaries on every row
        grid.mark_in_range_scaled(28, 0, 40, 9);
        assert!(!grid.get_in_range_scaled(41, 0, 90, 9));
        assert!(!grid.get_in_range_scaled(0, 10, 100, 20));
        assert!(!grid.get_in_range_scaled(0, 0, 27, 9));
        grid.mark_in_range_scaled(41, 0, 90, 9);
        grid.unmark_in_range_scaled(41, 0, 90, 9);
        assert!(grid.get_in_range_scaled(28, 0, 40, 9));
        assert_eq!(grid.count_marked(), 13 * 10);
    }

    #[test]
    fn out_of_bound_rectangles_read_as_occupied() {
        let grid = OccupancyGrid::new(100.0, 100.0, 0.0);
        assert!(grid.search_out_of_bound(-1, 0, 10, 10));
        assert!(grid.search_out_of_bound(0, 0, 101, 10));
        assert!(!grid.search_out_of_bound(0, 0, 100, 100));
        assert!(grid.get_in_range_scaled(95, 95, 120, 99));
        assert!(grid.get_scaled(-3, 4));
        assert!(!grid.get_in_range_scaled(5, 5, 4, 6));
    }

    #[test]
    fn marks_outside_the_grid_are_clipped() {
        let mut grid = OccupancyGrid::new(10.0, 10.0, 0.0);
        grid.mark_in_range_scaled(-5, -5, 2, 2);
        assert_eq!(grid.count_marked(), 9);
        grid.mark_scaled(50, 50);
        assert_eq!(grid.count_marked(), 9);
    }

    #[test]
    fn ascii_dump_shows_marked_cells() {
        let mut grid = OccupancyGrid::new(2.0, 1.0, 0.0);
        grid.mark_scaled(1, 0);
        assert_eq!(grid.to_ascii(), ".#.\n...\n");
    }
}
