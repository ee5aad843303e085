//! Alpha-only raster surface with source-over compositing.

/// Single-channel coverage buffer at real chart resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaSurface {
    width: usize,
    height: usize,
    alpha: Vec<u8>,
}

impl AlphaSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            alpha: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn alpha(&self, x: usize, y: usize) -> u8 {
        if x < self.width && y < self.height {
            self.alpha[y * self.width + x]
        } else {
            0
        }
    }

    /// Rows of alpha values, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.alpha.chunks(self.width.max(1))
    }

    fn blend(&mut self, index: usize, src: u8) {
        let dst = self.alpha[index] as u32;
        let src = src as u32;
        self.alpha[index] = (src + dst * (255 - src) / 255) as u8;
    }

    /// Blends pixels `x0..x1` of row `y`, clipped to the surface.
    fn blend_span(&mut self, y: i64, x0: i64, x1: i64, alpha: u8) {
        if y < 0 || y >= self.height as i64 {
            return;
        }
        let start = x0.max(0);
        let end = x1.min(self.width as i64);
        if start >= end {
            return;
        }
        let base = y as usize * self.width;
        for x in start as usize..end as usize {
            self.blend(base + x, alpha);
        }
    }

    /// Fills rings with the nonzero winding rule, sampling pixel centres.
    pub fn fill_polygons(&mut self, rings: &[Vec<(f32, f32)>], alpha: u8) {
        let (min_y, max_y) = rings
            .iter()
            .flatten()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.1), hi.max(p.1))
            });
        if !min_y.is_finite() || !max_y.is_finite() {
            return;
        }
        let first = (min_y.floor() as i64).max(0);
        let last = (max_y.ceil() as i64).min(self.height as i64 - 1);

        let mut crossings: Vec<(f32, i32)> = Vec::new();
        for row in first..=last {
            let yc = row as f32 + 0.5;
            crossings.clear();
            for ring in rings {
                let n = ring.len();
                if n < 2 {
                    continue;
                }
                for i in 0..n {
                    let p = ring[i];
                    let q = ring[(i + 1) % n];
                    let upward = p.1 <= yc && q.1 > yc;
                    let downward = q.1 <= yc && p.1 > yc;
                    if upward || downward {
                        let x = p.0 + (yc - p.1) * (q.0 - p.0) / (q.1 - p.1);
                        crossings.push((x, if upward { 1 } else { -1 }));
                    }
                }
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            let mut span_start = 0.0f32;
            let spans: Vec<(f32, f32)> = crossings
                .iter()
                .filter_map(|&(x, dir)| {
                    let before = winding;
                    winding += dir;
                    if before == 0 && winding != 0 {
                        span_start = x;
                        None
                    } else if before != 0 && winding == 0 {
                        Some((span_start, x))
                    } else {
                        None
                    }
                })
                .collect();
            for (x0, x1) in spans {
                // pixels whose centre lies in [x0, x1)
                let start = (x0 - 0.5).ceil() as i64;
                let end = (x1 - 0.5).ceil() as i64;
                self.blend_span(row, start, end, alpha);
            }
        }
    }

    /// Blends every pixel touched by a convex polygon, once.
    fn fill_convex_conservative(&mut self, poly: &[(f32, f32)], alpha: u8) {
        let (min_y, max_y) = poly
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.1), hi.max(p.1))
            });
        let height = self.height as f32;
        if !min_y.is_finite() || !max_y.is_finite() || max_y < 0.0 || min_y > height {
            return;
        }
        let (min_y, max_y) = (min_y.max(-1.0), max_y.min(height + 1.0));
        let first = (min_y.floor() as i64).max(0);
        let last = ((max_y.ceil() as i64) - 1)
            .max(min_y.floor() as i64)
            .min(self.height as i64 - 1);
        let right = self.width as f32 + 1.0;
        for row in first..=last {
            if let Some((lo, hi)) = band_extent(poly, row as f32, row as f32 + 1.0) {
                let start = lo.clamp(-1.0, right).floor() as i64;
                let end = (hi.clamp(-1.0, right).ceil() as i64).max(start + 1);
                self.blend_span(row, start, end, alpha);
            }
        }
    }

    /// Strokes a polyline with square caps, covering every touched pixel.
    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], closed: bool, width: f32, alpha: u8) {
        if points.is_empty() || width <= 0.0 {
            return;
        }
        let half = width / 2.0;
        if points.len() == 1 {
            let (x, y) = points[0];
            let square = [
                (x - half, y - half),
                (x + half, y - half),
                (x + half, y + half),
                (x - half, y + half),
            ];
            self.fill_convex_conservative(&square, alpha);
            return;
        }
        let segment_count = if closed { points.len() } else { points.len() - 1 };
        for i in 0..segment_count {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            if let Some(quad) = segment_quad(a, b, half) {
                self.fill_convex_conservative(&quad, alpha);
            }
        }
    }

    /// Midpoint circle fill around the pixel nearest the centre.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, r: f32, alpha: u8) {
        if r <= 0.0 || !r.is_finite() || !cx.is_finite() || !cy.is_finite() {
            return;
        }
        let (xc, yc, radius) = (cx.round() as f64, cy.round() as f64, r.round() as f64);
        let (width, height) = (self.width as f64, self.height as f64);
        if xc + radius < 0.0 || xc - radius >= width || yc + radius < 0.0 || yc - radius >= height
        {
            return;
        }
        if radius > width + height {
            self.fill_disc_rows(xc, yc, radius, alpha);
            return;
        }

        let radius = radius as i64;
        let (xc, yc) = (xc as i64, yc as i64);
        let size = (2 * radius + 1) as usize;
        let mut half_widths = vec![-1i64; size];
        let mut widen = |dy: i64, half: i64| {
            let slot = &mut half_widths[(dy + radius) as usize];
            *slot = (*slot).max(half);
        };

        let (mut x, mut y, mut err) = (radius, 0i64, 1 - radius);
        while x >= y {
            widen(y, x);
            widen(-y, x);
            widen(x, y);
            widen(-x, y);
            y += 1;
            if err < 0 {
                err += 2 * y + 1;
            } else {
                x -= 1;
                err += 2 * (y - x) + 1;
            }
        }

        for (offset, half) in half_widths.into_iter().enumerate() {
            if half >= 0 {
                let row = yc + offset as i64 - radius;
                self.blend_span(row, xc - half, xc + half + 1, alpha);
            }
        }
    }

    /// Row-by-row disc fill for radii far beyond the surface, visiting only
    /// the rows the surface has.
    fn fill_disc_rows(&mut self, xc: f64, yc: f64, radius: f64, alpha: u8) {
        let (width, height) = (self.width as f64, self.height as f64);
        let first = (yc - radius).max(0.0) as i64;
        let last = (yc + radius).min(height - 1.0) as i64;
        for row in first..=last {
            let dy = row as f64 - yc;
            let half = (radius * radius - dy * dy).max(0.0).sqrt().floor();
            let start = (xc - half).clamp(-1.0, width + 1.0) as i64;
            let end = (xc + half + 1.0).clamp(-1.0, width + 1.0) as i64;
            self.blend_span(row, start, end, alpha);
        }
    }
}

/// Rectangle around segment `a`-`b`, extended by `half` at both ends.
fn segment_quad(a: (f32, f32), b: (f32, f32), half: f32) -> Option<[(f32, f32); 4]> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len = dx.hypot(dy);
    let (ux, uy) = if len > f32::EPSILON {
        (dx / len, dy / len)
    } else {
        (1.0, 0.0)
    };
    if !ux.is_finite() || !uy.is_finite() {
        return None;
    }
    let (nx, ny) = (-uy * half, ux * half);
    let (ex, ey) = (ux * half, uy * half);
    Some([
        (a.0 - ex + nx, a.1 - ey + ny),
        (a.0 - ex - nx, a.1 - ey - ny),
        (b.0 + ex - nx, b.1 + ey - ny),
        (b.0 + ex + nx, b.1 + ey + ny),
    ])
}

/// Horizontal extent of a convex polygon within the band `y0..=y1`.
fn band_extent(poly: &[(f32, f32)], y0: f32, y1: f32) -> Option<(f32, f32)> {
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    let n = poly.len();
    for i in 0..n {
        let p = poly[i];
        let q = poly[(i + 1) % n];
        let (edge_min, edge_max) = (p.1.min(q.1), p.1.max(q.1));
        if edge_max < y0 || edge_min > y1 {
            continue;
        }
        let dy = q.1 - p.1;
        if dy.abs() < f32::EPSILON {
            lo = lo.min(p.0.min(q.0));
            hi = hi.max(p.0.max(q.0));
            continue;
        }
        for y in [y0, y1] {
            let t = ((y - p.1) / dy).clamp(0.0, 1.0);
            let x = p.0 + t * (q.0 - p.0);
            lo = lo.min(x);
            hi = hi.max(x);
        }
    }
    (lo <= hi).then_some((lo, hi))
}
