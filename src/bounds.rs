use serde::{Deserialize, Serialize};

use crate::mark::{MarkItem, Shape, TextShape};

/// `(x, y, width, height)`
pub type Rect = (f32, f32, f32, f32);

/// Which part of a mark labels anchor against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundsScope {
    #[default]
    Default,
    Top,
    Middle,
    Bottom,
    Left,
    Right,
    Center,
    Centroid,
    Annotation,
}

/// Six reference coordinates of a mark: `[x_start, x_mid, x_end, y_start, y_mid, y_end]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkBounds(pub [f32; 6]);

impl MarkBounds {
    pub fn new(xs: [f32; 3], ys: [f32; 3]) -> Self {
        Self([xs[0], xs[1], xs[2], ys[0], ys[1], ys[2]])
    }

    pub fn from_rect((x, y, w, h): Rect) -> Self {
        Self::new([x, x + w / 2.0, x + w], [y, y + h / 2.0, y + h])
    }

    pub fn point(x: f32, y: f32) -> Self {
        Self::new([x; 3], [y; 3])
    }

    pub fn x_start(&self) -> f32 {
        self.0[0]
    }

    pub fn x_mid(&self) -> f32 {
        self.0[1]
    }

    pub fn x_end(&self) -> f32 {
        self.0[2]
    }

    pub fn y_start(&self) -> f32 {
        self.0[3]
    }

    pub fn y_mid(&self) -> f32 {
        self.0[4]
    }

    pub fn y_end(&self) -> f32 {
        self.0[5]
    }

    /// Reference x for a horizontal direction in `-1..=1`.
    pub fn x_at(&self, dx: i32) -> f32 {
        self.0[(1 + dx.clamp(-1, 1)) as usize]
    }

    /// Reference y for a vertical direction in `-1..=1`.
    pub fn y_at(&self, dy: i32) -> f32 {
        self.0[(4 + dy.clamp(-1, 1)) as usize]
    }

    pub fn contains_box(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> bool {
        self.x_start() <= x1 && x2 <= self.x_end() && self.y_start() <= y1 && y2 <= self.y_end()
    }

    /// True when the mark lies entirely outside a `width` x `height` chart.
    pub fn outside_chart(&self, width: f32, height: f32) -> bool {
        self.x_end() < 0.0 || self.y_end() < 0.0 || self.x_start() > width || self.y_start() > height
    }

    pub fn translate(self, dx: f32, dy: f32) -> Self {
        let [a, b, c, d, e, f] = self.0;
        Self([a + dx, b + dx, c + dx, d + dy, e + dy, f + dy])
    }

    /// Smallest box around both, with midpoints recomputed.
    pub fn union(self, other: Self) -> Self {
        let x0 = self.x_start().min(other.x_start());
        let x1 = self.x_end().max(other.x_end());
        let y0 = self.y_start().min(other.y_start());
        let y1 = self.y_end().max(other.y_end());
        Self::new([x0, (x0 + x1) / 2.0, x1], [y0, (y0 + y1) / 2.0, y1])
    }

    pub fn to_rect(&self) -> Rect {
        (
            self.x_start(),
            self.y_start(),
            self.x_end() - self.x_start(),
            self.y_end() - self.y_start(),
        )
    }
}

/// Axis-aligned overlap test; touching edges count as a collision.
pub fn find_collision(a: &Rect, b: &Rect) -> bool {
    let (ax, ay, aw, ah) = *a;
    let (bx, by, bw, bh) = *b;
    ax <= bx + bw && bx <= ax + aw && by <= ay + ah && ay <= by + bh
}

pub fn mark_bounds(item: &MarkItem, scope: BoundsScope) -> MarkBounds {
    let (tx, ty) = (item.translate_x, item.translate_y);
    match &item.shape {
        Shape::Rect {
            x,
            y,
            width,
            height,
        } => rect_bounds(x + tx, y + ty, *width, *height, scope),
        Shape::Circle { cx, cy, r } => {
            let (x, y) = (cx + tx, cy + ty);
            MarkBounds::new([x - r, x, x + r], [y - r, y, y + r])
        }
        Shape::Line { x1, y1, x2, y2 } => {
            let (left, right) = (x1.min(*x2) + tx, x1.max(*x2) + tx);
            let (top, bottom) = (y1.min(*y2) + ty, y1.max(*y2) + ty);
            MarkBounds::from_rect((left, top, right - left, bottom - top))
        }
        Shape::Text(text) => text_bounds(text, tx, ty, scope),
        Shape::Path(path) => {
            let r = path.r.unwrap_or(0.0);
            let around = |x: f32, y: f32| {
                let (x, y) = (x + tx, y + ty);
                MarkBounds::new([x - r, x, x + r], [y - r, y, y + r])
            };
            match (path.fake_center, path.center_box) {
                (Some((x, y)), _) => around(x, y),
                (None, Some(cb)) => MarkBounds::new(
                    [cb.x1 + tx, (cb.x1 + cb.x2) / 2.0 + tx, cb.x2 + tx],
                    [cb.y1 + ty, (cb.y1 + cb.y2) / 2.0 + ty, cb.y2 + ty],
                ),
                (None, None) => around(path.x, path.y),
            }
        }
        Shape::Group { items } => items
            .iter()
            .map(|child| mark_bounds(child, scope))
            .reduce(MarkBounds::union)
            .map(|bounds| bounds.translate(tx, ty))
            .unwrap_or_else(|| MarkBounds::point(tx, ty)),
    }
}

fn rect_bounds(left: f32, top: f32, w: f32, h: f32, scope: BoundsScope) -> MarkBounds {
    let xs = [left, left + w / 2.0, left + w];
    let ys = [top, top + h / 2.0, top + h];
    match scope {
        BoundsScope::Annotation => MarkBounds::new(
            [left - w / 2.0, left, left + w / 2.0],
            [top - h / 2.0, top, top + h / 2.0],
        ),
        BoundsScope::Top => MarkBounds::new(xs, [top; 3]),
        BoundsScope::Middle => MarkBounds::point(xs[1], ys[1]),
        // keeps bottom labels clear of the axis line
        BoundsScope::Bottom => MarkBounds::new(xs, [top + h - 6.0; 3]),
        BoundsScope::Right => MarkBounds::new([left + w; 3], ys),
        BoundsScope::Left => MarkBounds::new([left; 3], ys),
        BoundsScope::Default | BoundsScope::Center | BoundsScope::Centroid => {
            MarkBounds::new(xs, ys)
        }
    }
}

pub(crate) fn text_bounds(text: &TextShape, tx: f32, ty: f32, scope: BoundsScope) -> MarkBounds {
    let (w, h) = (text.width, text.height);
    let left = text.x + text.dx_px() + tx - text.anchor_shift();
    let top = text.y + text.dy_px() + ty;
    let xs = [left, left + w / 2.0, left + w];
    let ys = [top, top + h / 2.0, top + h];
    match scope {
        BoundsScope::Centroid => MarkBounds::point(xs[1], ys[1]),
        BoundsScope::Top => MarkBounds::new(xs, [top; 3]),
        BoundsScope::Middle => MarkBounds::new(xs, [ys[1]; 3]),
        BoundsScope::Bottom => MarkBounds::new(xs, [ys[2]; 3]),
        BoundsScope::Center => MarkBounds::new([xs[1]; 3], ys),
        BoundsScope::Right => MarkBounds::new([xs[2]; 3], ys),
        BoundsScope::Left => MarkBounds::new([left; 3], ys),
        // text y is the baseline, so the box extends upwards
        BoundsScope::Default | BoundsScope::Annotation => {
            MarkBounds::new(xs, [top - h, top - h / 2.0, top])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mark::{CenterBox, Length, TextAnchor};

    #[test]
    fn rect_scopes() {
        let rect = MarkItem::rect(10.0, 20.0, 40.0, 60.0);
        assert_eq!(
            rect.bounds(BoundsScope::Default).0,
            [10.0, 30.0, 50.0, 20.0, 50.0, 80.0]
        );
        assert_eq!(
            rect.bounds(BoundsScope::Top).0,
            [10.0, 30.0, 50.0, 20.0, 20.0, 20.0]
        );
        assert_eq!(
            rect.bounds(BoundsScope::Bottom).0,
            [10.0, 30.0, 50.0, 74.0, 74.0, 74.0]
        );
        assert_eq!(
            rect.bounds(BoundsScope::Middle).0,
            [30.0, 30.0, 30.0, 50.0, 50.0, 50.0]
        );
        assert_eq!(
            rect.bounds(BoundsScope::Annotation).0,
            [-10.0, 10.0, 30.0, -10.0, 20.0, 50.0]
        );
        assert_eq!(
            rect.bounds(BoundsScope::Right).0,
            [50.0, 50.0, 50.0, 20.0, 50.0, 80.0]
        );
    }

    #[test]
    fn translate_applies_to_every_shape() {
        let circle = MarkItem::circle(5.0, 5.0, 2.0).translated(10.0, 1.0);
        assert_eq!(circle.bounds(BoundsScope::Default).0, [13.0, 15.0, 17.0, 4.0, 6.0, 8.0]);

        let line = MarkItem::line(8.0, 2.0, 0.0, 6.0).translated(1.0, 1.0);
        assert_eq!(line.bounds(BoundsScope::Default).0, [1.0, 5.0, 9.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn text_box_sits_above_baseline() {
        let mut item = MarkItem::text(100.0, 50.0, 40.0, 10.0);
        if let Shape::Text(text) = &mut item.shape {
            text.text_anchor = Some(TextAnchor::Middle);
            text.dy = Some(Length::String("1em".to_string()));
            text.font_size = Some(4.0);
        }
        assert_eq!(
            item.bounds(BoundsScope::Default).0,
            [80.0, 100.0, 120.0, 44.0, 49.0, 54.0]
        );
        assert_eq!(
            item.bounds(BoundsScope::Centroid).0,
            [100.0, 100.0, 100.0, 59.0, 59.0, 59.0]
        );
    }

    #[test]
    fn path_prefers_fake_center_then_center_box() {
        let mut item = MarkItem::path("M0,0L1,1");
        if let Shape::Path(path) = &mut item.shape {
            path.x = 10.0;
            path.y = 10.0;
            path.r = Some(3.0);
        }
        assert_eq!(item.bounds(BoundsScope::Default).0, [7.0, 10.0, 13.0, 7.0, 10.0, 13.0]);

        if let Shape::Path(path) = &mut item.shape {
            path.center_box = Some(CenterBox {
                x1: 0.0,
                y1: 0.0,
                x2: 20.0,
                y2: 10.0,
            });
        }
        assert_eq!(item.bounds(BoundsScope::Default).0, [0.0, 10.0, 20.0, 0.0, 5.0, 10.0]);

        if let Shape::Path(path) = &mut item.shape {
            path.fake_center = Some((50.0, 60.0));
        }
        assert_eq!(item.bounds(BoundsScope::Default).0, [47.0, 50.0, 53.0, 57.0, 60.0, 63.0]);
    }

    #[test]
    fn group_bounds_cover_children() {
        let group = MarkItem::group(vec![
            MarkItem::rect(0.0, 0.0, 10.0, 10.0),
            MarkItem::rect(30.0, 20.0, 10.0, 10.0),
        ])
        .translated(5.0, 0.0);
        assert_eq!(group.bounds(BoundsScope::Default).0, [5.0, 25.0, 45.0, 0.0, 15.0, 30.0]);
        assert_eq!(
            MarkItem::group(Vec::new()).bounds(BoundsScope::Default),
            MarkBounds::point(0.0, 0.0)
        );
    }

    #[test]
    fn chart_containment() {
        let bounds = MarkBounds::from_rect((-20.0, 10.0, 10.0, 10.0));
        assert!(bounds.outside_chart(100.0, 100.0));
        assert!(!MarkBounds::point(100.0, 100.0).outside_chart(100.0, 100.0));
        assert!(MarkBounds::from_rect((0.0, 0.0, 10.0, 10.0)).contains_box(2.0, 2.0, 10.0, 10.0));
        assert!(!MarkBounds::from_rect((0.0, 0.0, 10.0, 10.0)).contains_box(2.0, 2.0, 11.0, 10.0));
    }

    #[test]
    fn rect_overlap() {
        assert!(find_collision(&(0.0, 0.0, 10.0, 10.0), &(5.0, 5.0, 10.0, 10.0)));
        assert!(find_collision(&(0.0, 0.0, 10.0, 10.0), &(10.0, 0.0, 5.0, 5.0)));
        assert!(!find_collision(&(0.0, 0.0, 10.0, 10.0), &(10.5, 0.0, 5.0, 5.0)));
        assert!(!find_collision(&(0.0, 0.0, 10.0, 10.0), &(0.0, 20.0, 5.0, 5.0)));
    }
}
