//! Elliptical arc to cubic bezier conversion.

use std::f32::consts::{FRAC_PI_2, TAU};

/// One piece of an arc, at most a quarter turn, in the ellipse's unit space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ArcSegment {
    cx: f32,
    cy: f32,
    th0: f32,
    th1: f32,
    rx: f32,
    ry: f32,
    sin_th: f32,
    cos_th: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ArcTo {
    pub rx: f32,
    pub ry: f32,
    /// x-axis rotation in degrees.
    pub rotation: f32,
    pub large_arc: bool,
    pub sweep: bool,
    pub x: f32,
    pub y: f32,
}

/// Splits the arc from `(ox, oy)` into segments of at most a quarter turn.
/// Radii too small to reach the end point are scaled up.
pub(crate) fn arc_segments(ox: f32, oy: f32, arc: &ArcTo) -> Vec<ArcSegment> {
    let (x, y) = (arc.x, arc.y);
    let th = arc.rotation.to_radians();
    let (sin_th, cos_th) = th.sin_cos();
    let mut rx = arc.rx.abs();
    let mut ry = arc.ry.abs();
    if rx == 0.0 || ry == 0.0 || (ox == x && oy == y) {
        return Vec::new();
    }

    let px = cos_th * (ox - x) * 0.5 + sin_th * (oy - y) * 0.5;
    let py = cos_th * (oy - y) * 0.5 - sin_th * (ox - x) * 0.5;
    let pl = (px * px) / (rx * rx) + (py * py) / (ry * ry);
    if pl > 1.0 {
        let scale = pl.sqrt();
        rx *= scale;
        ry *= scale;
    }

    let a00 = cos_th / rx;
    let a01 = sin_th / rx;
    let a10 = -sin_th / ry;
    let a11 = cos_th / ry;
    let x0 = a00 * ox + a01 * oy;
    let y0 = a10 * ox + a11 * oy;
    let x1 = a00 * x + a01 * y;
    let y1 = a10 * x + a11 * y;

    let d = (x1 - x0) * (x1 - x0) + (y1 - y0) * (y1 - y0);
    let mut sfactor = (1.0 / d - 0.25).max(0.0).sqrt();
    if arc.sweep == arc.large_arc {
        sfactor = -sfactor;
    }
    let xc = 0.5 * (x0 + x1) - sfactor * (y1 - y0);
    let yc = 0.5 * (y0 + y1) + sfactor * (x1 - x0);

    let th0 = (y0 - yc).atan2(x0 - xc);
    let th1 = (y1 - yc).atan2(x1 - xc);

    let mut th_arc = th1 - th0;
    if th_arc < 0.0 && arc.sweep {
        th_arc += TAU;
    } else if th_arc > 0.0 && !arc.sweep {
        th_arc -= TAU;
    }

    let segs = (th_arc / (FRAC_PI_2 + 0.001)).abs().ceil() as usize;
    (0..segs)
        .map(|i| ArcSegment {
            cx: xc,
            cy: yc,
            th0: th0 + i as f32 * th_arc / segs as f32,
            th1: th0 + (i + 1) as f32 * th_arc / segs as f32,
            rx,
            ry,
            sin_th,
            cos_th,
        })
        .collect()
}

/// Control points and end point of the cubic approximating `seg`.
pub(crate) fn segment_bezier(seg: &ArcSegment) -> [(f32, f32); 3] {
    let a00 = seg.cos_th * seg.rx;
    let a01 = -seg.sin_th * seg.ry;
    let a10 = seg.sin_th * seg.rx;
    let a11 = seg.cos_th * seg.ry;

    let (sin_th0, cos_th0) = seg.th0.sin_cos();
    let (sin_th1, cos_th1) = seg.th1.sin_cos();

    let th_half = 0.5 * (seg.th1 - seg.th0);
    let sin_half = (th_half * 0.5).sin();
    let t = (8.0 / 3.0) * sin_half * sin_half / th_half.sin();
    let x1 = seg.cx + cos_th0 - t * sin_th0;
    let y1 = seg.cy + sin_th0 + t * cos_th0;
    let x3 = seg.cx + cos_th1;
    let y3 = seg.cy + sin_th1;
    let x2 = x3 + t * sin_th1;
    let y2 = y3 - t * cos_th1;

    let map = |x: f32, y: f32| (a00 * x + a01 * y, a10 * x + a11 * y);
    [map(x1, y1), map(x2, y2), map(x3, y3)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-3 && (a.1 - b.1).abs() < 1e-3
    }

    #[test]
    fn half_circle_splits_into_two_quarters() {
        let arc = ArcTo {
            rx: 10.0,
            ry: 10.0,
            rotation: 0.0,
            large_arc: false,
            sweep: true,
            x: 20.0,
            y: 0.0,
        };
        let segments = arc_segments(0.0, 0.0, &arc);
        assert_eq!(segments.len(), 2);
        let mid = segment_bezier(&segments[0])[2];
        let end = segment_bezier(&segments[1])[2];
        assert!(close(end, (20.0, 0.0)), "arc should end at target, got {end:?}");
        assert!((mid.0 - 10.0).abs() < 1e-3, "midpoint x {mid:?}");
        assert!((mid.1.abs() - 10.0).abs() < 1e-3, "midpoint y {mid:?}");
    }

    #[test]
    fn degenerate_arcs_produce_nothing() {
        let mut arc = ArcTo {
            rx: 0.0,
            ry: 5.0,
            rotation: 0.0,
            large_arc: false,
            sweep: false,
            x: 10.0,
            y: 0.0,
        };
        assert!(arc_segments(0.0, 0.0, &arc).is_empty());
        arc.rx = 5.0;
        assert!(arc_segments(10.0, 0.0, &arc).is_empty());
    }

    #[test]
    fn small_radii_are_scaled_to_reach_the_end() {
        let arc = ArcTo {
            rx: 1.0,
            ry: 1.0,
            rotation: 0.0,
            large_arc: false,
            sweep: true,
            x: 10.0,
            y: 0.0,
        };
        let segments = arc_segments(0.0, 0.0, &arc);
        let end = segment_bezier(segments.last().expect("segments"))[2];
        assert!(close(end, (10.0, 0.0)), "got {end:?}");
    }
}
