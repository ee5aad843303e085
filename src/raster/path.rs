//! SVG path data parsing and flattening into polylines.

use once_cell::sync::Lazy;
use regex::Regex;

use super::arc::{arc_segments, segment_bezier, ArcTo};

static COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[MLHVCSQTAZmlhvcsqtaz]").expect("valid path regex"));
// also splits runs such as `1.5.5` and `10-5` into separate numbers
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid path regex"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    Horizontal { x: f32 },
    Vertical { y: f32 },
    Cubic { x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32 },
    SmoothCubic { x2: f32, y2: f32, x: f32, y: f32 },
    Quad { x1: f32, y1: f32, x: f32, y: f32 },
    SmoothQuad { x: f32, y: f32 },
    Arc {
        rx: f32,
        ry: f32,
        rotation: f32,
        large_arc: bool,
        sweep: bool,
        x: f32,
        y: f32,
    },
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathCommand {
    pub segment: PathSegment,
    pub relative: bool,
}

fn arity(op: char) -> usize {
    match op.to_ascii_lowercase() {
        'm' | 'l' | 't' => 2,
        'h' | 'v' => 1,
        'c' => 6,
        's' | 'q' => 4,
        'a' => 7,
        _ => 0,
    }
}

fn build_segment(op: char, p: &[f32]) -> PathSegment {
    match op.to_ascii_lowercase() {
        'm' => PathSegment::MoveTo { x: p[0], y: p[1] },
        'l' => PathSegment::LineTo { x: p[0], y: p[1] },
        'h' => PathSegment::Horizontal { x: p[0] },
        'v' => PathSegment::Vertical { y: p[0] },
        'c' => PathSegment::Cubic {
            x1: p[0],
            y1: p[1],
            x2: p[2],
            y2: p[3],
            x: p[4],
            y: p[5],
        },
        's' => PathSegment::SmoothCubic {
            x2: p[0],
            y2: p[1],
            x: p[2],
            y: p[3],
        },
        'q' => PathSegment::Quad {
            x1: p[0],
            y1: p[1],
            x: p[2],
            y: p[3],
        },
        't' => PathSegment::SmoothQuad { x: p[0], y: p[1] },
        'a' => PathSegment::Arc {
            rx: p[0],
            ry: p[1],
            rotation: p[2],
            large_arc: p[3] != 0.0,
            sweep: p[4] != 0.0,
            x: p[5],
            y: p[6],
        },
        _ => PathSegment::Close,
    }
}

/// Parses path data into commands. Extra parameters repeat the command, and
/// extra pairs after a move become line-tos. Incomplete trailing parameter
/// groups are dropped.
pub fn parse_path(data: &str) -> Vec<PathCommand> {
    let mut commands = Vec::new();
    let starts: Vec<(usize, char)> = COMMAND_RE
        .find_iter(data)
        .filter_map(|m| m.as_str().chars().next().map(|op| (m.start(), op)))
        .collect();

    for (idx, &(start, op)) in starts.iter().enumerate() {
        let end = starts.get(idx + 1).map(|(next, _)| *next).unwrap_or(data.len());
        let params: Vec<f32> = NUMBER_RE
            .find_iter(&data[start + 1..end])
            .filter_map(|m| m.as_str().parse::<f32>().ok())
            .collect();
        let relative = op.is_ascii_lowercase();
        let len = arity(op);

        if len == 0 {
            commands.push(PathCommand {
                segment: PathSegment::Close,
                relative,
            });
            continue;
        }

        let mut current = op;
        for chunk in params.chunks_exact(len) {
            commands.push(PathCommand {
                segment: build_segment(current, chunk),
                relative,
            });
            current = match current {
                'M' => 'L',
                'm' => 'l',
                other => other,
            };
        }
    }
    commands
}

/// A flattened subpath in chart coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Subpath {
    pub points: Vec<(f32, f32)>,
    pub closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Reflect {
    None,
    Cubic(f32, f32),
    Quad(f32, f32),
}

struct Flattener {
    origin: (f32, f32),
    scale: f32,
    subpaths: Vec<Subpath>,
    current: Subpath,
    cursor: (f32, f32),
    start: (f32, f32),
}

impl Flattener {
    fn to_chart(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (x * self.scale + self.origin.0, y * self.scale + self.origin.1)
    }

    fn finish_subpath(&mut self, closed: bool) {
        let mut done = std::mem::take(&mut self.current);
        done.closed = closed;
        if done.points.len() > 1 || (done.points.len() == 1 && closed) {
            self.subpaths.push(done);
        }
    }

    fn move_to(&mut self, p: (f32, f32)) {
        self.finish_subpath(false);
        self.cursor = p;
        self.start = p;
        let chart = self.to_chart(p);
        self.current.points.push(chart);
    }

    fn line_to(&mut self, p: (f32, f32)) {
        if self.current.points.is_empty() {
            let from = self.to_chart(self.cursor);
            self.current.points.push(from);
        }
        self.cursor = p;
        let chart = self.to_chart(p);
        self.current.points.push(chart);
    }

    fn cubic_to(&mut self, c1: (f32, f32), c2: (f32, f32), p: (f32, f32)) {
        let p0 = self.cursor;
        let steps = curve_steps(self.scale, &[p0, c1, c2, p]);
        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            let mt = 1.0 - t;
            let a = mt * mt * mt;
            let b = 3.0 * mt * mt * t;
            let c = 3.0 * mt * t * t;
            let d = t * t * t;
            self.line_to((
                a * p0.0 + b * c1.0 + c * c2.0 + d * p.0,
                a * p0.1 + b * c1.1 + c * c2.1 + d * p.1,
            ));
        }
    }

    fn quad_to(&mut self, c: (f32, f32), p: (f32, f32)) {
        let p0 = self.cursor;
        let steps = curve_steps(self.scale, &[p0, c, p]);
        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            let mt = 1.0 - t;
            self.line_to((
                mt * mt * p0.0 + 2.0 * mt * t * c.0 + t * t * p.0,
                mt * mt * p0.1 + 2.0 * mt * t * c.1 + t * t * p.1,
            ));
        }
    }

    fn close(&mut self) {
        self.cursor = self.start;
        self.finish_subpath(true);
    }
}

/// Enough steps to keep flattened chords around two pixels long.
fn curve_steps(scale: f32, points: &[(f32, f32)]) -> usize {
    let length: f32 = points
        .windows(2)
        .map(|w| ((w[1].0 - w[0].0).powi(2) + (w[1].1 - w[0].1).powi(2)).sqrt())
        .sum();
    ((length * scale.abs() / 2.0).ceil() as usize).clamp(4, 64)
}

/// Flattens commands into polylines; path units are scaled by `scale` and
/// shifted to `origin`.
pub fn flatten(commands: &[PathCommand], origin: (f32, f32), scale: f32) -> Vec<Subpath> {
    let mut f = Flattener {
        origin,
        scale,
        subpaths: Vec::new(),
        current: Subpath::default(),
        cursor: (0.0, 0.0),
        start: (0.0, 0.0),
    };
    let mut reflect = Reflect::None;

    for command in commands {
        let (cx, cy) = f.cursor;
        let abs = |x: f32, y: f32| {
            if command.relative {
                (cx + x, cy + y)
            } else {
                (x, y)
            }
        };
        let mut next_reflect = Reflect::None;
        match command.segment {
            PathSegment::MoveTo { x, y } => f.move_to(abs(x, y)),
            PathSegment::LineTo { x, y } => f.line_to(abs(x, y)),
            PathSegment::Horizontal { x } => {
                let x = if command.relative { cx + x } else { x };
                f.line_to((x, cy));
            }
            PathSegment::Vertical { y } => {
                let y = if command.relative { cy + y } else { y };
                f.line_to((cx, y));
            }
            PathSegment::Cubic {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                let c2 = abs(x2, y2);
                f.cubic_to(abs(x1, y1), c2, abs(x, y));
                next_reflect = Reflect::Cubic(c2.0, c2.1);
            }
            PathSegment::SmoothCubic { x2, y2, x, y } => {
                let c1 = match reflect {
                    Reflect::Cubic(px, py) => (2.0 * cx - px, 2.0 * cy - py),
                    _ => (cx, cy),
                };
                let c2 = abs(x2, y2);
                f.cubic_to(c1, c2, abs(x, y));
                next_reflect = Reflect::Cubic(c2.0, c2.1);
            }
            PathSegment::Quad { x1, y1, x, y } => {
                let c = abs(x1, y1);
                f.quad_to(c, abs(x, y));
                next_reflect = Reflect::Quad(c.0, c.1);
            }
            PathSegment::SmoothQuad { x, y } => {
                let c = match reflect {
                    Reflect::Quad(px, py) => (2.0 * cx - px, 2.0 * cy - py),
                    _ => (cx, cy),
                };
                f.quad_to(c, abs(x, y));
                next_reflect = Reflect::Quad(c.0, c.1);
            }
            PathSegment::Arc {
                rx,
                ry,
                rotation,
                large_arc,
                sweep,
                x,
                y,
            } => {
                let (x, y) = abs(x, y);
                let arc = ArcTo {
                    rx,
                    ry,
                    rotation,
                    large_arc,
                    sweep,
                    x,
                    y,
                };
                let segments = arc_segments(cx, cy, &arc);
                if segments.is_empty() {
                    f.line_to((x, y));
                }
                for segment in &segments {
                    let [c1, c2, end] = segment_bezier(segment);
                    f.cubic_to(c1, c2, end);
                }
                // land exactly on the end point
                f.cursor = (x, y);
            }
            PathSegment::Close => f.close(),
        }
        reflect = next_reflect;
    }
    f.finish_subpath(false);
    f.subpaths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_line_to_after_move() {
        let commands = parse_path("M0,0 10,0 10,10z");
        assert_eq!(commands.len(), 4);
        assert_eq!(commands[0].segment, PathSegment::MoveTo { x: 0.0, y: 0.0 });
        assert_eq!(commands[1].segment, PathSegment::LineTo { x: 10.0, y: 0.0 });
        assert_eq!(commands[2].segment, PathSegment::LineTo { x: 10.0, y: 10.0 });
        assert_eq!(commands[3].segment, PathSegment::Close);
        assert!(!commands[1].relative);
    }

    #[test]
    fn compact_number_runs_split() {
        let commands = parse_path("m1.5.5l10-5h-2.5e1");
        assert_eq!(commands[0].segment, PathSegment::MoveTo { x: 1.5, y: 0.5 });
        assert_eq!(commands[1].segment, PathSegment::LineTo { x: 10.0, y: -5.0 });
        assert_eq!(commands[2].segment, PathSegment::Horizontal { x: -25.0 });
        assert!(commands.iter().all(|c| c.relative));
    }

    #[test]
    fn incomplete_parameter_groups_are_dropped() {
        let commands = parse_path("M0 0 L5");
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn flatten_applies_origin_scale_and_relative_moves() {
        let subpaths = flatten(&parse_path("M0,0h2v2h-2z"), (10.0, 20.0), 5.0);
        assert_eq!(subpaths.len(), 1);
        assert!(subpaths[0].closed);
        assert_eq!(
            subpaths[0].points,
            vec![(10.0, 20.0), (20.0, 20.0), (20.0, 30.0), (10.0, 30.0)]
        );
    }

    #[test]
    fn curves_end_on_their_end_points() {
        let subpaths = flatten(&parse_path("M0,0C0,10 10,10 10,0S20,-10 20,0Q25,5 30,0T40,0"), (0.0, 0.0), 1.0);
        let last = *subpaths[0].points.last().expect("points");
        assert!((last.0 - 40.0).abs() < 1e-4 && last.1.abs() < 1e-4, "got {last:?}");
    }

    #[test]
    fn arc_reaches_target() {
        let subpaths = flatten(&parse_path("M0,0A10,10 0 0 1 20,0"), (0.0, 0.0), 1.0);
        let last = *subpaths[0].points.last().expect("points");
        assert!((last.0 - 20.0).abs() < 1e-3 && last.1.abs() < 1e-3, "got {last:?}");
    }
}
