use crate::bitmap::{Bitmaps, OccupancyGrid};
use crate::collision::{LabelDecision, LabelKind, LabelSpec, Placement};
use crate::config::{ChartSize, RenderConfig};
use crate::label::{Align, Baseline};
use crate::mark::{MarkItem, Shape, TextAnchor};
use crate::scene::{PassReport, ScenePass};
use crate::text_metrics::FontMetrics;
use anyhow::Result;
use std::path::Path;

/// Debug picture of one pass: occupied cells underneath, avoid marks as
/// outlines, then every label at the spot it was given.
pub fn render_svg(
    pass: &ScenePass,
    report: &PassReport,
    bitmaps: &Bitmaps,
    config: &RenderConfig,
    metrics: &dyn FontMetrics,
) -> String {
    let ChartSize { width, height } = report.size;
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));

    if config.show_grid {
        svg.push_str(&grid_svg(&bitmaps.solid, &config.solid_cell_fill, "solid"));
        if let Some(border) = &bitmaps.border {
            svg.push_str(&grid_svg(border, &config.border_cell_fill, "border"));
        }
    }

    svg.push_str(&format!(
        "<g class=\"marks\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\">",
        config.mark_stroke
    ));
    for item in pass.avoid_marks.iter().flatten() {
        svg.push_str(&mark_svg(item, (0.0, 0.0)));
    }
    svg.push_str("</g>");

    for (spec, outcome) in pass.labels.iter().zip(&report.labels) {
        let (placement, color) = match &outcome.decision {
            LabelDecision::Placed(p) => (p, config.label_color.as_str()),
            LabelDecision::Hidden(p) if config.show_hidden => {
                (p, config.hidden_label_color.as_str())
            }
            _ => continue,
        };
        svg.push_str(&label_svg(spec, placement, color, config, metrics));
    }

    svg.push_str("</svg>");
    svg
}

/// One rect per horizontal run of occupied cells.
fn grid_svg(grid: &OccupancyGrid, fill: &str, class: &str) -> String {
    let ratio = grid.pixel_ratio();
    let pad = grid.padding();
    let mut out = format!("<g class=\"{class}\" fill=\"{fill}\" stroke=\"none\">");
    for row in 0..grid.height() as i32 {
        let mut col = 0;
        while col < grid.width() as i32 {
            if !grid.get_scaled(col, row) {
                col += 1;
                continue;
            }
            let start = col;
            while col < grid.width() as i32 && grid.get_scaled(col, row) {
                col += 1;
            }
            out.push_str(&format!(
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{ratio:.2}\"/>",
                start as f32 * ratio - pad,
                row as f32 * ratio - pad,
                (col - start) as f32 * ratio,
            ));
        }
    }
    out.push_str("</g>");
    out
}

fn mark_svg(item: &MarkItem, offset: (f32, f32)) -> String {
    let tx = offset.0 + item.translate_x;
    let ty = offset.1 + item.translate_y;
    match &item.shape {
        Shape::Rect {
            x,
            y,
            width,
            height,
        } => format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{width:.2}\" height=\"{height:.2}\"/>",
            x + tx,
            y + ty
        ),
        Shape::Circle { cx, cy, r } => format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{r:.2}\"/>",
            cx + tx,
            cy + ty
        ),
        Shape::Line { x1, y1, x2, y2 } => format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\"/>",
            x1 + tx,
            y1 + ty,
            x2 + tx,
            y2 + ty
        ),
        Shape::Text(text) => format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" stroke-dasharray=\"2 2\"/>",
            text.x + tx - text.anchor_shift() + text.dx_px(),
            text.y + ty + text.dy_px(),
            text.width,
            text.height
        ),
        Shape::Path(path) => format!(
            "<path transform=\"translate({:.2} {:.2})\" d=\"{}\"/>",
            path.x + tx,
            path.y + ty,
            escape_xml(&path.d)
        ),
        Shape::Group { items } => items
            .iter()
            .map(|child| mark_svg(child, (tx, ty)))
            .collect(),
    }
}

fn label_svg(
    spec: &LabelSpec,
    placement: &Placement,
    color: &str,
    config: &RenderConfig,
    metrics: &dyn FontMetrics,
) -> String {
    let w = spec
        .width
        .unwrap_or_else(|| metrics.measure(&spec.text, spec.font_size, &spec.font_family));
    let h = placement.text_height;
    let left = match placement.align {
        Align::Left => placement.x,
        Align::Center => placement.x - w / 2.0,
        Align::Right => placement.x - w,
    };
    let top = match placement.baseline {
        Baseline::Top => placement.y,
        Baseline::Middle => placement.y - h / 2.0,
        Baseline::Bottom => placement.y - h,
    };
    let opacity = if placement.label_hidden { 0.5 } else { 1.0 };

    let mut out = format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" fill=\"none\" stroke=\"{color}\" stroke-dasharray=\"3 2\" opacity=\"{opacity}\"/>",
        left - placement.translate_x,
        top - placement.translate_y,
    );
    if spec.kind == LabelKind::Text {
        let anchor = placement.text_anchor.unwrap_or(TextAnchor::Start);
        out.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"{}\" font-family=\"{}\" font-size=\"{}\" fill=\"{color}\" opacity=\"{opacity}\">{}</text>",
            placement.render_x(),
            placement.render_y(),
            anchor.as_str(),
            escape_xml(&config.font_family),
            spec.font_size,
            escape_xml(&spec.text)
        ));
    }
    out
}

pub fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
        }
        None => {
            print!("{}", text);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, size: ChartSize, config: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = config.font_family.clone();
    if let Some(default_size) = usvg::Size::from_wh(size.width, size.height) {
        opt.default_size = default_size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
