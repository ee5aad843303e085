//! Label collision resolution over a pass of marks and labels.
//!
//! Marks are keyed by their datum, rasterized into the bitmaps, and each
//! label is then placed, hidden or retracted depending on the mode.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bitmap::Bitmaps;
use crate::bounds::{BoundsScope, MarkBounds};
use crate::config::{ChartSize, CollisionOptions};
use crate::error::Result;
use crate::label::{Align, AnchorPosition, Baseline, Commit, LabelItem};
use crate::mark::{Length, MarkItem, Shape, TextAnchor, TextShape};
use crate::placer::{Candidate, LabelPlacer};
use crate::raster::Rasterizer;
use crate::text_metrics::FontMetrics;

/// Accessor value used when a datum field is missing or empty.
pub const NOT_FOUND: &str = "Not Found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    #[default]
    Text,
    Rect,
}

fn default_font_size() -> f32 {
    12.0
}

fn default_font_family() -> String {
    "sans-serif".to_string()
}

fn default_opacity() -> f32 {
    1.0
}

/// A label as the rendering layer currently knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSpec {
    #[serde(default)]
    pub kind: LabelKind,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Data position of the label.
    pub x: f32,
    pub y: f32,
    /// Where the label is drawn right now, if it has been drawn before.
    #[serde(default)]
    pub rendered_x: Option<f32>,
    #[serde(default)]
    pub rendered_y: Option<f32>,
    /// Known text width, or the box width of a rect label.
    #[serde(default)]
    pub width: Option<f32>,
    /// Box height of a rect label.
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub text_anchor: Option<TextAnchor>,
    #[serde(default)]
    pub data_text_anchor: Option<TextAnchor>,
    #[serde(default)]
    pub translate_x: f32,
    #[serde(default)]
    pub translate_y: f32,
    #[serde(default)]
    pub dx: Option<Length>,
    #[serde(default)]
    pub dy: Option<Length>,
    #[serde(default)]
    pub datum: Value,
    #[serde(default)]
    pub data_hidden: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Outcome of the previous pass for this label, if any.
    #[serde(default)]
    pub label_hidden: Option<bool>,
    #[serde(default)]
    pub keep_data_y: bool,
    #[serde(default)]
    pub no_text_anchor: bool,
}

impl LabelSpec {
    pub fn text(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            kind: LabelKind::Text,
            text: text.into(),
            font_size: default_font_size(),
            font_family: default_font_family(),
            x,
            y,
            rendered_x: None,
            rendered_y: None,
            width: None,
            height: None,
            text_anchor: None,
            data_text_anchor: None,
            translate_x: 0.0,
            translate_y: 0.0,
            dx: None,
            dy: None,
            datum: Value::Null,
            data_hidden: false,
            opacity: default_opacity(),
            label_hidden: None,
            keep_data_y: false,
            no_text_anchor: false,
        }
    }

    pub fn rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            kind: LabelKind::Rect,
            width: Some(width),
            height: Some(height),
            ..Self::text("", x, y)
        }
    }

    pub fn with_datum(mut self, datum: Value) -> Self {
        self.datum = datum;
        self
    }

    pub fn with_font(mut self, size: f32, family: impl Into<String>) -> Self {
        self.font_size = size;
        self.font_family = family.into();
        self
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_translate(mut self, x: f32, y: f32) -> Self {
        self.translate_x = x;
        self.translate_y = y;
        self
    }

    pub fn text_height(&self) -> f32 {
        match self.kind {
            LabelKind::Rect => self.height.unwrap_or(0.0),
            LabelKind::Text => (self.font_size - 1.0).max(1.0),
        }
    }

    /// The label drawn as a mark at `(x, y)`, used when no mark correlates with it.
    fn as_mark(&self, x: f32, y: f32, text_width: f32) -> MarkItem {
        let shape = match self.kind {
            LabelKind::Rect => Shape::Rect {
                x,
                y,
                width: text_width,
                height: self.text_height(),
            },
            LabelKind::Text => Shape::Text(TextShape {
                x,
                y,
                width: text_width,
                height: self.text_height(),
                font_size: Some(self.font_size),
                text_anchor: self.text_anchor,
                data_text_anchor: self.data_text_anchor,
                dx: self.dx.clone(),
                dy: self.dy.clone(),
            }),
        };
        MarkItem::new(shape).translated(self.translate_x, self.translate_y)
    }
}

/// Output key of a label: its index, or `"{index}-{key}"` when it has a datum key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum LabelKey {
    Index(usize),
    Keyed(String),
}

impl LabelKey {
    fn new(index: usize, key: &str) -> Self {
        if key == NOT_FOUND {
            LabelKey::Index(index)
        } else {
            LabelKey::Keyed(format!("{index}-{key}"))
        }
    }
}

impl fmt::Display for LabelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelKey::Index(index) => write!(f, "{index}"),
            LabelKey::Keyed(key) => f.write_str(key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub translate_x: f32,
    pub translate_y: f32,
    /// Shift from the computed baseline to an SVG alphabetic baseline.
    pub translate_height: f32,
    pub text_anchor: Option<TextAnchor>,
    pub align: Align,
    pub baseline: Baseline,
    pub text_height: f32,
    pub label_moved: bool,
    pub label_hidden: bool,
    /// False in hide-only mode, where the caller keeps its own geometry.
    pub reposition: bool,
}

impl Placement {
    pub fn render_x(&self) -> f32 {
        self.x - self.translate_x
    }

    pub fn render_y(&self) -> f32 {
        self.y - self.translate_y + self.translate_height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum LabelDecision {
    Placed(Placement),
    Hidden(Placement),
    DoNothing,
}

impl LabelDecision {
    pub fn placement(&self) -> Option<&Placement> {
        match self {
            LabelDecision::Placed(p) | LabelDecision::Hidden(p) => Some(p),
            LabelDecision::DoNothing => None,
        }
    }

    pub fn is_placed(&self) -> bool {
        matches!(self, LabelDecision::Placed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelOutcome {
    pub key: LabelKey,
    pub decision: LabelDecision,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionOutcome {
    /// Bitmaps to hand to the next call of the same chart.
    pub bitmaps: Bitmaps,
    /// One entry per input label, in input order.
    pub labels: Vec<LabelOutcome>,
}

/// Unwraps `{data: {data: X}}` and `{data: X}` down to `X`.
pub fn unwrap_datum(datum: &Value) -> &Value {
    let present = |v: &&Value| !v.is_null();
    datum
        .get("data")
        .and_then(|d| d.get("data"))
        .filter(present)
        .or_else(|| datum.get("data").filter(present))
        .unwrap_or(datum)
}

fn js_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map(|f| format!("{f}")).unwrap_or_else(|| n.to_string())
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items.iter().map(js_string).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn accessor_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(js_string(other)),
    }
}

/// Joined accessor values and whether any of them was found.
pub fn correlation_key(datum: &Value, accessors: &[String]) -> (String, bool) {
    let datum = unwrap_datum(datum);
    let mut found = false;
    let key = accessors
        .iter()
        .map(|field| match accessor_value(datum.get(field)) {
            Some(value) => {
                found = true;
                value
            }
            None => NOT_FOUND.to_string(),
        })
        .collect::<Vec<_>>()
        .join("-");
    (key, found)
}

fn collect_mark_bounds(
    groups: &[Vec<MarkItem>],
    accessors: &[String],
    scope: BoundsScope,
) -> HashMap<String, MarkBounds> {
    let mut hash = HashMap::new();
    if accessors.is_empty() {
        return hash;
    }
    for item in groups.iter().flatten() {
        let (key, found) = correlation_key(&item.datum, accessors);
        if found {
            hash.insert(key, item.bounds(scope));
        }
    }
    hash
}

fn build_label_item(
    spec: &LabelSpec,
    correlated: Option<MarkBounds>,
    options: &CollisionOptions,
    scope: BoundsScope,
    metrics: &dyn FontMetrics,
) -> LabelItem {
    let mut text_width = match spec.kind {
        LabelKind::Rect => Some(spec.width.unwrap_or(0.0)),
        LabelKind::Text => spec.width.filter(|w| *w > 0.0),
    };

    let mark_bounds = match correlated.filter(|_| !options.hide_only) {
        Some(bounds) => bounds,
        None => {
            let width = *text_width.get_or_insert_with(|| {
                metrics.measure(&spec.text, spec.font_size, &spec.font_family)
            });
            let (x, y) = match (spec.rendered_x, spec.rendered_y) {
                (Some(x), Some(y)) if options.remove_only && !spec.keep_data_y => (x, y),
                _ => (spec.x, spec.y),
            };
            spec.as_mark(x, y, width).bounds(scope)
        }
    };

    let mut item = LabelItem::new(spec.text.clone(), spec.font_size, mark_bounds)
        .with_font_family(spec.font_family.clone())
        .with_text_height(spec.text_height());
    item.text_width = text_width;
    item
}

fn prepare_bitmaps(
    incoming: Option<Bitmaps>,
    avoid_marks: &[Vec<MarkItem>],
    items: &[LabelItem],
    size: ChartSize,
    options: &CollisionOptions,
) -> Bitmaps {
    if options.remove_only || options.suppress_mark_draw {
        return incoming
            .unwrap_or_else(|| Bitmaps::empty(size.width, size.height, options.padding));
    }

    let rasterizer = Rasterizer::new(size, options.padding, options.label_inside);
    let mut bitmaps = match incoming {
        Some(mut bitmaps) => {
            rasterizer.merge_into(avoid_marks, &mut bitmaps);
            bitmaps
        }
        None => rasterizer.rasterize(avoid_marks),
    };
    if avoid_marks.is_empty() && options.avoid_base_mark {
        for item in items {
            bitmaps
                .solid
                .mark(item.mark_bounds.x_start(), item.mark_bounds.y_start());
        }
    }
    bitmaps
}

fn placement_for(spec: &LabelSpec, item: &LabelItem, hidden: bool, reposition: bool) -> Placement {
    Placement {
        x: item.x,
        y: item.y,
        translate_x: spec.translate_x,
        translate_y: spec.translate_y,
        translate_height: if spec.no_text_anchor {
            0.0
        } else {
            item.baseline.translate_height(item.text_height)
        },
        text_anchor: (!spec.no_text_anchor).then(|| item.align.text_anchor()),
        align: item.align,
        baseline: item.baseline,
        text_height: item.text_height,
        label_moved: true,
        label_hidden: hidden,
        reposition,
    }
}

/// Runs one pass: rasterizes `avoid_marks` into the bitmaps, then places,
/// hides or retracts every label according to `options`.
///
/// Every input label yields exactly one outcome, in input order. The
/// returned bitmaps carry this pass's commits into the next call.
pub fn resolve_label_collision(
    labels: &[LabelSpec],
    avoid_marks: &[Vec<MarkItem>],
    options: &CollisionOptions,
    bitmaps: Option<Bitmaps>,
    metrics: &dyn FontMetrics,
) -> Result<CollisionOutcome> {
    let size = options.chart_size()?;
    let scope = options.bounds_scope.unwrap_or_default();
    tracing::debug!(
        labels = labels.len(),
        mark_groups = avoid_marks.len(),
        hide_only = options.hide_only,
        remove_only = options.remove_only,
        suppress_mark_draw = options.suppress_mark_draw,
        "resolving label collisions"
    );
    if size.width == 0.0 || size.height == 0.0 {
        tracing::warn!(width = size.width, height = size.height, "chart has no area");
    }

    let bounds_by_key = collect_mark_bounds(avoid_marks, &options.accessors, scope);

    let keyed: Vec<(String, bool)> = labels
        .iter()
        .map(|spec| correlation_key(&spec.datum, &options.accessors))
        .collect();
    let mut items: Vec<LabelItem> = labels
        .iter()
        .zip(&keyed)
        .map(|(spec, (key, found))| {
            let correlated = found.then(|| bounds_by_key.get(key).copied()).flatten();
            build_label_item(spec, correlated, options, scope, metrics)
        })
        .collect();

    let mut bitmaps = prepare_bitmaps(bitmaps, avoid_marks, &items, size, options);

    let candidates = if options.hide_only {
        vec![Candidate::new(AnchorPosition::Middle, 1.0)]
    } else {
        options.candidates()
    };
    let mut placer = LabelPlacer::new(&mut bitmaps, size, &candidates, metrics);

    let mut outcomes = Vec::with_capacity(labels.len());
    let rows = labels.iter().zip(&mut items).zip(&keyed).enumerate();
    for (index, ((spec, item), (key, _))) in rows {
        let key = if options.accessors.is_empty() {
            LabelKey::Index(index)
        } else {
            LabelKey::new(index, key)
        };

        let decision = if options.remove_only {
            if spec.label_hidden != Some(true) {
                item.commit = Commit::Prior;
                placer.unplace(item);
            }
            LabelDecision::DoNothing
        } else if spec.data_hidden || spec.opacity == 0.0 {
            LabelDecision::DoNothing
        } else if placer.place(item) {
            LabelDecision::Placed(placement_for(spec, item, false, !options.hide_only))
        } else {
            LabelDecision::Hidden(placement_for(spec, item, true, !options.hide_only))
        };
        tracing::trace!(key = %key, ?decision, "label resolved");
        outcomes.push(LabelOutcome { key, decision });
    }

    Ok(CollisionOutcome {
        bitmaps,
        labels: outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_metrics::HeuristicMetrics;
    use serde_json::json;

    fn options(width: f32, height: f32) -> CollisionOptions {
        CollisionOptions {
            accessors: vec!["id".to_string()],
            padding: 0.0,
            ..CollisionOptions::default()
        }
        .with_size(width, height)
    }

    #[test]
    fn datum_unwrapping() {
        let nested = json!({"data": {"data": {"id": 1}}});
        assert_eq!(unwrap_datum(&nested), &json!({"id": 1}));
        let single = json!({"data": {"id": 2}});
        assert_eq!(unwrap_datum(&single), &json!({"id": 2}));
        let flat = json!({"id": 3});
        assert_eq!(unwrap_datum(&flat), &flat);
    }

    #[test]
    fn keys_format_like_javascript() {
        let accessors = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            correlation_key(&json!({"a": 1.0, "b": "x"}), &accessors),
            ("1-x".to_string(), true)
        );
        assert_eq!(
            correlation_key(&json!({"a": 0, "b": ""}), &accessors),
            ("Not Found-Not Found".to_string(), false)
        );
        assert_eq!(
            correlation_key(&json!({"a": 2.5, "b": true}), &accessors),
            ("2.5-true".to_string(), true)
        );
    }

    #[test]
    fn label_key_uses_index_for_missing_datum() {
        assert_eq!(LabelKey::new(3, NOT_FOUND), LabelKey::Index(3));
        assert_eq!(LabelKey::new(3, "a").to_string(), "3-a");
    }

    #[test]
    fn wrong_chart_size_fails_fast() {
        let options = CollisionOptions::default();
        let metrics = HeuristicMetrics::default();
        let err = resolve_label_collision(&[], &[], &options, None, &metrics)
            .expect_err("size is required");
        assert_eq!(err, crate::error::CollisionError::InvalidChartSize { len: 0 });
    }

    #[test]
    fn label_uses_correlated_mark_bounds() {
        let marks = vec![vec![
            MarkItem::rect(10.0, 10.0, 20.0, 20.0).with_datum(json!({"id": "a"})),
            MarkItem::rect(60.0, 60.0, 20.0, 20.0).with_datum(json!({"id": "b"})),
        ]];
        let labels = vec![LabelSpec::text("B", 0.0, 0.0)
            .with_width(8.0)
            .with_datum(json!({"data": {"id": "b"}}))];
        let options = options(100.0, 100.0)
            .with_candidates(&[AnchorPosition::Top], &[2.0]);
        let metrics = HeuristicMetrics::default();
        let outcome = resolve_label_collision(&labels, &marks, &options, None, &metrics)
            .expect("valid pass");

        let result = &outcome.labels[0];
        assert_eq!(result.key, LabelKey::Keyed("0-b".to_string()));
        let LabelDecision::Placed(placement) = &result.decision else {
            panic!("expected placement, got {:?}", result.decision);
        };
        assert_eq!(placement.x, 70.0);
        assert_eq!(placement.y, 58.0);
        assert_eq!(placement.baseline, Baseline::Bottom);
        assert_eq!(placement.text_anchor, Some(TextAnchor::Middle));
        assert!(!placement.label_hidden);
    }

    #[test]
    fn hidden_and_transparent_labels_do_nothing() {
        let mut hidden = LabelSpec::text("h", 50.0, 50.0);
        hidden.data_hidden = true;
        let mut transparent = LabelSpec::text("t", 50.0, 50.0);
        transparent.opacity = 0.0;
        let metrics = HeuristicMetrics::default();
        let outcome = resolve_label_collision(
            &[hidden, transparent],
            &[],
            &options(100.0, 100.0),
            None,
            &metrics,
        )
        .expect("valid pass");
        assert!(outcome
            .labels
            .iter()
            .all(|l| l.decision == LabelDecision::DoNothing));
        assert_eq!(outcome.labels[1].key, LabelKey::Index(1));
    }

    #[test]
    fn colliding_label_is_hidden_with_last_geometry() {
        let marks = vec![vec![MarkItem::rect(0.0, 0.0, 100.0, 100.0).filled()]];
        let labels = vec![LabelSpec::text("x", 50.0, 50.0).with_width(10.0)];
        let metrics = HeuristicMetrics::default();
        let outcome =
            resolve_label_collision(&labels, &marks, &options(100.0, 100.0), None, &metrics)
                .expect("valid pass");
        let LabelDecision::Hidden(placement) = &outcome.labels[0].decision else {
            panic!("expected hidden label");
        };
        assert!(placement.label_hidden);
        assert!(placement.label_moved);
        assert_eq!(placement.baseline, Baseline::Middle);
    }

    #[test]
    fn remove_only_retracts_previous_pass() {
        let labels = vec![LabelSpec::text("a", 40.0, 40.0)
            .with_width(10.0)
            .with_datum(json!({"id": "a"}))];
        let options = options(100.0, 100.0);
        let metrics = HeuristicMetrics::default();
        let first = resolve_label_collision(&labels, &[], &options, None, &metrics)
            .expect("valid pass");
        assert!(first.labels[0].decision.is_placed());
        assert!(!first.bitmaps.solid.is_empty());

        let removal = CollisionOptions {
            remove_only: true,
            ..options.clone()
        };
        let second =
            resolve_label_collision(&labels, &[], &removal, Some(first.bitmaps), &metrics)
                .expect("valid pass");
        assert_eq!(second.labels[0].decision, LabelDecision::DoNothing);
        assert!(second.bitmaps.solid.is_empty());
    }

    #[test]
    fn remove_only_skips_previously_hidden_labels() {
        let mut label = LabelSpec::text("a", 40.0, 40.0).with_width(10.0);
        label.label_hidden = Some(true);
        let mut bitmaps = Bitmaps::empty(100.0, 100.0, 0.0);
        bitmaps.solid.mark_in_range(30.0, 30.0, 50.0, 50.0);
        let before = bitmaps.clone();
        let removal = CollisionOptions {
            remove_only: true,
            ..options(100.0, 100.0)
        };
        let metrics = HeuristicMetrics::default();
        let outcome = resolve_label_collision(&[label], &[], &removal, Some(bitmaps), &metrics)
            .expect("valid pass");
        assert_eq!(outcome.bitmaps, before);
    }

    #[test]
    fn hide_only_keeps_geometry_and_toggles_visibility() {
        let marks = vec![vec![MarkItem::rect(0.0, 0.0, 30.0, 100.0).filled()]];
        let labels = vec![
            LabelSpec::text("left", 10.0, 50.0).with_width(10.0),
            LabelSpec::text("right", 70.0, 50.0).with_width(10.0),
        ];
        let options = CollisionOptions {
            hide_only: true,
            anchors: vec![AnchorPosition::Top],
            offsets: vec![20.0],
            ..options(100.0, 100.0)
        };
        let metrics = HeuristicMetrics::default();
        let outcome = resolve_label_collision(&labels, &marks, &options, None, &metrics)
            .expect("valid pass");
        let left = &outcome.labels[0].decision;
        let right = &outcome.labels[1].decision;
        assert!(matches!(left, LabelDecision::Hidden(p) if !p.reposition));
        assert!(matches!(right, LabelDecision::Placed(p) if !p.reposition));
    }

    #[test]
    fn hide_only_ignores_configured_anchors() {
        // the label's own box is covered, the spot 20px above it is free
        let marks = vec![vec![MarkItem::rect(45.0, 35.0, 20.0, 20.0).filled()]];
        let labels = vec![LabelSpec::text("fixed", 50.0, 50.0).with_width(10.0)];
        let outside = options(100.0, 100.0).with_candidates(&[AnchorPosition::Top], &[20.0]);
        let metrics = HeuristicMetrics::default();

        let outcome = resolve_label_collision(&labels, &marks, &outside, None, &metrics)
            .expect("valid pass");
        let LabelDecision::Placed(placement) = &outcome.labels[0].decision else {
            panic!("expected placement above the mark");
        };
        assert_eq!((placement.x, placement.y), (55.0, 19.0));
        assert_eq!(placement.baseline, Baseline::Bottom);

        let hide_only = CollisionOptions {
            hide_only: true,
            ..outside
        };
        let outcome = resolve_label_collision(&labels, &marks, &hide_only, None, &metrics)
            .expect("valid pass");
        let LabelDecision::Hidden(placement) = &outcome.labels[0].decision else {
            panic!("expected hidden label, got {:?}", outcome.labels[0].decision);
        };
        assert_eq!((placement.x, placement.y), (55.0, 44.5));
        assert_eq!(placement.baseline, Baseline::Middle);
        assert_eq!(placement.align, Align::Center);
        assert!(!placement.reposition);
    }

    fn removal_grid() -> Bitmaps {
        let mut bitmaps = Bitmaps::empty(100.0, 100.0, 0.0);
        // text boxes of width 10 whose baselines sit at (10, 30) and (60, 80)
        bitmaps.solid.mark_in_range(11.0, 21.0, 19.0, 28.0);
        bitmaps.solid.mark_in_range(61.0, 71.0, 69.0, 78.0);
        bitmaps
    }

    #[test]
    fn remove_only_clears_the_rendered_position() {
        let mut label = LabelSpec::text("moved", 10.0, 30.0).with_width(10.0);
        label.rendered_x = Some(60.0);
        label.rendered_y = Some(80.0);
        let removal = CollisionOptions {
            remove_only: true,
            ..options(100.0, 100.0)
        };
        let metrics = HeuristicMetrics::default();

        let outcome = resolve_label_collision(
            &[label.clone()],
            &[],
            &removal,
            Some(removal_grid()),
            &metrics,
        )
        .expect("valid pass");
        let solid = &outcome.bitmaps.solid;
        assert!(!solid.get_in_range(61.0, 71.0, 69.0, 78.0));
        assert!(solid.get_in_range(11.0, 21.0, 19.0, 28.0));

        label.keep_data_y = true;
        let outcome =
            resolve_label_collision(&[label], &[], &removal, Some(removal_grid()), &metrics)
                .expect("valid pass");
        let solid = &outcome.bitmaps.solid;
        assert!(solid.get_in_range(61.0, 71.0, 69.0, 78.0));
        assert!(!solid.get_in_range(11.0, 21.0, 19.0, 28.0));
    }

    #[test]
    fn rendered_zero_coordinate_counts_as_present() {
        let mut label = LabelSpec::text("edge", 60.0, 80.0).with_width(10.0);
        label.rendered_x = Some(0.0);
        label.rendered_y = Some(30.0);
        let mut bitmaps = removal_grid();
        bitmaps.solid.mark_in_range(1.0, 21.0, 9.0, 28.0);
        let removal = CollisionOptions {
            remove_only: true,
            ..options(100.0, 100.0)
        };
        let outcome = resolve_label_collision(
            &[label],
            &[],
            &removal,
            Some(bitmaps),
            &HeuristicMetrics::default(),
        )
        .expect("valid pass");
        let solid = &outcome.bitmaps.solid;
        assert!(!solid.get_in_range(1.0, 21.0, 9.0, 28.0));
        assert!(solid.get_in_range(61.0, 71.0, 69.0, 78.0));
    }

    #[test]
    fn oversized_chart_is_rejected_before_rasterizing() {
        let marks = vec![vec![MarkItem::rect(0.0, 0.0, 10.0, 10.0).filled()]];
        let options = options(1e20, 1e20);
        let err = resolve_label_collision(&[], &marks, &options, None, &HeuristicMetrics::default())
            .expect_err("too large to rasterize");
        assert!(matches!(
            err,
            crate::error::CollisionError::ChartTooLarge { .. }
        ));
    }

    #[test]
    fn avoid_base_mark_marks_label_corners() {
        let labels = vec![LabelSpec::rect(20.0, 20.0, 10.0, 10.0)];
        let options = CollisionOptions {
            avoid_base_mark: true,
            suppress_mark_draw: false,
            ..options(100.0, 100.0)
        }
        .with_candidates(&[AnchorPosition::Right], &[50.0]);
        let metrics = HeuristicMetrics::default();
        let outcome = resolve_label_collision(&labels, &[], &options, None, &metrics)
            .expect("valid pass");
        assert!(outcome.bitmaps.solid.get(20.0, 20.0));
    }
}
