//! Multi-pass scenes. Each pass resolves one batch of labels against its
//! avoid marks, and hands its bitmaps to the next pass.

use serde::{Deserialize, Serialize};

use crate::bitmap::{Bitmaps, OccupancyGrid};
use crate::collision::{resolve_label_collision, LabelOutcome, LabelSpec};
use crate::config::{ChartSize, CollisionOptions, OptionsOverlay};
use crate::error::Result;
use crate::mark::MarkItem;
use crate::text_metrics::FontMetrics;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePass {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avoid_marks: Vec<Vec<MarkItem>>,
    #[serde(default)]
    pub labels: Vec<LabelSpec>,
    #[serde(default)]
    pub options: OptionsOverlay,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// `[width, height]`; a pass may still override it in its options.
    #[serde(default)]
    pub size: Vec<f32>,
    #[serde(default)]
    pub passes: Vec<ScenePass>,
}

impl Scene {
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = vec![width, height];
        self
    }

    /// Options for pass `index`: base, then scene size, then the pass overlay.
    pub fn pass_options(&self, index: usize, base: &CollisionOptions) -> CollisionOptions {
        let mut options = base.clone();
        if !self.size.is_empty() {
            options.size = self.size.clone();
        }
        if let Some(pass) = self.passes.get(index) {
            pass.options.apply(&mut options);
        }
        options
    }
}

pub fn parse_scene(input: &str) -> anyhow::Result<Scene> {
    match serde_json::from_str(input) {
        Ok(scene) => Ok(scene),
        Err(json_err) => json5::from_str(input)
            .map_err(|err| anyhow::anyhow!("invalid scene: {json_err} (json5: {err})")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridStats {
    pub width: usize,
    pub height: usize,
    pub pixel_ratio: f32,
    pub solid_cells: usize,
    pub border_cells: Option<usize>,
}

impl GridStats {
    pub fn of(bitmaps: &Bitmaps) -> Self {
        let solid: &OccupancyGrid = &bitmaps.solid;
        Self {
            width: solid.width(),
            height: solid.height(),
            pixel_ratio: solid.pixel_ratio(),
            solid_cells: solid.count_marked(),
            border_cells: bitmaps.border.as_ref().map(OccupancyGrid::count_marked),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub name: String,
    pub size: ChartSize,
    pub labels: Vec<LabelOutcome>,
    pub grid: GridStats,
}

impl PassReport {
    pub fn placed(&self) -> usize {
        self.labels.iter().filter(|l| l.decision.is_placed()).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneResult {
    pub passes: Vec<PassReport>,
    /// Bitmaps after the last pass; `None` for a scene without passes.
    pub bitmaps: Option<Bitmaps>,
}

pub fn run_scene(
    scene: &Scene,
    base: &CollisionOptions,
    metrics: &dyn FontMetrics,
) -> Result<SceneResult> {
    let mut bitmaps: Option<Bitmaps> = None;
    let mut passes = Vec::with_capacity(scene.passes.len());

    for (index, pass) in scene.passes.iter().enumerate() {
        let options = scene.pass_options(index, base);
        let size = options.chart_size()?;
        let outcome = resolve_label_collision(
            &pass.labels,
            &pass.avoid_marks,
            &options,
            bitmaps.take(),
            metrics,
        )?;
        let report = PassReport {
            name: pass
                .name
                .clone()
                .unwrap_or_else(|| format!("pass-{}", index + 1)),
            size,
            labels: outcome.labels,
            grid: GridStats::of(&outcome.bitmaps),
        };
        tracing::debug!(
            pass = %report.name,
            placed = report.placed(),
            labels = report.labels.len(),
            solid_cells = report.grid.solid_cells,
            "pass finished"
        );
        passes.push(report);
        bitmaps = Some(outcome.bitmaps);
    }

    Ok(SceneResult { passes, bitmaps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::LabelDecision;
    use crate::text_metrics::HeuristicMetrics;

    const TWO_PASSES: &str = r#"{
        // series labels first, then annotations that must avoid them
        size: [200, 100],
        passes: [
            {
                name: "series",
                avoidMarks: [[
                    { kind: "rect", x: 20, y: 60, width: 40, height: 40, fill: true, datum: { id: "a" } },
                ]],
                labels: [{ text: "A", x: 0, y: 0, width: 8, datum: { id: "a" } }],
                options: { anchors: ["top"], offsets: [4], accessors: ["id"] },
            },
            {
                labels: [{ text: "B", x: 36, y: 56, width: 8 }],
                options: { anchors: ["middle"], offsets: [1], suppressMarkDraw: true },
            },
        ],
    }"#;

    #[test]
    fn parses_json5_scenes() {
        let scene = parse_scene(TWO_PASSES).expect("json5 scene");
        assert_eq!(scene.size, vec![200.0, 100.0]);
        assert_eq!(scene.passes.len(), 2);
        assert_eq!(scene.passes[0].avoid_marks[0].len(), 1);
        assert!(scene.passes[0].avoid_marks[0][0].fill);
        assert_eq!(scene.passes[1].options.suppress_mark_draw, Some(true));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_scene("passes: [").is_err());
    }

    #[test]
    fn later_passes_see_earlier_labels() {
        let scene = parse_scene(TWO_PASSES).expect("json5 scene");
        let base = CollisionOptions {
            padding: 0.0,
            ..CollisionOptions::default()
        };
        let result = run_scene(&scene, &base, &HeuristicMetrics::default()).expect("runs");

        let first = &result.passes[0];
        assert_eq!(first.name, "series");
        assert_eq!(first.placed(), 1);
        let placement = first.labels[0].decision.placement().expect("placed");
        assert_eq!((placement.x, placement.y), (40.0, 56.0));

        // same spot as the first label: blocked by the carried bitmaps
        let second = &result.passes[1];
        assert_eq!(second.name, "pass-2");
        assert!(matches!(second.labels[0].decision, LabelDecision::Hidden(_)));
        assert!(second.grid.solid_cells >= first.grid.solid_cells);
        assert!(result.bitmaps.is_some());
    }

    #[test]
    fn pass_options_layer_in_order() {
        let scene = Scene::default().with_size(300.0, 150.0);
        let base = CollisionOptions::default().with_size(10.0, 10.0);
        assert_eq!(scene.pass_options(0, &base).size, vec![300.0, 150.0]);

        let scene = Scene {
            passes: vec![ScenePass {
                options: OptionsOverlay {
                    size: Some(vec![50.0, 50.0]),
                    ..OptionsOverlay::default()
                },
                ..ScenePass::default()
            }],
            ..scene
        };
        assert_eq!(scene.pass_options(0, &base).size, vec![50.0, 50.0]);
    }

    #[test]
    fn missing_size_is_an_error() {
        let scene = Scene {
            passes: vec![ScenePass::default()],
            ..Scene::default()
        };
        assert!(run_scene(&scene, &CollisionOptions::default(), &HeuristicMetrics::default())
            .is_err());
    }
}
