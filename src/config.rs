use crate::bounds::BoundsScope;
use crate::error::{CollisionError, Result};
use crate::label::AnchorPosition;
use crate::placer::Candidate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest chart area, in real pixels, the rasterizer will allocate for.
pub const MAX_CHART_PIXELS: u64 = 1 << 26;

/// Real chart dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartSize {
    pub width: f32,
    pub height: f32,
}

impl ChartSize {
    pub fn new(width: f32, height: f32) -> Result<Self> {
        if !width.is_finite() || !height.is_finite() || width < 0.0 || height < 0.0 {
            return Err(CollisionError::NonFiniteChartSize { width, height });
        }
        let (w, h) = (width.ceil() as u64, height.ceil() as u64);
        if w.max(h) > MAX_CHART_PIXELS
            || w.checked_mul(h).is_none_or(|pixels| pixels > MAX_CHART_PIXELS)
        {
            return Err(CollisionError::ChartTooLarge {
                width,
                height,
                max: MAX_CHART_PIXELS,
            });
        }
        Ok(Self { width, height })
    }

    /// Accepts exactly `[width, height]`.
    pub fn from_slice(size: &[f32]) -> Result<Self> {
        match size {
            [width, height] => Self::new(*width, *height),
            _ => Err(CollisionError::InvalidChartSize { len: size.len() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollisionOptions {
    /// Permitted anchors, highest priority first.
    pub anchors: Vec<AnchorPosition>,
    /// Pixel offset per anchor; negative values ask for inside placement.
    pub offsets: Vec<f32>,
    /// Datum fields joined into the key correlating labels with marks.
    pub accessors: Vec<String>,
    pub size: Vec<f32>,
    pub bounds_scope: Option<BoundsScope>,
    pub hide_only: bool,
    pub remove_only: bool,
    pub suppress_mark_draw: bool,
    pub avoid_base_mark: bool,
    pub label_inside: bool,
    pub padding: f32,
}

impl Default for CollisionOptions {
    fn default() -> Self {
        Self {
            anchors: vec![AnchorPosition::Middle],
            offsets: vec![1.0],
            accessors: Vec::new(),
            size: Vec::new(),
            bounds_scope: None,
            hide_only: false,
            remove_only: false,
            suppress_mark_draw: false,
            avoid_base_mark: false,
            label_inside: false,
            padding: 1.0,
        }
    }
}

impl CollisionOptions {
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = vec![width, height];
        self
    }

    pub fn with_candidates(mut self, anchors: &[AnchorPosition], offsets: &[f32]) -> Self {
        self.anchors = anchors.to_vec();
        self.offsets = offsets.to_vec();
        self
    }

    pub fn chart_size(&self) -> Result<ChartSize> {
        ChartSize::from_slice(&self.size)
    }

    /// Anchors paired with their offsets in priority order.
    pub fn candidates(&self) -> Vec<Candidate> {
        if self.anchors.len() != self.offsets.len() {
            tracing::warn!(
                anchors = self.anchors.len(),
                offsets = self.offsets.len(),
                "anchor and offset lists differ in length, extra entries are ignored"
            );
        }
        self.anchors
            .iter()
            .zip(&self.offsets)
            .map(|(anchor, offset)| Candidate::new(*anchor, *offset))
            .collect()
    }
}

/// Partial [`CollisionOptions`]; every present field replaces the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsOverlay {
    pub anchors: Option<Vec<AnchorPosition>>,
    pub offsets: Option<Vec<f32>>,
    pub accessors: Option<Vec<String>>,
    pub size: Option<Vec<f32>>,
    pub bounds_scope: Option<BoundsScope>,
    pub hide_only: Option<bool>,
    pub remove_only: Option<bool>,
    pub suppress_mark_draw: Option<bool>,
    pub avoid_base_mark: Option<bool>,
    pub label_inside: Option<bool>,
    pub padding: Option<f32>,
}

impl OptionsOverlay {
    pub fn apply(&self, options: &mut CollisionOptions) {
        if let Some(v) = &self.anchors {
            options.anchors = v.clone();
        }
        if let Some(v) = &self.offsets {
            options.offsets = v.clone();
        }
        if let Some(v) = &self.accessors {
            options.accessors = v.clone();
        }
        if let Some(v) = &self.size {
            options.size = v.clone();
        }
        if let Some(v) = self.bounds_scope {
            options.bounds_scope = Some(v);
        }
        if let Some(v) = self.hide_only {
            options.hide_only = v;
        }
        if let Some(v) = self.remove_only {
            options.remove_only = v;
        }
        if let Some(v) = self.suppress_mark_draw {
            options.suppress_mark_draw = v;
        }
        if let Some(v) = self.avoid_base_mark {
            options.avoid_base_mark = v;
        }
        if let Some(v) = self.label_inside {
            options.label_inside = v;
        }
        if let Some(v) = self.padding {
            options.padding = v;
        }
    }

    pub fn merged(&self, base: &CollisionOptions) -> CollisionOptions {
        let mut options = base.clone();
        self.apply(&mut options);
        options
    }
}

/// Colors and sizes for the debug rendering of a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub background: String,
    pub solid_cell_fill: String,
    pub border_cell_fill: String,
    pub mark_stroke: String,
    pub label_color: String,
    pub hidden_label_color: String,
    pub font_family: String,
    pub show_grid: bool,
    pub show_hidden: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            solid_cell_fill: "#F4C7C3".to_string(),
            border_cell_fill: "#C3D9F4".to_string(),
            mark_stroke: "#5A5A5A".to_string(),
            label_color: "#222222".to_string(),
            hidden_label_color: "#B0B0B0".to_string(),
            font_family: "sans-serif".to_string(),
            show_grid: true,
            show_hidden: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub options: CollisionOptions,
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    background: Option<String>,
    solid_cell_fill: Option<String>,
    border_cell_fill: Option<String>,
    mark_stroke: Option<String>,
    label_color: Option<String>,
    hidden_label_color: Option<String>,
    font_family: Option<String>,
    show_grid: Option<bool>,
    show_hidden: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    options: Option<OptionsOverlay>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed = parse_config_file(&contents)?;

    if let Some(options) = parsed.options {
        options.apply(&mut config.options);
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.background {
            config.render.background = v;
        }
        if let Some(v) = render.solid_cell_fill {
            config.render.solid_cell_fill = v;
        }
        if let Some(v) = render.border_cell_fill {
            config.render.border_cell_fill = v;
        }
        if let Some(v) = render.mark_stroke {
            config.render.mark_stroke = v;
        }
        if let Some(v) = render.label_color {
            config.render.label_color = v;
        }
        if let Some(v) = render.hidden_label_color {
            config.render.hidden_label_color = v;
        }
        if let Some(v) = render.font_family {
            config.render.font_family = v;
        }
        if let Some(v) = render.show_grid {
            config.render.show_grid = v;
        }
        if let Some(v) = render.show_hidden {
            config.render.show_hidden = v;
        }
    }

    Ok(config)
}

fn parse_config_file(contents: &str) -> anyhow::Result<ConfigFile> {
    match serde_json::from_str(contents) {
        Ok(parsed) => Ok(parsed),
        Err(json_err) => json5::from_str(contents)
            .map_err(|_| anyhow::anyhow!("invalid config file: {json_err}")),
    }
}
