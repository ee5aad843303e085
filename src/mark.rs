use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bounds::{BoundsScope, MarkBounds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

impl TextAnchor {
    /// Distance from the anchor point back to the left edge of a run of `width`.
    pub fn shift(self, width: f32) -> f32 {
        match self {
            TextAnchor::Start => 0.0,
            TextAnchor::Middle => width / 2.0,
            TextAnchor::End => width,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// A length given either as a plain number or as a string such as `"4"` or `"0.3em"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Length {
    Number(f32),
    String(String),
}

impl Length {
    /// Resolves to pixels; `em` values scale by `font_size`, anything unparsable is 0.
    pub fn to_px(&self, font_size: f32) -> f32 {
        match self {
            Length::Number(val) if val.is_finite() => *val,
            Length::Number(_) => 0.0,
            Length::String(raw) => {
                let trimmed = raw.trim();
                if let Ok(val) = trimmed.parse::<f32>() {
                    return if val.is_finite() { val } else { 0.0 };
                }
                if trimmed.contains("em") {
                    let ems = trimmed.replace("em", "");
                    return ems.trim().parse::<f32>().map(|v| v * font_size).unwrap_or(0.0);
                }
                0.0
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextShape {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub text_anchor: Option<TextAnchor>,
    /// Anchor the text was laid out with, takes priority over `text_anchor`.
    #[serde(default)]
    pub data_text_anchor: Option<TextAnchor>,
    #[serde(default)]
    pub dx: Option<Length>,
    #[serde(default)]
    pub dy: Option<Length>,
}

impl TextShape {
    pub fn anchor_shift(&self) -> f32 {
        self.data_text_anchor
            .or(self.text_anchor)
            .unwrap_or_default()
            .shift(self.width)
    }

    fn em_size(&self) -> f32 {
        match self.font_size {
            Some(size) if size > 0.0 => size,
            _ => self.height,
        }
    }

    pub fn dx_px(&self) -> f32 {
        self.dx.as_ref().map(|len| len.to_px(self.em_size())).unwrap_or(0.0)
    }

    pub fn dy_px(&self) -> f32 {
        self.dy.as_ref().map(|len| len.to_px(self.em_size())).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathShape {
    pub d: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    /// Symbol radius; also the scale the path is drawn at.
    #[serde(default)]
    pub r: Option<f32>,
    /// Stand-in centre point used for bounds only.
    #[serde(default)]
    pub fake_center: Option<(f32, f32)>,
    #[serde(default)]
    pub center_box: Option<CenterBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Text(TextShape),
    Path(PathShape),
    Group {
        items: Vec<MarkItem>,
    },
}

fn default_true() -> bool {
    true
}

fn default_stroke_width() -> f32 {
    1.0
}

/// A rendered shape the label pass has to know about, either to avoid it or
/// to anchor a label to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkItem {
    #[serde(flatten)]
    pub shape: Shape,
    #[serde(default)]
    pub translate_x: f32,
    #[serde(default)]
    pub translate_y: f32,
    #[serde(default)]
    pub fill: bool,
    #[serde(default = "default_true")]
    pub stroke: bool,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f32,
    #[serde(default)]
    pub datum: Value,
}

impl MarkItem {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            translate_x: 0.0,
            translate_y: 0.0,
            fill: false,
            stroke: true,
            stroke_width: default_stroke_width(),
            datum: Value::Null,
        }
    }

    pub fn rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(Shape::Rect {
            x,
            y,
            width,
            height,
        })
    }

    pub fn circle(cx: f32, cy: f32, r: f32) -> Self {
        Self::new(Shape::Circle { cx, cy, r })
    }

    pub fn line(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(Shape::Line { x1, y1, x2, y2 })
    }

    pub fn text(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(Shape::Text(TextShape {
            x,
            y,
            width,
            height,
            font_size: None,
            text_anchor: None,
            data_text_anchor: None,
            dx: None,
            dy: None,
        }))
    }

    pub fn path(d: impl Into<String>) -> Self {
        Self::new(Shape::Path(PathShape {
            d: d.into(),
            x: 0.0,
            y: 0.0,
            r: None,
            fake_center: None,
            center_box: None,
        }))
    }

    pub fn group(items: Vec<MarkItem>) -> Self {
        Self::new(Shape::Group { items })
    }

    pub fn filled(mut self) -> Self {
        self.fill = true;
        self
    }

    pub fn translated(mut self, x: f32, y: f32) -> Self {
        self.translate_x = x;
        self.translate_y = y;
        self
    }

    pub fn with_datum(mut self, datum: Value) -> Self {
        self.datum = datum;
        self
    }

    pub fn kind_name(&self) -> &'static str {
        match self.shape {
            Shape::Rect { .. } => "rect",
            Shape::Circle { .. } => "circle",
            Shape::Line { .. } => "line",
            Shape::Text(_) => "text",
            Shape::Path(_) => "path",
            Shape::Group { .. } => "group",
        }
    }

    pub fn bounds(&self, scope: BoundsScope) -> MarkBounds {
        crate::bounds::mark_bounds(self, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn em_lengths_scale_by_font_size() {
        assert_eq!(Length::Number(3.0).to_px(10.0), 3.0);
        assert_eq!(Length::String("4".to_string()).to_px(10.0), 4.0);
        assert_eq!(Length::String("0.5em".to_string()).to_px(12.0), 6.0);
        assert_eq!(Length::String("5px".to_string()).to_px(12.0), 0.0);
    }

    #[test]
    fn data_text_anchor_wins() {
        let mut item = MarkItem::text(0.0, 0.0, 40.0, 10.0);
        let Shape::Text(text) = &mut item.shape else {
            unreachable!();
        };
        text.text_anchor = Some(TextAnchor::End);
        assert_eq!(text.anchor_shift(), 40.0);
        text.data_text_anchor = Some(TextAnchor::Middle);
        assert_eq!(text.anchor_shift(), 20.0);
    }

    #[test]
    fn deserializes_tagged_marks() {
        let item: MarkItem = serde_json::from_str(
            r#"{"kind":"rect","x":1,"y":2,"width":3,"height":4,"fill":true,"datum":{"id":"a"}}"#,
        )
        .expect("rect mark");
        assert!(item.fill);
        assert!(item.stroke);
        assert_eq!(item.kind_name(), "rect");
        assert_eq!(item.datum["id"], "a");

        let group: MarkItem = serde_json::from_str(
            r#"{"kind":"group","translateX":5,"items":[{"kind":"circle","cx":1,"cy":1,"r":1}]}"#,
        )
        .expect("group mark");
        assert_eq!(group.translate_x, 5.0);
        assert!(matches!(group.shape, Shape::Group { ref items } if items.len() == 1));
    }
}
