use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bounds::MarkBounds;
use crate::mark::TextAnchor;

const TOP: u8 = 0x0;
const MIDDLE: u8 = 0x1 << 0x2;
const BOTTOM: u8 = 0x2 << 0x2;
const LEFT: u8 = 0x0;
const CENTER: u8 = 0x1;
const RIGHT: u8 = 0x2;

/// One of the nine positions around a mark a label can be anchored at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorPosition {
    TopLeft,
    Top,
    TopRight,
    Left,
    Middle,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl AnchorPosition {
    pub const ALL: [AnchorPosition; 9] = [
        AnchorPosition::TopLeft,
        AnchorPosition::Top,
        AnchorPosition::TopRight,
        AnchorPosition::Left,
        AnchorPosition::Middle,
        AnchorPosition::Right,
        AnchorPosition::BottomLeft,
        AnchorPosition::Bottom,
        AnchorPosition::BottomRight,
    ];

    /// Packed form: low two bits horizontal, next two bits vertical.
    pub const fn code(self) -> u8 {
        match self {
            AnchorPosition::TopLeft => TOP + LEFT,
            AnchorPosition::Top => TOP + CENTER,
            AnchorPosition::TopRight => TOP + RIGHT,
            AnchorPosition::Left => MIDDLE + LEFT,
            AnchorPosition::Middle => MIDDLE + CENTER,
            AnchorPosition::Right => MIDDLE + RIGHT,
            AnchorPosition::BottomLeft => BOTTOM + LEFT,
            AnchorPosition::Bottom => BOTTOM + CENTER,
            AnchorPosition::BottomRight => BOTTOM + RIGHT,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|anchor| anchor.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            AnchorPosition::TopLeft => "top-left",
            AnchorPosition::Top => "top",
            AnchorPosition::TopRight => "top-right",
            AnchorPosition::Left => "left",
            AnchorPosition::Middle => "middle",
            AnchorPosition::Right => "right",
            AnchorPosition::BottomLeft => "bottom-left",
            AnchorPosition::Bottom => "bottom",
            AnchorPosition::BottomRight => "bottom-right",
        }
    }

    /// `(dx, dy)`, each in `-1..=1`.
    pub fn direction(self) -> (i32, i32) {
        decode_anchor(self.code())
    }
}

pub fn decode_anchor(code: u8) -> (i32, i32) {
    ((code & 0x3) as i32 - 1, ((code >> 0x2) & 0x3) as i32 - 1)
}

impl fmt::Display for AnchorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnchorPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|anchor| anchor.name() == s.trim())
            .ok_or_else(|| format!("unknown anchor position: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    /// `-1` right-aligns (text grows leftwards), `0` centers, `1` left-aligns.
    pub fn from_direction(dir: i32) -> Self {
        match dir.signum() {
            -1 => Align::Right,
            0 => Align::Center,
            _ => Align::Left,
        }
    }

    pub fn text_anchor(self) -> TextAnchor {
        match self {
            Align::Left => TextAnchor::Start,
            Align::Center => TextAnchor::Middle,
            Align::Right => TextAnchor::End,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Baseline {
    Top,
    Middle,
    Bottom,
}

impl Baseline {
    pub fn from_direction(dir: i32) -> Self {
        match dir.signum() {
            -1 => Baseline::Bottom,
            0 => Baseline::Middle,
            _ => Baseline::Top,
        }
    }

    /// Vertical shift that moves an SVG alphabetic baseline onto this baseline.
    pub fn translate_height(self, text_height: f32) -> f32 {
        match self {
            Baseline::Top => text_height,
            Baseline::Middle => text_height / 3.0,
            Baseline::Bottom => 0.0,
        }
    }
}

/// Which candidate box, if any, a label currently holds in the solid grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Commit {
    #[default]
    None,
    /// Committed by this placer at the given candidate index.
    At(usize),
    /// Committed by an earlier call; the candidate is unknown.
    Prior,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelItem {
    pub text: String,
    pub font_size: f32,
    pub font_family: String,
    /// Measured lazily by the placer when missing.
    pub text_width: Option<f32>,
    pub text_height: f32,
    pub mark_bounds: MarkBounds,
    pub x: f32,
    pub y: f32,
    pub align: Align,
    pub baseline: Baseline,
    pub visible: bool,
    pub commit: Commit,
}

impl LabelItem {
    pub fn new(text: impl Into<String>, font_size: f32, mark_bounds: MarkBounds) -> Self {
        Self {
            text: text.into(),
            font_size,
            font_family: "sans-serif".to_string(),
            text_width: None,
            text_height: (font_size - 1.0).max(1.0),
            mark_bounds,
            x: mark_bounds.x_mid(),
            y: mark_bounds.y_mid(),
            align: Align::Center,
            baseline: Baseline::Middle,
            visible: true,
            commit: Commit::None,
        }
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    pub fn with_text_width(mut self, width: f32) -> Self {
        self.text_width = Some(width);
        self
    }

    pub fn with_text_height(mut self, height: f32) -> Self {
        self.text_height = height;
        self
    }

    pub fn is_committed(&self) -> bool {
        self.commit != Commit::None
    }
}
