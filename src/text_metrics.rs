use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Average advance of a glyph, in ems, when no font face is available.
pub const FALLBACK_CHAR_WIDTH_EM: f32 = 0.56;

/// Width of a run of text, used by the placer once a candidate is worth measuring.
pub trait FontMetrics {
    fn measure(&self, text: &str, font_size: f32, font_family: &str) -> f32;
}

/// Fixed per-character advance; deterministic and font independent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicMetrics {
    pub char_width_em: f32,
}

impl Default for HeuristicMetrics {
    fn default() -> Self {
        Self {
            char_width_em: FALLBACK_CHAR_WIDTH_EM,
        }
    }
}

impl FontMetrics for HeuristicMetrics {
    fn measure(&self, text: &str, font_size: f32, _font_family: &str) -> f32 {
        let count = text.chars().filter(|ch| *ch != '\n').count() as f32;
        (count * font_size * self.char_width_em).max(0.0)
    }
}

/// Measures with installed system fonts, falling back to [`HeuristicMetrics`]
/// when no face resolves for the family list.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFontMetrics;

impl FontMetrics for SystemFontMetrics {
    fn measure(&self, text: &str, font_size: f32, font_family: &str) -> f32 {
        if text.is_empty() || font_size <= 0.0 {
            return 0.0;
        }
        FONT_CATALOG
            .lock()
            .ok()
            .and_then(|mut catalog| catalog.face(font_family)?.width(text, font_size))
            .unwrap_or_else(|| HeuristicMetrics::default().measure(text, font_size, font_family))
    }
}

static FONT_CATALOG: Lazy<Mutex<FontCatalog>> = Lazy::new(|| Mutex::new(FontCatalog::default()));

/// System font database, loaded on first use, plus the face picked for each
/// family list seen so far.
#[derive(Default)]
struct FontCatalog {
    db: Option<Database>,
    faces: HashMap<String, Option<LoadedFace>>,
}

impl FontCatalog {
    fn face(&mut self, font_family: &str) -> Option<&LoadedFace> {
        let key = family_key(font_family);
        if !self.faces.contains_key(&key) {
            let face = self.resolve(&key);
            if face.is_none() {
                tracing::debug!(family = %key, "no font face resolved, using heuristic widths");
            }
            self.faces.insert(key.clone(), face);
        }
        self.faces.get(&key)?.as_ref()
    }

    fn resolve(&mut self, families: &str) -> Option<LoadedFace> {
        let db = self.db.get_or_insert_with(|| {
            let mut db = Database::new();
            db.load_system_fonts();
            db
        });
        let mut query_families: Vec<Family<'_>> = families
            .split(',')
            .map(|part| part.trim().trim_matches(['"', '\'']))
            .filter(|name| !name.is_empty())
            .map(css_family)
            .collect();
        if query_families.is_empty() {
            query_families.push(Family::SansSerif);
        }
        let query = Query {
            families: &query_families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = db.query(&query)?;
        db.with_face_data(id, |data, index| LoadedFace {
            data: data.to_vec(),
            index,
        })
    }
}

fn css_family(name: &str) -> Family<'_> {
    match name.to_ascii_lowercase().as_str() {
        "serif" => Family::Serif,
        "sans-serif" | "system-ui" => Family::SansSerif,
        "monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        _ => Family::Name(name),
    }
}

fn family_key(font_family: &str) -> String {
    match font_family.trim() {
        "" => "sans-serif".to_string(),
        family => family.to_string(),
    }
}

struct LoadedFace {
    data: Vec<u8>,
    index: u32,
}

impl LoadedFace {
    /// Sum of horizontal advances; glyphs the face lacks count as the
    /// fallback advance.
    fn width(&self, text: &str, font_size: f32) -> Option<f32> {
        let face = Face::parse(&self.data, self.index).ok()?;
        let scale = font_size / face.units_per_em().max(1) as f32;
        let fallback = font_size * FALLBACK_CHAR_WIDTH_EM;
        let width: f32 = text
            .chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| {
                face.glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .map_or(fallback, |advance| advance as f32 * scale)
            })
            .sum();
        Some(width.max(0.0))
    }
}
