use labelgrid::{
    Bitmaps, CollisionOptions, HeuristicMetrics, LabelOutcome, LabelSpec, MarkItem,
    resolve_label_collision,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveRequest {
    #[serde(default)]
    labels: Vec<LabelSpec>,
    #[serde(default)]
    avoid_marks: Vec<Vec<MarkItem>>,
    #[serde(default)]
    options: CollisionOptions,
    /// Average glyph advance in ems, for callers without font access.
    char_width_em: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ResolveResponse {
    labels: Vec<LabelOutcome>,
}

fn to_js(error: impl ToString) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn resolve(request_json: &str, bitmaps: Option<Bitmaps>) -> Result<(String, Bitmaps), String> {
    let request: ResolveRequest =
        serde_json::from_str(request_json).map_err(|error| error.to_string())?;
    let mut metrics = HeuristicMetrics::default();
    if let Some(em) = request.char_width_em {
        metrics.char_width_em = em;
    }
    let outcome = resolve_label_collision(
        &request.labels,
        &request.avoid_marks,
        &request.options,
        bitmaps,
        &metrics,
    )
    .map_err(|error| error.to_string())?;
    let response = serde_json::to_string(&ResolveResponse {
        labels: outcome.labels,
    })
    .map_err(|error| error.to_string())?;
    Ok((response, outcome.bitmaps))
}

/// One-shot resolution with fresh bitmaps.
#[wasm_bindgen]
pub fn resolve_labels(request_json: &str) -> Result<String, JsValue> {
    resolve(request_json, None)
        .map(|(response, _)| response)
        .map_err(to_js)
}

/// Keeps bitmaps between calls so successive passes over one chart see each other.
#[wasm_bindgen]
#[derive(Default)]
pub struct LabelSession {
    bitmaps: Option<Bitmaps>,
}

#[wasm_bindgen]
impl LabelSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, request_json: &str) -> Result<String, JsValue> {
        let (response, bitmaps) = resolve(request_json, self.bitmaps.take()).map_err(to_js)?;
        self.bitmaps = Some(bitmaps);
        Ok(response)
    }

    pub fn reset(&mut self) {
        self.bitmaps = None;
    }

    #[wasm_bindgen(js_name = solidCells)]
    pub fn solid_cells(&self) -> usize {
        self.bitmaps
            .as_ref()
            .map_or(0, |bitmaps| bitmaps.solid.count_marked())
    }
}

#[cfg(test)]
mod tests {
    use crate::resolve;

    const REQUEST: &str = r#"{
        "labels": [{"text": "A", "x": 40, "y": 40, "width": 10}],
        "avoidMarks": [],
        "options": {"size": [100, 100]}
    }"#;

    #[test]
    fn resolves_and_returns_bitmaps() {
        let (response, bitmaps) = resolve(REQUEST, None).expect("valid request");
        assert!(response.contains("\"placed\""));
        assert!(!bitmaps.solid.is_empty());

        let (second, _) = resolve(REQUEST, Some(bitmaps)).expect("valid request");
        assert!(second.contains("\"hidden\""));
    }

    #[test]
    fn reports_bad_sizes() {
        let err = resolve(r#"{"options": {"size": [1]}}"#, None).expect_err("bad size");
        assert!(err.contains("size"), "unexpected error: {err}");
    }
}
