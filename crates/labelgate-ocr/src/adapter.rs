//! The closed set of payload adapters.
//!
//! Each OCR provider family gets one adapter behind a shared interface, so a
//! new provider is a new impl rather than another branch inside the
//! normalizer. The direct-array adapter covers providers that report
//! `lines`/`tokens`; the document-block adapter covers providers that report
//! a nested block tree with markup payloads.

use serde_json::Value;

use labelgate_kernel::{BoundingBox, CoordinateSpace, OcrLine, OcrToken, polygon_bounding_box};

use crate::blocks::extract_document_blocks;
use crate::coerce::{clamp_confidence, coerce_bounding_box, coerce_polygon, to_number, to_string_value};

/// Lines and geometry one adapter managed to pull out of a payload.
#[derive(Debug, Default)]
pub struct AdapterExtraction {
    pub lines: Vec<OcrLine>,
    pub tokens: Vec<OcrToken>,
    pub coordinate_space: Option<CoordinateSpace>,
}

/// One provider payload family.
pub trait PayloadAdapter {
    /// Adapter name for diagnostics.
    fn name(&self) -> &'static str;

    /// Pull whatever this adapter understands out of the payload. Adapters
    /// never error: an unusable payload yields an empty extraction.
    fn extract(&self, payload: &Value) -> AdapterExtraction;
}

const DEFAULT_CONFIDENCE: f64 = 0.85;

fn coerce_line(value: &Value) -> Option<OcrLine> {
    let shape = value.as_object()?;
    let text = to_string_value(shape.get("text")).trim().to_string();
    if text.is_empty() {
        return None;
    }

    let polygon = coerce_polygon(shape.get("polygon"));
    let direct_bbox = coerce_bounding_box(shape.get("bbox"));
    let bbox = if direct_bbox.is_valid() {
        direct_bbox
    } else if let Some(points) = &polygon {
        polygon_bounding_box(points)?
    } else {
        BoundingBox::new(0.0, 0.0, 0.0, 0.0)
    };

    if !bbox.is_valid() {
        return None;
    }

    Some(OcrLine {
        text,
        confidence: clamp_confidence(to_number(shape.get("confidence"), DEFAULT_CONFIDENCE)),
        bbox,
        polygon,
    })
}

fn coerce_token(value: &Value, index: usize) -> Option<OcrToken> {
    let shape = value.as_object()?;
    let text = to_string_value(shape.get("text")).trim().to_string();
    if text.is_empty() {
        return None;
    }

    let bbox = coerce_bounding_box(shape.get("bbox"));
    if !bbox.is_valid() {
        return None;
    }

    let line_id = shape
        .get("line_id")
        .or_else(|| shape.get("lineId"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("line_{index}"));

    Some(OcrToken {
        text,
        confidence: clamp_confidence(to_number(shape.get("confidence"), DEFAULT_CONFIDENCE)),
        bbox,
        line_id: Some(line_id),
    })
}

/// Providers that expose `lines[]` / `tokens[]` directly.
pub struct DirectArrayAdapter;

impl PayloadAdapter for DirectArrayAdapter {
    fn name(&self) -> &'static str {
        "direct_arrays"
    }

    fn extract(&self, payload: &Value) -> AdapterExtraction {
        let lines = payload
            .get("lines")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(coerce_line).collect())
            .unwrap_or_default();
        let tokens = payload
            .get("tokens")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .enumerate()
                    .filter_map(|(index, entry)| coerce_token(entry, index))
                    .collect()
            })
            .unwrap_or_default();

        AdapterExtraction {
            lines,
            tokens,
            coordinate_space: None,
        }
    }
}

/// Providers that expose a nested document-block tree.
pub struct DocumentBlockAdapter;

impl PayloadAdapter for DocumentBlockAdapter {
    fn name(&self) -> &'static str {
        "document_blocks"
    }

    fn extract(&self, payload: &Value) -> AdapterExtraction {
        let extraction = extract_document_blocks(payload);
        AdapterExtraction {
            lines: extraction.lines,
            tokens: Vec::new(),
            coordinate_space: extraction.coordinate_space,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_adapter_coerces_lines_and_tokens() {
        let payload = json!({
            "lines": [
                { "text": "AMALFI COAST", "confidence": 0.92,
                  "bbox": { "x0": 120, "y0": 64, "x1": 440, "y1": 126 }, "line_id": "line_0" },
                { "text": "   ", "confidence": 0.9,
                  "bbox": { "x0": 0, "y0": 0, "x1": 10, "y1": 10 } }
            ],
            "tokens": [
                { "text": "AMALFI", "confidence": 0.93,
                  "bbox": { "x0": 120, "y0": 64, "x1": 280, "y1": 126 }, "line_id": "line_0" },
                { "text": "COAST", "confidence": 91,
                  "bbox": { "x0": 288, "y0": 64, "x1": 440, "y1": 126 } }
            ]
        });

        let extraction = DirectArrayAdapter.extract(&payload);
        assert_eq!(extraction.lines.len(), 1);
        assert_eq!(extraction.tokens.len(), 2);
        assert_eq!(extraction.tokens[0].line_id.as_deref(), Some("line_0"));
        // Missing line_id synthesizes from the token index.
        assert_eq!(extraction.tokens[1].line_id.as_deref(), Some("line_1"));
        assert_eq!(extraction.tokens[1].confidence, 0.91);
    }

    #[test]
    fn direct_adapter_recovers_line_box_from_polygon() {
        let payload = json!({
            "lines": [
                { "text": "GIN", "confidence": 0.9,
                  "bbox": { "x0": 0, "y0": 0, "x1": 0, "y1": 0 },
                  "polygon": [[10, 20], [60, 18], [62, 44], [12, 46]] }
            ]
        });

        let extraction = DirectArrayAdapter.extract(&payload);
        assert_eq!(extraction.lines.len(), 1);
        assert_eq!(extraction.lines[0].bbox, BoundingBox::new(10.0, 18.0, 62.0, 46.0));
        assert!(extraction.lines[0].polygon.is_some());
    }

    #[test]
    fn direct_adapter_drops_invalid_boxes() {
        let payload = json!({
            "lines": [ { "text": "GIN", "confidence": 0.9, "bbox": { "x0": 5, "y0": 5, "x1": 5, "y1": 9 } } ]
        });
        assert!(DirectArrayAdapter.extract(&payload).lines.is_empty());
    }

    #[test]
    fn direct_adapter_defaults_confidence() {
        let payload = json!({
            "lines": [ { "text": "GIN", "bbox": { "x0": 0, "y0": 0, "x1": 10, "y1": 10 } } ]
        });
        let extraction = DirectArrayAdapter.extract(&payload);
        assert_eq!(extraction.lines[0].confidence, 0.85);
    }
}
