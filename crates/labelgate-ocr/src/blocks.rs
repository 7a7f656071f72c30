//! Document-block payload walking.
//!
//! Some providers return a page-structured tree of blocks whose text hides
//! inside HTML or markdown payloads, mixed with imagery blocks and model
//! narration ("the image shows ..."). The walker collects genuine text lines
//! with their geometry, drops everything else, and dedupes collisions.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use labelgate_kernel::{
    BoundingBox, CoordinateSpace, OcrLine, PolygonPoint, normalize_text,
};

use crate::coerce::{clamp_confidence, coerce_bounding_box, coerce_polygon, to_number, to_string_value};

static HTML_STYLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style.*?</style>").unwrap());
static HTML_SCRIPT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script.*?</script>").unwrap());
static HTML_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static MARKDOWN_IMAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]+\)|!\[[^\]]*\]\[[^\]]*\]").unwrap());

static NARRATION_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^(image|photo|picture|illustration|graphic|figure|logo)\s*[:\-]").unwrap(),
        Regex::new(r"^(an?|the|this)\s+(image|photo|picture|illustration|graphic|label)\s+(shows|depicts|features)\b")
            .unwrap(),
        Regex::new(r"^(an?\s+)?close[- ]up\s+of\b").unwrap(),
    ]
});

#[derive(Debug, Clone)]
struct BlockLineCandidate {
    text: String,
    confidence: f64,
    bbox: BoundingBox,
    polygon: Option<Vec<PolygonPoint>>,
}

#[derive(Debug, Default)]
pub struct BlockExtraction {
    pub lines: Vec<OcrLine>,
    pub coordinate_space: Option<CoordinateSpace>,
}

fn collapse_inner_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_html_entities(value: &str) -> String {
    value
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

fn strip_html_to_text(value: &str) -> String {
    let without_style = HTML_STYLE_REGEX.replace_all(value, " ");
    let without_script = HTML_SCRIPT_REGEX.replace_all(&without_style, " ");
    let without_tags = HTML_TAG_REGEX.replace_all(&without_script, " ");
    collapse_inner_whitespace(&decode_html_entities(&without_tags))
}

fn strip_markdown_image_syntax(value: &str) -> String {
    collapse_inner_whitespace(&MARKDOWN_IMAGE_REGEX.replace_all(value, " "))
}

fn normalize_block_type(value: Option<&Value>) -> String {
    to_string_value(value)
        .to_lowercase()
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '_' && *ch != '-')
        .collect()
}

fn is_non_text_block_type(value: Option<&Value>) -> bool {
    const EXCLUDED: &[&str] = &[
        "page",
        "image",
        "picture",
        "figure",
        "graphic",
        "illustration",
        "logo",
        "seal",
        "stamp",
        "table",
        "tableofcontents",
        "caption",
        "figurecaption",
        "imagecaption",
        "photocaption",
    ];
    EXCLUDED.contains(&normalize_block_type(value).as_str())
}

fn object_text(shape: &serde_json::Map<String, Value>) -> String {
    for key in ["text", "raw_text", "line_text", "value", "content"] {
        let text = to_string_value(shape.get(key)).trim().to_string();
        if !text.is_empty() {
            return collapse_inner_whitespace(&text);
        }
    }

    let markdown = strip_markdown_image_syntax(to_string_value(shape.get("markdown")));
    if !markdown.is_empty() {
        return markdown;
    }

    let html = to_string_value(shape.get("html")).trim().to_string();
    if !html.is_empty() {
        return strip_html_to_text(&html);
    }

    String::new()
}

fn is_likely_image_description(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return false;
    }

    NARRATION_REGEXES
        .iter()
        .any(|pattern| pattern.is_match(&normalized))
}

fn object_bounding_box(shape: &serde_json::Map<String, Value>) -> Option<BoundingBox> {
    for key in ["bbox", "box", "bounds", "boundingBox", "bounding_box"] {
        let bbox = coerce_bounding_box(shape.get(key));
        if bbox.is_valid() {
            return Some(bbox);
        }
    }

    for key in ["polygon", "points"] {
        if let Some(polygon) = coerce_polygon(shape.get(key)) {
            return labelgate_kernel::polygon_bounding_box(&polygon);
        }
    }

    None
}

fn object_polygon(shape: &serde_json::Map<String, Value>) -> Option<Vec<PolygonPoint>> {
    for key in ["polygon", "points"] {
        if let Some(polygon) = coerce_polygon(shape.get(key)) {
            return Some(polygon);
        }
    }

    None
}

fn object_confidence(shape: &serde_json::Map<String, Value>) -> f64 {
    clamp_confidence(to_number(
        shape.get("confidence"),
        to_number(shape.get("score"), to_number(shape.get("probability"), 0.85)),
    ))
}

fn collect_candidates(
    value: &Value,
    results: &mut Vec<BlockLineCandidate>,
    page_candidates: &mut Vec<BoundingBox>,
    visited: &mut HashSet<*const Value>,
) {
    if let Value::Array(entries) = value {
        for entry in entries {
            collect_candidates(entry, results, page_candidates, visited);
        }
        return;
    }

    let Value::Object(shape) = value else {
        return;
    };

    // The same subtree can be reachable through several payload roots.
    if !visited.insert(value as *const Value) {
        return;
    }

    if to_string_value(shape.get("block_type")).to_lowercase() == "page" {
        if let Some(page_bounds) = object_bounding_box(shape) {
            page_candidates.push(page_bounds);
        }
    }

    let skip_as_text = is_non_text_block_type(shape.get("block_type"));
    let text = object_text(shape);
    let bbox = object_bounding_box(shape);
    let skip_as_narration = is_likely_image_description(&text);
    if !skip_as_text && !skip_as_narration && !text.is_empty() {
        if let Some(bbox) = bbox {
            results.push(BlockLineCandidate {
                text,
                confidence: object_confidence(shape),
                bbox,
                polygon: object_polygon(shape),
            });
        }
    }

    for nested in shape.values() {
        if nested.is_object() || nested.is_array() {
            collect_candidates(nested, results, page_candidates, visited);
        }
    }
}

/// Drop candidates that collide on (normalized text, box snapped to an 8px
/// grid), then order survivors top-to-bottom, left-to-right within a +-6px
/// vertical-center tolerance.
fn unique_lines_by_geometry(candidates: Vec<BlockLineCandidate>) -> Vec<BlockLineCandidate> {
    let snap = |value: f64| ((value / 8.0).round() * 8.0) as i64;
    let mut seen = HashSet::new();
    let mut unique: Vec<BlockLineCandidate> = Vec::new();
    for candidate in candidates {
        let key = (
            normalize_text(&candidate.text),
            snap(candidate.bbox.x0),
            snap(candidate.bbox.y0),
            snap(candidate.bbox.x1),
            snap(candidate.bbox.y1),
        );
        if seen.insert(key) {
            unique.push(candidate);
        }
    }

    unique.sort_by(|left, right| {
        let left_y = left.bbox.center_y();
        let right_y = right.bbox.center_y();
        if (left_y - right_y).abs() <= 6.0 {
            left.bbox.center_x().partial_cmp(&right.bbox.center_x()).unwrap()
        } else {
            left_y.partial_cmp(&right_y).unwrap()
        }
    });
    unique
}

fn largest_bounding_box(boxes: &[BoundingBox]) -> Option<BoundingBox> {
    boxes.iter().copied().reduce(|largest, current| {
        if current.area() > largest.area() {
            current
        } else {
            largest
        }
    })
}

/// Walk every plausible root of a document-block payload and assemble the
/// ordered line list plus the page coordinate space, when one is declared.
pub fn extract_document_blocks(payload: &Value) -> BlockExtraction {
    let mut candidates = Vec::new();
    let mut page_candidates = Vec::new();
    let mut visited = HashSet::new();

    let roots = ["json", "chunks", "pages"];
    for root in roots {
        if let Some(value) = payload.get(root) {
            collect_candidates(value, &mut candidates, &mut page_candidates, &mut visited);
        }
    }
    collect_candidates(payload, &mut candidates, &mut page_candidates, &mut visited);

    let lines = unique_lines_by_geometry(candidates)
        .into_iter()
        .map(|candidate| OcrLine {
            text: candidate.text,
            confidence: candidate.confidence,
            bbox: candidate.bbox,
            polygon: candidate.polygon,
        })
        .collect();

    let coordinate_space = largest_bounding_box(&page_candidates)
        .and_then(|bbox| CoordinateSpace::from_bounding_box(&bbox));

    BlockExtraction {
        lines,
        coordinate_space,
    }
}
