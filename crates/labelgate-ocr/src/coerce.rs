//! Lenient JSON coercions shared by the payload adapters.
//!
//! OCR providers disagree on number encodings (string vs. number), box
//! layouts (edge object, 4-element array, polygon), and confidence scales
//! (0-1 vs. 0-100). Everything funnels through these helpers so the rest of
//! the crate works on the canonical model.

use serde_json::Value;

use labelgate_kernel::{BoundingBox, CoordinateSpace, PolygonPoint, polygon_bounding_box};

/// Number-or-numeric-string, with a caller-supplied fallback.
pub fn to_number(value: Option<&Value>, fallback: f64) -> f64 {
    match value {
        Some(Value::Number(number)) => number.as_f64().filter(|n| n.is_finite()).unwrap_or(fallback),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(fallback),
        _ => fallback,
    }
}

pub fn to_string_value(value: Option<&Value>) -> &str {
    match value {
        Some(Value::String(text)) => text,
        _ => "",
    }
}

/// Confidences above 1 are read as a 0-100 scale, then clamped to [0, 1].
pub fn clamp_confidence(value: f64) -> f64 {
    if value > 1.0 {
        (value / 100.0).clamp(0.0, 1.0)
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A polygon needs at least three usable points; each point may be a
/// 2+-element array or an object with `x`/`y` (or `X`/`Y`) members.
pub fn coerce_polygon(value: Option<&Value>) -> Option<Vec<PolygonPoint>> {
    let Some(Value::Array(entries)) = value else {
        return None;
    };

    let points: Vec<PolygonPoint> = entries
        .iter()
        .filter_map(|point| match point {
            Value::Array(pair) if pair.len() >= 2 => Some(PolygonPoint {
                x: to_number(pair.first(), 0.0),
                y: to_number(pair.get(1), 0.0),
            }),
            Value::Object(shape) => {
                let x = shape.get("x").or_else(|| shape.get("X"));
                let y = shape.get("y").or_else(|| shape.get("Y"));
                Some(PolygonPoint {
                    x: to_number(x, 0.0),
                    y: to_number(y, 0.0),
                })
            }
            _ => None,
        })
        .collect();

    if points.len() >= 3 { Some(points) } else { None }
}

/// Box from an edge object, a 4-element scalar array, or a polygon.
///
/// Falls back to the zero box (invalid, callers must check validity).
pub fn coerce_bounding_box(value: Option<&Value>) -> BoundingBox {
    if let Some(Value::Array(entries)) = value {
        if entries.len() == 4
            && entries
                .iter()
                .all(|entry| entry.is_number() || entry.is_string())
        {
            return BoundingBox::new(
                to_number(entries.first(), 0.0),
                to_number(entries.get(1), 0.0),
                to_number(entries.get(2), 0.0),
                to_number(entries.get(3), 0.0),
            );
        }

        if let Some(polygon) = coerce_polygon(value) {
            if let Some(bbox) = polygon_bounding_box(&polygon) {
                return bbox;
            }
        }
    }

    let Some(Value::Object(shape)) = value else {
        return BoundingBox::new(0.0, 0.0, 0.0, 0.0);
    };

    BoundingBox::new(
        to_number(shape.get("x0"), to_number(shape.get("left"), 0.0)),
        to_number(shape.get("y0"), to_number(shape.get("top"), 0.0)),
        to_number(shape.get("x1"), to_number(shape.get("right"), 0.0)),
        to_number(shape.get("y1"), to_number(shape.get("bottom"), 0.0)),
    )
}

/// Coordinate space from an object that may express size as width/height or
/// as right/bottom edges.
pub fn coerce_coordinate_space(value: Option<&Value>) -> Option<CoordinateSpace> {
    let Some(Value::Object(shape)) = value else {
        return None;
    };

    let x = to_number(
        shape.get("x"),
        to_number(shape.get("x0"), to_number(shape.get("left"), 0.0)),
    );
    let y = to_number(
        shape.get("y"),
        to_number(shape.get("y0"), to_number(shape.get("top"), 0.0)),
    );
    let width = to_number(
        shape.get("width"),
        to_number(
            shape.get("w"),
            to_number(shape.get("x1"), to_number(shape.get("right"), 0.0)),
        ),
    );
    let height = to_number(
        shape.get("height"),
        to_number(
            shape.get("h"),
            to_number(shape.get("y1"), to_number(shape.get("bottom"), 0.0)),
        ),
    );

    let uses_right_edge = !shape.contains_key("width")
        && !shape.contains_key("w")
        && (shape.contains_key("x1") || shape.contains_key("right"));
    let uses_bottom_edge = !shape.contains_key("height")
        && !shape.contains_key("h")
        && (shape.contains_key("y1") || shape.contains_key("bottom"));

    let normalized_width = if uses_right_edge { width - x } else { width };
    let normalized_height = if uses_bottom_edge { height - y } else { height };

    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    if normalized_width <= 0.0 || normalized_height <= 0.0 {
        return None;
    }

    Some(CoordinateSpace {
        x,
        y,
        width: normalized_width,
        height: normalized_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_parse_from_strings() {
        assert_eq!(to_number(Some(&json!("12.5")), 0.0), 12.5);
        assert_eq!(to_number(Some(&json!(7)), 0.0), 7.0);
        assert_eq!(to_number(Some(&json!("abc")), 3.0), 3.0);
        assert_eq!(to_number(None, 9.0), 9.0);
    }

    #[test]
    fn confidence_percent_scale_is_rescaled() {
        assert_eq!(clamp_confidence(92.0), 0.92);
        assert_eq!(clamp_confidence(0.92), 0.92);
        assert_eq!(clamp_confidence(-0.5), 0.0);
        assert_eq!(clamp_confidence(250.0), 1.0);
    }

    #[test]
    fn bounding_box_from_edge_object() {
        let bbox = coerce_bounding_box(Some(&json!({"x0": 1, "y0": 2, "x1": 3, "y1": 4})));
        assert_eq!(bbox, BoundingBox::new(1.0, 2.0, 3.0, 4.0));

        let aliased = coerce_bounding_box(Some(&json!({"left": 1, "top": 2, "right": 3, "bottom": 4})));
        assert_eq!(aliased, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn bounding_box_from_scalar_array() {
        let bbox = coerce_bounding_box(Some(&json!([10, "20", 30, 40])));
        assert_eq!(bbox, BoundingBox::new(10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn bounding_box_from_polygon_array() {
        let bbox = coerce_bounding_box(Some(&json!([[120, 92], [430, 68], [440, 126]])));
        assert_eq!(bbox, BoundingBox::new(120.0, 68.0, 440.0, 126.0));
    }

    #[test]
    fn malformed_box_degrades_to_zero_box() {
        assert!(!coerce_bounding_box(Some(&json!("nope"))).is_valid());
        assert!(!coerce_bounding_box(None).is_valid());
    }

    #[test]
    fn polygon_requires_three_points() {
        assert!(coerce_polygon(Some(&json!([[0, 0], [1, 1]]))).is_none());
        let polygon = coerce_polygon(Some(&json!([[0, 0], {"x": 1, "y": 1}, {"X": 2, "Y": 0}])));
        assert_eq!(polygon.unwrap().len(), 3);
    }

    #[test]
    fn coordinate_space_accepts_edge_style_sizes() {
        let space = coerce_coordinate_space(Some(&json!({"x0": 10, "y0": 20, "x1": 110, "y1": 220})));
        assert_eq!(
            space,
            Some(CoordinateSpace { x: 10.0, y: 20.0, width: 100.0, height: 200.0 })
        );
    }

    #[test]
    fn coordinate_space_rejects_non_positive_sizes() {
        assert!(coerce_coordinate_space(Some(&json!({"x": 0, "y": 0, "width": 0, "height": 10}))).is_none());
        assert!(coerce_coordinate_space(Some(&json!("wide"))).is_none());
    }
}
