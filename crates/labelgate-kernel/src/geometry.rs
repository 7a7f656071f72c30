//! Evidence geometry engine.
//!
//! Token boxes arrive in arbitrary provider order and with localization
//! drift. This module restores reading order, groups tokens into contiguous
//! clusters, drops spatial outliers, and bounds-checks candidate evidence
//! boxes against the page. Thresholds here are calibration constants tuned
//! against the acceptance corpus; change them only against those fixtures.

use crate::model::{BoundingBox, FieldKey, OcrToken};

/// Median of a value list; 0.0 on empty input.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|left, right| left.partial_cmp(right).unwrap());
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) / 2.0
    } else {
        sorted[middle]
    }
}

fn median_token_height(tokens: &[OcrToken]) -> f64 {
    median(
        &tokens
            .iter()
            .map(|token| token.bbox.height())
            .collect::<Vec<_>>(),
    )
}

/// Order tokens top-to-bottom, left-to-right.
///
/// Two tokens count as the same line when their vertical-center delta is
/// within max(10, 0.8 x median token height).
pub fn sort_tokens_for_reading_order(tokens: &[OcrToken]) -> Vec<OcrToken> {
    let same_line_threshold = (median_token_height(tokens) * 0.8).max(10.0);
    let mut sorted = tokens.to_vec();
    sorted.sort_by(|left, right| {
        let left_center_y = left.bbox.center_y();
        let right_center_y = right.bbox.center_y();
        if (left_center_y - right_center_y).abs() <= same_line_threshold {
            left.bbox
                .center_x()
                .partial_cmp(&right.bbox.center_x())
                .unwrap()
        } else {
            left_center_y.partial_cmp(&right_center_y).unwrap()
        }
    });
    sorted
}

/// Drop tokens whose center strays from the cluster's median center.
///
/// Only applied when the cluster has more than two tokens, and never empties
/// a cluster entirely.
pub fn remove_outlier_tokens(tokens: &[OcrToken]) -> Vec<OcrToken> {
    if tokens.len() <= 2 {
        return tokens.to_vec();
    }

    let centers_y: Vec<f64> = tokens.iter().map(|token| token.bbox.center_y()).collect();
    let centers_x: Vec<f64> = tokens.iter().map(|token| token.bbox.center_x()).collect();

    let median_y = median(&centers_y);
    let median_x = median(&centers_x);
    let median_height = median_token_height(tokens).max(8.0);
    let vertical_range = median_height * 3.5;
    let horizontal_range = median_height * 20.0;

    let filtered: Vec<OcrToken> = tokens
        .iter()
        .filter(|token| {
            let within_vertical = (token.bbox.center_y() - median_y).abs() <= vertical_range;
            let within_horizontal = (token.bbox.center_x() - median_x).abs() <= horizontal_range;
            within_vertical && within_horizontal
        })
        .cloned()
        .collect();

    if filtered.is_empty() {
        tokens.to_vec()
    } else {
        filtered
    }
}

/// Walk reading-ordered tokens and break a new cluster whenever the gap to
/// the previous token exceeds 1.4x median height vertically or 3.2x
/// horizontally. Each cluster is outlier-filtered before being returned.
pub fn build_contiguous_token_clusters(tokens: &[OcrToken]) -> Vec<Vec<OcrToken>> {
    if tokens.is_empty() {
        return Vec::new();
    }

    let sorted = sort_tokens_for_reading_order(tokens);
    let median_height = median_token_height(&sorted).max(8.0);
    let max_vertical_gap = median_height * 1.4;
    let max_horizontal_gap = median_height * 3.2;

    let mut clusters: Vec<Vec<OcrToken>> = Vec::new();
    let mut current: Vec<OcrToken> = vec![sorted[0].clone()];

    for pair in sorted.windows(2) {
        let previous = &pair[0];
        let token = &pair[1];
        let vertical_gap = (token.bbox.center_y() - previous.bbox.center_y()).abs();
        let horizontal_gap = (token.bbox.center_x() - previous.bbox.center_x()).abs();

        if vertical_gap <= max_vertical_gap && horizontal_gap <= max_horizontal_gap {
            current.push(token.clone());
            continue;
        }

        clusters.push(std::mem::take(&mut current));
        current.push(token.clone());
    }

    clusters.push(current);
    clusters
        .iter()
        .map(|cluster| remove_outlier_tokens(cluster))
        .collect()
}

/// Axis-aligned union of a box list; `None` on empty input.
pub fn merge_evidence_boxes(boxes: &[BoundingBox]) -> Option<BoundingBox> {
    let mut iter = boxes.iter();
    let first = *iter.next()?;
    Some(iter.fold(first, |merged, bbox| merged.union(bbox)))
}

/// Evidence box area over page bounds area; `None` when either side is
/// unavailable or non-positive.
pub fn compute_evidence_box_area_ratio(
    evidence_box: Option<&BoundingBox>,
    page_bounds: Option<&BoundingBox>,
) -> Option<f64> {
    let evidence_box = evidence_box?;
    let page_bounds = page_bounds?;
    let page_area = page_bounds.area();
    if page_area <= 0.0 {
        return None;
    }

    Some(evidence_box.area() / page_area)
}

fn oversize_threshold(field: FieldKey) -> f64 {
    match field {
        FieldKey::BrandName => 0.20,
        FieldKey::ClassTypeDesignation => 0.25,
        FieldKey::AlcoholContent => 0.20,
        FieldKey::NetContents => 0.20,
        FieldKey::NameAddress => 0.45,
        FieldKey::CountryOfOrigin => 0.20,
        FieldKey::GovernmentWarning => 0.70,
    }
}

/// Whether an evidence area ratio exceeds the field's calibrated threshold.
pub fn is_evidence_box_oversized(field: FieldKey, area_ratio: Option<f64>) -> bool {
    match area_ratio {
        Some(ratio) => ratio > oversize_threshold(field),
        None => false,
    }
}

/// For brand and class/type fields, constrain a candidate box to a vertical
/// band centered on the underlying token union so one box cannot absorb
/// unrelated rows above or below.
pub fn clamp_evidence_box_by_field(
    field: FieldKey,
    bbox: &BoundingBox,
    token_boxes: &[BoundingBox],
) -> BoundingBox {
    let Some(token_union) = merge_evidence_boxes(token_boxes) else {
        return *bbox;
    };

    if field != FieldKey::BrandName && field != FieldKey::ClassTypeDesignation {
        return *bbox;
    }

    let median_height = median(
        &token_boxes
            .iter()
            .map(|token_box| token_box.height())
            .collect::<Vec<_>>(),
    )
    .max(8.0);
    let max_height = (median_height * 3.5).max(token_union.height() * 1.1);
    let center_y = token_union.center_y();
    let half_height = max_height / 2.0;

    BoundingBox {
        x0: token_union.x0,
        x1: token_union.x1,
        y0: bbox.y0.max(center_y - half_height),
        y1: bbox.y1.min(center_y + half_height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> OcrToken {
        OcrToken {
            text: text.to_string(),
            confidence: 0.9,
            bbox: BoundingBox::new(x0, y0, x1, y1),
            line_id: None,
        }
    }

    #[test]
    fn median_of_even_list_averages_middle_pair() {
        assert_eq!(median(&[1.0, 3.0, 5.0, 7.0]), 4.0);
        assert_eq!(median(&[2.0]), 2.0);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn reading_order_is_row_major() {
        let tokens = vec![
            token("OAK", 362.0, 64.0, 500.0, 116.0),
            token("RUM", 300.0, 140.0, 380.0, 188.0),
            token("GOLDEN", 188.0, 64.0, 350.0, 116.0),
        ];
        let ordered = sort_tokens_for_reading_order(&tokens);
        let texts: Vec<&str> = ordered.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["GOLDEN", "OAK", "RUM"]);
    }

    #[test]
    fn reading_order_tolerates_slight_baseline_drift() {
        // Centers differ by 2px, well inside the same-line threshold.
        let tokens = vec![
            token("COAST", 344.0, 74.0, 502.0, 114.0),
            token("AMALFI", 180.0, 72.0, 330.0, 112.0),
        ];
        let ordered = sort_tokens_for_reading_order(&tokens);
        assert_eq!(ordered[0].text, "AMALFI");
    }

    #[test]
    fn clusters_split_on_large_vertical_gaps() {
        let tokens = vec![
            token("AMALFI", 180.0, 72.0, 330.0, 112.0),
            token("COAST", 344.0, 72.0, 502.0, 112.0),
            token("ITALY", 300.0, 518.0, 382.0, 552.0),
        ];
        let clusters = build_contiguous_token_clusters(&tokens);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 2);
        assert_eq!(clusters[1][0].text, "ITALY");
    }

    #[test]
    fn clusters_split_on_large_horizontal_gaps() {
        let tokens = vec![
            token("80", 150.0, 250.0, 220.0, 300.0),
            token("PROOF", 226.0, 250.0, 290.0, 300.0),
            token("375", 510.0, 250.0, 570.0, 300.0),
        ];
        let clusters = build_contiguous_token_clusters(&tokens);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn outlier_removal_requires_more_than_two_tokens() {
        let tokens = vec![
            token("A", 0.0, 0.0, 10.0, 10.0),
            token("B", 0.0, 500.0, 10.0, 510.0),
        ];
        assert_eq!(remove_outlier_tokens(&tokens).len(), 2);
    }

    #[test]
    fn outlier_removal_drops_distant_token() {
        let tokens = vec![
            token("DISTILLED", 120.0, 450.0, 260.0, 488.0),
            token("BOTTLED", 274.0, 452.0, 398.0, 488.0),
            token("LUCIANA", 412.0, 452.0, 535.0, 488.0),
            token("STRAY", 430.0, 1400.0, 520.0, 1438.0),
        ];
        let kept = remove_outlier_tokens(&tokens);
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|t| t.text != "STRAY"));
    }

    #[test]
    fn merge_of_empty_list_is_none() {
        assert!(merge_evidence_boxes(&[]).is_none());
        let merged = merge_evidence_boxes(&[
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(5.0, 5.0, 30.0, 8.0),
        ])
        .unwrap();
        assert_eq!(merged, BoundingBox::new(0.0, 0.0, 30.0, 10.0));
    }

    #[test]
    fn area_ratio_requires_both_boxes() {
        let evidence = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let page = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(
            compute_evidence_box_area_ratio(Some(&evidence), Some(&page)),
            Some(0.01)
        );
        assert_eq!(compute_evidence_box_area_ratio(Some(&evidence), None), None);
        assert_eq!(compute_evidence_box_area_ratio(None, Some(&page)), None);
    }

    #[test]
    fn oversize_thresholds_are_field_specific() {
        assert!(is_evidence_box_oversized(FieldKey::BrandName, Some(0.21)));
        assert!(!is_evidence_box_oversized(FieldKey::BrandName, Some(0.19)));
        assert!(!is_evidence_box_oversized(FieldKey::GovernmentWarning, Some(0.5)));
        assert!(is_evidence_box_oversized(FieldKey::GovernmentWarning, Some(0.71)));
        assert!(!is_evidence_box_oversized(FieldKey::NetContents, None));
    }

    #[test]
    fn clamp_constrains_brand_band_to_token_union() {
        let tall = BoundingBox::new(100.0, 0.0, 500.0, 400.0);
        let token_boxes = [
            BoundingBox::new(150.0, 180.0, 300.0, 220.0),
            BoundingBox::new(310.0, 180.0, 460.0, 220.0),
        ];
        let clamped = clamp_evidence_box_by_field(FieldKey::BrandName, &tall, &token_boxes);
        assert_eq!(clamped.x0, 150.0);
        assert_eq!(clamped.x1, 460.0);
        assert!(clamped.y0 >= 200.0 - 70.0 - 1e-9);
        assert!(clamped.y1 <= 200.0 + 70.0 + 1e-9);
    }

    #[test]
    fn clamp_leaves_other_fields_untouched() {
        let bbox = BoundingBox::new(0.0, 0.0, 700.0, 900.0);
        let token_boxes = [BoundingBox::new(10.0, 10.0, 50.0, 30.0)];
        let clamped = clamp_evidence_box_by_field(FieldKey::NetContents, &bbox, &token_boxes);
        assert_eq!(clamped, bbox);
    }
}
