//! Word-level candidate search.
//!
//! Slides windows of adjacent tokens over spatially-filtered clusters and
//! scores each window's concatenated text against the expected value. The
//! cluster pass keeps windows spatially coherent; a brand-only fallback
//! re-runs over all candidate tokens because brand words can sit further
//! apart than the cluster gap thresholds allow.

use labelgate_kernel::{
    BoundingBox, EvidenceSource, FieldKey, OcrToken, collapse_whitespace, dice_coefficient,
    geometry::{
        build_contiguous_token_clusters, clamp_evidence_box_by_field,
        compute_evidence_box_area_ratio, is_evidence_box_oversized, merge_evidence_boxes,
        remove_outlier_tokens, sort_tokens_for_reading_order,
    },
    normalized_includes, tokenize_normalized,
};

use crate::scoring::{
    MatchCandidate, approximate_token_coverage, average_confidence, brand_class_leak_penalty,
    is_address_like_text, is_mostly_uppercase, unmatched_candidate_token_ratio,
};

fn window_penalty_rate(field: FieldKey) -> f64 {
    match field {
        FieldKey::BrandName => 0.05,
        FieldKey::ClassTypeDesignation => 0.06,
        FieldKey::CountryOfOrigin => 0.05,
        _ => 0.03,
    }
}

fn includes_boost(
    field: FieldKey,
    expected_token_count: usize,
    includes_expected: bool,
    unmatched_ratio: f64,
) -> f64 {
    if !includes_expected {
        return 0.0;
    }

    match field {
        FieldKey::BrandName => (0.99 - unmatched_ratio * 0.55).max(0.76),
        FieldKey::ClassTypeDesignation if expected_token_count == 1 => {
            (0.99 - unmatched_ratio * 0.72).max(0.72)
        }
        FieldKey::CountryOfOrigin if expected_token_count == 1 => {
            (0.99 - unmatched_ratio * 0.62).max(0.76)
        }
        _ => 0.99,
    }
}

pub(crate) fn best_word_match(
    field: FieldKey,
    expected_value: &str,
    ocr_tokens: &[OcrToken],
    page_bounds: Option<&BoundingBox>,
) -> Option<MatchCandidate> {
    if ocr_tokens.is_empty() {
        return None;
    }

    let expected_tokens = tokenize_normalized(expected_value);
    if expected_tokens.is_empty() {
        return None;
    }

    let max_y = ocr_tokens
        .iter()
        .fold(1.0_f64, |largest, token| largest.max(token.bbox.y1));

    let mut candidate_tokens: Vec<OcrToken> = ocr_tokens
        .iter()
        .filter(|token| !token.text.trim().is_empty())
        .cloned()
        .collect();

    if field == FieldKey::BrandName {
        candidate_tokens.retain(|token| {
            let is_upper_region = token.bbox.center_y() <= max_y * 0.72;
            is_upper_region && !is_address_like_text(&token.text)
        });
    }

    if field == FieldKey::NameAddress {
        candidate_tokens.retain(|token| {
            is_address_like_text(&token.text)
                || token.text.contains(',')
                || token.text.chars().any(|ch| ch.is_ascii_digit())
        });
    }

    if candidate_tokens.is_empty() {
        return None;
    }

    let clusters = build_contiguous_token_clusters(&candidate_tokens);
    let mut best: Option<MatchCandidate> = None;

    let evaluate_sequence = |sequence: &[OcrToken], best: &mut Option<MatchCandidate>| {
        let ordered = sort_tokens_for_reading_order(sequence);
        let max_window = ordered.len().min(match field {
            FieldKey::BrandName => (expected_tokens.len() + 2).max(4),
            _ => (expected_tokens.len() + 4).max(8),
        });

        for start_index in 0..ordered.len() {
            for window_size in 1..=max_window {
                if start_index + window_size > ordered.len() {
                    break;
                }

                let slice = &ordered[start_index..start_index + window_size];
                let filtered = remove_outlier_tokens(slice);
                let candidate_text = collapse_whitespace(
                    &filtered
                        .iter()
                        .map(|token| token.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" "),
                );
                if candidate_text.is_empty() {
                    continue;
                }

                let token_coverage = approximate_token_coverage(&expected_tokens, &candidate_text);
                let minimum_coverage = if field == FieldKey::BrandName && expected_tokens.len() > 1
                {
                    0.7
                } else {
                    0.45
                };
                if token_coverage < minimum_coverage {
                    continue;
                }

                let similarity = dice_coefficient(expected_value, &candidate_text);
                let includes_expected = normalized_includes(&candidate_text, expected_value);
                let unmatched_ratio =
                    unmatched_candidate_token_ratio(&expected_tokens, &candidate_text);
                let boost = includes_boost(
                    field,
                    expected_tokens.len(),
                    includes_expected,
                    unmatched_ratio,
                );

                let Some(average_token_confidence) =
                    average_confidence(filtered.iter().map(|token| token.confidence))
                else {
                    continue;
                };
                let token_boxes: Vec<BoundingBox> =
                    filtered.iter().map(|token| token.bbox).collect();
                let Some(candidate_box) = merge_evidence_boxes(&token_boxes) else {
                    continue;
                };

                let clamped_box = clamp_evidence_box_by_field(field, &candidate_box, &token_boxes);
                let area_ratio = compute_evidence_box_area_ratio(Some(&clamped_box), page_bounds);
                let oversized_penalty = if is_evidence_box_oversized(field, area_ratio) {
                    0.22
                } else {
                    0.0
                };
                let window_penalty = window_size.saturating_sub(expected_tokens.len()) as f64
                    * window_penalty_rate(field);

                let base_score = similarity.max(boost).max(token_coverage) * 0.75;
                let mut score = base_score + average_token_confidence * 0.25;

                if field == FieldKey::BrandName {
                    let uppercase_bonus = if is_mostly_uppercase(&candidate_text) { 0.06 } else { 0.0 };
                    let address_penalty = if is_address_like_text(&candidate_text) { 0.45 } else { 0.0 };
                    let class_leak_penalty =
                        brand_class_leak_penalty(expected_value, &candidate_text);
                    let unmatched_penalty = unmatched_ratio * 0.28;
                    score += uppercase_bonus - address_penalty - class_leak_penalty
                        - unmatched_penalty;
                }

                if field == FieldKey::ClassTypeDesignation {
                    let top_bias = (1.0 - clamped_box.center_y() / max_y).max(0.0);
                    let compact_token_bonus =
                        if expected_tokens.len() == 1 && filtered.len() == 1 { 0.16 } else { 0.0 };
                    let vertical_shape_penalty = if expected_tokens.len() == 1
                        && filtered.len() == 1
                        && clamped_box.aspect_ratio() < 0.9
                    {
                        0.26
                    } else {
                        0.0
                    };
                    let spillover_penalty = unmatched_ratio * 0.35
                        + if expected_tokens.len() == 1 {
                            filtered.len().saturating_sub(1) as f64 * 0.08
                        } else {
                            0.0
                        };
                    score +=
                        top_bias * 0.08 + compact_token_bonus - spillover_penalty
                            - vertical_shape_penalty;
                }

                if field == FieldKey::CountryOfOrigin {
                    let lower_bias = (clamped_box.center_y() / max_y - 0.35).max(0.0);
                    let compact_token_bonus =
                        if expected_tokens.len() == 1 && filtered.len() == 1 { 0.12 } else { 0.0 };
                    let spillover_penalty = unmatched_ratio * 0.34
                        + if expected_tokens.len() == 1 {
                            filtered.len().saturating_sub(1) as f64 * 0.08
                        } else {
                            0.0
                        };
                    score += lower_bias * 0.08 + compact_token_bonus - spillover_penalty;
                }

                score = score - window_penalty - oversized_penalty;

                let is_better = best
                    .as_ref()
                    .is_none_or(|current| score > current.score);
                if is_better {
                    *best = Some(MatchCandidate {
                        text: candidate_text,
                        confidence: average_token_confidence,
                        bbox: clamped_box,
                        score,
                        source: EvidenceSource::Word,
                        token_count: filtered.len(),
                    });
                }
            }
        }
    };

    for cluster in &clusters {
        evaluate_sequence(cluster, &mut best);
    }

    if best.is_none()
        && field == FieldKey::BrandName
        && expected_tokens.len() > 1
        && candidate_tokens.len() > 1
    {
        // Brand words can be spaced apart beyond strict cluster gap thresholds.
        evaluate_sequence(&candidate_tokens, &mut best);
    }

    best.filter(|candidate| candidate.score >= 0.42)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, x0: f64, y0: f64, x1: f64, y1: f64, confidence: f64) -> OcrToken {
        OcrToken {
            text: text.to_string(),
            confidence,
            bbox: BoundingBox::new(x0, y0, x1, y1),
            line_id: None,
        }
    }

    fn amalfi_tokens() -> Vec<OcrToken> {
        vec![
            token("AMALFI", 180.0, 70.0, 330.0, 112.0, 0.92),
            token("COAST", 344.0, 72.0, 502.0, 114.0, 0.91),
            token("DISTILLED", 120.0, 450.0, 260.0, 488.0, 0.93),
            token("BOTTLED", 274.0, 452.0, 398.0, 488.0, 0.94),
            token("LUCIANA", 412.0, 452.0, 535.0, 488.0, 0.89),
            token("SPIRITS", 546.0, 452.0, 650.0, 488.0, 0.9),
            token("ITALY", 300.0, 518.0, 382.0, 552.0, 0.95),
        ]
    }

    #[test]
    fn brand_match_joins_adjacent_upper_tokens() {
        let page = BoundingBox::new(0.0, 0.0, 760.0, 900.0);
        let candidate =
            best_word_match(FieldKey::BrandName, "AMALFI COAST", &amalfi_tokens(), Some(&page))
                .unwrap();
        assert_eq!(candidate.text, "AMALFI COAST");
        assert_eq!(candidate.source, EvidenceSource::Word);
        assert_eq!(candidate.token_count, 2);
        assert!(!candidate.text.contains("DISTILLED"));
    }

    #[test]
    fn brand_search_excludes_address_region_tokens() {
        let page = BoundingBox::new(0.0, 0.0, 760.0, 900.0);
        // Lower-label address words are filtered before windowing, so a brand
        // value that only appears down there finds nothing.
        let candidate =
            best_word_match(FieldKey::BrandName, "LUCIANA SPIRITS", &amalfi_tokens(), Some(&page));
        assert!(candidate.is_none());
    }

    #[test]
    fn country_match_prefers_lower_occurrence() {
        let page = BoundingBox::new(0.0, 0.0, 760.0, 900.0);
        let tokens = vec![
            token("BARBADOS", 150.0, 62.0, 312.0, 116.0, 0.93),
            token("GOLDEN", 324.0, 62.0, 470.0, 116.0, 0.92),
            token("OAK", 484.0, 62.0, 596.0, 116.0, 0.92),
            token("BARBADOS", 266.0, 522.0, 466.0, 566.0, 0.92),
        ];
        let candidate =
            best_word_match(FieldKey::CountryOfOrigin, "BARBADOS", &tokens, Some(&page)).unwrap();
        assert!(candidate.bbox.y0 > 400.0);
    }

    #[test]
    fn empty_inputs_yield_no_candidate() {
        assert!(best_word_match(FieldKey::BrandName, "OLD TOM", &[], None).is_none());
        let tokens = vec![token("OLD", 0.0, 0.0, 50.0, 20.0, 0.9)];
        assert!(best_word_match(FieldKey::BrandName, "!!", &tokens, None).is_none());
    }

    #[test]
    fn name_address_requires_address_signals() {
        let tokens = vec![
            token("SUNRISE", 100.0, 50.0, 300.0, 90.0, 0.95),
            token("IPA", 320.0, 50.0, 400.0, 90.0, 0.95),
        ];
        assert!(
            best_word_match(FieldKey::NameAddress, "Brewed by Example, Denver", &tokens, None)
                .is_none()
        );
    }
}
