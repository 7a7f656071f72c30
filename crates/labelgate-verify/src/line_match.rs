//! Line-level candidate search, plus the multi-line aggregate candidate used
//! for brand and address statements that wrap across rows.

use labelgate_kernel::{
    EvidenceSource, FieldKey, OcrLine, collapse_whitespace, dice_coefficient,
    geometry::merge_evidence_boxes, normalize_text, normalized_includes, tokenize_normalized,
};

use crate::scoring::{
    MatchCandidate, approximate_token_coverage, average_confidence, brand_class_leak_penalty,
    is_address_like_text, is_mostly_uppercase, unmatched_candidate_token_ratio,
};

fn max_line_y(ocr_lines: &[OcrLine]) -> f64 {
    ocr_lines
        .iter()
        .fold(1.0_f64, |largest, line| largest.max(line.bbox.y1))
}

/// Union of all lines whose tokens approximately cover the expected value,
/// for multi-line brand/address statements.
pub(crate) fn aggregate_match_candidate(
    field: FieldKey,
    expected_value: &str,
    ocr_lines: &[OcrLine],
) -> Option<MatchCandidate> {
    let normalized_tokens = tokenize_normalized(expected_value);
    if normalized_tokens.is_empty() {
        return None;
    }

    let max_y = max_line_y(ocr_lines);
    let token_lines: Vec<&OcrLine> = ocr_lines
        .iter()
        .filter(|line| {
            let normalized_line = normalize_text(&line.text);
            let exact_token_match = normalized_tokens
                .iter()
                .any(|token| normalized_line.contains(token.as_str()));
            exact_token_match
                || approximate_token_coverage(&normalized_tokens, &line.text) >= 0.5
        })
        .collect();

    let filtered_token_lines: Vec<&OcrLine> = match field {
        FieldKey::BrandName => token_lines
            .into_iter()
            .filter(|line| {
                let is_upper_region = line.bbox.center_y() <= max_y * 0.65;
                is_upper_region && !is_address_like_text(&line.text)
            })
            .collect(),
        FieldKey::NameAddress => token_lines
            .into_iter()
            .filter(|line| {
                let is_lower_region = line.bbox.center_y() >= max_y * 0.45;
                let has_address_signal = is_address_like_text(&line.text)
                    || line.text.contains(',')
                    || line.text.chars().any(|ch| ch.is_ascii_digit());
                is_lower_region && has_address_signal
            })
            .collect(),
        _ => token_lines,
    };

    if filtered_token_lines.is_empty() {
        return None;
    }

    let aggregate_text = collapse_whitespace(
        &filtered_token_lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    );
    let aggregate_confidence =
        average_confidence(filtered_token_lines.iter().map(|line| line.confidence)).unwrap_or(0.0);
    let includes_expected = normalized_includes(&aggregate_text, expected_value);
    let similarity = dice_coefficient(expected_value, &aggregate_text);
    let token_coverage = approximate_token_coverage(&normalized_tokens, &aggregate_text);

    let aggregate_score = similarity
        .max(if includes_expected { 0.97 } else { 0.0 })
        .max(token_coverage)
        * 0.75
        + aggregate_confidence * 0.25;

    if aggregate_score < 0.5 {
        return None;
    }

    let merged_box = merge_evidence_boxes(
        &filtered_token_lines
            .iter()
            .map(|line| line.bbox)
            .collect::<Vec<_>>(),
    )?;

    Some(MatchCandidate {
        text: aggregate_text,
        confidence: aggregate_confidence,
        bbox: merged_box,
        score: aggregate_score,
        source: EvidenceSource::Line,
        token_count: filtered_token_lines.len(),
    })
}

pub(crate) fn best_line_match(
    field: FieldKey,
    expected_value: &str,
    ocr_lines: &[OcrLine],
) -> Option<MatchCandidate> {
    let mut best: Option<MatchCandidate> = None;
    let normalized_tokens = tokenize_normalized(expected_value);
    let max_y = max_line_y(ocr_lines);

    for line in ocr_lines {
        if field == FieldKey::NameAddress && line.bbox.center_y() <= max_y * 0.45 {
            continue;
        }

        let similarity = dice_coefficient(expected_value, &line.text);
        let includes_match = normalized_includes(&line.text, expected_value);
        let normalized_line_text = normalize_text(&line.text);
        let unmatched_ratio = unmatched_candidate_token_ratio(&normalized_tokens, &line.text);
        let line_token_count = tokenize_normalized(&line.text).len();
        let expected_contains_line = normalized_includes(expected_value, &line.text)
            && (normalized_line_text.len() >= 4 || line_token_count >= 2);

        let class_single_token_boost = if field == FieldKey::ClassTypeDesignation
            && normalized_tokens.len() == 1
            && includes_match
        {
            (0.99 - unmatched_ratio * 0.72).max(0.72)
        } else {
            0.0
        };
        let country_single_token_boost = if field == FieldKey::CountryOfOrigin
            && normalized_tokens.len() == 1
            && includes_match
        {
            (0.99 - unmatched_ratio * 0.62).max(0.76)
        } else {
            0.0
        };

        let includes_component = if class_single_token_boost > 0.0 {
            class_single_token_boost
        } else if country_single_token_boost > 0.0 {
            country_single_token_boost
        } else if includes_match {
            0.99
        } else {
            0.0
        };
        let line_score_base = similarity
            .max(includes_component)
            .max(if expected_contains_line { 0.8 } else { 0.0 });

        let mut line_score = line_score_base * 0.8 + line.confidence * 0.2;
        let token_coverage = approximate_token_coverage(&normalized_tokens, &line.text);

        if field == FieldKey::BrandName {
            let top_bias = 1.0 - line.bbox.center_y() / max_y;
            let uppercase_bonus = if is_mostly_uppercase(&line.text) { 0.05 } else { 0.0 };
            let long_line_penalty =
                if line.text.trim().split_whitespace().count() > 6 { 0.12 } else { 0.0 };
            let address_penalty = if is_address_like_text(&line.text) { 0.38 } else { 0.0 };
            let unmatched_penalty = unmatched_ratio * 0.2;
            let class_leak_penalty = brand_class_leak_penalty(expected_value, &line.text);
            line_score = line_score * 0.7
                + token_coverage * 0.3
                + top_bias.max(0.0) * 0.08
                + uppercase_bonus
                - long_line_penalty
                - address_penalty
                - unmatched_penalty
                - class_leak_penalty;
        }

        if field == FieldKey::NameAddress {
            if is_address_like_text(&line.text) {
                line_score += 0.22;
            }
            if line.text.contains(',') || line.text.chars().any(|ch| ch.is_ascii_digit()) {
                line_score += 0.08;
            }
            if token_coverage < 0.35 {
                line_score -= 0.22;
            }
            if normalized_line_text.len() < 6 {
                line_score -= 0.18;
            }
        }

        if field == FieldKey::ClassTypeDesignation {
            let top_bias = (1.0 - line.bbox.center_y() / max_y).max(0.0);
            let compact_token_bonus =
                if normalized_tokens.len() == 1 && line_token_count == 1 { 0.16 } else { 0.0 };
            let spillover_penalty = unmatched_ratio * 0.36
                + if normalized_tokens.len() == 1 {
                    line_token_count.saturating_sub(1) as f64 * 0.08
                } else {
                    0.0
                };
            line_score += top_bias * 0.08 + compact_token_bonus - spillover_penalty;
        }

        if field == FieldKey::CountryOfOrigin {
            let lower_bias = (line.bbox.center_y() / max_y - 0.35).max(0.0);
            let compact_token_bonus =
                if normalized_tokens.len() == 1 && line_token_count == 1 { 0.12 } else { 0.0 };
            let spillover_penalty = unmatched_ratio * 0.34
                + if normalized_tokens.len() == 1 {
                    line_token_count.saturating_sub(1) as f64 * 0.08
                } else {
                    0.0
                };
            line_score += lower_bias * 0.08 + compact_token_bonus - spillover_penalty;
        }

        let is_better = best.as_ref().is_none_or(|current| line_score > current.score);
        if is_better {
            best = Some(MatchCandidate {
                text: line.text.clone(),
                confidence: line.confidence,
                bbox: line.bbox,
                score: line_score,
                source: EvidenceSource::Line,
                token_count: line.text.trim().split_whitespace().count().max(1),
            });
        }
    }

    if field == FieldKey::BrandName || field == FieldKey::NameAddress {
        if let Some(aggregate) = aggregate_match_candidate(field, expected_value, ocr_lines) {
            let prefer_aggregate_for_address = field == FieldKey::NameAddress
                && best.as_ref().is_some_and(|current| {
                    aggregate.token_count >= (current.token_count + 2).max(4)
                        && aggregate.score >= current.score - 0.2
                });

            let aggregate_wins = best
                .as_ref()
                .is_none_or(|current| aggregate.score > current.score);
            if aggregate_wins || prefer_aggregate_for_address {
                best = Some(aggregate);
            }
        }
    }

    let minimum_score = if field == FieldKey::BrandName { 0.28 } else { 0.4 };
    best.filter(|candidate| candidate.score >= minimum_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelgate_kernel::BoundingBox;

    fn line(text: &str, row: usize, confidence: f64) -> OcrLine {
        OcrLine {
            text: text.to_string(),
            confidence,
            bbox: BoundingBox::new(
                20.0,
                20.0 + row as f64 * 20.0,
                720.0,
                20.0 + row as f64 * 20.0 + 16.0,
            ),
            polygon: None,
        }
    }

    #[test]
    fn exact_line_match_scores_high() {
        let lines = vec![
            line("OLD TOM", 0, 0.95),
            line("BOURBON", 1, 0.95),
            line("750 ML", 3, 0.95),
        ];
        let candidate = best_line_match(FieldKey::BrandName, "OLD TOM", &lines).unwrap();
        assert_eq!(candidate.text, "OLD TOM");
        assert!(candidate.score > 0.93);
    }

    #[test]
    fn country_prefers_compact_dedicated_line() {
        let lines = vec![
            line("BARBADOS GOLDEN OAK", 0, 0.93),
            line("RUM", 1, 0.92),
            line("BARBADOS", 8, 0.91),
        ];
        let candidate = best_line_match(FieldKey::CountryOfOrigin, "BARBADOS", &lines).unwrap();
        assert_eq!(candidate.text, "BARBADOS");
        assert!(candidate.bbox.y0 > 100.0);
    }

    #[test]
    fn name_address_skips_upper_label_lines() {
        let lines = vec![
            line("Bottled By Example Co., Denver, CO", 0, 0.95),
            line("SOMETHING ELSE", 9, 0.9),
        ];
        // The only address-like line sits in the top region, so it is skipped
        // and the remaining candidate scores below the floor.
        assert!(
            best_line_match(FieldKey::NameAddress, "Bottled By Example Co., Denver, CO", &lines)
                .is_none()
        );
    }

    #[test]
    fn aggregate_unions_wrapped_address_lines() {
        let lines = vec![
            line("SUNRISE", 0, 0.95),
            line("Brewed and Bottled by", 6, 0.93),
            line("Example Brewing Co., Denver, CO", 7, 0.92),
        ];
        let candidate = aggregate_match_candidate(
            FieldKey::NameAddress,
            "Brewed and Bottled by Example Brewing Co., Denver, CO",
            &lines,
        )
        .unwrap();
        assert_eq!(candidate.token_count, 2);
        assert!(candidate.text.contains("Denver"));
        assert!(!candidate.text.contains("SUNRISE"));
    }

    #[test]
    fn low_similarity_lines_fall_below_floor() {
        let lines = vec![line("COMPLETELY DIFFERENT", 0, 0.95)];
        assert!(best_line_match(FieldKey::ClassTypeDesignation, "BOURBON", &lines).is_none());
    }
}
