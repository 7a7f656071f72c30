//! The shared text-field verifier: brand, class/type, name/address, country.
//!
//! Two candidate searches run independently and a field-aware tie-break
//! keeps the stronger one; the winner is then classified against the
//! field's pass thresholds.

use labelgate_kernel::{
    BoundingBox, EvidenceSource, FieldKey, OcrLine, OcrToken, VerificationFieldResult,
    VerificationStatus,
    geometry::{compute_evidence_box_area_ratio, is_evidence_box_oversized},
    tokenize_normalized,
};

use crate::expectation::{FieldExpectation, append_rule_context, format_application_value};
use crate::line_match::best_line_match;
use crate::project::{best_anchor_line_for_single_token, projected_token_box_from_line};
use crate::scoring::{
    MatchCandidate, approximate_token_coverage, calibrated_confidence, field_thresholds,
    is_address_like_text, unmatched_candidate_token_ratio,
};
use crate::word_match::best_word_match;

fn empty_evidence_result(
    expectation: &FieldExpectation,
    application_value: String,
    extracted_value: &str,
    status: VerificationStatus,
    reason: String,
) -> VerificationFieldResult {
    VerificationFieldResult {
        field: expectation.field,
        label: expectation.field.label().to_string(),
        application_value,
        extracted_value: extracted_value.to_string(),
        status,
        confidence: None,
        reason,
        evidence_box: None,
        evidence_source: EvidenceSource::None,
        evidence_token_count: 0,
        evidence_box_area_ratio: None,
        evidence_oversized: false,
    }
}

/// Handle the two no-expected-value outcomes shared by every verifier:
/// vacuous Pass when the field is not required, Needs Review when it is.
pub(crate) fn absent_expectation_result(
    expectation: &FieldExpectation,
    missing_reason: &str,
) -> Option<VerificationFieldResult> {
    if expectation.expected_value.is_some() {
        return None;
    }

    if !expectation.is_required {
        return Some(empty_evidence_result(
            expectation,
            "N/A (not required for this application)".to_string(),
            "N/A",
            VerificationStatus::Pass,
            append_rule_context(&expectation.requirement_reason, &expectation.supporting_rule_ids),
        ));
    }

    Some(empty_evidence_result(
        expectation,
        "Missing from application JSON".to_string(),
        "N/A",
        VerificationStatus::NeedsReview,
        append_rule_context(
            &format!("{missing_reason} {}", expectation.requirement_reason),
            &expectation.supporting_rule_ids,
        ),
    ))
}

fn select_candidate(
    expectation: &FieldExpectation,
    expected_tokens: &[String],
    word_candidate: Option<MatchCandidate>,
    line_candidate: &Option<MatchCandidate>,
    page_bounds: Option<&BoundingBox>,
    ocr_lines: &[OcrLine],
) -> Option<MatchCandidate> {
    let field = expectation.field;
    let expected_token_count = expected_tokens.len();
    let line_oversized = line_candidate.as_ref().is_some_and(|candidate| {
        let ratio = compute_evidence_box_area_ratio(Some(&candidate.bbox), page_bounds);
        is_evidence_box_oversized(field, ratio)
    });

    let mut selected = line_candidate.clone();
    match (word_candidate, line_candidate) {
        (Some(word), None) => selected = Some(word),
        (Some(word), Some(line)) => match field {
            FieldKey::BrandName => {
                let prefer_word_for_multi_word_brand =
                    expected_token_count > 1 && word.token_count >= expected_token_count.min(2);
                if prefer_word_for_multi_word_brand
                    || line_oversized
                    || is_address_like_text(&line.text)
                    || word.score >= line.score - 0.02
                {
                    selected = Some(word);
                }
            }
            FieldKey::ClassTypeDesignation | FieldKey::CountryOfOrigin => {
                let word_token_count = tokenize_normalized(&word.text).len();
                let line_token_count = tokenize_normalized(&line.text).len();
                let word_box_aspect_ratio = word.bbox.aspect_ratio();
                let word_coverage = approximate_token_coverage(expected_tokens, &word.text);
                let single_token_spatial_mismatch = expected_token_count == 1
                    && word_token_count == 1
                    && line_token_count == 1
                    && word.bbox.overlap_ratio(&line.bbox) < 0.22;
                let prefer_compact_word_match = expected_token_count == 1
                    && word_token_count == 1
                    && line_token_count > 1
                    && word_coverage >= 0.95;
                let suspicious_compact_word_match = expected_token_count == 1
                    && word_token_count == 1
                    && word_box_aspect_ratio < 0.9
                    && line_token_count == 1;
                let projected_compact_word_box = if field == FieldKey::ClassTypeDesignation
                    && expected_token_count == 1
                    && word_token_count == 1
                    && word_box_aspect_ratio < 0.9
                    && line_token_count > 1
                {
                    let anchor = OcrLine {
                        text: line.text.clone(),
                        confidence: line.confidence,
                        bbox: line.bbox,
                        polygon: None,
                    };
                    projected_token_box_from_line(&anchor, &expected_tokens[0], field)
                } else {
                    None
                };

                if let Some(projected_box) = projected_compact_word_box {
                    selected = Some(MatchCandidate {
                        score: word.score.max(line.score - 0.02),
                        bbox: projected_box,
                        ..word
                    });
                } else if single_token_spatial_mismatch || suspicious_compact_word_match {
                    selected = line_candidate.clone();
                } else if prefer_compact_word_match
                    || (word.score >= line.score - 0.04 && word_token_count < line_token_count)
                    || (line_oversized && word.score >= line.score - 0.03)
                    || word.score >= line.score + 0.08
                {
                    selected = Some(word);
                }
            }
            _ => {
                if (line_oversized && word.score >= line.score - 0.03)
                    || word.score >= line.score + 0.08
                {
                    selected = Some(word);
                }
            }
        },
        (None, _) => {}
    }

    // Thin single-token evidence gets re-projected onto the matching line's
    // character-offset span.
    let repaired_box = selected.as_ref().and_then(|candidate| {
        let should_repair = expected_token_count == 1
            && (field == FieldKey::BrandName || field == FieldKey::ClassTypeDesignation)
            && tokenize_normalized(&candidate.text).len() == 1;
        if !should_repair {
            return None;
        }

        let current_aspect_ratio = candidate.bbox.aspect_ratio();
        if current_aspect_ratio >= 1.05 {
            return None;
        }

        let anchor = best_anchor_line_for_single_token(&expected_tokens[0], ocr_lines)
            .cloned()
            .or_else(|| {
                line_candidate.as_ref().map(|line| OcrLine {
                    text: line.text.clone(),
                    confidence: line.confidence,
                    bbox: line.bbox,
                    polygon: None,
                })
            })?;
        projected_token_box_from_line(&anchor, &expected_tokens[0], field)
            .filter(|projected_box| projected_box.aspect_ratio() > current_aspect_ratio + 0.2)
    });
    if let (Some(candidate), Some(projected_box)) = (selected.as_mut(), repaired_box) {
        candidate.bbox = projected_box;
    }

    selected
}

pub(crate) fn verify_text_field(
    expectation: &FieldExpectation,
    ocr_lines: &[OcrLine],
    ocr_tokens: &[OcrToken],
    page_bounds: Option<&BoundingBox>,
) -> VerificationFieldResult {
    if let Some(result) =
        absent_expectation_result(expectation, "Required field is missing in application JSON.")
    {
        return result;
    }
    let expected_value = expectation
        .expected_value
        .clone()
        .expect("absent expectation handled above");

    let word_candidate =
        best_word_match(expectation.field, &expected_value, ocr_tokens, page_bounds);
    let line_candidate = best_line_match(expectation.field, &expected_value, ocr_lines);
    let expected_tokens = tokenize_normalized(&expected_value);
    let expected_token_count = expected_tokens.len();

    let Some(match_candidate) = select_candidate(
        expectation,
        &expected_tokens,
        word_candidate,
        &line_candidate,
        page_bounds,
        ocr_lines,
    ) else {
        return empty_evidence_result(
            expectation,
            format_application_value(Some(&expected_value)),
            "Not detected in OCR output",
            VerificationStatus::Missing,
            "No OCR line matched the expected value with enough confidence.".to_string(),
        );
    };

    let resolved_confidence =
        calibrated_confidence(match_candidate.confidence, match_candidate.score);
    let matched_token_coverage =
        approximate_token_coverage(&expected_tokens, &match_candidate.text);
    let area_ratio = compute_evidence_box_area_ratio(Some(&match_candidate.bbox), page_bounds);
    let oversized = is_evidence_box_oversized(expectation.field, area_ratio);
    let spillover_ratio = unmatched_candidate_token_ratio(&expected_tokens, &match_candidate.text);
    let single_token_spillover = (expectation.field == FieldKey::ClassTypeDesignation
        || expectation.field == FieldKey::CountryOfOrigin)
        && expected_token_count == 1
        && spillover_ratio > 0.34;
    let evidence_reason_prefix = if oversized {
        "Evidence area is larger than expected and may include adjacent text. "
    } else {
        ""
    };

    let pass_coverage_threshold = if expected_token_count > 2 { 0.55 } else { 0.35 };
    let thresholds = field_thresholds(expectation.field, expected_token_count);

    let build = |status: VerificationStatus, reason: String| VerificationFieldResult {
        field: expectation.field,
        label: expectation.field.label().to_string(),
        application_value: format_application_value(Some(&expected_value)),
        extracted_value: match_candidate.text.clone(),
        status,
        confidence: Some(resolved_confidence),
        reason,
        evidence_box: Some(match_candidate.bbox),
        evidence_source: match_candidate.source,
        evidence_token_count: match_candidate.token_count,
        evidence_box_area_ratio: area_ratio,
        evidence_oversized: oversized,
    };

    if match_candidate.score >= thresholds.pass_score
        && match_candidate.confidence >= thresholds.pass_confidence
        && matched_token_coverage >= pass_coverage_threshold
        && !single_token_spillover
    {
        return build(
            VerificationStatus::Pass,
            format!(
                "{evidence_reason_prefix}Detected text strongly matches the application value at a high confidence threshold."
            ),
        );
    }

    if match_candidate.score >= 0.75 {
        let close_match_reason = if single_token_spillover {
            format!(
                "{evidence_reason_prefix}Detected field text includes extra adjacent label words and needs manual confirmation."
            )
        } else {
            format!(
                "{evidence_reason_prefix}Detected text is close to expected but below strict pass threshold."
            )
        };
        return build(VerificationStatus::NeedsReview, close_match_reason);
    }

    build(
        VerificationStatus::Fail,
        format!(
            "{evidence_reason_prefix}Detected text does not match the application value under conservative matching rules."
        ),
    )
}
