//! Alcohol-content verifier.
//!
//! Compares the declared ABV/proof pair against each OCR line that parses as
//! an alcohol statement; the fixed relation proof = 2 x ABV fills in
//! whichever number a statement omits. A whole-page text scan backstops
//! statements fragmented across lines.

use labelgate_kernel::{
    BoundingBox, CanonicalApplication, EvidenceSource, FieldKey, OcrLine, OcrToken,
    ParsedAlcoholContent, VerificationFieldResult, VerificationStatus,
    collapse_whitespace,
    geometry::{compute_evidence_box_area_ratio, is_evidence_box_oversized},
    parse_alcohol_content,
};

use crate::expectation::{FieldExpectation, append_rule_context, format_application_value};
use crate::scoring::{average_confidence, calibrated_confidence};
use crate::text_field::{absent_expectation_result, verify_text_field};

fn format_alcohol_value(parsed: &ParsedAlcoholContent) -> String {
    let mut chunks = Vec::new();
    if let Some(abv) = parsed.abv_percent {
        chunks.push(format!("{abv:.1}% ABV"));
    }
    if let Some(proof) = parsed.proof {
        chunks.push(format!("{proof:.1} PROOF"));
    }

    if chunks.is_empty() {
        "N/A".to_string()
    } else {
        chunks.join(" | ")
    }
}

fn combined_ocr_text(ocr_lines: &[OcrLine]) -> String {
    collapse_whitespace(
        &ocr_lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

struct LineResultParams<'build> {
    expectation: &'build FieldExpectation,
    expected_value: &'build str,
    status: VerificationStatus,
    confidence: Option<f64>,
    reason: String,
    extracted_value: String,
    evidence: Option<(&'build OcrLine, Option<&'build BoundingBox>)>,
}

fn line_result(params: LineResultParams<'_>) -> VerificationFieldResult {
    let (evidence_box, evidence_source, evidence_token_count, area_ratio) = match params.evidence {
        Some((line, page_bounds)) => {
            let ratio = compute_evidence_box_area_ratio(Some(&line.bbox), page_bounds);
            (
                Some(line.bbox),
                EvidenceSource::Line,
                line.text.trim().split_whitespace().count().max(1),
                ratio,
            )
        }
        None => (None, EvidenceSource::None, 0, None),
    };

    VerificationFieldResult {
        field: params.expectation.field,
        label: params.expectation.field.label().to_string(),
        application_value: format_application_value(Some(params.expected_value)),
        extracted_value: params.extracted_value,
        status: params.status,
        confidence: params.confidence,
        reason: params.reason,
        evidence_box,
        evidence_source,
        evidence_token_count,
        evidence_box_area_ratio: area_ratio,
        evidence_oversized: is_evidence_box_oversized(FieldKey::AlcoholContent, area_ratio),
    }
}

pub(crate) fn verify_alcohol_field(
    expectation: &FieldExpectation,
    application: &CanonicalApplication,
    ocr_lines: &[OcrLine],
    ocr_tokens: &[OcrToken],
    page_bounds: Option<&BoundingBox>,
) -> VerificationFieldResult {
    if let Some(result) = absent_expectation_result(expectation, "Missing required alcohol value.")
    {
        return result;
    }
    let expected_value = expectation
        .expected_value
        .clone()
        .expect("absent expectation handled above");

    let Some(expected_alcohol) = parse_alcohol_content(&expected_value) else {
        // Unparsable expectations fall back to plain text matching.
        return verify_text_field(expectation, ocr_lines, ocr_tokens, page_bounds);
    };

    let mut best: Option<(&OcrLine, f64, ParsedAlcoholContent)> = None;
    for line in ocr_lines {
        let Some(parsed) = parse_alcohol_content(&line.text) else {
            continue;
        };

        let abv_score = match expected_alcohol.abv_percent {
            Some(expected_abv) => match parsed.abv_percent {
                Some(parsed_abv) => (1.0 - (expected_abv - parsed_abv).abs() / 3.0).max(0.0),
                None => 0.0,
            },
            None => 1.0,
        };
        let proof_score = match expected_alcohol.proof {
            Some(expected_proof) => match parsed.proof {
                Some(parsed_proof) => (1.0 - (expected_proof - parsed_proof).abs() / 6.0).max(0.0),
                None => 0.0,
            },
            None => 1.0,
        };

        let normalized_score = (abv_score + proof_score) / 2.0 * 0.8 + line.confidence * 0.2;
        if best
            .as_ref()
            .is_none_or(|(_, best_score, _)| normalized_score > *best_score)
        {
            best = Some((line, normalized_score, parsed));
        }
    }

    let Some((best_line, best_score, best_parsed)) = best else {
        let full_text = combined_ocr_text(ocr_lines);
        if let Some(full_text_alcohol) = parse_alcohol_content(&full_text) {
            return line_result(LineResultParams {
                expectation,
                expected_value: &expected_value,
                status: VerificationStatus::NeedsReview,
                confidence: average_confidence(ocr_lines.iter().map(|line| line.confidence)),
                reason: "Alcohol content appears across multiple OCR lines and needs manual confirmation."
                    .to_string(),
                extracted_value: format!(
                    "Detected across multiple OCR lines ({})",
                    format_alcohol_value(&full_text_alcohol)
                ),
                evidence: None,
            });
        }

        let (status, reason) = if expectation.is_required {
            (
                VerificationStatus::Missing,
                "Alcohol content was not detected on label OCR output.".to_string(),
            )
        } else {
            (
                VerificationStatus::Pass,
                append_rule_context(
                    &expectation.requirement_reason,
                    &expectation.supporting_rule_ids,
                ),
            )
        };
        return line_result(LineResultParams {
            expectation,
            expected_value: &expected_value,
            status,
            confidence: None,
            reason,
            extracted_value: "Not detected in OCR output".to_string(),
            evidence: None,
        });
    };

    let abv_diff = match (expected_alcohol.abv_percent, best_parsed.abv_percent) {
        (Some(expected), Some(parsed)) => Some((expected - parsed).abs()),
        _ => None,
    };
    let proof_diff = match (expected_alcohol.proof, best_parsed.proof) {
        (Some(expected), Some(parsed)) => Some((expected - parsed).abs()),
        _ => None,
    };

    let abv_strong_match = abv_diff.is_none_or(|diff| diff <= 0.3);
    let proof_strong_match = proof_diff.is_none_or(|diff| diff <= 1.0);
    let abv_near_match = abv_diff.is_none_or(|diff| diff <= 1.0);
    let proof_near_match = proof_diff.is_none_or(|diff| diff <= 3.0);

    let normalized_extracted = format!(
        "{} ({})",
        best_line.text,
        format_alcohol_value(&best_parsed)
    );
    let resolved_confidence = calibrated_confidence(best_line.confidence, best_score);

    if abv_strong_match && proof_strong_match && best_line.confidence >= 0.55 {
        return line_result(LineResultParams {
            expectation,
            expected_value: &expected_value,
            status: VerificationStatus::Pass,
            confidence: Some(resolved_confidence),
            reason: format!(
                "{} alcohol-content comparison passed normalized ABV/proof checks.",
                application.alcohol_class.as_str()
            ),
            extracted_value: normalized_extracted,
            evidence: Some((best_line, page_bounds)),
        });
    }

    if abv_near_match && proof_near_match {
        return line_result(LineResultParams {
            expectation,
            expected_value: &expected_value,
            status: VerificationStatus::NeedsReview,
            confidence: Some(resolved_confidence),
            reason: "Alcohol values were close but below strict pass tolerances after normalization."
                .to_string(),
            extracted_value: normalized_extracted,
            evidence: Some((best_line, page_bounds)),
        });
    }

    if best_line.confidence >= 0.65 {
        return line_result(LineResultParams {
            expectation,
            expected_value: &expected_value,
            status: VerificationStatus::Fail,
            confidence: Some(resolved_confidence),
            reason: "Alcohol value mismatch was detected with high OCR confidence.".to_string(),
            extracted_value: normalized_extracted,
            evidence: Some((best_line, page_bounds)),
        });
    }

    line_result(LineResultParams {
        expectation,
        expected_value: &expected_value,
        status: VerificationStatus::NeedsReview,
        confidence: Some(resolved_confidence),
        reason: "Alcohol value mismatch is ambiguous at current OCR confidence.".to_string(),
        extracted_value: normalized_extracted,
        evidence: Some((best_line, page_bounds)),
    })
}
