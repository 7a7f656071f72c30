//! Net-contents verifier.
//!
//! Normalizes every volume statement to milliliters before comparing, and
//! checks the unit system against the class convention (beer in U.S.
//! customary, wine/spirits in metric). When no single line parses, three
//! fallbacks apply in order: adjacent-line reconstruction, whole-text
//! parsing, and a numeric-only line accepted with an explicit
//! "unit unclear" annotation.

use std::sync::LazyLock;

use regex::Regex;

use labelgate_kernel::{
    BoundingBox, CanonicalApplication, EvidenceSource, FieldKey, OcrLine, OcrToken,
    ParsedNetContents, VerificationFieldResult, VerificationStatus,
    collapse_whitespace,
    geometry::{compute_evidence_box_area_ratio, is_evidence_box_oversized, merge_evidence_boxes},
    parse_net_contents,
};
use labelgate_policy::net_unit_policy;

use crate::expectation::{FieldExpectation, append_rule_context, format_application_value};
use crate::scoring::{average_confidence, calibrated_confidence};
use crate::text_field::{absent_expectation_result, verify_text_field};

static BARE_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2,4}(?:\.\d+)?)").unwrap());

struct ResultParams<'build> {
    expectation: &'build FieldExpectation,
    expected_value: &'build str,
    status: VerificationStatus,
    confidence: Option<f64>,
    reason: String,
    extracted_value: String,
    evidence_box: Option<BoundingBox>,
    evidence_token_count: usize,
    page_bounds: Option<&'build BoundingBox>,
}

fn build_result(params: ResultParams<'_>) -> VerificationFieldResult {
    let area_ratio =
        compute_evidence_box_area_ratio(params.evidence_box.as_ref(), params.page_bounds);
    VerificationFieldResult {
        field: params.expectation.field,
        label: params.expectation.field.label().to_string(),
        application_value: format_application_value(Some(params.expected_value)),
        extracted_value: params.extracted_value,
        status: params.status,
        confidence: params.confidence,
        reason: params.reason,
        evidence_source: if params.evidence_box.is_some() {
            EvidenceSource::Line
        } else {
            EvidenceSource::None
        },
        evidence_box: params.evidence_box,
        evidence_token_count: params.evidence_token_count,
        evidence_box_area_ratio: area_ratio,
        evidence_oversized: is_evidence_box_oversized(FieldKey::NetContents, area_ratio),
    }
}

fn line_token_count(line: &OcrLine) -> usize {
    line.text.trim().split_whitespace().count().max(1)
}

pub(crate) fn verify_net_contents_field(
    expectation: &FieldExpectation,
    application: &CanonicalApplication,
    ocr_lines: &[OcrLine],
    ocr_tokens: &[OcrToken],
    page_bounds: Option<&BoundingBox>,
) -> VerificationFieldResult {
    if let Some(result) = absent_expectation_result(
        expectation,
        "Required net contents value is missing in application JSON.",
    ) {
        return result;
    }
    let expected_value = expectation
        .expected_value
        .clone()
        .expect("absent expectation handled above");

    let Some(expected_net_contents) = parse_net_contents(&expected_value) else {
        return verify_text_field(expectation, ocr_lines, ocr_tokens, page_bounds);
    };

    let mut best: Option<(&OcrLine, f64, ParsedNetContents, f64)> = None;
    for line in ocr_lines {
        let Some(parsed) = parse_net_contents(&line.text) else {
            continue;
        };

        let difference_ml = (expected_net_contents.volume_ml - parsed.volume_ml).abs();
        let mut comparison_score = (1.0 - difference_ml / 120.0).max(0.0);
        if parsed.unit == expected_net_contents.unit {
            comparison_score = (comparison_score + 0.12).min(1.0);
        }

        let line_score = comparison_score * 0.8 + line.confidence * 0.2;
        if best
            .as_ref()
            .is_none_or(|(_, best_score, _, _)| line_score > *best_score)
        {
            best = Some((line, line_score, parsed, difference_ml));
        }
    }

    let Some((best_line, best_score, best_parsed, best_difference_ml)) = best else {
        // Fallback 1: number on one line, unit on the next.
        for pair in ocr_lines.windows(2) {
            let combined_text = format!("{} {}", pair[0].text, pair[1].text);
            let Some(parsed_pair) = parse_net_contents(&combined_text) else {
                continue;
            };

            let pair_difference_ml =
                (expected_net_contents.volume_ml - parsed_pair.volume_ml).abs();
            if pair_difference_ml <= 6.0 {
                let pair_confidence =
                    average_confidence(pair.iter().map(|line| line.confidence)).unwrap_or(0.0);
                let status = if pair_difference_ml <= 3.0 {
                    VerificationStatus::Pass
                } else {
                    VerificationStatus::NeedsReview
                };
                return build_result(ResultParams {
                    expectation,
                    expected_value: &expected_value,
                    status,
                    confidence: Some(pair_confidence),
                    reason: "Net contents was reconstructed from adjacent OCR lines because numeric value and unit were split."
                        .to_string(),
                    extracted_value: format!(
                        "{combined_text} ({:.1} mL normalized)",
                        parsed_pair.volume_ml
                    ),
                    evidence_box: merge_evidence_boxes(&[pair[0].bbox, pair[1].bbox]),
                    evidence_token_count: line_token_count(&pair[0]) + line_token_count(&pair[1]),
                    page_bounds,
                });
            }
        }

        // Fallback 2: parse the whole concatenated OCR text.
        let full_text = collapse_whitespace(
            &ocr_lines
                .iter()
                .map(|line| line.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        );
        if let Some(full_text_net_contents) = parse_net_contents(&full_text) {
            let difference_ml =
                (expected_net_contents.volume_ml - full_text_net_contents.volume_ml).abs();
            let status = if difference_ml <= 15.0 {
                VerificationStatus::NeedsReview
            } else {
                VerificationStatus::Fail
            };
            return build_result(ResultParams {
                expectation,
                expected_value: &expected_value,
                status,
                confidence: average_confidence(ocr_lines.iter().map(|line| line.confidence)),
                reason: "Net contents was detected from combined OCR text, but token-level evidence was fragmented."
                    .to_string(),
                extracted_value: format!(
                    "Detected across OCR lines ({} {})",
                    full_text_net_contents.value,
                    full_text_net_contents.unit.as_str()
                ),
                evidence_box: None,
                evidence_token_count: 0,
                page_bounds,
            });
        }

        // Fallback 3: OCR often captures "750" but misses "ML" on curved
        // labels. A numeric value close to expected downgrades to review
        // instead of hard-missing so operators can quickly confirm.
        let numeric_only_candidate = ocr_lines
            .iter()
            .filter_map(|line| {
                let captures = BARE_NUMBER_REGEX.captures(&line.text)?;
                let parsed_value: f64 = captures.get(1)?.as_str().parse().ok()?;
                let difference_ml = (expected_net_contents.volume_ml - parsed_value).abs();
                Some((line, parsed_value, difference_ml))
            })
            .min_by(|left, right| {
                left.2
                    .partial_cmp(&right.2)
                    .unwrap()
                    .then(right.0.confidence.partial_cmp(&left.0.confidence).unwrap())
            });

        if let Some((line, _, difference_ml)) = numeric_only_candidate {
            if difference_ml <= 12.0 {
                return build_result(ResultParams {
                    expectation,
                    expected_value: &expected_value,
                    status: VerificationStatus::NeedsReview,
                    confidence: Some(line.confidence),
                    reason: "Detected numeric net-contents value is close to expected, but OCR did not confidently capture the unit."
                        .to_string(),
                    extracted_value: format!("{} (unit unclear)", line.text),
                    evidence_box: Some(line.bbox),
                    evidence_token_count: line_token_count(line),
                    page_bounds,
                });
            }
        }

        let (status, reason) = if expectation.is_required {
            (
                VerificationStatus::Missing,
                "Net contents statement was not detected on the label.".to_string(),
            )
        } else {
            (
                VerificationStatus::Pass,
                expectation.requirement_reason.clone(),
            )
        };
        return build_result(ResultParams {
            expectation,
            expected_value: &expected_value,
            status,
            confidence: None,
            reason,
            extracted_value: "Not detected in OCR output".to_string(),
            evidence_box: None,
            evidence_token_count: 0,
            page_bounds,
        });
    };

    let unit_policy = net_unit_policy(application.alcohol_class, best_parsed.unit_system);
    let normalized_extracted =
        format!("{} ({:.1} mL normalized)", best_line.text, best_parsed.volume_ml);
    let resolved_confidence = calibrated_confidence(best_line.confidence, best_score);

    if best_difference_ml <= 3.0 && best_line.confidence >= 0.55 {
        if unit_policy.is_preferred_unit {
            return build_result(ResultParams {
                expectation,
                expected_value: &expected_value,
                status: VerificationStatus::Pass,
                confidence: Some(resolved_confidence),
                reason: "Net contents matched expected value after unit normalization.".to_string(),
                extracted_value: normalized_extracted,
                evidence_box: Some(best_line.bbox),
                evidence_token_count: line_token_count(best_line),
                page_bounds,
            });
        }

        return build_result(ResultParams {
            expectation,
            expected_value: &expected_value,
            status: VerificationStatus::NeedsReview,
            confidence: Some(resolved_confidence),
            reason: format!(
                "Value matched but unit system differs from expected {} convention for class.",
                match unit_policy.expected_unit_system {
                    labelgate_kernel::UnitSystem::Metric => "metric",
                    labelgate_kernel::UnitSystem::UsCustomary => "us_customary",
                    labelgate_kernel::UnitSystem::Neutral => "neutral",
                }
            ),
            extracted_value: normalized_extracted,
            evidence_box: Some(best_line.bbox),
            evidence_token_count: line_token_count(best_line),
            page_bounds,
        });
    }

    if best_difference_ml <= 15.0 {
        return build_result(ResultParams {
            expectation,
            expected_value: &expected_value,
            status: VerificationStatus::NeedsReview,
            confidence: Some(resolved_confidence),
            reason: "Net contents were close after normalization but not within strict pass tolerance."
                .to_string(),
            extracted_value: normalized_extracted,
            evidence_box: Some(best_line.bbox),
            evidence_token_count: line_token_count(best_line),
            page_bounds,
        });
    }

    if best_line.confidence < 0.6 {
        return build_result(ResultParams {
            expectation,
            expected_value: &expected_value,
            status: VerificationStatus::NeedsReview,
            confidence: Some(resolved_confidence),
            reason: "Net contents mismatch is uncertain because OCR confidence is low.".to_string(),
            extracted_value: normalized_extracted,
            evidence_box: Some(best_line.bbox),
            evidence_token_count: line_token_count(best_line),
            page_bounds,
        });
    }

    build_result(ResultParams {
        expectation,
        expected_value: &expected_value,
        status: VerificationStatus::Fail,
        confidence: Some(resolved_confidence),
        reason: "Net contents differ from application value after unit normalization.".to_string(),
        extracted_value: normalized_extracted,
        evidence_box: Some(best_line.bbox),
        evidence_token_count: line_token_count(best_line),
        page_bounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelgate_kernel::{AlcoholClass, ApplicationFields, SourceSchema};

    fn application(alcohol_class: AlcoholClass) -> CanonicalApplication {
        CanonicalApplication {
            application_id: "APP-1".to_string(),
            alcohol_class,
            is_import: false,
            fields: ApplicationFields {
                brand_name: Some("OLD TOM".to_string()),
                class_type_designation: Some("BOURBON".to_string()),
                alcohol_content: Some("90 PROOF".to_string()),
                net_contents: Some("750 ML".to_string()),
                name_address: None,
                country_of_origin: None,
                government_warning_required: true,
                government_warning_text: "GOVERNMENT WARNING: ...".to_string(),
            },
            source_schema: SourceSchema::LegacyTestForm,
        }
    }

    fn expectation(value: Option<&str>, required: bool) -> FieldExpectation {
        FieldExpectation {
            field: FieldKey::NetContents,
            expected_value: value.map(str::to_string),
            is_required: required,
            requirement_reason: "This field is required for the selected alcohol class."
                .to_string(),
            supporting_rule_ids: vec!["DS-05".to_string()],
        }
    }

    fn line(text: &str, row: usize, confidence: f64) -> OcrLine {
        OcrLine {
            text: text.to_string(),
            confidence,
            bbox: BoundingBox::new(
                24.0,
                24.0 + row as f64 * 20.0,
                700.0,
                24.0 + row as f64 * 20.0 + 16.0,
            ),
            polygon: None,
        }
    }

    #[test]
    fn matching_metric_statement_passes_for_spirits() {
        let lines = vec![line("750 ML", 3, 0.95)];
        let result = verify_net_contents_field(
            &expectation(Some("750 ML"), true),
            &application(AlcoholClass::DistilledSpirits),
            &lines,
            &[],
            None,
        );
        assert_eq!(result.status, VerificationStatus::Pass);
        assert!(result.extracted_value.contains("750.0 mL normalized"));
    }

    #[test]
    fn cross_unit_equivalence_downgrades_on_unit_system() {
        // 25.36 fl oz is 750 mL, but spirits labels are expected in metric.
        let lines = vec![line("25.36 FL OZ", 3, 0.92)];
        let result = verify_net_contents_field(
            &expectation(Some("750 ML"), true),
            &application(AlcoholClass::DistilledSpirits),
            &lines,
            &[],
            None,
        );
        assert_eq!(result.status, VerificationStatus::NeedsReview);
        assert!(result.reason.contains("metric"));
    }

    #[test]
    fn us_customary_is_preferred_for_beer() {
        let lines = vec![line("12 FL OZ", 2, 0.95)];
        let result = verify_net_contents_field(
            &expectation(Some("12 FL OZ"), true),
            &application(AlcoholClass::Beer),
            &lines,
            &[],
            None,
        );
        assert_eq!(result.status, VerificationStatus::Pass);
    }

    #[test]
    fn adjacent_lines_reconstruct_split_statement() {
        let lines = vec![line("750", 3, 0.9), line("ML", 4, 0.9)];
        let result = verify_net_contents_field(
            &expectation(Some("750 ML"), true),
            &application(AlcoholClass::DistilledSpirits),
            &lines,
            &[],
            None,
        );
        assert_eq!(result.status, VerificationStatus::Pass);
        assert!(result.reason.contains("reconstructed from adjacent OCR lines"));
    }

    #[test]
    fn numeric_only_line_needs_review_with_unit_annotation() {
        let lines = vec![line("OLD TOM", 0, 0.95), line("750", 3, 0.93)];
        let result = verify_net_contents_field(
            &expectation(Some("750 ML"), true),
            &application(AlcoholClass::DistilledSpirits),
            &lines,
            &[],
            None,
        );
        assert_eq!(result.status, VerificationStatus::NeedsReview);
        assert!(result.extracted_value.contains("(unit unclear)"));
    }

    #[test]
    fn distant_volume_fails() {
        let lines = vec![line("375 ML", 3, 0.95)];
        let result = verify_net_contents_field(
            &expectation(Some("750 ML"), true),
            &application(AlcoholClass::DistilledSpirits),
            &lines,
            &[],
            None,
        );
        assert_eq!(result.status, VerificationStatus::Fail);
    }

    #[test]
    fn undetectable_required_value_is_missing() {
        let lines = vec![line("OLD TOM", 0, 0.95)];
        let result = verify_net_contents_field(
            &expectation(Some("750 ML"), true),
            &application(AlcoholClass::DistilledSpirits),
            &lines,
            &[],
            None,
        );
        assert_eq!(result.status, VerificationStatus::Missing);
    }
}
