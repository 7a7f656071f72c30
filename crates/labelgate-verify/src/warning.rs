//! Government-warning verifier.
//!
//! Locates the warning anchor line, reconstructs the full multi-line
//! statement in reading order, applies a fixed table of OCR-typo
//! corrections, and then holds the result to the strict statutory checks:
//! an uppercase "GOVERNMENT WARNING:" prefix and an exact ordered-token
//! body match.

use std::sync::LazyLock;

use regex::Regex;

use labelgate_kernel::{
    CanonicalApplication, EvidenceSource, FieldKey, OcrLine, VerificationFieldResult,
    VerificationStatus, collapse_whitespace, dice_coefficient,
    geometry::{compute_evidence_box_area_ratio, is_evidence_box_oversized, merge_evidence_boxes},
    normalize_text, normalized_includes,
};

use crate::expectation::format_application_value;
use crate::scoring::average_confidence;

const WARNING_PREFIX: &str = "GOVERNMENT WARNING:";

static PREFIX_STRIP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^government\s+warning:\s*").unwrap());

struct Correction {
    pattern: Regex,
    replacement: &'static str,
}

/// OCR-typo corrections observed in warning text, applied before the strict
/// body comparison.
static WARNING_CORRECTIONS: LazyLock<Vec<Correction>> = LazyLock::new(|| {
    let correction = |pattern: &str, replacement: &'static str| Correction {
        pattern: Regex::new(pattern).unwrap(),
        replacement,
    };
    vec![
        // Punctuation artifacts.
        correction(r"\s*/\s*", " "),
        correction(r"\(\s*\(", "("),
        // Token merge/split errors.
        correction(r"(?i)\bofthe\b", "of the"),
        correction(r"(?i)\bthe[\.\s]*risk\b", "the risk"),
        correction(r"(?i)\babiity\b", "ability"),
        correction(r"(?i)\bprobiems\b", "problems"),
        correction(r"(?i)\bprob1ems\b", "problems"),
        correction(r"(?i)\bofbirth\b", "of birth"),
        correction(
            r"(?i)\bcnsptionalcoholicbeverages\b",
            "consumption of alcoholic beverages",
        ),
        correction(
            r"(?i)\bconsumptionalcoholicbeverages\b",
            "consumption of alcoholic beverages",
        ),
        correction(
            r"(?i)consumption of alcoholic beverages,\s*and may cause health problems\.?\s*impairs your (?:abiity|ability) to drive a car or operate machinery,?",
            "consumption of alcoholic beverages impairs your ability to drive a car or operate machinery, and may cause health problems",
        ),
        // Clause-marker substitutions.
        correction(r"(?i)\(\s*[il]\s*\)", "(1)"),
        correction(r"(?i)\(\s*z\s*\)", "(2)"),
        correction(r"\(\s*([12])\s*\)\s*", "($1) "),
        correction(r"(?i)\b([12])([a-z])", "$1 $2"),
        correction(r"(?i)\b1o\b", "to"),
    ]
});

fn strip_warning_prefix(value: &str) -> String {
    PREFIX_STRIP_REGEX.replace(value, "").trim().to_string()
}

fn normalize_warning_body_for_comparison(value: &str) -> String {
    let mut corrected = value.to_string();
    for correction in WARNING_CORRECTIONS.iter() {
        corrected = correction
            .pattern
            .replace_all(&corrected, correction.replacement)
            .into_owned();
    }

    normalize_text(&corrected)
}

/// Ordered-subsequence token match: every expected token (except the literal
/// clause digits) must appear in order, and anything left over in the
/// extracted text must be two characters or shorter.
fn is_expected_token_sequence_present(expected: &str, extracted: &str) -> bool {
    let expected_tokens: Vec<&str> = expected
        .split(' ')
        .filter(|token| !token.is_empty() && *token != "1" && *token != "2")
        .collect();
    let extracted_tokens: Vec<&str> =
        extracted.split(' ').filter(|token| !token.is_empty()).collect();
    if expected_tokens.is_empty() {
        return false;
    }

    let mut matched_indices = vec![false; extracted_tokens.len()];
    let mut extracted_index = 0;
    for expected_token in &expected_tokens {
        let mut token_matched = false;
        while extracted_index < extracted_tokens.len() {
            let candidate_index = extracted_index;
            extracted_index += 1;
            if extracted_tokens[candidate_index] == *expected_token {
                matched_indices[candidate_index] = true;
                token_matched = true;
                break;
            }
        }

        if !token_matched {
            return false;
        }
    }

    extracted_tokens
        .iter()
        .zip(matched_indices.iter())
        .all(|(token, matched)| *matched || token.len() <= 2)
}

fn median_line_height(lines: &[OcrLine]) -> f64 {
    if lines.is_empty() {
        return 16.0;
    }

    let mut heights: Vec<f64> = lines.iter().map(|line| line.bbox.height()).collect();
    heights.sort_by(|left, right| left.partial_cmp(right).unwrap());
    heights[heights.len() / 2]
}

/// Group lines into rows by vertical center (with a running row-center
/// average) and read each row left-to-right.
fn sort_lines_for_warning_reading_order(lines: &[OcrLine]) -> Vec<OcrLine> {
    if lines.len() <= 1 {
        return lines.to_vec();
    }

    let mut sorted_by_y = lines.to_vec();
    sorted_by_y.sort_by(|left, right| {
        left.bbox
            .center_y()
            .partial_cmp(&right.bbox.center_y())
            .unwrap()
    });
    let median_height = median_line_height(&sorted_by_y);
    let same_row_threshold = (median_height * 0.5).max(6.0);

    let mut row_groups: Vec<Vec<OcrLine>> = Vec::new();
    let mut row_center_ys: Vec<f64> = Vec::new();

    for line in sorted_by_y {
        let center_y = line.bbox.center_y();
        match (row_groups.last_mut(), row_center_ys.last_mut()) {
            (Some(row), Some(row_center_y))
                if (center_y - *row_center_y).abs() <= same_row_threshold =>
            {
                row.push(line);
                let row_size = row.len() as f64;
                *row_center_y = (*row_center_y * (row_size - 1.0) + center_y) / row_size;
            }
            _ => {
                row_groups.push(vec![line]);
                row_center_ys.push(center_y);
            }
        }
    }

    let mut ordered = Vec::new();
    for mut row in row_groups {
        row.sort_by(|left, right| {
            left.bbox
                .center_x()
                .partial_cmp(&right.bbox.center_x())
                .unwrap()
        });
        ordered.extend(row);
    }
    ordered
}

fn warning_result(
    expected_value: &str,
    status: VerificationStatus,
    confidence: Option<f64>,
    reason: String,
    extracted_value: String,
    evidence_lines: Option<&[OcrLine]>,
    page_bounds: Option<&labelgate_kernel::BoundingBox>,
) -> VerificationFieldResult {
    let evidence_box = evidence_lines.and_then(|lines| {
        merge_evidence_boxes(&lines.iter().map(|line| line.bbox).collect::<Vec<_>>())
    });
    let area_ratio = compute_evidence_box_area_ratio(evidence_box.as_ref(), page_bounds);
    let token_count = evidence_lines.map_or(0, |lines| lines.len());

    VerificationFieldResult {
        field: FieldKey::GovernmentWarning,
        label: FieldKey::GovernmentWarning.label().to_string(),
        application_value: format_application_value(Some(expected_value)),
        extracted_value,
        status,
        confidence,
        reason,
        evidence_source: if evidence_box.is_some() {
            EvidenceSource::Line
        } else {
            EvidenceSource::None
        },
        evidence_box,
        evidence_token_count: token_count,
        evidence_box_area_ratio: area_ratio,
        evidence_oversized: is_evidence_box_oversized(FieldKey::GovernmentWarning, area_ratio),
    }
}

pub(crate) fn verify_government_warning(
    application: &CanonicalApplication,
    ocr_lines: &[OcrLine],
    page_bounds: Option<&labelgate_kernel::BoundingBox>,
) -> VerificationFieldResult {
    let expected_value = application.fields.government_warning_text.as_str();

    if !application.fields.government_warning_required {
        return VerificationFieldResult {
            field: FieldKey::GovernmentWarning,
            label: FieldKey::GovernmentWarning.label().to_string(),
            application_value: "N/A (not required for this application)".to_string(),
            extracted_value: "N/A".to_string(),
            status: VerificationStatus::Pass,
            confidence: None,
            reason: "Government warning is not required by the application payload.".to_string(),
            evidence_box: None,
            evidence_source: EvidenceSource::None,
            evidence_token_count: 0,
            evidence_box_area_ratio: None,
            evidence_oversized: false,
        };
    }

    let mut warning_start_index = ocr_lines
        .iter()
        .position(|line| normalized_includes(&line.text, "government warning"));

    if warning_start_index.is_none() {
        let max_y = ocr_lines
            .iter()
            .fold(1.0_f64, |largest, line| largest.max(line.bbox.y1));
        warning_start_index = ocr_lines.iter().position(|line| {
            let is_lower_region = line.bbox.center_y() >= max_y * 0.45;
            let has_warning_anchor = normalized_includes(&line.text, "government")
                || normalized_includes(&line.text, "warning");
            is_lower_region && has_warning_anchor
        });
    }

    let Some(start_index) = warning_start_index else {
        let full_extracted = collapse_whitespace(
            &ocr_lines
                .iter()
                .map(|line| line.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        );
        let full_similarity = dice_coefficient(expected_value, &full_extracted);
        let full_has_clause_markers =
            full_extracted.contains("(1)") && full_extracted.contains("(2)");
        let full_mentions_surgeon_general = normalized_includes(&full_extracted, "surgeon general");

        if full_similarity >= 0.62 || (full_has_clause_markers && full_mentions_surgeon_general) {
            return warning_result(
                expected_value,
                VerificationStatus::NeedsReview,
                average_confidence(ocr_lines.iter().map(|line| line.confidence)),
                "Warning-like text was detected across the label, but the canonical anchor phrase was fragmented in OCR lines."
                    .to_string(),
                full_extracted,
                Some(ocr_lines),
                page_bounds,
            );
        }

        return warning_result(
            expected_value,
            VerificationStatus::Missing,
            None,
            "Expected warning statement was not detected in OCR output on this label.".to_string(),
            "Not detected in OCR output".to_string(),
            None,
            page_bounds,
        );
    };

    let warning_slice: Vec<OcrLine> = ocr_lines
        .iter()
        .skip(start_index)
        .take(60)
        .cloned()
        .collect();
    let anchor_center_y = ocr_lines[start_index].bbox.center_y();
    let median_height = median_line_height(ocr_lines);
    let warning_candidate_lines: Vec<OcrLine> = ocr_lines
        .iter()
        .filter(|line| line.bbox.center_y() >= anchor_center_y - median_height * 0.6)
        .cloned()
        .collect();
    let ordered_warning_lines = sort_lines_for_warning_reading_order(
        if warning_candidate_lines.is_empty() {
            &warning_slice
        } else {
            &warning_candidate_lines
        },
    );

    let extracted_warning = ordered_warning_lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let collapsed_extracted = collapse_whitespace(&extracted_warning);
    let collapsed_expected = collapse_whitespace(expected_value);
    let prefix_window: String = collapsed_extracted
        .chars()
        .take(WARNING_PREFIX.len() + 2)
        .collect();
    let uppercase_prefix_present = prefix_window.starts_with(WARNING_PREFIX);
    let expected_body = strip_warning_prefix(&collapsed_expected);
    let extracted_body = strip_warning_prefix(&collapsed_extracted);
    let normalized_expected_body = normalize_warning_body_for_comparison(&expected_body);
    let normalized_extracted_body = normalize_warning_body_for_comparison(&extracted_body);
    let exact_body_match = !normalized_extracted_body.is_empty()
        && is_expected_token_sequence_present(&normalized_expected_body, &normalized_extracted_body);
    let has_clause_markers =
        collapsed_extracted.contains("(1)") && collapsed_extracted.contains("(2)");
    let warning_similarity = dice_coefficient(expected_value, &extracted_warning);
    let warning_confidence =
        average_confidence(ordered_warning_lines.iter().map(|line| line.confidence));

    if exact_body_match && uppercase_prefix_present {
        return warning_result(
            expected_value,
            VerificationStatus::Pass,
            warning_confidence,
            "Government warning matched required uppercase prefix and exact wording.".to_string(),
            collapsed_extracted,
            Some(&ordered_warning_lines),
            page_bounds,
        );
    }

    let detected_confidently = warning_confidence.is_some_and(|confidence| confidence >= 0.7);
    if detected_confidently {
        let mut mismatch_reasons = Vec::new();
        if !uppercase_prefix_present {
            mismatch_reasons.push("missing required uppercase 'GOVERNMENT WARNING:' prefix");
        }
        if !exact_body_match {
            mismatch_reasons.push("warning body does not exactly match required wording");
        }
        let mismatch_reason = if mismatch_reasons.is_empty() {
            "warning text does not satisfy strict formatting requirements".to_string()
        } else {
            mismatch_reasons.join("; ")
        };

        return warning_result(
            expected_value,
            VerificationStatus::Fail,
            warning_confidence,
            format!("Warning was detected with high confidence but is non-compliant: {mismatch_reason}."),
            collapsed_extracted,
            Some(&ordered_warning_lines),
            page_bounds,
        );
    }

    if warning_similarity >= 0.72 || has_clause_markers {
        return warning_result(
            expected_value,
            VerificationStatus::NeedsReview,
            warning_confidence,
            "Warning region was detected, but strict wording or format checks were inconclusive."
                .to_string(),
            collapsed_extracted,
            Some(&ordered_warning_lines),
            page_bounds,
        );
    }

    warning_result(
        expected_value,
        VerificationStatus::Missing,
        warning_confidence,
        "Detected text near warning region was too incomplete for strict validation.".to_string(),
        collapsed_extracted,
        Some(&ordered_warning_lines),
        page_bounds,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelgate_kernel::{AlcoholClass, ApplicationFields, BoundingBox, SourceSchema};
    use labelgate_policy::GOVERNMENT_WARNING_TEXT;

    fn application(required: bool) -> CanonicalApplication {
        CanonicalApplication {
            application_id: "APP-1".to_string(),
            alcohol_class: AlcoholClass::DistilledSpirits,
            is_import: false,
            fields: ApplicationFields {
                brand_name: Some("OLD TOM".to_string()),
                class_type_designation: Some("BOURBON".to_string()),
                alcohol_content: Some("90 PROOF".to_string()),
                net_contents: Some("750 ML".to_string()),
                name_address: None,
                country_of_origin: None,
                government_warning_required: required,
                government_warning_text: GOVERNMENT_WARNING_TEXT.to_string(),
            },
            source_schema: SourceSchema::LegacyTestForm,
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

    fn label_lines(warning_text: &str, warning_confidence: f64) -> Vec<OcrLine> {
        vec![
            line("OLD TOM", 0, 0.95),
            line("BOURBON", 1, 0.95),
            line("90 PROOF", 2, 0.95),
            line("750 ML", 3, 0.95),
            line(warning_text, 8, warning_confidence),
        ]
    }

    #[test]
    fn verbatim_warning_passes() {
        let lines = label_lines(GOVERNMENT_WARNING_TEXT, 0.94);
        let result = verify_government_warning(&application(true), &lines, None);
        assert_eq!(result.status, VerificationStatus::Pass);
        assert_eq!(result.evidence_source, EvidenceSource::Line);
    }

    #[test]
    fn lowercase_prefix_fails_with_itemized_reason() {
        let relaxed = GOVERNMENT_WARNING_TEXT.replace("GOVERNMENT WARNING:", "Government Warning:");
        let lines = label_lines(&relaxed, 0.96);
        let result = verify_government_warning(&application(true), &lines, None);
        assert_eq!(result.status, VerificationStatus::Fail);
        assert!(result.reason.contains("uppercase 'GOVERNMENT WARNING:' prefix"));
        assert!(!result.reason.contains("exactly match required wording"));
    }

    #[test]
    fn fully_uppercase_body_still_passes() {
        let shouted = GOVERNMENT_WARNING_TEXT.to_uppercase();
        let lines = label_lines(&shouted, 0.96);
        let result = verify_government_warning(&application(true), &lines, None);
        assert_eq!(result.status, VerificationStatus::Pass);
    }

    #[test]
    fn known_ocr_typos_are_corrected_before_comparison() {
        let degraded = "GOVERNMENT WARNING: (1) According to the Surgeon General, women should not drink alcoholic beverages during pregnancy because ofthe risk of birth defects. (2) Consumption of alcoholic beverages impairs your abiity / to drive a car or operate machinery, and may cause health problems.";
        let lines = label_lines(degraded, 0.95);
        let result = verify_government_warning(&application(true), &lines, None);
        assert_eq!(result.status, VerificationStatus::Pass);
    }

    #[test]
    fn missing_second_clause_marker_still_passes() {
        let without_marker = GOVERNMENT_WARNING_TEXT.replace("(2) ", "");
        let lines = label_lines(&without_marker, 0.95);
        let result = verify_government_warning(&application(true), &lines, None);
        assert_eq!(result.status, VerificationStatus::Pass);
    }

    #[test]
    fn reworded_body_fails_at_high_confidence() {
        let reworded = GOVERNMENT_WARNING_TEXT
            .replace("risk of birth defects", "risk of serious birth defects");
        let lines = label_lines(&reworded, 0.98);
        let result = verify_government_warning(&application(true), &lines, None);
        assert_eq!(result.status, VerificationStatus::Fail);
        assert!(result.reason.contains("exactly match required wording"));
    }

    #[test]
    fn absent_warning_is_missing() {
        let lines = vec![line("OLD TOM", 0, 0.95), line("750 ML", 3, 0.95)];
        let result = verify_government_warning(&application(true), &lines, None);
        assert_eq!(result.status, VerificationStatus::Missing);
        assert!(result.evidence_box.is_none());
    }

    #[test]
    fn not_required_passes_unconditionally() {
        let result = verify_government_warning(&application(false), &[], None);
        assert_eq!(result.status, VerificationStatus::Pass);
        assert_eq!(result.confidence, None);
    }

    #[test]
    fn token_subsequence_tolerates_tiny_noise() {
        assert!(is_expected_token_sequence_present(
            "according to the surgeon general",
            "according to xx the surgeon general"
        ));
        assert!(!is_expected_token_sequence_present(
            "according to the surgeon general",
            "according to the extra surgeon general"
        ));
        assert!(!is_expected_token_sequence_present(
            "according to the surgeon general",
            "according to the surgeon"
        ));
    }

    #[test]
    fn reading_order_groups_split_rows() {
        let lines = vec![
            OcrLine {
                text: "GOVERNMENT WARNING: (1) According".to_string(),
                confidence: 0.9,
                bbox: BoundingBox::new(20.0, 100.0, 360.0, 120.0),
                polygon: None,
            },
            OcrLine {
                text: "to the Surgeon General".to_string(),
                confidence: 0.9,
                bbox: BoundingBox::new(370.0, 102.0, 700.0, 122.0),
                polygon: None,
            },
            OcrLine {
                text: "second row".to_string(),
                confidence: 0.9,
                bbox: BoundingBox::new(20.0, 130.0, 300.0, 150.0),
                polygon: None,
            },
        ];
        let ordered = sort_lines_for_warning_reading_order(&lines);
        assert_eq!(ordered[0].text, "GOVERNMENT WARNING: (1) According");
        assert_eq!(ordered[1].text, "to the Surgeon General");
        assert_eq!(ordered[2].text, "second row");
    }
}
