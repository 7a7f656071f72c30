//! Verification orchestrator.
//!
//! Runs every field verifier against one application/OCR pair and assembles
//! the results in canonical field order. The only error is the internal
//! field-coverage invariant; malformed content never raises.

use labelgate_kernel::{
    BoundingBox, CanonicalApplication, FieldKey, OcrLine, OcrToken, VerificationError,
    VerificationFieldResult, geometry::merge_evidence_boxes,
};

use crate::alcohol::verify_alcohol_field;
use crate::expectation::field_expectation;
use crate::net_contents::verify_net_contents_field;
use crate::text_field::verify_text_field;
use crate::warning::verify_government_warning;

fn page_bounds(ocr_lines: &[OcrLine], ocr_tokens: &[OcrToken]) -> Option<BoundingBox> {
    let boxes: Vec<BoundingBox> = ocr_lines
        .iter()
        .map(|line| line.bbox)
        .chain(ocr_tokens.iter().map(|token| token.bbox))
        .collect();
    merge_evidence_boxes(&boxes)
}

/// Verify one label/application pair.
///
/// Returns exactly the seven canonical fields, in canonical order, exactly
/// once each.
pub fn verify_label(
    application: &CanonicalApplication,
    ocr_lines: &[OcrLine],
    ocr_tokens: &[OcrToken],
) -> Result<Vec<VerificationFieldResult>, VerificationError> {
    let bounds = page_bounds(ocr_lines, ocr_tokens);
    let bounds_ref = bounds.as_ref();

    let mut results: Vec<VerificationFieldResult> = FieldKey::ALL
        .iter()
        .filter(|field| **field != FieldKey::GovernmentWarning)
        .map(|field| {
            let expectation = field_expectation(application, *field);
            match field {
                FieldKey::AlcoholContent => verify_alcohol_field(
                    &expectation,
                    application,
                    ocr_lines,
                    ocr_tokens,
                    bounds_ref,
                ),
                FieldKey::NetContents => verify_net_contents_field(
                    &expectation,
                    application,
                    ocr_lines,
                    ocr_tokens,
                    bounds_ref,
                ),
                _ => verify_text_field(&expectation, ocr_lines, ocr_tokens, bounds_ref),
            }
        })
        .collect();
    results.push(verify_government_warning(application, ocr_lines, bounds_ref));

    FieldKey::ALL
        .iter()
        .map(|field| {
            results
                .iter()
                .find(|result| result.field == *field)
                .cloned()
                .ok_or(VerificationError::MissingFieldResult { field: *field })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelgate_kernel::{AlcoholClass, ApplicationFields, SourceSchema, VerificationStatus};
    use labelgate_policy::GOVERNMENT_WARNING_TEXT;

    fn application() -> CanonicalApplication {
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
                government_warning_required: true,
                government_warning_text: GOVERNMENT_WARNING_TEXT.to_string(),
            },
            source_schema: SourceSchema::LegacyTestForm,
        }
    }

    fn line(text: &str, row: usize) -> OcrLine {
        OcrLine {
            text: text.to_string(),
            confidence: 0.95,
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
    fn emits_all_seven_fields_in_canonical_order() {
        let results = verify_label(&application(), &[], &[]).unwrap();
        let fields: Vec<FieldKey> = results.iter().map(|result| result.field).collect();
        assert_eq!(fields, FieldKey::ALL.to_vec());
    }

    #[test]
    fn empty_ocr_degrades_without_error() {
        let results = verify_label(&application(), &[], &[]).unwrap();
        let brand = &results[0];
        assert_eq!(brand.status, VerificationStatus::Missing);
        // Optional untouched fields still pass vacuously.
        let country = &results[5];
        assert_eq!(country.status, VerificationStatus::Pass);
    }

    #[test]
    fn confidences_stay_in_unit_range() {
        let lines = vec![
            line("OLD TOM", 0),
            line("BOURBON", 1),
            line("90 PROOF", 2),
            line("750 ML", 3),
            line(GOVERNMENT_WARNING_TEXT, 8),
        ];
        let results = verify_label(&application(), &lines, &[]).unwrap();
        for result in &results {
            if let Some(confidence) = result.confidence {
                assert!((0.0..=1.0).contains(&confidence), "{confidence}");
            }
            if let Some(ratio) = result.evidence_box_area_ratio {
                assert!(ratio >= 0.0);
            }
            if let Some(bbox) = &result.evidence_box {
                assert!(bbox.is_valid());
            }
        }
    }

    #[test]
    fn identical_inputs_yield_identical_outputs() {
        let lines = vec![
            line("OLD TOM", 0),
            line("BOURBON", 1),
            line("90 PROOF", 2),
            line("750 ML", 3),
            line(GOVERNMENT_WARNING_TEXT, 8),
        ];
        let first = verify_label(&application(), &lines, &[]).unwrap();
        let second = verify_label(&application(), &lines, &[]).unwrap();
        assert_eq!(first, second);
    }
}
