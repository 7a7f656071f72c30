//! Evidence-box repair for single-token fields.
//!
//! Token-level OCR sometimes localizes a word as a thin vertical strip. When
//! that happens the matching line's character-offset span gives a far better
//! box, re-projected and reshaped per field.

use labelgate_kernel::{
    BoundingBox, FieldKey, OcrLine, dice_coefficient, normalize_text, tokenize_normalized,
};

use crate::scoring::{approximate_token_coverage, unmatched_candidate_token_ratio};

fn whitespace_token_spans(text: &str) -> Vec<(usize, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (index, ch) in chars.iter().enumerate() {
        if ch.is_whitespace() {
            if let Some(begin) = start.take() {
                spans.push((begin, index));
            }
        } else if start.is_none() {
            start = Some(index);
        }
    }
    if let Some(begin) = start {
        spans.push((begin, chars.len()));
    }
    spans
}

/// Project the best-matching token of `line` onto a horizontal span, then
/// reshape into a field-appropriate evidence box. `None` when no token of
/// the line resembles the expected token closely enough.
pub(crate) fn projected_token_box_from_line(
    line: &OcrLine,
    normalized_expected_token: &str,
    field: FieldKey,
) -> Option<BoundingBox> {
    let chars: Vec<char> = line.text.chars().collect();
    let spans = whitespace_token_spans(&line.text);
    if spans.is_empty() || normalized_expected_token.is_empty() {
        return None;
    }

    let mut best: Option<(usize, usize, f64)> = None;
    for &(start, end) in &spans {
        let token_text: String = chars[start..end].iter().collect();
        let similarity = dice_coefficient(normalized_expected_token, &normalize_text(&token_text));
        if best.is_none_or(|(_, _, best_similarity)| similarity > best_similarity) {
            best = Some((start, end, similarity));
        }
    }

    let (start, end, similarity) = best?;
    if similarity < 0.58 {
        return None;
    }

    let line_width = line.bbox.width();
    let line_units = chars.len().max(1) as f64;
    let projected_x0 = line.bbox.x0 + line_width * (start as f64 / line_units);
    let projected_x1 = line.bbox.x0 + line_width * (end as f64 / line_units);
    let clamped_x0 = projected_x0.clamp(line.bbox.x0, line.bbox.x1);
    let clamped_x1 = projected_x1.max(clamped_x0).min(line.bbox.x1);

    if field == FieldKey::ClassTypeDesignation {
        // Class designations sit under the brand crest; bias toward the line
        // center and the lower band of the line box.
        let line_height = line.bbox.height();
        let line_center_x = line.bbox.center_x();
        let projected_center_x = (clamped_x0 + clamped_x1) / 2.0;
        let blended_center_x = projected_center_x * 0.35 + line_center_x * 0.65;
        let token_width = (clamped_x1 - clamped_x0).max(8.0);
        let adjusted_width = (token_width * 1.35)
            .max(line_width * 0.22)
            .max(line_height * 1.1)
            .min(line_width * 0.72);
        let x0 = (blended_center_x - adjusted_width / 2.0).max(line.bbox.x0);
        let x1 = (blended_center_x + adjusted_width / 2.0).min(line.bbox.x1);
        let y0 = line.bbox.y0 + line_height * 0.56;
        let y1 = line.bbox.y0 + line_height * 0.98;

        return Some(BoundingBox {
            x0,
            y0: y0.max(line.bbox.y0),
            x1: x1.max(x0 + 1.0),
            y1: y1.min(line.bbox.y1).max(line.bbox.y0 + 1.0),
        });
    }

    if field == FieldKey::BrandName {
        let line_height = line.bbox.height();
        let line_center_x = line.bbox.center_x();
        let projected_center_x = (clamped_x0 + clamped_x1) / 2.0;
        let blended_center_x = projected_center_x * 0.6 + line_center_x * 0.4;
        let token_width = (clamped_x1 - clamped_x0).max(8.0);
        let adjusted_width = (token_width * 1.25)
            .max(line_width * 0.26)
            .max(line_height * 1.0)
            .min(line_width * 0.72);
        let x0 = (blended_center_x - adjusted_width / 2.0).max(line.bbox.x0);
        let x1 = (blended_center_x + adjusted_width / 2.0).min(line.bbox.x1);
        let y0 = line.bbox.y0 + line_height * 0.06;
        let y1 = line.bbox.y0 + line_height * 0.64;

        return Some(BoundingBox {
            x0,
            y0: y0.max(line.bbox.y0),
            x1: x1.max(x0 + 1.0),
            y1: y1.min(line.bbox.y1).max(line.bbox.y0 + 1.0),
        });
    }

    Some(BoundingBox {
        x0: clamped_x0,
        y0: line.bbox.y0,
        x1: clamped_x1,
        y1: line.bbox.y1,
    })
}

/// The line most likely to actually contain a single-token field value,
/// scored by coverage, confidence, box shape, and text compactness.
pub(crate) fn best_anchor_line_for_single_token<'lines>(
    normalized_expected_token: &str,
    ocr_lines: &'lines [OcrLine],
) -> Option<&'lines OcrLine> {
    let expected = [normalized_expected_token.to_string()];
    let mut best: Option<(&OcrLine, f64)> = None;

    for line in ocr_lines {
        let coverage = approximate_token_coverage(&expected, &line.text);
        if coverage < 0.82 {
            continue;
        }

        let line_token_count = tokenize_normalized(&line.text).len();
        let unmatched_ratio = unmatched_candidate_token_ratio(&expected, &line.text);
        let aspect_ratio = line.bbox.aspect_ratio();
        let aspect_bonus = (aspect_ratio / 6.0 * 0.24).min(0.24);
        let extra_token_penalty = line_token_count.saturating_sub(3) as f64 * 0.05;
        let score = coverage * 0.55 + line.confidence * 0.2 + aspect_bonus
            - unmatched_ratio * 0.18
            - extra_token_penalty;

        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((line, score));
        }
    }

    best.map(|(line, _)| line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, x0: f64, y0: f64, x1: f64, y1: f64, confidence: f64) -> OcrLine {
        OcrLine {
            text: text.to_string(),
            confidence,
            bbox: BoundingBox::new(x0, y0, x1, y1),
            polygon: None,
        }
    }

    #[test]
    fn projection_requires_a_similar_token() {
        let source = line("STEEL HAMMER VODKA", 150.0, 52.0, 640.0, 228.0, 0.85);
        assert!(
            projected_token_box_from_line(&source, "zinfandel", FieldKey::ClassTypeDesignation)
                .is_none()
        );
        assert!(
            projected_token_box_from_line(&source, "vodka", FieldKey::ClassTypeDesignation)
                .is_some()
        );
    }

    #[test]
    fn class_projection_lands_in_lower_band_with_wide_aspect() {
        let source = line("STEEL HAMMER VODKA", 150.0, 52.0, 640.0, 228.0, 0.85);
        let bbox =
            projected_token_box_from_line(&source, "vodka", FieldKey::ClassTypeDesignation)
                .unwrap();
        assert!(bbox.y0 > source.bbox.y0 + source.bbox.height() * 0.5);
        assert!(bbox.aspect_ratio() > 1.05);
        assert!(bbox.x0 >= source.bbox.x0 && bbox.x1 <= source.bbox.x1);
    }

    #[test]
    fn brand_projection_lands_in_upper_band() {
        let source = line("SUNRISE IPA", 120.0, 70.0, 540.0, 250.0, 0.9);
        let bbox = projected_token_box_from_line(&source, "sunrise", FieldKey::BrandName).unwrap();
        assert!(bbox.y1 < source.bbox.y0 + source.bbox.height() * 0.7);
        assert!(bbox.aspect_ratio() > 1.05);
    }

    #[test]
    fn other_fields_keep_the_raw_character_span() {
        let source = line("PRODUCT OF ITALY", 100.0, 500.0, 420.0, 540.0, 0.9);
        let bbox =
            projected_token_box_from_line(&source, "italy", FieldKey::CountryOfOrigin).unwrap();
        assert_eq!(bbox.y0, 500.0);
        assert_eq!(bbox.y1, 540.0);
        assert!(bbox.x0 > 300.0);
    }

    #[test]
    fn anchor_line_prefers_compact_high_coverage_lines() {
        let lines = vec![
            line("SUNRISE IPA", 120.0, 70.0, 540.0, 250.0, 0.9),
            line("GOVERNMENT WARNING: sunrise in moderation", 60.0, 760.0, 720.0, 860.0, 0.9),
        ];
        let anchor = best_anchor_line_for_single_token("sunrise", &lines).unwrap();
        assert_eq!(anchor.text, "SUNRISE IPA");
    }

    #[test]
    fn anchor_requires_strong_coverage() {
        let lines = vec![line("750 ML", 0.0, 0.0, 100.0, 20.0, 0.9)];
        assert!(best_anchor_line_for_single_token("bourbon", &lines).is_none());
    }
}
