//! Shared scoring vocabulary for the text-field matchers.
//!
//! The numbers in this module (and in the per-field profiles) are
//! calibration constants tuned against the acceptance corpus. Do not adjust
//! them without re-running the full fixture suites.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use labelgate_kernel::{
    BoundingBox, EvidenceSource, FieldKey, dice_coefficient, tokenize_normalized,
};

/// One scored match candidate, from either search.
#[derive(Debug, Clone)]
pub(crate) struct MatchCandidate {
    pub text: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    pub score: f64,
    pub source: EvidenceSource,
    pub token_count: usize,
}

static ADDRESS_LIKE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(distilled|bottled|imported|produced|manufactured|spirits|company|co\.?|inc\.?|llc|s\.p\.a\.?|ltd|street|st\.|avenue|ave\.|road|rd\.|city|state)\b")
        .unwrap()
});
static COMMA_THEN_LETTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*[A-Za-z]").unwrap());

/// Tokens that belong to a class/type statement, used to keep a brand match
/// from leaking into the neighboring designation.
static ALCOHOL_CLASS_TOKENS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "gin", "vodka", "rum", "tequila", "mezcal", "brandy", "whiskey", "whisky", "scotch",
        "bourbon", "rye", "beer", "lager", "ale", "stout", "porter", "cider", "wine", "liqueur",
        "spirits",
    ])
});

pub(crate) fn is_address_like_text(value: &str) -> bool {
    ADDRESS_LIKE_REGEX.is_match(value)
        || COMMA_THEN_LETTER_REGEX.is_match(value)
        || value.chars().any(|ch| ch.is_ascii_digit())
}

pub(crate) fn is_mostly_uppercase(value: &str) -> bool {
    let letters: Vec<char> = value.chars().filter(|ch| ch.is_ascii_alphabetic()).collect();
    if letters.is_empty() {
        return false;
    }

    let uppercase = letters.iter().filter(|ch| ch.is_ascii_uppercase()).count();
    uppercase as f64 / letters.len() as f64 >= 0.7
}

/// Fraction of candidate tokens with no sufficiently similar expected token.
pub(crate) fn unmatched_candidate_token_ratio(expected_tokens: &[String], candidate: &str) -> f64 {
    let candidate_tokens = tokenize_normalized(candidate);
    if candidate_tokens.is_empty() || expected_tokens.is_empty() {
        return 0.0;
    }

    let unmatched = candidate_tokens
        .iter()
        .filter(|candidate_token| {
            expected_tokens
                .iter()
                .map(|expected_token| dice_coefficient(candidate_token, expected_token))
                .fold(0.0_f64, f64::max)
                < 0.72
        })
        .count();

    unmatched as f64 / candidate_tokens.len() as f64
}

/// Penalty for class/type vocabulary appearing in a brand candidate without
/// being part of the expected brand.
pub(crate) fn brand_class_leak_penalty(expected_brand: &str, candidate: &str) -> f64 {
    let expected_tokens: HashSet<String> = tokenize_normalized(expected_brand).into_iter().collect();
    let leak_count = tokenize_normalized(candidate)
        .iter()
        .filter(|token| {
            !expected_tokens.contains(*token) && ALCOHOL_CLASS_TOKENS.contains(token.as_str())
        })
        .count();

    (leak_count as f64 * 0.28).min(0.5)
}

/// Fraction of expected tokens with at least one approximate hit in the
/// candidate text.
pub(crate) fn approximate_token_coverage(expected_tokens: &[String], candidate: &str) -> f64 {
    if expected_tokens.is_empty() {
        return 0.0;
    }

    let candidate_tokens = tokenize_normalized(candidate);
    if candidate_tokens.is_empty() {
        return 0.0;
    }

    let covered = expected_tokens
        .iter()
        .filter(|expected_token| {
            candidate_tokens
                .iter()
                .map(|candidate_token| dice_coefficient(expected_token, candidate_token))
                .fold(0.0_f64, f64::max)
                >= 0.58
        })
        .count();

    covered as f64 / expected_tokens.len() as f64
}

/// Blend the raw OCR confidence with the match score, never reporting less
/// than the OCR itself and never more than 0.99.
pub(crate) fn calibrated_confidence(ocr_confidence: f64, match_score: f64) -> f64 {
    let weighted = ocr_confidence * 0.6 + match_score * 0.4;
    ocr_confidence.max(weighted.min(0.99))
}

pub(crate) fn average_confidence(confidences: impl IntoIterator<Item = f64>) -> Option<f64> {
    let values: Vec<f64> = confidences.into_iter().collect();
    if values.is_empty() {
        return None;
    }

    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Per-field classification thresholds for the shared text matcher.
pub(crate) struct FieldThresholds {
    pub pass_score: f64,
    pub pass_confidence: f64,
}

pub(crate) fn field_thresholds(field: FieldKey, expected_token_count: usize) -> FieldThresholds {
    let pass_score = match field {
        FieldKey::BrandName => 0.93,
        FieldKey::ClassTypeDesignation if expected_token_count == 1 => 0.82,
        _ => 0.9,
    };
    let pass_confidence = if field == FieldKey::BrandName { 0.92 } else { 0.55 };
    FieldThresholds {
        pass_score,
        pass_confidence,
    }
}
