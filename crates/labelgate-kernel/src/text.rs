//! Text canonicalization and bigram similarity.
//!
//! Every string comparison in the engine routes through this module — no
//! verifier duplicates similarity logic. All functions are pure.

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

/// Trim and collapse internal whitespace runs to single spaces.
pub fn collapse_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;
    for ch in value.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    out
}

/// Canonical comparison form: collapsed whitespace, NFKC, lowercase, with
/// everything outside `[a-z0-9 ]` stripped.
pub fn normalize_text(value: &str) -> String {
    collapse_whitespace(value)
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || *ch == ' ')
        .collect()
}

fn build_bigrams(value: &str) -> HashSet<String> {
    let normalized = normalize_text(value);
    let chars: Vec<char> = normalized.chars().collect();
    if chars.len() <= 1 {
        // Single-character (and empty) strings compare as a one-element set.
        let mut set = HashSet::new();
        set.insert(normalized);
        return set;
    }

    chars
        .windows(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect()
}

/// Character-bigram Dice similarity over normalized strings.
///
/// Empty vs. empty is 1.0; empty vs. non-empty is 0.0.
pub fn dice_coefficient(left: &str, right: &str) -> f64 {
    let left_set = build_bigrams(left);
    let right_set = build_bigrams(right);

    let left_empty = left_set.len() == 1 && left_set.contains("");
    let right_empty = right_set.len() == 1 && right_set.contains("");
    if left_empty && right_empty {
        return 1.0;
    }
    if left_empty || right_empty {
        return 0.0;
    }

    let intersection = left_set.intersection(&right_set).count();
    (2.0 * intersection as f64) / (left_set.len() + right_set.len()) as f64
}

/// Substring containment after normalization.
pub fn normalized_includes(haystack: &str, needle: &str) -> bool {
    normalize_text(haystack).contains(&normalize_text(needle))
}

/// Normalized tokens of length > 1, the unit of coverage scoring.
pub fn tokenize_normalized(value: &str) -> Vec<String> {
    normalize_text(value)
        .split(' ')
        .filter(|token| token.len() > 1)
        .map(str::to_string)
        .collect()
}
