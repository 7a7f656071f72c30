//! Parsers for declared label value statements.
//!
//! Both the application record and OCR lines express alcohol content and net
//! contents as free text; these parsers pull out the comparable numbers. The
//! relation `proof = 2 x ABV` derives whichever of the pair is missing.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text::collapse_whitespace;

static ABV_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*%\s*(?:ABV|ALC\.?\s*/?\s*VOL\.?|ALC/VOL)?").unwrap()
});
static PROOF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*PROOF").unwrap());
static ALCOHOL_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(PROOF|ABV|ALC|VOL|%)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedAlcoholContent {
    pub abv_percent: Option<f64>,
    pub proof: Option<f64>,
}

fn normalize_numeric_input(value: &str) -> String {
    value.replacen(',', ".", 1)
}

fn capture_number(regex: &Regex, input: &str) -> Option<f64> {
    regex
        .captures(input)
        .and_then(|captures| captures.get(1))
        .and_then(|group| group.as_str().parse::<f64>().ok())
}

/// Parse an alcohol statement such as `"45% Alc./Vol. (90 Proof)"`.
///
/// Returns `None` when the input carries no alcohol marker at all, so plain
/// prose never reads as an alcohol statement.
pub fn parse_alcohol_content(input: &str) -> Option<ParsedAlcoholContent> {
    let normalized = normalize_numeric_input(input);
    if !ALCOHOL_MARKER_REGEX.is_match(&normalized) {
        return None;
    }

    let parsed_abv = capture_number(&ABV_REGEX, &normalized);
    let parsed_proof = capture_number(&PROOF_REGEX, &normalized);

    let abv_percent = match (parsed_abv, parsed_proof) {
        (Some(abv), _) => Some(abv.clamp(0.0, 100.0)),
        (None, Some(proof)) => Some((proof / 2.0).clamp(0.0, 100.0)),
        (None, None) => None,
    };
    let proof = match (parsed_proof, abv_percent) {
        (Some(proof), _) => Some(proof.clamp(0.0, 200.0)),
        (None, Some(abv)) => Some((abv * 2.0).clamp(0.0, 200.0)),
        (None, None) => None,
    };

    if abv_percent.is_none() && proof.is_none() {
        return None;
    }

    Some(ParsedAlcoholContent { abv_percent, proof })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetUnit {
    Ml,
    L,
    FlOz,
    Oz,
    Pt,
    Qt,
    Gal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    Metric,
    UsCustomary,
    Neutral,
}

impl NetUnit {
    pub fn unit_system(&self) -> UnitSystem {
        match self {
            NetUnit::Ml | NetUnit::L => UnitSystem::Metric,
            _ => UnitSystem::UsCustomary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetUnit::Ml => "ml",
            NetUnit::L => "l",
            NetUnit::FlOz => "fl_oz",
            NetUnit::Oz => "oz",
            NetUnit::Pt => "pt",
            NetUnit::Qt => "qt",
            NetUnit::Gal => "gal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedNetContents {
    pub value: f64,
    pub unit: NetUnit,
    pub volume_ml: f64,
    pub unit_system: UnitSystem,
}

static NET_CONTENTS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d+(?:\.\d+)?)\s*(ML|MILLILITERS?|L|LITERS?|FL\.?\s*OZ|FLUID\s*OUNCES?|OZ|OUNCES?|PT|PINTS?|QT|QUARTS?|GAL|GALLONS?)",
    )
    .unwrap()
});

fn normalize_net_unit(unit: &str) -> Option<NetUnit> {
    let mut token = unit.to_lowercase().replace('.', "");
    token = token.split_whitespace().collect::<Vec<_>>().join("_");

    match token.as_str() {
        "ml" | "milliliter" | "milliliters" => Some(NetUnit::Ml),
        "l" | "liter" | "liters" => Some(NetUnit::L),
        "fl_oz" | "fluid_ounce" | "fluid_ounces" => Some(NetUnit::FlOz),
        "oz" | "ounce" | "ounces" => Some(NetUnit::Oz),
        "pt" | "pint" | "pints" => Some(NetUnit::Pt),
        "qt" | "quart" | "quarts" => Some(NetUnit::Qt),
        "gal" | "gallon" | "gallons" => Some(NetUnit::Gal),
        _ => None,
    }
}

fn volume_to_ml(value: f64, unit: NetUnit) -> f64 {
    match unit {
        NetUnit::Ml => value,
        NetUnit::L => value * 1000.0,
        NetUnit::FlOz | NetUnit::Oz => value * 29.5735,
        NetUnit::Pt => value * 473.176,
        NetUnit::Qt => value * 946.353,
        NetUnit::Gal => value * 3785.41,
    }
}

/// Parse a net-contents statement such as `"750 ML"` or `"25.36 FL OZ"` and
/// normalize it to milliliters.
pub fn parse_net_contents(input: &str) -> Option<ParsedNetContents> {
    let normalized = normalize_numeric_input(&collapse_whitespace(input));
    let captures = NET_CONTENTS_REGEX.captures(&normalized)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    let unit = normalize_net_unit(captures.get(2)?.as_str())?;

    Some(ParsedNetContents {
        value,
        unit,
        volume_ml: volume_to_ml(value, unit),
        unit_system: unit.unit_system(),
    })
}
