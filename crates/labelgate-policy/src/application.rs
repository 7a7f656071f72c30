//! Application contract parsing.
//!
//! Two JSON shapes are accepted: the flat legacy test form and the structured
//! record. Both canonicalize into `CanonicalApplication`; everything
//! downstream consumes only the canonical shape.

use serde::Deserialize;
use serde_json::Value;

use labelgate_kernel::{AlcoholClass, ApplicationFields, CanonicalApplication, SourceSchema};

/// The statutory health warning text required on alcoholic beverage labels.
pub const GOVERNMENT_WARNING_TEXT: &str = "GOVERNMENT WARNING: (1) According to the Surgeon General, women should not drink alcoholic beverages during pregnancy because of the risk of birth defects. (2) Consumption of alcoholic beverages impairs your ability to drive a car or operate machinery, and may cause health problems.";

#[derive(Debug, thiserror::Error)]
pub enum ApplicationParseError {
    #[error("application JSON matches neither the legacy test form nor the structured record: {0}")]
    UnrecognizedShape(String),
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct LegacyTestForm {
    cola_application_id: String,
    #[allow(dead_code)]
    label_image_name: Option<String>,
    brand_name: Option<String>,
    class_type_designation: Option<String>,
    alcohol_content: Option<String>,
    net_contents: Option<String>,
    bottler_producer_name_address: Option<String>,
    #[serde(default)]
    is_imported: bool,
    country_of_origin_import: Option<String>,
    #[serde(default = "default_true")]
    government_health_warning_required: bool,
}

#[derive(Debug, Deserialize)]
struct StructuredAlcoholContent {
    abv_percent: Option<f64>,
    proof: Option<f64>,
    display_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StructuredNetContents {
    value: Option<f64>,
    unit: Option<String>,
    display_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StructuredProducer {
    name_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StructuredFields {
    brand_name: Option<String>,
    class_type_designation: Option<String>,
    alcohol_content: StructuredAlcoholContent,
    net_contents: StructuredNetContents,
    producer: StructuredProducer,
    country_of_origin: Option<String>,
    government_warning_text: String,
}

#[derive(Debug, Deserialize)]
struct StructuredRecord {
    application_id: String,
    alcohol_class: AlcoholClass,
    is_import: Option<bool>,
    fields: StructuredFields,
}

/// Keyword inference for the legacy form, which never names a class.
fn infer_alcohol_class(class_type_designation: Option<&str>) -> AlcoholClass {
    let Some(designation) = class_type_designation else {
        return AlcoholClass::Other;
    };
    let normalized = designation.to_lowercase();

    const BEER_KEYWORDS: &[&str] = &["ipa", "lager", "ale", "stout", "porter", "pilsner"];
    const WINE_KEYWORDS: &[&str] = &["wine", "rose", "ros", "champagne"];
    const DISTILLED_KEYWORDS: &[&str] = &[
        "rum", "vodka", "whiskey", "whisky", "bourbon", "gin", "tequila", "brandy", "spirit",
    ];

    if BEER_KEYWORDS.iter().any(|keyword| normalized.contains(keyword)) {
        return AlcoholClass::Beer;
    }
    if WINE_KEYWORDS.iter().any(|keyword| normalized.contains(keyword)) {
        return AlcoholClass::Wine;
    }
    if DISTILLED_KEYWORDS
        .iter()
        .any(|keyword| normalized.contains(keyword))
    {
        return AlcoholClass::DistilledSpirits;
    }

    AlcoholClass::Other
}

fn coerce_alcohol_display_text(alcohol: &StructuredAlcoholContent) -> Option<String> {
    if let Some(display) = &alcohol.display_text {
        let trimmed = display.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    match (alcohol.abv_percent, alcohol.proof) {
        (Some(abv), Some(proof)) => Some(format!("{abv}% ABV ({proof} PROOF)")),
        (Some(abv), None) => Some(format!("{abv}% ABV")),
        (None, Some(proof)) => Some(format!("{proof} PROOF")),
        (None, None) => None,
    }
}

fn coerce_net_contents_text(net_contents: &StructuredNetContents) -> Option<String> {
    if let Some(display) = &net_contents.display_text {
        let trimmed = display.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    match (net_contents.value, &net_contents.unit) {
        (Some(value), Some(unit)) => Some(format!("{value} {unit}")),
        _ => None,
    }
}

/// Parse one of the two accepted application shapes into the canonical record.
pub fn parse_application_json(raw: &Value) -> Result<CanonicalApplication, ApplicationParseError> {
    if let Ok(form) = LegacyTestForm::deserialize(raw) {
        return Ok(CanonicalApplication {
            alcohol_class: infer_alcohol_class(form.class_type_designation.as_deref()),
            application_id: form.cola_application_id,
            is_import: form.is_imported,
            fields: ApplicationFields {
                brand_name: form.brand_name,
                class_type_designation: form.class_type_designation,
                alcohol_content: form.alcohol_content,
                net_contents: form.net_contents,
                name_address: form.bottler_producer_name_address,
                country_of_origin: form.country_of_origin_import,
                government_warning_required: form.government_health_warning_required,
                government_warning_text: GOVERNMENT_WARNING_TEXT.to_string(),
            },
            source_schema: SourceSchema::LegacyTestForm,
        });
    }

    match StructuredRecord::deserialize(raw) {
        Ok(record) => {
            let is_import = record.is_import.unwrap_or_else(|| {
                record
                    .fields
                    .country_of_origin
                    .as_deref()
                    .is_some_and(|country| !country.trim().is_empty())
            });
            Ok(CanonicalApplication {
                application_id: record.application_id,
                alcohol_class: record.alcohol_class,
                is_import,
                fields: ApplicationFields {
                    brand_name: record.fields.brand_name,
                    class_type_designation: record.fields.class_type_designation,
                    alcohol_content: coerce_alcohol_display_text(&record.fields.alcohol_content),
                    net_contents: coerce_net_contents_text(&record.fields.net_contents),
                    name_address: record.fields.producer.name_address,
                    country_of_origin: record.fields.country_of_origin,
                    government_warning_required: true,
                    government_warning_text: record.fields.government_warning_text,
                },
                source_schema: SourceSchema::Prd,
            })
        }
        Err(error) => Err(ApplicationParseError::UnrecognizedShape(error.to_string())),
    }
}
