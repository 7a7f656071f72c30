//! Static requirement matrix plus the per-field override logic.
//!
//! The matrix gives the base required/conditional/optional level per
//! (alcohol class, field); four overrides layer on top of it: import status
//! hard-requires country-of-origin and name/address, the application's
//! explicit flag drives the government warning, and remaining conditional
//! fields become required exactly when a value is supplied.

use serde::{Deserialize, Serialize};

use labelgate_kernel::{AlcoholClass, CanonicalApplication, FieldKey};

use crate::rulesets::supporting_rule_ids_for_field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRequirementLevel {
    Required,
    Conditional,
    Optional,
}

/// The resolved requirement of one field for one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRequirementProfile {
    pub level: FieldRequirementLevel,
    pub is_required: bool,
    pub rationale: String,
    pub supporting_rule_ids: Vec<String>,
}

/// Base level before overrides.
pub fn requirement_level(alcohol_class: AlcoholClass, field: FieldKey) -> FieldRequirementLevel {
    use FieldRequirementLevel::{Conditional, Required};

    match field {
        FieldKey::BrandName => Required,
        FieldKey::ClassTypeDesignation => Required,
        FieldKey::AlcoholContent => match alcohol_class {
            AlcoholClass::DistilledSpirits | AlcoholClass::Wine => Required,
            AlcoholClass::Beer | AlcoholClass::Other => Conditional,
        },
        FieldKey::NetContents => Required,
        FieldKey::NameAddress => Conditional,
        FieldKey::CountryOfOrigin => Conditional,
        FieldKey::GovernmentWarning => Required,
    }
}

fn build_rationale(field: FieldKey, level: FieldRequirementLevel) -> &'static str {
    if field == FieldKey::CountryOfOrigin {
        return "Country of origin is mandatory when imported and optional otherwise.";
    }

    if field == FieldKey::NameAddress {
        return "Name/address is required for imported paths and validated when supplied.";
    }

    if field == FieldKey::AlcoholContent && level == FieldRequirementLevel::Conditional {
        return "Alcohol content is conditional for this class and required when supplied.";
    }

    match level {
        FieldRequirementLevel::Required => "This field is required for the selected alcohol class.",
        FieldRequirementLevel::Optional => "This field is optional for the selected alcohol class.",
        FieldRequirementLevel::Conditional => {
            "This field is conditionally required for the selected alcohol class."
        }
    }
}

/// Resolve the requirement profile for one field of one application.
pub fn field_requirement_profile(
    application: &CanonicalApplication,
    field: FieldKey,
) -> FieldRequirementProfile {
    let level = requirement_level(application.alcohol_class, field);
    let has_value = application
        .field_value(field)
        .is_some_and(|value| !value.is_empty());

    let is_required = match field {
        FieldKey::CountryOfOrigin => application.is_import,
        FieldKey::NameAddress => application.is_import || has_value,
        FieldKey::GovernmentWarning => application.fields.government_warning_required,
        _ => match level {
            FieldRequirementLevel::Required => true,
            FieldRequirementLevel::Optional => false,
            FieldRequirementLevel::Conditional => has_value,
        },
    };

    FieldRequirementProfile {
        level,
        is_required,
        rationale: build_rationale(field, level).to_string(),
        supporting_rule_ids: supporting_rule_ids_for_field(application.alcohol_class, field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelgate_kernel::{ApplicationFields, SourceSchema};

    fn application(
        alcohol_class: AlcoholClass,
        is_import: bool,
        country: Option<&str>,
        name_address: Option<&str>,
    ) -> CanonicalApplication {
        CanonicalApplication {
            application_id: "POLICY-TST-01".to_string(),
            alcohol_class,
            is_import,
            fields: ApplicationFields {
                brand_name: Some("TEST".to_string()),
                class_type_designation: Some("RUM".to_string()),
                alcohol_content: Some("40% ABV".to_string()),
                net_contents: Some("750 ML".to_string()),
                name_address: name_address.map(str::to_string),
                country_of_origin: country.map(str::to_string),
                government_warning_required: true,
                government_warning_text: "GOVERNMENT WARNING: ...".to_string(),
            },
            source_schema: SourceSchema::LegacyTestForm,
        }
    }

    #[test]
    fn matrix_levels_for_distilled_spirits() {
        let class = AlcoholClass::DistilledSpirits;
        assert_eq!(
            requirement_level(class, FieldKey::BrandName),
            FieldRequirementLevel::Required
        );
        assert_eq!(
            requirement_level(class, FieldKey::AlcoholContent),
            FieldRequirementLevel::Required
        );
        assert_eq!(
            requirement_level(class, FieldKey::NameAddress),
            FieldRequirementLevel::Conditional
        );
        assert_eq!(
            requirement_level(class, FieldKey::CountryOfOrigin),
            FieldRequirementLevel::Conditional
        );
    }

    #[test]
    fn beer_alcohol_content_is_conditional() {
        assert_eq!(
            requirement_level(AlcoholClass::Beer, FieldKey::AlcoholContent),
            FieldRequirementLevel::Conditional
        );
        assert_eq!(
            requirement_level(AlcoholClass::Wine, FieldKey::AlcoholContent),
            FieldRequirementLevel::Required
        );
    }

    #[test]
    fn import_hard_requires_country_and_name_address() {
        let app = application(AlcoholClass::DistilledSpirits, true, Some("BARBADOS"), None);
        let country = field_requirement_profile(&app, FieldKey::CountryOfOrigin);
        let name_address = field_requirement_profile(&app, FieldKey::NameAddress);
        assert!(country.is_required);
        assert!(name_address.is_required);
        assert!(!country.supporting_rule_ids.is_empty());
        assert!(!name_address.supporting_rule_ids.is_empty());
    }

    #[test]
    fn domestic_country_of_origin_is_not_required_even_with_value() {
        let app = application(AlcoholClass::DistilledSpirits, false, Some("USA"), None);
        let profile = field_requirement_profile(&app, FieldKey::CountryOfOrigin);
        assert!(!profile.is_required);
    }

    #[test]
    fn name_address_required_when_value_present() {
        let app = application(
            AlcoholClass::Beer,
            false,
            None,
            Some("Brewed by Example Brewing, Denver, CO"),
        );
        let profile = field_requirement_profile(&app, FieldKey::NameAddress);
        assert!(profile.is_required);
    }

    #[test]
    fn conditional_alcohol_follows_supplied_value() {
        let mut app = application(AlcoholClass::Beer, false, None, None);
        let with_value = field_requirement_profile(&app, FieldKey::AlcoholContent);
        assert!(with_value.is_required);

        app.fields.alcohol_content = None;
        let without_value = field_requirement_profile(&app, FieldKey::AlcoholContent);
        assert!(!without_value.is_required);
    }

    #[test]
    fn warning_follows_explicit_flag() {
        let mut app = application(AlcoholClass::Wine, false, None, None);
        assert!(field_requirement_profile(&app, FieldKey::GovernmentWarning).is_required);

        app.fields.government_warning_required = false;
        assert!(!field_requirement_profile(&app, FieldKey::GovernmentWarning).is_required);
    }
}
