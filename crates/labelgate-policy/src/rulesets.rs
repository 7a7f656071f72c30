//! Executable policy rule catalogs, one per alcohol class.
//!
//! Each rule carries the regulation citations that back a requirement
//! decision; resolvers join rules to fields by scope so every verdict can
//! point at its supporting rule IDs for audit trails.

use labelgate_kernel::{AlcoholClass, FieldKey};

/// How a rule binds: to one canonical field, or across several.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    Field(FieldKey),
    CrossField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleRequirement {
    Required,
    Conditional,
    Optional,
    ManualReview,
}

/// One executable labeling rule with its citations.
#[derive(Debug, Clone, Copy)]
pub struct ExecutablePolicyRule {
    pub id: &'static str,
    pub title: &'static str,
    pub scope: RuleScope,
    pub requirement: RuleRequirement,
    pub summary: &'static str,
    pub citations: &'static [&'static str],
}

const DISTILLED_SPIRITS_RULES: &[ExecutablePolicyRule] = &[
    ExecutablePolicyRule {
        id: "DS-01",
        title: "Same Field of Vision Core Items",
        scope: RuleScope::CrossField,
        requirement: RuleRequirement::ManualReview,
        summary: "Brand, class/type, and alcohol statements should share one field of vision.",
        citations: &["27 CFR 5.63", "27 CFR 5.64", "27 CFR 5.65"],
    },
    ExecutablePolicyRule {
        id: "DS-02",
        title: "Brand Name",
        scope: RuleScope::Field(FieldKey::BrandName),
        requirement: RuleRequirement::Required,
        summary: "Brand name must appear and match the application value.",
        citations: &["27 CFR 5.64"],
    },
    ExecutablePolicyRule {
        id: "DS-03",
        title: "Class/Type Designation",
        scope: RuleScope::Field(FieldKey::ClassTypeDesignation),
        requirement: RuleRequirement::Required,
        summary: "Class/type or permitted alternative designation must be present.",
        citations: &["27 CFR 5.141", "27 CFR 5.165"],
    },
    ExecutablePolicyRule {
        id: "DS-04",
        title: "Alcohol Content Statement",
        scope: RuleScope::Field(FieldKey::AlcoholContent),
        requirement: RuleRequirement::Required,
        summary: "Alcohol content must be provided and normalized ABV/proof checks apply.",
        citations: &["27 CFR 5.65"],
    },
    ExecutablePolicyRule {
        id: "DS-05",
        title: "Net Contents",
        scope: RuleScope::Field(FieldKey::NetContents),
        requirement: RuleRequirement::Required,
        summary: "Net contents are required with acceptable metric expression.",
        citations: &["27 CFR 5.70", "27 CFR 5.203"],
    },
    ExecutablePolicyRule {
        id: "DS-06",
        title: "Name and Address",
        scope: RuleScope::Field(FieldKey::NameAddress),
        requirement: RuleRequirement::Conditional,
        summary: "Name/address statement is expected; imported workflows prioritize strict presence.",
        citations: &["27 CFR 5.66", "27 CFR 5.67", "27 CFR 5.68"],
    },
    ExecutablePolicyRule {
        id: "DS-07",
        title: "Government Health Warning",
        scope: RuleScope::Field(FieldKey::GovernmentWarning),
        requirement: RuleRequirement::Required,
        summary: "Warning must match exact text with uppercase prefix and formatting checks.",
        citations: &["27 CFR part 16"],
    },
    ExecutablePolicyRule {
        id: "DS-08",
        title: "Country of Origin",
        scope: RuleScope::Field(FieldKey::CountryOfOrigin),
        requirement: RuleRequirement::Conditional,
        summary: "Country-of-origin statement is required when product is imported.",
        citations: &["19 CFR 134.11", "27 CFR 5.69"],
    },
];

const WINE_RULES: &[ExecutablePolicyRule] = &[
    ExecutablePolicyRule {
        id: "W-01",
        title: "Brand Name",
        scope: RuleScope::Field(FieldKey::BrandName),
        requirement: RuleRequirement::Required,
        summary: "Brand name must appear and match application values.",
        citations: &["27 CFR 4.33"],
    },
    ExecutablePolicyRule {
        id: "W-02",
        title: "Class/Type Designation",
        scope: RuleScope::Field(FieldKey::ClassTypeDesignation),
        requirement: RuleRequirement::Required,
        summary: "Class/type or truthful composition statement is required.",
        citations: &["27 CFR 4.21", "27 CFR 4.34", "27 CFR 4.91"],
    },
    ExecutablePolicyRule {
        id: "W-05",
        title: "Alcohol Content",
        scope: RuleScope::Field(FieldKey::AlcoholContent),
        requirement: RuleRequirement::Required,
        summary: "Alcohol content should be present and comparable under ABV normalization.",
        citations: &["27 CFR 4.36"],
    },
    ExecutablePolicyRule {
        id: "W-06",
        title: "Net Contents",
        scope: RuleScope::Field(FieldKey::NetContents),
        requirement: RuleRequirement::Required,
        summary: "Net contents must be present with accepted expression and normalized units.",
        citations: &["27 CFR 4.37", "27 CFR 4.70(b)", "27 CFR 4.72"],
    },
    ExecutablePolicyRule {
        id: "W-07",
        title: "Name and Address",
        scope: RuleScope::Field(FieldKey::NameAddress),
        requirement: RuleRequirement::Conditional,
        summary: "Name/address is typically expected; imported products enforce stricter requirement.",
        citations: &["27 CFR 4.35"],
    },
    ExecutablePolicyRule {
        id: "W-09",
        title: "Government Health Warning",
        scope: RuleScope::Field(FieldKey::GovernmentWarning),
        requirement: RuleRequirement::Required,
        summary: "Government warning requires strict text and uppercase prefix checks.",
        citations: &["27 CFR part 16"],
    },
    ExecutablePolicyRule {
        id: "W-10",
        title: "Country of Origin",
        scope: RuleScope::Field(FieldKey::CountryOfOrigin),
        requirement: RuleRequirement::Conditional,
        summary: "Country-of-origin statement is mandatory for imported wine products.",
        citations: &["19 CFR 134.11"],
    },
];

const BEER_RULES: &[ExecutablePolicyRule] = &[
    ExecutablePolicyRule {
        id: "MB-01",
        title: "Brand Name",
        scope: RuleScope::Field(FieldKey::BrandName),
        requirement: RuleRequirement::Required,
        summary: "Brand name must be present and match application values.",
        citations: &["27 CFR 7.64"],
    },
    ExecutablePolicyRule {
        id: "MB-02",
        title: "Designation",
        scope: RuleScope::Field(FieldKey::ClassTypeDesignation),
        requirement: RuleRequirement::Required,
        summary: "Class/type or valid alternative designation must be present.",
        citations: &["27 CFR 7.63", "27 CFR part 7 subpart I"],
    },
    ExecutablePolicyRule {
        id: "MB-04",
        title: "Net Contents",
        scope: RuleScope::Field(FieldKey::NetContents),
        requirement: RuleRequirement::Required,
        summary: "Net contents are required with acceptable U.S. customary notation.",
        citations: &["27 CFR 7.70"],
    },
    ExecutablePolicyRule {
        id: "MB-05",
        title: "Alcohol Content",
        scope: RuleScope::Field(FieldKey::AlcoholContent),
        requirement: RuleRequirement::Conditional,
        summary: "Alcohol statement is conditional and validated when supplied by application data.",
        citations: &["27 CFR 7.65"],
    },
    ExecutablePolicyRule {
        id: "MB-03",
        title: "Name and Address (Domestic)",
        scope: RuleScope::Field(FieldKey::NameAddress),
        requirement: RuleRequirement::Conditional,
        summary: "Name/address expected with domestic rules; strict requirement for import path.",
        citations: &["27 CFR 7.66", "27 CFR 25.141", "27 CFR 25.142"],
    },
    ExecutablePolicyRule {
        id: "MB-06",
        title: "Government Health Warning",
        scope: RuleScope::Field(FieldKey::GovernmentWarning),
        requirement: RuleRequirement::Required,
        summary: "Government warning must match required text and formatting expectations.",
        citations: &["27 CFR part 16"],
    },
    ExecutablePolicyRule {
        id: "MB-07",
        title: "Country of Origin",
        scope: RuleScope::Field(FieldKey::CountryOfOrigin),
        requirement: RuleRequirement::Conditional,
        summary: "Country-of-origin statement is mandatory for imported malt beverages.",
        citations: &["27 CFR 7.69", "19 CFR parts 102 and 134"],
    },
    ExecutablePolicyRule {
        id: "MB-08",
        title: "Name and Address (Imported)",
        scope: RuleScope::Field(FieldKey::NameAddress),
        requirement: RuleRequirement::Conditional,
        summary: "Importer name/address follows imported labeling path requirements.",
        citations: &["27 CFR 7.67", "27 CFR 7.68"],
    },
];

const OTHER_RULES: &[ExecutablePolicyRule] = &[
    ExecutablePolicyRule {
        id: "GEN-01",
        title: "Brand Name",
        scope: RuleScope::Field(FieldKey::BrandName),
        requirement: RuleRequirement::Required,
        summary: "Brand name is required for core verification workflows.",
        citations: &["MVP core field policy"],
    },
    ExecutablePolicyRule {
        id: "GEN-02",
        title: "Class/Type",
        scope: RuleScope::Field(FieldKey::ClassTypeDesignation),
        requirement: RuleRequirement::Required,
        summary: "Class/type designation is required for core verification workflows.",
        citations: &["MVP core field policy"],
    },
    ExecutablePolicyRule {
        id: "GEN-03",
        title: "Alcohol Content",
        scope: RuleScope::Field(FieldKey::AlcoholContent),
        requirement: RuleRequirement::Conditional,
        summary: "Alcohol content is conditional and enforced when supplied.",
        citations: &["MVP core field policy"],
    },
    ExecutablePolicyRule {
        id: "GEN-04",
        title: "Net Contents",
        scope: RuleScope::Field(FieldKey::NetContents),
        requirement: RuleRequirement::Required,
        summary: "Net contents are required for core verification workflows.",
        citations: &["MVP core field policy"],
    },
    ExecutablePolicyRule {
        id: "GEN-05",
        title: "Name/Address",
        scope: RuleScope::Field(FieldKey::NameAddress),
        requirement: RuleRequirement::Conditional,
        summary: "Name/address verification is conditional unless imported.",
        citations: &["MVP core field policy"],
    },
    ExecutablePolicyRule {
        id: "GEN-06",
        title: "Country of Origin",
        scope: RuleScope::Field(FieldKey::CountryOfOrigin),
        requirement: RuleRequirement::Conditional,
        summary: "Country of origin is required for imported products.",
        citations: &["MVP core field policy"],
    },
    ExecutablePolicyRule {
        id: "GEN-07",
        title: "Government Warning",
        scope: RuleScope::Field(FieldKey::GovernmentWarning),
        requirement: RuleRequirement::Required,
        summary: "Government warning must be validated under strict checks.",
        citations: &["MVP core field policy"],
    },
];

/// The executable rules backing one alcohol class.
pub fn executable_rules_for_class(alcohol_class: AlcoholClass) -> &'static [ExecutablePolicyRule] {
    match alcohol_class {
        AlcoholClass::DistilledSpirits => DISTILLED_SPIRITS_RULES,
        AlcoholClass::Wine => WINE_RULES,
        AlcoholClass::Beer => BEER_RULES,
        AlcoholClass::Other => OTHER_RULES,
    }
}

/// Rule IDs whose scope is exactly the given field.
pub fn supporting_rule_ids_for_field(alcohol_class: AlcoholClass, field: FieldKey) -> Vec<String> {
    executable_rules_for_class(alcohol_class)
        .iter()
        .filter(|rule| rule.scope == RuleScope::Field(field))
        .map(|rule| rule.id.to_string())
        .collect()
}
