//! Field expectations: the declared value joined with its resolved
//! requirement profile.

use labelgate_kernel::{CanonicalApplication, FieldKey};
use labelgate_policy::field_requirement_profile;

#[derive(Debug, Clone)]
pub struct FieldExpectation {
    pub field: FieldKey,
    pub expected_value: Option<String>,
    pub is_required: bool,
    pub requirement_reason: String,
    pub supporting_rule_ids: Vec<String>,
}

pub(crate) fn field_expectation(
    application: &CanonicalApplication,
    field: FieldKey,
) -> FieldExpectation {
    let profile = field_requirement_profile(application, field);
    let expected_value = match field {
        // The warning verifier owns its own expectation handling.
        FieldKey::GovernmentWarning => None,
        _ => application.field_value(field).map(str::to_string),
    };

    FieldExpectation {
        field,
        expected_value,
        is_required: profile.is_required,
        requirement_reason: profile.rationale,
        supporting_rule_ids: profile.supporting_rule_ids,
    }
}

pub(crate) fn format_application_value(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => "N/A".to_string(),
    }
}

pub(crate) fn append_rule_context(reason: &str, rule_ids: &[String]) -> String {
    if rule_ids.is_empty() {
        return reason.to_string();
    }

    format!("{reason} (Rules: {})", rule_ids.join(", "))
}
