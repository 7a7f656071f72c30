//! # Labelgate Policy
//!
//! Application contract parsing and field requirement derivation.
//!
//! Accepts the two supported application JSON shapes, canonicalizes them,
//! and resolves (alcohol class, import flag, field) into a requirement
//! profile backed by per-class executable rule catalogs with their
//! regulation citations.

pub mod application;
pub mod matrix;
pub mod rulesets;
pub mod units;

pub use application::{ApplicationParseError, GOVERNMENT_WARNING_TEXT, parse_application_json};
pub use matrix::{
    FieldRequirementLevel, FieldRequirementProfile, field_requirement_profile, requirement_level,
};
pub use rulesets::{
    ExecutablePolicyRule, RuleRequirement, RuleScope, executable_rules_for_class,
    supporting_rule_ids_for_field,
};
pub use units::{NetUnitPolicy, net_unit_policy, net_unit_system_for_class};
