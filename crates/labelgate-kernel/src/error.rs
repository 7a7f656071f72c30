//! Error types for kernel and orchestrator operations.
//!
//! Malformed OCR content never raises an error — it degrades to a Missing or
//! Needs Review verdict with an explanatory reason. The variants here cover
//! the conditions that are genuine programming defects or caller mistakes.

use crate::model::FieldKey;

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// A canonical field is absent from the orchestrator's output. This is an
    /// internal invariant violation, not bad input, and stays a hard failure.
    #[error("missing verification result for canonical field: {field}")]
    MissingFieldResult { field: FieldKey },
}
