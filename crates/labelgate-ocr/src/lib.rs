//! # Labelgate OCR
//!
//! OCR response normalization. The engine core only understands the
//! canonical line/token/coordinate-space model; this crate is the sole
//! consumer of raw provider payloads.
//!
//! Provider families are modeled as a closed set of adapters behind
//! [`adapter::PayloadAdapter`]; adding a provider means adding an impl, not
//! another branch in the normalizer. The entry point is
//! [`normalize_ocr_payload`], which never fails — unparsable shapes degrade
//! to empty output plus warnings.

pub mod adapter;
pub mod blocks;
pub mod coerce;
pub mod normalize;
pub mod synthesize;

pub use adapter::{AdapterExtraction, DirectArrayAdapter, DocumentBlockAdapter, PayloadAdapter};
pub use normalize::{NormalizedOcr, OcrRunDiagnostics, normalize_ocr_payload};
