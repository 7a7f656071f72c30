//! # Labelgate Kernel
//!
//! The shared core of the label-field verification engine: a canonical
//! text/geometry model, the text normalizer every comparison routes through,
//! value parsers for alcohol-content and net-contents statements, and the
//! evidence geometry engine.
//!
//! This crate is **provider-agnostic**: it does not know where OCR lines come
//! from or which policy requires a field. It only prescribes how text and
//! geometry behave once normalized into the canonical model.
//!
//! ## Architecture
//!
//! ```text
//! model      <- BoundingBox, OcrLine/OcrToken, CanonicalApplication, results
//!     |
//! text       <- normalization + bigram similarity (sole similarity home)
//!     |
//! parse      <- ABV/proof and volume statements
//!     |
//! geometry   <- reading order, clusters, outliers, oversize checks
//! ```

pub mod error;
pub mod geometry;
pub mod model;
pub mod parse;
pub mod text;

pub use error::VerificationError;
pub use model::{
    AlcoholClass, ApplicationFields, BoundingBox, CanonicalApplication, CoordinateSpace,
    EvidenceSource, FieldKey, OcrLine, OcrToken, PolygonPoint, SourceSchema,
    VerificationFieldResult, VerificationStatus, polygon_bounding_box,
};
pub use parse::{
    NetUnit, ParsedAlcoholContent, ParsedNetContents, UnitSystem, parse_alcohol_content,
    parse_net_contents,
};
pub use text::{
    collapse_whitespace, dice_coefficient, normalize_text, normalized_includes,
    tokenize_normalized,
};
