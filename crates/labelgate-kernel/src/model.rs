//! Canonical data model shared by every verification stage.
//!
//! All entities are immutable value objects: the engine holds no cross-call
//! state, and a `VerificationFieldResult` is created fresh on every run. The
//! serialized form uses camelCase keys so the JSON matches the review-side
//! contract.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in image pixel space.
///
/// A box is only usable as evidence when `x1 > x0 && y1 > y0`; invalid boxes
/// are never surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn is_valid(&self) -> bool {
        self.x1 > self.x0 && self.y1 > self.y0
    }

    /// Width floored at one pixel so it is safe as a divisor.
    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).max(1.0)
    }

    /// Height floored at one pixel so it is safe as a divisor.
    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).max(1.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width() / self.height()
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Overlap area divided by the smaller box area; 0.0 when disjoint.
    pub fn overlap_ratio(&self, other: &BoundingBox) -> f64 {
        let overlap_width = (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0);
        let overlap_height = (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0);
        if overlap_width <= 0.0 || overlap_height <= 0.0 {
            return 0.0;
        }

        let overlap_area = overlap_width * overlap_height;
        let self_area = ((self.x1 - self.x0) * (self.y1 - self.y0)).max(1.0);
        let other_area = ((other.x1 - other.x0) * (other.y1 - other.y0)).max(1.0);
        overlap_area / self_area.min(other_area)
    }
}

/// One vertex of an optional non-rectangular detection region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolygonPoint {
    pub x: f64,
    pub y: f64,
}

/// Reduce a polygon (>= 3 points to be usable) to its enclosing box.
pub fn polygon_bounding_box(points: &[PolygonPoint]) -> Option<BoundingBox> {
    let first = points.first()?;
    let mut bbox = BoundingBox::new(first.x, first.y, first.x, first.y);
    for point in &points[1..] {
        bbox.x0 = bbox.x0.min(point.x);
        bbox.y0 = bbox.y0.min(point.y);
        bbox.x1 = bbox.x1.max(point.x);
        bbox.y1 = bbox.y1.max(point.y);
    }
    Some(bbox)
}

/// The rectangle of image pixels the OCR geometry is expressed in.
///
/// Required whenever evidence-box-to-page area ratios are computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSpace {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CoordinateSpace {
    pub fn from_bounding_box(bbox: &BoundingBox) -> Option<Self> {
        let width = bbox.x1 - bbox.x0;
        let height = bbox.y1 - bbox.y0;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }

        Some(Self {
            x: bbox.x0,
            y: bbox.y0,
            width,
            height,
        })
    }

    pub fn to_bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

/// One logical text line as reported (or synthesized) by an OCR backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    /// In [0, 1] after normalization.
    pub confidence: f64,
    pub bbox: BoundingBox,
    /// Kept for diagnostics overlays; always reducible to `bbox`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Vec<PolygonPoint>>,
}

/// One word-level unit, either reported directly or derived by splitting a
/// line on whitespace with proportional sub-boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrToken {
    pub text: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    #[serde(default)]
    pub line_id: Option<String>,
}

/// The seven canonical label fields, in their fixed evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    BrandName,
    ClassTypeDesignation,
    AlcoholContent,
    NetContents,
    NameAddress,
    CountryOfOrigin,
    GovernmentWarning,
}

impl FieldKey {
    /// Canonical output order. Every verification run emits exactly these
    /// fields, exactly once each, in this order.
    pub const ALL: [FieldKey; 7] = [
        FieldKey::BrandName,
        FieldKey::ClassTypeDesignation,
        FieldKey::AlcoholContent,
        FieldKey::NetContents,
        FieldKey::NameAddress,
        FieldKey::CountryOfOrigin,
        FieldKey::GovernmentWarning,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FieldKey::BrandName => "Brand Name",
            FieldKey::ClassTypeDesignation => "Class / Type Designation",
            FieldKey::AlcoholContent => "Alcohol Content",
            FieldKey::NetContents => "Net Contents",
            FieldKey::NameAddress => "Name / Address",
            FieldKey::CountryOfOrigin => "Country of Origin",
            FieldKey::GovernmentWarning => "Government Warning",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::BrandName => "brand_name",
            FieldKey::ClassTypeDesignation => "class_type_designation",
            FieldKey::AlcoholContent => "alcohol_content",
            FieldKey::NetContents => "net_contents",
            FieldKey::NameAddress => "name_address",
            FieldKey::CountryOfOrigin => "country_of_origin",
            FieldKey::GovernmentWarning => "government_warning",
        }
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlcoholClass {
    Wine,
    Beer,
    DistilledSpirits,
    Other,
}

impl AlcoholClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlcoholClass::Wine => "wine",
            AlcoholClass::Beer => "beer",
            AlcoholClass::DistilledSpirits => "distilled_spirits",
            AlcoholClass::Other => "other",
        }
    }
}

/// Per-field verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Pass,
    Fail,
    #[serde(rename = "Needs Review")]
    NeedsReview,
    Missing,
}

/// Where the surfaced evidence box came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceSource {
    Word,
    Line,
    None,
}

/// Which accepted input contract the application record was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSchema {
    LegacyTestForm,
    Prd,
}

/// The declared field values of a regulatory application record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationFields {
    pub brand_name: Option<String>,
    pub class_type_designation: Option<String>,
    pub alcohol_content: Option<String>,
    pub net_contents: Option<String>,
    pub name_address: Option<String>,
    pub country_of_origin: Option<String>,
    pub government_warning_required: bool,
    pub government_warning_text: String,
}

/// Canonical application record. Produced by the contract parser; immutable
/// once handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalApplication {
    pub application_id: String,
    pub alcohol_class: AlcoholClass,
    pub is_import: bool,
    pub fields: ApplicationFields,
    pub source_schema: SourceSchema,
}

impl CanonicalApplication {
    /// The declared value the verifier compares against, per field.
    ///
    /// The government warning only carries an expectation when the
    /// application explicitly requires it.
    pub fn field_value(&self, field: FieldKey) -> Option<&str> {
        match field {
            FieldKey::BrandName => self.fields.brand_name.as_deref(),
            FieldKey::ClassTypeDesignation => self.fields.class_type_designation.as_deref(),
            FieldKey::AlcoholContent => self.fields.alcohol_content.as_deref(),
            FieldKey::NetContents => self.fields.net_contents.as_deref(),
            FieldKey::NameAddress => self.fields.name_address.as_deref(),
            FieldKey::CountryOfOrigin => self.fields.country_of_origin.as_deref(),
            FieldKey::GovernmentWarning => {
                if self.fields.government_warning_required {
                    Some(self.fields.government_warning_text.as_str())
                } else {
                    None
                }
            }
        }
    }
}

/// One per-field verdict with its supporting evidence coordinates.
///
/// Never mutated after construction; carries no identity beyond the
/// (applicationId, field) tuple for a given run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationFieldResult {
    pub field: FieldKey,
    pub label: String,
    pub application_value: String,
    pub extracted_value: String,
    pub status: VerificationStatus,
    /// In [0, 1]; `None` when the verdict did not rest on OCR evidence.
    pub confidence: Option<f64>,
    pub reason: String,
    pub evidence_box: Option<BoundingBox>,
    pub evidence_source: EvidenceSource,
    pub evidence_token_count: usize,
    /// Evidence area divided by page bounds area; `None` without page bounds.
    pub evidence_box_area_ratio: Option<f64>,
    pub evidence_oversized: bool,
}
