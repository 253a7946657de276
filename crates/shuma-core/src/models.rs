//! Domain models shared by the store, the orchestrator and the API

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::blob::Blob;

/// Key under which the merged AI output lives inside session data
pub const EXTRACTED_DATA_KEY: &str = "extractedData";

/// Key under which the uploads list lives inside session data
pub const UPLOADS_KEY: &str = "uploads";

// ============================================================================
// Document types
// ============================================================================

/// Uploaded document type, the unit of (selective) extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    /// Land registry extract (נסח טאבו)
    #[serde(alias = "land_registry")]
    Tabu,
    /// Building permit (היתר בנייה)
    #[serde(alias = "building_permit")]
    Permit,
    /// Shared building / condominium order (צו בית משותף)
    #[serde(alias = "shared_building")]
    Condo,
    /// Property photographs, analysed as interior + exterior
    #[serde(alias = "image_analysis")]
    Images,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tabu => "tabu",
            Self::Permit => "permit",
            Self::Condo => "condo",
            Self::Images => "images",
        }
    }

    pub fn all() -> &'static [DocType] {
        &[Self::Tabu, Self::Permit, Self::Condo, Self::Images]
    }

    /// Extraction calls issued for this document type
    pub fn kinds(&self) -> &'static [ExtractionKind] {
        match self {
            Self::Tabu => &[ExtractionKind::LandRegistry],
            Self::Permit => &[ExtractionKind::BuildingPermit],
            Self::Condo => &[ExtractionKind::SharedBuilding],
            Self::Images => &[ExtractionKind::InteriorImages, ExtractionKind::ExteriorImages],
        }
    }

    /// Map an upload's `type` field to the document type it feeds
    pub fn from_upload_type(upload_type: &str) -> Option<Self> {
        match upload_type.to_lowercase().as_str() {
            "tabu" | "land_registry" => Some(Self::Tabu),
            "permit" | "building_permit" => Some(Self::Permit),
            "condo" | "condominium_order" | "shared_building" => Some(Self::Condo),
            "building_image" | "interior_image" | "exterior_image" | "image" | "images" => {
                Some(Self::Images)
            }
            _ => None,
        }
    }
}

impl std::str::FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tabu" | "land_registry" => Ok(Self::Tabu),
            "permit" | "building_permit" => Ok(Self::Permit),
            "condo" | "shared_building" => Ok(Self::Condo),
            "images" | "image_analysis" => Ok(Self::Images),
            _ => Err(format!("Unknown document type: {}", s)),
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One AI extraction call
///
/// The string form doubles as the namespace key inside the extracted blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionKind {
    LandRegistry,
    BuildingPermit,
    SharedBuilding,
    #[serde(rename = "interior_analysis")]
    InteriorImages,
    #[serde(rename = "exterior_analysis")]
    ExteriorImages,
}

impl ExtractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LandRegistry => "land_registry",
            Self::BuildingPermit => "building_permit",
            Self::SharedBuilding => "shared_building",
            Self::InteriorImages => "interior_analysis",
            Self::ExteriorImages => "exterior_analysis",
        }
    }

    pub fn all() -> &'static [ExtractionKind] {
        &[
            Self::LandRegistry,
            Self::BuildingPermit,
            Self::SharedBuilding,
            Self::InteriorImages,
            Self::ExteriorImages,
        ]
    }

    pub fn doc_type(&self) -> DocType {
        match self {
            Self::LandRegistry => DocType::Tabu,
            Self::BuildingPermit => DocType::Permit,
            Self::SharedBuilding => DocType::Condo,
            Self::InteriorImages | Self::ExteriorImages => DocType::Images,
        }
    }

    /// Whether this call consumes photographs rather than PDFs
    pub fn is_image_analysis(&self) -> bool {
        matches!(self, Self::InteriorImages | Self::ExteriorImages)
    }
}

impl std::str::FromStr for ExtractionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "land_registry" => Ok(Self::LandRegistry),
            "building_permit" => Ok(Self::BuildingPermit),
            "shared_building" => Ok(Self::SharedBuilding),
            "interior_analysis" => Ok(Self::InteriorImages),
            "exterior_analysis" => Ok(Self::ExteriorImages),
            _ => Err(format!("Unknown extraction kind: {}", s)),
        }
    }
}

impl std::fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// A valuation wizard session
///
/// `data` holds the appraiser-entered fields, the uploads list and the
/// extracted-data blob under [`EXTRACTED_DATA_KEY`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub data: Blob,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// The extracted-data blob (empty when nothing was extracted yet)
    pub fn extracted_data(&self) -> Blob {
        extracted_data_of(&self.data)
    }

    /// Uploaded documents listed in session data
    pub fn uploads(&self) -> Vec<Upload> {
        uploads_of(&self.data)
    }
}

/// Read the extracted-data blob out of session data
pub fn extracted_data_of(data: &Blob) -> Blob {
    match data.get(EXTRACTED_DATA_KEY) {
        Some(Value::Object(map)) => map.clone(),
        _ => Blob::new(),
    }
}

/// Read the uploads list out of session data, skipping malformed entries
pub fn uploads_of(data: &Blob) -> Vec<Upload> {
    match data.get(UPLOADS_KEY) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// One uploaded file as recorded by the upload step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    #[serde(rename = "type")]
    pub upload_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

// ============================================================================
// Provenance
// ============================================================================

/// How a field value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Ai,
    Manual,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Manual => "manual",
        }
    }
}

impl std::str::FromStr for ExtractionMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ai" => Ok(Self::Ai),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Unknown extraction method: {}", s)),
        }
    }
}

/// Region of a document page, in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Accepts a bbox as an object or as a JSON-encoded string
fn deserialize_bbox<'de, D>(deserializer: D) -> std::result::Result<Option<BoundingBox>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => serde_json::from_str(&s).ok(),
        Some(v @ Value::Object(_)) => serde_json::from_value(v).ok(),
        _ => None,
    })
}

/// Where a field's current value came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub id: i64,
    pub session_id: String,
    pub field_path: String,
    pub document_name: Option<String>,
    pub document_id: Option<String>,
    pub page_number: Option<u32>,
    /// 0.0-1.0
    pub confidence: Option<f64>,
    pub extraction_method: ExtractionMethod,
    #[serde(default, deserialize_with = "deserialize_bbox")]
    pub bbox: Option<BoundingBox>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Provenance record for insertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProvenanceRecord {
    pub field_path: String,
    #[serde(default)]
    pub document_name: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub confidence: Option<f64>,
    pub extraction_method: ExtractionMethod,
    #[serde(default, deserialize_with = "deserialize_bbox")]
    pub bbox: Option<BoundingBox>,
}

impl NewProvenanceRecord {
    /// Record for a value typed in by the appraiser
    pub fn manual(field_path: &str) -> Self {
        Self {
            field_path: field_path.to_string(),
            document_name: None,
            document_id: None,
            page_number: None,
            confidence: Some(1.0),
            extraction_method: ExtractionMethod::Manual,
            bbox: None,
        }
    }
}

// ============================================================================
// Extraction snapshots
// ============================================================================

/// Outcome of one document type within an extraction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocTypeStatus {
    Succeeded { fields: usize },
    Failed { error: String },
    Skipped,
}

impl DocTypeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// What a snapshot was produced from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Document types processed in this run
    #[serde(default)]
    pub processed: Vec<DocType>,
    /// Whether the run was a selective reprocess
    #[serde(default)]
    pub selective: bool,
    #[serde(default)]
    pub statuses: BTreeMap<DocType, DocTypeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Any other metadata supplied by clients
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Immutable record of one completed extraction run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIExtractionSnapshot {
    pub id: i64,
    pub session_id: String,
    pub extraction_date: DateTime<Utc>,
    pub extracted_fields: Blob,
    pub is_active: bool,
    #[serde(rename = "extractionType")]
    pub extraction_type: String,
    pub metadata: ExtractionMetadata,
}

/// Extraction type recorded for orchestrator runs
pub const COMBINED_EXTRACTION: &str = "combined";

// ============================================================================
// Field edits
// ============================================================================

/// Audit row for a manual field edit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEditRecord {
    pub id: i64,
    pub session_id: String,
    pub field_key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_doc_type_from_upload_type() {
        assert_eq!(DocType::from_upload_type("tabu"), Some(DocType::Tabu));
        assert_eq!(
            DocType::from_upload_type("interior_image"),
            Some(DocType::Images)
        );
        assert_eq!(DocType::from_upload_type("gis_screenshot"), None);
    }

    #[test]
    fn test_doc_type_deserializes_cli_spellings() {
        for (name, expected) in [
            ("tabu", DocType::Tabu),
            ("land_registry", DocType::Tabu),
            ("building_permit", DocType::Permit),
            ("shared_building", DocType::Condo),
            ("image_analysis", DocType::Images),
        ] {
            let parsed: DocType = serde_json::from_value(json!(name)).unwrap();
            assert_eq!(parsed, expected);
            assert_eq!(name.parse::<DocType>().unwrap(), expected);
        }
        // Serialized form stays canonical
        assert_eq!(serde_json::to_value(DocType::Tabu).unwrap(), json!("tabu"));
        assert!(serde_json::from_value::<DocType>(json!("deeds")).is_err());
    }

    #[test]
    fn test_images_issue_two_calls() {
        assert_eq!(DocType::Images.kinds().len(), 2);
        for kind in DocType::Images.kinds() {
            assert_eq!(kind.doc_type(), DocType::Images);
        }
    }

    #[test]
    fn test_bbox_from_string_or_object() {
        let from_string: NewProvenanceRecord = serde_json::from_value(json!({
            "field_path": "gush",
            "extraction_method": "ai",
            "bbox": "{\"x\":1,\"y\":2,\"width\":3,\"height\":4}"
        }))
        .unwrap();
        assert_eq!(from_string.bbox.unwrap().width, 3.0);

        let from_object: NewProvenanceRecord = serde_json::from_value(json!({
            "field_path": "gush",
            "extraction_method": "ai",
            "bbox": {"x": 1, "y": 2, "width": 3, "height": 4}
        }))
        .unwrap();
        assert_eq!(from_object.bbox.unwrap().height, 4.0);
    }

    #[test]
    fn test_doc_type_status_serialization() {
        let status = DocTypeStatus::Failed {
            error: "timeout".into(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, json!({"status": "failed", "error": "timeout"}));
    }

    #[test]
    fn test_uploads_of_skips_malformed() {
        let data = crate::blob::into_blob(json!({
            "uploads": [
                {"type": "tabu", "url": "tabu.pdf"},
                {"no_type": true}
            ]
        }));
        let uploads = uploads_of(&data);
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].upload_type, "tabu");
    }
}
