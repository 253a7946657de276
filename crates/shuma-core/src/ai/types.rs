//! Types shared by the extraction backends

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ExtractionKind;

/// A document ready to be embedded in a provider request
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub name: String,
    /// MIME type, e.g. `application/pdf` or `image/jpeg`
    pub media_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

impl LoadedDocument {
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// One field read out of a provider response
///
/// Providers wrap values as `{value, confidence, context, pattern, page}`;
/// plain values are accepted too and carry no evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl ExtractedField {
    pub fn plain(value: Value) -> Self {
        Self {
            value,
            confidence: None,
            context: None,
            pattern: None,
            page: None,
        }
    }
}

/// Evidence for one blob path, used to write provenance records
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEvidence {
    /// Call that produced the value
    pub kind: ExtractionKind,
    /// Dotted path in the extracted blob
    pub path: String,
    pub confidence: Option<f64>,
    pub page: Option<u32>,
}
