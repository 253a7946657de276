//! Normalization of raw provider output into blob fragments
//!
//! Each call's JSON is flattened to a set of snake_case fields. A document
//! type's fragment holds the fields under the call's namespace (its kind name)
//! plus a handful of flat camelCase convenience keys that the field registry
//! reads first.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::types::{ExtractedField, FieldEvidence};
use crate::blob::Blob;
use crate::error::{Error, Result};
use crate::models::{DocType, ExtractionKind};
use crate::provenance::camel_to_snake;

/// Fields of one call, keyed by snake_case name
pub type FieldSet = BTreeMap<String, ExtractedField>;

/// Values models use to say a field was not found
const NOT_FOUND_MARKERS: &[&str] = &["not found", "לא נמצא", "n/a", "null", "none"];

/// Flat convenience keys written next to each namespace
fn flat_key(kind: ExtractionKind, field: &str) -> Option<&'static str> {
    let key = match (kind, field) {
        (ExtractionKind::LandRegistry, "gush") => "gush",
        (ExtractionKind::LandRegistry, "chelka") => "chelka",
        (ExtractionKind::LandRegistry, "sub_chelka") => "subChelka",
        (ExtractionKind::LandRegistry, "ownership_type") => "ownershipType",
        (ExtractionKind::LandRegistry, "registered_area") => "registeredArea",
        (ExtractionKind::LandRegistry, "built_area") => "builtArea",
        (ExtractionKind::LandRegistry, "balcony_area") => "balconyArea",
        (ExtractionKind::LandRegistry, "extract_date") => "extractDate",
        (ExtractionKind::LandRegistry, "floor") => "floor",
        (ExtractionKind::LandRegistry, "rooms") => "rooms",
        (ExtractionKind::LandRegistry, "parking") => "parking",
        (ExtractionKind::LandRegistry, "owners") => "owners",
        (ExtractionKind::LandRegistry, "attachments") => "attachments",
        (ExtractionKind::BuildingPermit, "permit_number") => "permitNumber",
        (ExtractionKind::BuildingPermit, "permit_date") => "permitDate",
        (ExtractionKind::BuildingPermit, "permitted_use") => "permittedUse",
        (ExtractionKind::BuildingPermit, "building_year") => "buildingYear",
        (ExtractionKind::SharedBuilding, "order_date") => "orderDate",
        (ExtractionKind::SharedBuilding, "sub_plots_count") => "subPlotsCount",
        (ExtractionKind::SharedBuilding, "building_floors") => "buildingFloors",
        (ExtractionKind::SharedBuilding, "total_units") => "buildingUnits",
        (ExtractionKind::SharedBuilding, "apartment_number") => "apartmentNumber",
        (ExtractionKind::SharedBuilding, "floor") => "floor",
        (ExtractionKind::SharedBuilding, "parking") => "parking",
        (ExtractionKind::InteriorImages, "property_condition") => "propertyCondition",
        (ExtractionKind::InteriorImages, "finish_level") => "finishLevel",
        (ExtractionKind::ExteriorImages, "building_condition") => "buildingCondition",
        _ => return None,
    };
    Some(key)
}

fn is_not_found(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let s = s.trim();
            s.is_empty() || NOT_FOUND_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m))
        }
        _ => false,
    }
}

fn confidence_of(value: Option<&Value>) -> Option<f64> {
    let confidence = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok()?,
        _ => return None,
    };
    if !confidence.is_finite() {
        return None;
    }
    // Some models answer in percent
    let confidence = if confidence > 1.0 {
        confidence / 100.0
    } else {
        confidence
    };
    Some(confidence.clamp(0.0, 1.0))
}

fn page_of(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|p| u32::try_from(p).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_of(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Read one field, unwrapping `{value, confidence, ...}` wrappers
fn read_field(raw: &Value) -> Option<ExtractedField> {
    let field = match raw {
        Value::Object(obj) if obj.contains_key("value") => ExtractedField {
            value: obj.get("value").cloned().unwrap_or(Value::Null),
            confidence: confidence_of(obj.get("confidence")),
            context: text_of(obj.get("context")),
            pattern: text_of(obj.get("pattern")),
            page: page_of(obj.get("page")),
        },
        other => ExtractedField::plain(other.clone()),
    };
    (!is_not_found(&field.value)).then_some(field)
}

/// Normalize the JSON returned by one extraction call
///
/// Accepts fields at the top level or nested under the call's namespace;
/// namespaced entries win. Keys are converted to snake_case and not-found
/// values are dropped.
pub fn normalize_fields(kind: ExtractionKind, raw: &Value) -> Result<FieldSet> {
    let obj = raw.as_object().ok_or_else(|| {
        Error::UnexpectedResponseFormat(format!("{} response is not a JSON object", kind))
    })?;

    let mut fields = FieldSet::new();
    let mut collect = |entries: &Map<String, Value>| {
        for (key, value) in entries {
            let key = camel_to_snake(key);
            match read_field(value) {
                Some(field) => {
                    fields.insert(key, field);
                }
                None => {
                    fields.remove(&key);
                }
            }
        }
    };

    let namespace = kind.as_str();
    let top_level: Map<String, Value> = obj
        .iter()
        .filter(|(k, _)| k.as_str() != namespace)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    collect(&top_level);
    if let Some(Value::Object(nested)) = obj.get(namespace) {
        collect(nested);
    }

    Ok(fields)
}

/// Normalized output of one document type
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedExtractionResult {
    LandRegistry(FieldSet),
    BuildingPermit(FieldSet),
    SharedBuilding(FieldSet),
    /// Photos go through two calls; either may have failed
    ImageAnalysis {
        interior: Option<FieldSet>,
        exterior: Option<FieldSet>,
    },
}

impl NormalizedExtractionResult {
    /// Wrap the field set of a single-call document type
    pub fn single(kind: ExtractionKind, fields: FieldSet) -> Self {
        match kind {
            ExtractionKind::LandRegistry => Self::LandRegistry(fields),
            ExtractionKind::BuildingPermit => Self::BuildingPermit(fields),
            ExtractionKind::SharedBuilding => Self::SharedBuilding(fields),
            ExtractionKind::InteriorImages => Self::ImageAnalysis {
                interior: Some(fields),
                exterior: None,
            },
            ExtractionKind::ExteriorImages => Self::ImageAnalysis {
                interior: None,
                exterior: Some(fields),
            },
        }
    }

    pub fn doc_type(&self) -> DocType {
        match self {
            Self::LandRegistry(_) => DocType::Tabu,
            Self::BuildingPermit(_) => DocType::Permit,
            Self::SharedBuilding(_) => DocType::Condo,
            Self::ImageAnalysis { .. } => DocType::Images,
        }
    }

    /// Field sets per call
    pub fn parts(&self) -> Vec<(ExtractionKind, &FieldSet)> {
        match self {
            Self::LandRegistry(f) => vec![(ExtractionKind::LandRegistry, f)],
            Self::BuildingPermit(f) => vec![(ExtractionKind::BuildingPermit, f)],
            Self::SharedBuilding(f) => vec![(ExtractionKind::SharedBuilding, f)],
            Self::ImageAnalysis { interior, exterior } => {
                let mut parts = Vec::new();
                if let Some(f) = interior {
                    parts.push((ExtractionKind::InteriorImages, f));
                }
                if let Some(f) = exterior {
                    parts.push((ExtractionKind::ExteriorImages, f));
                }
                parts
            }
        }
    }

    pub fn field_count(&self) -> usize {
        self.parts().iter().map(|(_, f)| f.len()).sum()
    }

    /// Blob fragment contributed by this document type
    pub fn fragment(&self) -> Blob {
        let mut blob = Blob::new();
        for (kind, fields) in self.parts() {
            let mut namespace = Map::new();
            for (key, field) in fields {
                namespace.insert(key.clone(), field.value.clone());
                if let Some(flat) = flat_key(kind, key) {
                    blob.insert(flat.to_string(), field.value.clone());
                }
            }
            blob.insert(kind.as_str().to_string(), Value::Object(namespace));
        }
        blob
    }

    /// Provenance evidence for every path written by [`Self::fragment`]
    pub fn evidence(&self) -> Vec<FieldEvidence> {
        let mut evidence = Vec::new();
        for (kind, fields) in self.parts() {
            for (key, field) in fields {
                let paths = std::iter::once(format!("{}.{}", kind.as_str(), key))
                    .chain(flat_key(kind, key).map(String::from));
                for path in paths {
                    evidence.push(FieldEvidence {
                        kind,
                        path,
                        confidence: field.confidence,
                        page: field.page,
                    });
                }
            }
        }
        evidence
    }
}
