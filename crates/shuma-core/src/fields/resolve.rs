//! Value resolution over the extracted and manual blobs

use serde::Serialize;
use serde_json::Value;

use super::{registry, CanonicalField, FieldType, SectionConfig};
use crate::blob::{get_present, Blob};
use crate::models::ProvenanceRecord;
use crate::provenance::ProvenanceStore;

/// Displayed when no path yields a value
pub const NOT_FOUND_PLACEHOLDER: &str = "לא נמצא";

/// Which blob supplied a resolved value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrigin {
    Extracted,
    Manual,
    /// Produced by a custom getter
    Computed,
}

/// A resolved value together with the path that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub value: Value,
    /// `None` for computed fields
    pub path: Option<&'static str>,
    pub origin: ValueOrigin,
}

/// Resolve a field, reporting the winning path and blob
pub fn resolve_field(field: &CanonicalField, extracted: &Blob, manual: &Blob) -> Option<Resolution> {
    if let Some(getter) = field.custom_getter {
        return getter(extracted, manual).map(|value| Resolution {
            value,
            path: None,
            origin: ValueOrigin::Computed,
        });
    }

    for path in field.value_paths {
        if let Some(value) = get_present(extracted, path) {
            return Some(Resolution {
                value: value.clone(),
                path: Some(*path),
                origin: ValueOrigin::Extracted,
            });
        }
        if let Some(value) = get_present(manual, path) {
            return Some(Resolution {
                value: value.clone(),
                path: Some(*path),
                origin: ValueOrigin::Manual,
            });
        }
    }
    None
}

/// Resolve a field to its display value
///
/// Paths are tried in order; for each path the extracted blob is checked
/// before the manual blob. `None` means no path held a present value.
pub fn resolve(field: &CanonicalField, extracted: &Blob, manual: &Blob) -> Option<Value> {
    resolve_field(field, extracted, manual).map(|r| r.value)
}

/// Render a resolved value as display text
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NOT_FOUND_PLACEHOLDER.to_string(),
        Some(Value::String(s)) if s.is_empty() => NOT_FOUND_PLACEHOLDER.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(true)) => "כן".to_string(),
        Some(Value::Bool(false)) => "לא".to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| display_value(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other @ Value::Object(_)) => other.to_string(),
    }
}

/// A field as presented to the appraiser
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedField {
    pub key: &'static str,
    pub label: &'static str,
    pub section: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<&'static str>,
    pub value: Option<Value>,
    pub display: String,
    pub path: Option<&'static str>,
    pub origin: Option<ValueOrigin>,
    pub data_source: String,
    pub provenance: Option<ProvenanceRecord>,
}

fn view(
    section: &SectionConfig,
    field: &CanonicalField,
    extracted: &Blob,
    manual: &Blob,
    provenance: Option<&ProvenanceStore>,
) -> ResolvedField {
    let resolution = resolve_field(field, extracted, manual);
    let path = resolution.as_ref().and_then(|r| r.path);

    let record = provenance.and_then(|store| {
        path.and_then(|p| store.lookup(p))
            .or_else(|| store.lookup(field.key))
            .cloned()
    });

    ResolvedField {
        key: field.key,
        label: field.label,
        section: section.id,
        field_type: field.field_type,
        options: field.options.to_vec(),
        display: display_value(resolution.as_ref().map(|r| &r.value)),
        origin: resolution.as_ref().map(|r| r.origin),
        value: resolution.map(|r| r.value),
        path,
        data_source: field.data_source.describe(extracted),
        provenance: record,
    }
}

/// Resolve every field of one section; `None` for an unknown section
pub fn resolve_section(
    section_id: &str,
    extracted: &Blob,
    manual: &Blob,
    provenance: Option<&ProvenanceStore>,
) -> Option<Vec<ResolvedField>> {
    let section = registry::section(section_id)?;
    Some(
        section
            .fields
            .iter()
            .map(|field| view(section, field, extracted, manual, provenance))
            .collect(),
    )
}

/// Resolve every field of every section, in display order
pub fn resolve_all(
    extracted: &Blob,
    manual: &Blob,
    provenance: Option<&ProvenanceStore>,
) -> Vec<ResolvedField> {
    registry::sections()
        .iter()
        .flat_map(|section| {
            section
                .fields
                .iter()
                .map(move |field| view(section, field, extracted, manual, provenance))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::into_blob;
    use serde_json::json;

    fn field(paths: &'static [&'static str]) -> CanonicalField {
        CanonicalField::text("test", "Test", paths, "test")
    }

    #[test]
    fn test_path_order_checks_manual_before_next_path() {
        let f = field(&["a", "b"]);
        let extracted = into_blob(json!({"b": 5}));
        let manual = into_blob(json!({"a": 1}));
        assert_eq!(resolve(&f, &extracted, &manual), Some(json!(1)));
    }

    #[test]
    fn test_gush_manual_flat_beats_nested_extracted() {
        let f = field(&["gush", "land_registry.gush"]);
        let extracted = into_blob(json!({"land_registry": {"gush": 123}}));
        let manual = into_blob(json!({"gush": 456}));
        let resolution = resolve_field(&f, &extracted, &manual).unwrap();
        assert_eq!(resolution.value, json!(456));
        assert_eq!(resolution.path, Some("gush"));
        assert_eq!(resolution.origin, ValueOrigin::Manual);
    }

    #[test]
    fn test_extracted_wins_on_same_path() {
        let f = field(&["rooms"]);
        let extracted = into_blob(json!({"rooms": 4}));
        let manual = into_blob(json!({"rooms": 3}));
        assert_eq!(resolve(&f, &extracted, &manual), Some(json!(4)));
    }

    #[test]
    fn test_falsy_values_are_present() {
        let f = field(&["floor", "fallback"]);
        let fallback = into_blob(json!({"fallback": 9}));
        for present in [json!(0), json!(false), json!([]), json!("0")] {
            let extracted = into_blob(json!({"floor": present.clone()}));
            assert_eq!(resolve(&f, &extracted, &fallback), Some(present));
        }
    }

    #[test]
    fn test_null_and_empty_fall_through() {
        let f = field(&["a", "b"]);
        let extracted = into_blob(json!({"a": null, "b": "x"}));
        let manual = into_blob(json!({"a": ""}));
        assert_eq!(resolve(&f, &extracted, &manual), Some(json!("x")));
    }

    #[test]
    fn test_intermediate_scalar_is_absent() {
        let f = field(&["land_registry.gush"]);
        let extracted = into_blob(json!({"land_registry": "unavailable"}));
        assert_eq!(resolve(&f, &extracted, &Blob::new()), None);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let extracted = into_blob(json!({
            "land_registry": {"gush": 6638, "owners": [{"name": "א"}]},
            "building_permit": {"permit_number": "P-1"}
        }));
        let manual = into_blob(json!({"city": "חיפה", "rooms": 0}));
        let first = serde_json::to_value(resolve_all(&extracted, &manual, None)).unwrap();
        let second = serde_json::to_value(resolve_all(&extracted, &manual, None)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_getter_bypasses_paths() {
        let f = registry::field_by_key("fullAddress").unwrap();
        let manual = into_blob(json!({"street": "הרצל", "city": "חיפה"}));
        let resolution = resolve_field(f, &Blob::new(), &manual).unwrap();
        assert_eq!(resolution.origin, ValueOrigin::Computed);
        assert_eq!(resolution.path, None);
        assert_eq!(resolution.value, json!("הרצל, חיפה"));
    }

    #[test]
    fn test_display_placeholder() {
        assert_eq!(display_value(None), NOT_FOUND_PLACEHOLDER);
        assert_eq!(display_value(Some(&json!(0))), "0");
        assert_eq!(display_value(Some(&json!(["a", 2]))), "a, 2");
    }

    #[test]
    fn test_resolve_section_views() {
        let extracted = into_blob(json!({"building_permit": {"permit_number": "P-99"}}));
        let views = resolve_section("building_permit", &extracted, &Blob::new(), None).unwrap();
        let permit = views.iter().find(|v| v.key == "permitNumber").unwrap();
        assert_eq!(permit.display, "P-99");
        assert_eq!(permit.path, Some("building_permit.permit_number"));
        assert_eq!(permit.origin, Some(ValueOrigin::Extracted));

        let date = views.iter().find(|v| v.key == "permitDate").unwrap();
        assert_eq!(date.display, NOT_FOUND_PLACEHOLDER);
        assert!(date.origin.is_none());

        assert!(resolve_section("no_such_section", &extracted, &Blob::new(), None).is_none());
    }
}
