//! Custom value getters for fields that need formatting or composition

use serde_json::{Map, Value};

use crate::blob::{get_present, Blob};

const OWNERS_PATHS: &[&str] = &["owners", "land_registry.owners"];
const ATTACHMENTS_PATHS: &[&str] = &["attachments", "land_registry.attachments"];

/// First present value across paths, extracted before manual per path
fn first_present(paths: &[&str], extracted: &Blob, manual: &Blob) -> Option<Value> {
    paths.iter().find_map(|path| {
        get_present(extracted, path)
            .or_else(|| get_present(manual, path))
            .cloned()
    })
}

fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Join list entries with `; `, formatting object entries with `format`
fn join_entries(value: Value, format: fn(&Map<String, Value>) -> Option<String>) -> Option<Value> {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(map) => format(map),
                    other => text_of(Some(other)),
                })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(Value::String(parts.join("; ")))
            }
        }
        Value::String(s) if !s.trim().is_empty() => Some(Value::String(s)),
        _ => None,
    }
}

/// Owners list, e.g. `ישראל ישראלי (ת.ז. 123) 1/2; ...`
pub fn owners(extracted: &Blob, manual: &Blob) -> Option<Value> {
    let raw = first_present(OWNERS_PATHS, extracted, manual)?;
    join_entries(raw, |owner| {
        let name = text_of(owner.get("name"))?;
        let mut entry = name;
        if let Some(id) = text_of(owner.get("id_number").or_else(|| owner.get("idNumber"))) {
            entry.push_str(&format!(" (ת.ז. {})", id));
        }
        let share = owner.get("share").or_else(|| owner.get("ownership_share"));
        if let Some(share) = text_of(share) {
            entry.push_str(&format!(" {}", share));
        }
        Some(entry)
    })
}

/// Attachments (הצמדות), e.g. `חניה מס' 4 (12 מ"ר); מחסן (6 מ"ר)`
pub fn attachments(extracted: &Blob, manual: &Blob) -> Option<Value> {
    let raw = first_present(ATTACHMENTS_PATHS, extracted, manual)?;
    join_entries(raw, |attachment| {
        let description = text_of(
            attachment
                .get("description")
                .or_else(|| attachment.get("type")),
        )?;
        match text_of(attachment.get("area")) {
            Some(area) => Some(format!("{} ({} מ\"ר)", description, area)),
            None => Some(description),
        }
    })
}

/// Full address composed from the appraiser's form data only
pub fn full_address(_extracted: &Blob, manual: &Blob) -> Option<Value> {
    let street = text_of(manual.get("street"));
    let number = text_of(manual.get("buildingNumber"));
    let city = text_of(manual.get("city"));

    let street_part = match (street, number) {
        (Some(street), Some(number)) => Some(format!("{} {}", street, number)),
        (Some(street), None) => Some(street),
        (None, _) => None,
    };

    let address = match (street_part, city) {
        (Some(street), Some(city)) => format!("{}, {}", street, city),
        (Some(street), None) => street,
        (None, Some(city)) => city,
        (None, None) => return None,
    };
    Some(Value::String(address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::into_blob;
    use serde_json::json;

    #[test]
    fn test_owners_formats_objects() {
        let extracted = into_blob(json!({
            "land_registry": {
                "owners": [
                    {"name": "ישראל ישראלי", "id_number": "123", "share": "1/2"},
                    {"name": "שרה ישראלי", "share": "1/2"}
                ]
            }
        }));
        let value = owners(&extracted, &Blob::new()).unwrap();
        assert_eq!(
            value,
            json!("ישראל ישראלי (ת.ז. 123) 1/2; שרה ישראלי 1/2")
        );
    }

    #[test]
    fn test_owners_accepts_plain_string() {
        let manual = into_blob(json!({"owners": "דוד כהן"}));
        assert_eq!(owners(&Blob::new(), &manual), Some(json!("דוד כהן")));
    }

    #[test]
    fn test_owners_empty_list_is_absent() {
        let extracted = into_blob(json!({"owners": []}));
        assert_eq!(owners(&extracted, &Blob::new()), None);
    }

    #[test]
    fn test_attachments_with_area() {
        let extracted = into_blob(json!({
            "attachments": [
                {"description": "חניה", "area": 12},
                {"type": "מחסן"}
            ]
        }));
        assert_eq!(
            attachments(&extracted, &Blob::new()),
            Some(json!("חניה (12 מ\"ר); מחסן"))
        );
    }

    #[test]
    fn test_full_address_uses_manual_only() {
        let extracted = into_blob(json!({"street": "ignored", "city": "ignored"}));
        let manual = into_blob(json!({
            "street": "הרצל",
            "buildingNumber": "10",
            "city": "תל אביב"
        }));
        assert_eq!(
            full_address(&extracted, &manual),
            Some(json!("הרצל 10, תל אביב"))
        );
        assert_eq!(full_address(&extracted, &Blob::new()), None);
    }
}
