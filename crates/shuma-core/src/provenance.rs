//! Provenance lookup for resolved fields
//!
//! Built once per session load from the stored records. Records arrive newest
//! first, and only the first active record per field path is kept.

use std::collections::HashMap;

use crate::models::ProvenanceRecord;

/// Namespaces tried when a bare field name has no record
pub const NAMESPACE_PREFIXES: &[&str] = &["land_registry.", "building_permit.", "shared_building."];

/// Convert a camelCase key to snake_case (`buildingYear` -> `building_year`)
pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('_') && !out.ends_with('.') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Keys tried for a lookup, in order
///
/// Exact key, snake_case key, then every namespace prefix applied to the
/// original and to the snake_case key.
pub fn lookup_candidates(field: &str) -> Vec<String> {
    let snake = camel_to_snake(field);
    let mut candidates = vec![field.to_string()];
    if snake != field {
        candidates.push(snake.clone());
    }
    for prefix in NAMESPACE_PREFIXES {
        candidates.push(format!("{}{}", prefix, field));
        if snake != field {
            candidates.push(format!("{}{}", prefix, snake));
        }
    }
    candidates
}

/// Active provenance records keyed by field path
#[derive(Debug, Clone, Default)]
pub struct ProvenanceStore {
    by_path: HashMap<String, ProvenanceRecord>,
}

impl ProvenanceStore {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ProvenanceRecord>,
    {
        let mut by_path = HashMap::new();
        for record in records.into_iter().filter(|r| r.is_active) {
            by_path.entry(record.field_path.clone()).or_insert(record);
        }
        Self { by_path }
    }

    /// Find the record for a field name, trying the fallback keys in order
    pub fn lookup(&self, field: &str) -> Option<&ProvenanceRecord> {
        if let Some(record) = self.by_path.get(field) {
            return Some(record);
        }
        lookup_candidates(field)
            .iter()
            .find_map(|candidate| self.by_path.get(candidate))
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}
