//! Static table of valuation fields, grouped into sections
//!
//! Path lists encode precedence: flat camelCase keys written by the form and
//! older sessions come first, then snake_case keys, then the namespaced keys
//! written by each extraction pipeline.

use super::getters;
use super::{CanonicalField, SectionConfig, SectionGroupConfig};
use crate::blob::{get_present, Blob};

const TABU: &str = "נסח טאבו";
const PERMIT: &str = "היתר בנייה";
const CONDO: &str = "צו בית משותף";
const INTERIOR: &str = "ניתוח תמונות פנים";
const EXTERIOR: &str = "ניתוח תמונות חוץ";
const PLANNING: &str = "מידע תכנוני";
const FORM: &str = "הוזן על ידי השמאי";

const CONDITION_OPTIONS: &[&str] = &["מצוין", "טוב", "סביר", "דורש שיפוץ"];

/// Land registry fields cite the extract date when it is known
fn tabu_source(extracted: &Blob) -> String {
    let date = ["land_registry.extract_date", "extractDate", "extract_date"]
        .iter()
        .find_map(|path| get_present(extracted, path))
        .and_then(|v| v.as_str());
    match date {
        Some(date) => format!("{} מיום {}", TABU, date),
        None => TABU.to_string(),
    }
}

const PROPERTY_IDENTIFICATION: &[CanonicalField] = &[
    CanonicalField::text("gush", "גוש", &["gush", "land_registry.gush", "block"], TABU)
        .described_by(tabu_source),
    CanonicalField::text(
        "chelka",
        "חלקה",
        &["chelka", "land_registry.chelka", "parcel"],
        TABU,
    )
    .described_by(tabu_source),
    CanonicalField::text(
        "subChelka",
        "תת חלקה",
        &[
            "subChelka",
            "sub_chelka",
            "land_registry.sub_chelka",
            "land_registry.subChelka",
        ],
        TABU,
    )
    .described_by(tabu_source),
    CanonicalField::computed("fullAddress", "כתובת", getters::full_address, FORM),
    CanonicalField::text("city", "עיר", &["city", "address.city"], FORM),
    CanonicalField::text("street", "רחוב", &["street", "address.street"], FORM),
    CanonicalField::text(
        "buildingNumber",
        "מספר בית",
        &["buildingNumber", "building_number", "address.building_number"],
        FORM,
    ),
];

const LEGAL_STATUS: &[CanonicalField] = &[
    CanonicalField::text(
        "ownershipType",
        "סוג הבעלות",
        &[
            "ownershipType",
            "ownership_type",
            "land_registry.ownership_type",
        ],
        TABU,
    )
    .select(&["בעלות פרטית", "חכירה", "רשות מקרקעי ישראל"])
    .described_by(tabu_source),
    CanonicalField::computed("owners", "בעלים", getters::owners, TABU).described_by(tabu_source),
    CanonicalField::computed("attachments", "הצמדות", getters::attachments, TABU)
        .described_by(tabu_source),
    CanonicalField::text(
        "registeredArea",
        "שטח רשום",
        &[
            "registeredArea",
            "registered_area",
            "land_registry.registered_area",
            "land_registry.area",
        ],
        TABU,
    )
    .described_by(tabu_source),
    CanonicalField::text(
        "extractDate",
        "תאריך הנסח",
        &["land_registry.extract_date", "extractDate", "extract_date"],
        TABU,
    ),
    CanonicalField::text(
        "mortgages",
        "משכנתאות",
        &["land_registry.mortgages", "mortgages"],
        TABU,
    )
    .textarea()
    .described_by(tabu_source),
    CanonicalField::text(
        "notes",
        "הערות",
        &["land_registry.notes", "registryNotes"],
        TABU,
    )
    .textarea()
    .described_by(tabu_source),
];

const UNIT_DATA: &[CanonicalField] = &[
    CanonicalField::text(
        "floor",
        "קומה",
        &["floor", "land_registry.floor", "shared_building.floor"],
        TABU,
    ),
    CanonicalField::text(
        "rooms",
        "מספר חדרים",
        &["rooms", "land_registry.rooms", "interior_analysis.rooms"],
        FORM,
    ),
    CanonicalField::text(
        "builtArea",
        "שטח בנוי",
        &[
            "builtArea",
            "built_area",
            "land_registry.built_area",
            "registered_area",
            "building_permit.built_area",
        ],
        TABU,
    ),
    CanonicalField::text(
        "balconyArea",
        "שטח מרפסת",
        &[
            "balconyArea",
            "balcony_area",
            "land_registry.balcony_area",
        ],
        TABU,
    ),
    CanonicalField::text(
        "apartmentNumber",
        "מספר דירה",
        &[
            "apartmentNumber",
            "apartment_number",
            "shared_building.apartment_number",
        ],
        CONDO,
    ),
];

const BUILDING_DETAILS: &[CanonicalField] = &[
    CanonicalField::text(
        "buildingYear",
        "שנת בנייה",
        &[
            "buildingYear",
            "building_year",
            "building_permit.building_year",
            "exterior_analysis.building_year",
        ],
        PERMIT,
    ),
    // Same key as in unit data; here the condominium order is preferred
    CanonicalField::text(
        "floor",
        "קומת הדירה בבניין",
        &["shared_building.floor", "floor"],
        CONDO,
    ),
    CanonicalField::text(
        "buildingFloors",
        "מספר קומות",
        &[
            "buildingFloors",
            "building_floors",
            "shared_building.building_floors",
            "building_permit.floors",
            "exterior_analysis.number_of_floors",
        ],
        CONDO,
    ),
    CanonicalField::text(
        "buildingUnits",
        "מספר יחידות בבניין",
        &[
            "buildingUnits",
            "building_units",
            "shared_building.total_units",
        ],
        CONDO,
    ),
    CanonicalField::text(
        "parking",
        "חניה",
        &[
            "parking",
            "land_registry.parking",
            "shared_building.parking",
        ],
        TABU,
    ),
];

const BUILDING_PERMIT: &[CanonicalField] = &[
    CanonicalField::text(
        "permitNumber",
        "מספר היתר",
        &[
            "permitNumber",
            "permit_number",
            "building_permit.permit_number",
        ],
        PERMIT,
    ),
    CanonicalField::text(
        "permitDate",
        "תאריך היתר",
        &["permitDate", "permit_date", "building_permit.permit_date"],
        PERMIT,
    ),
    CanonicalField::text(
        "permittedUse",
        "שימוש מותר",
        &[
            "permittedUse",
            "permitted_use",
            "building_permit.permitted_use",
            "building_permit.permitted_usage",
        ],
        PERMIT,
    ),
    CanonicalField::text(
        "permitDescription",
        "תיאור ההיתר",
        &["building_permit.description", "permitDescription"],
        PERMIT,
    )
    .textarea(),
];

const SHARED_BUILDING: &[CanonicalField] = &[
    CanonicalField::text(
        "orderDate",
        "תאריך הצו",
        &["shared_building.order_date", "orderDate", "order_date"],
        CONDO,
    ),
    CanonicalField::text(
        "subPlotsCount",
        "מספר תתי חלקות",
        &[
            "shared_building.sub_plots_count",
            "subPlotsCount",
            "sub_plots_count",
        ],
        CONDO,
    ),
    CanonicalField::text(
        "buildingDescription",
        "תיאור הבניין",
        &[
            "shared_building.building_description",
            "buildingDescription",
        ],
        CONDO,
    )
    .textarea(),
    CanonicalField::text(
        "sharedAreas",
        "רכוש משותף",
        &["shared_building.shared_areas", "sharedAreas"],
        CONDO,
    )
    .textarea(),
];

const INTERIOR_ANALYSIS: &[CanonicalField] = &[
    CanonicalField::text(
        "propertyCondition",
        "מצב הנכס",
        &[
            "propertyCondition",
            "property_condition",
            "interior_analysis.property_condition",
        ],
        INTERIOR,
    )
    .select(CONDITION_OPTIONS),
    CanonicalField::text(
        "finishLevel",
        "רמת גימור",
        &[
            "finishLevel",
            "finish_level",
            "interior_analysis.finish_level",
        ],
        INTERIOR,
    )
    .select(&["בסיסית", "סטנדרטית", "גבוהה", "יוקרתית"]),
    CanonicalField::text(
        "interiorDescription",
        "תיאור פנים הדירה",
        &["interior_analysis.description", "interiorDescription"],
        INTERIOR,
    )
    .textarea(),
];

const EXTERIOR_ANALYSIS: &[CanonicalField] = &[
    CanonicalField::text(
        "buildingCondition",
        "מצב הבניין",
        &[
            "buildingCondition",
            "building_condition",
            "exterior_analysis.building_condition",
        ],
        EXTERIOR,
    )
    .select(CONDITION_OPTIONS),
    CanonicalField::text(
        "buildingType",
        "סוג הבניין",
        &["exterior_analysis.building_type", "buildingType"],
        EXTERIOR,
    ),
    CanonicalField::text(
        "exteriorDescription",
        "תיאור חזית הבניין",
        &["exterior_analysis.description", "exteriorDescription"],
        EXTERIOR,
    )
    .textarea(),
];

const PLANNING_INFORMATION: &[CanonicalField] = &[
    CanonicalField::text(
        "planNumber",
        "תכנית חלה",
        &["planning_information.plan_number", "planNumber"],
        PLANNING,
    ),
    CanonicalField::text(
        "zoning",
        "ייעוד",
        &["planning_information.zoning", "zoning"],
        PLANNING,
    ),
    CanonicalField::text(
        "buildingRights",
        "זכויות בנייה",
        &["planning_information.building_rights", "buildingRights"],
        PLANNING,
    )
    .textarea(),
];

static SECTIONS: &[SectionConfig] = &[
    SectionConfig {
        id: "property_identification",
        title: "זיהוי הנכס",
        fields: PROPERTY_IDENTIFICATION,
    },
    SectionConfig {
        id: "legal_status",
        title: "מצב משפטי",
        fields: LEGAL_STATUS,
    },
    SectionConfig {
        id: "unit_data",
        title: "נתוני הדירה",
        fields: UNIT_DATA,
    },
    SectionConfig {
        id: "building_details",
        title: "פרטי הבניין",
        fields: BUILDING_DETAILS,
    },
    SectionConfig {
        id: "building_permit",
        title: "היתר בנייה",
        fields: BUILDING_PERMIT,
    },
    SectionConfig {
        id: "shared_building",
        title: "צו בית משותף",
        fields: SHARED_BUILDING,
    },
    SectionConfig {
        id: "interior_analysis",
        title: "ניתוח פנים",
        fields: INTERIOR_ANALYSIS,
    },
    SectionConfig {
        id: "exterior_analysis",
        title: "ניתוח חוץ",
        fields: EXTERIOR_ANALYSIS,
    },
    SectionConfig {
        id: "planning",
        title: "מידע תכנוני",
        fields: PLANNING_INFORMATION,
    },
];

static SECTION_GROUPS: &[SectionGroupConfig] = &[
    SectionGroupConfig {
        id: "land_registry_table",
        title: "טבלת נסח טאבו",
        section_ids: &["property_identification", "legal_status", "unit_data"],
    },
    SectionGroupConfig {
        id: "shared_building_order",
        title: "צו בית משותף",
        section_ids: &["shared_building", "building_details"],
    },
    SectionGroupConfig {
        id: "permits_and_planning",
        title: "היתרים ותכנון",
        section_ids: &["building_permit", "planning"],
    },
    SectionGroupConfig {
        id: "property_condition",
        title: "מצב הנכס",
        section_ids: &["interior_analysis", "exterior_analysis"],
    },
];

/// All sections, in display order
pub fn sections() -> &'static [SectionConfig] {
    SECTIONS
}

pub fn section(id: &str) -> Option<&'static SectionConfig> {
    SECTIONS.iter().find(|s| s.id == id)
}

/// All section groups, in display order
pub fn section_groups() -> &'static [SectionGroupConfig] {
    SECTION_GROUPS
}

pub fn section_group(id: &str) -> Option<&'static SectionGroupConfig> {
    SECTION_GROUPS.iter().find(|g| g.id == id)
}

/// First registered field with this key, in section order
pub fn field_by_key(key: &str) -> Option<&'static CanonicalField> {
    SECTIONS
        .iter()
        .flat_map(|s| s.fields.iter())
        .find(|f| f.key == key)
}

/// Every occurrence of a key, paired with its section id
///
/// A key can be registered in several sections with different paths.
pub fn fields_with_key(key: &str) -> Vec<(&'static str, &'static CanonicalField)> {
    SECTIONS
        .iter()
        .flat_map(|s| s.fields.iter().map(move |f| (s.id, f)))
        .filter(|(_, f)| f.key == key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_value_paths_non_empty_unless_computed() {
        for section in sections() {
            for field in section.fields {
                assert!(
                    !field.value_paths.is_empty() || field.has_custom_getter(),
                    "{}.{} has neither value paths nor a getter",
                    section.id,
                    field.key
                );
            }
        }
    }

    #[test]
    fn test_required_custom_getters() {
        for key in ["owners", "attachments", "fullAddress"] {
            let field = field_by_key(key).unwrap();
            assert!(field.has_custom_getter(), "{} should be computed", key);
        }
    }

    #[test]
    fn test_floor_registered_twice_with_different_paths() {
        let occurrences = fields_with_key("floor");
        assert_eq!(occurrences.len(), 2);
        assert_eq!(occurrences[0].0, "unit_data");
        assert_eq!(occurrences[1].0, "building_details");
        assert_ne!(occurrences[0].1.value_paths, occurrences[1].1.value_paths);
        assert_ne!(occurrences[0].1.label, occurrences[1].1.label);
    }

    #[test]
    fn test_keys_unique_within_section() {
        for section in sections() {
            let mut seen = HashSet::new();
            for field in section.fields {
                assert!(seen.insert(field.key), "duplicate {} in {}", field.key, section.id);
            }
        }
    }

    #[test]
    fn test_section_groups_reference_known_sections() {
        for group in section_groups() {
            for id in group.section_ids {
                assert!(section(id).is_some(), "unknown section {} in {}", id, group.id);
            }
        }
    }

    #[test]
    fn test_select_fields_have_options() {
        for section in sections() {
            for field in section.fields {
                if field.field_type == super::super::FieldType::Select {
                    assert!(!field.options.is_empty(), "{} has no options", field.key);
                }
            }
        }
    }

    #[test]
    fn test_tabu_source_cites_extract_date() {
        let extracted = crate::blob::into_blob(serde_json::json!({
            "land_registry": {"extract_date": "2024-03-01"}
        }));
        let gush = field_by_key("gush").unwrap();
        assert_eq!(gush.data_source.describe(&extracted), "נסח טאבו מיום 2024-03-01");
        assert_eq!(gush.data_source.describe(&Blob::new()), "נסח טאבו");
    }
}
