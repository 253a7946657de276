//! Field registry handlers

use axum::Json;
use serde::Serialize;

use shuma_core::fields::{self, SectionConfig, SectionGroupConfig};

#[derive(Serialize)]
pub struct SectionsResponse {
    pub sections: &'static [SectionConfig],
    pub groups: &'static [SectionGroupConfig],
}

/// GET /api/sections - Sections and their fields, in display order
pub async fn list_sections() -> Json<SectionsResponse> {
    Json(SectionsResponse {
        sections: fields::sections(),
        groups: fields::section_groups(),
    })
}
