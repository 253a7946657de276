//! Resolved field views and manual overrides

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{get_user_email, AppError, AppState};
use shuma_core::fields::{self, ResolvedField, ValueOrigin};
use shuma_core::models::FieldEditRecord;

/// Query parameters for resolved fields
#[derive(Debug, Deserialize)]
pub struct FieldsQuery {
    /// Only this section
    pub section: Option<String>,
}

/// GET /api/session/:id/fields - Resolve every field for display
pub async fn list_fields(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<FieldsQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<ResolvedField>>, AppError> {
    let user_email = get_user_email(&headers);

    let session = state.db.require_session(&id)?;
    let provenance = state.db.provenance_store(&id)?;
    let extracted = session.extracted_data();

    let resolved = match params.section.as_deref() {
        Some(section) => {
            fields::resolve_section(section, &extracted, &session.data, Some(&provenance))
                .ok_or_else(|| AppError::not_found(&format!("Section {} not found", section)))?
        }
        None => fields::resolve_all(&extracted, &session.data, Some(&provenance)),
    };

    state.db.record_audit(
        &user_email,
        "list",
        Some("fields"),
        Some(&id),
        Some(&format!("count={}", resolved.len())),
    );

    Ok(Json(resolved))
}

/// Request body for a manual field override
#[derive(Debug, Deserialize)]
pub struct UpdateFieldRequest {
    pub value: Value,
    /// Dotted path inside the extracted blob; defaults to where the value
    /// currently resolves from, else the field's first value path
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateFieldResponse {
    pub key: String,
    pub path: String,
    pub old_value: Option<Value>,
    pub new_value: Value,
}

/// PUT /api/session/:id/fields/:key - Manually override a field value
pub async fn update_field(
    State(state): State<Arc<AppState>>,
    Path((id, key)): Path<(String, String)>,
    headers: HeaderMap,
    Json(req): Json<UpdateFieldRequest>,
) -> Result<Json<UpdateFieldResponse>, AppError> {
    let user_email = get_user_email(&headers);

    let path = match req.path {
        Some(path) => path,
        None => {
            let field = fields::field_by_key(&key)
                .ok_or_else(|| AppError::not_found(&format!("Field {} not found", key)))?;
            let session = state.db.require_session(&id)?;
            let resolution =
                fields::resolve_field(field, &session.extracted_data(), &session.data);
            resolution
                .filter(|r| r.origin == ValueOrigin::Extracted)
                .and_then(|r| r.path)
                .or_else(|| field.value_paths.first().copied())
                .ok_or_else(|| {
                    AppError::bad_request(&format!("Field {} is computed; pass a path", key))
                })?
                .to_string()
        }
    };

    let old_value = state
        .db
        .update_extracted_field(&id, &key, &path, req.value.clone())?;

    state.db.record_audit(
        &user_email,
        "update",
        Some("field"),
        Some(&id),
        Some(&format!("key={}, path={}", key, path)),
    );

    Ok(Json(UpdateFieldResponse {
        key,
        path,
        old_value,
        new_value: req.value,
    }))
}

/// GET /api/session/:id/field-edits - Edit history, newest first
pub async fn list_field_edits(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<FieldEditRecord>>, AppError> {
    let user_email = get_user_email(&headers);

    state.db.require_session(&id)?;
    let edits = state.db.list_field_edits(&id)?;

    state.db.record_audit(
        &user_email,
        "list",
        Some("field_edit"),
        Some(&id),
        Some(&format!("count={}", edits.len())),
    );

    Ok(Json(edits))
}
