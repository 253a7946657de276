//! Provenance handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{get_user_email, AppError, AppState};
use shuma_core::models::{NewProvenanceRecord, ProvenanceRecord};

/// Query parameters for provenance
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceQuery {
    pub session_id: Option<String>,
}

/// GET /api/provenance?sessionId= - All records of a session, newest first
pub async fn list_provenance(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProvenanceQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProvenanceRecord>>, AppError> {
    let user_email = get_user_email(&headers);
    let session_id = params.session_id.unwrap_or_default();

    let records = state.db.list_provenance(&session_id)?;

    state.db.record_audit(
        &user_email,
        "list",
        Some("provenance"),
        Some(&session_id),
        Some(&format!("count={}", records.len())),
    );

    Ok(Json(records))
}

/// Request body for recording provenance
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProvenanceRequest {
    #[serde(default, alias = "session_id")]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub record: NewProvenanceRecord,
}

#[derive(Debug, Serialize)]
pub struct CreateProvenanceResponse {
    pub id: i64,
}

/// POST /api/provenance - Record where a field value came from
///
/// The session is taken from the body, falling back to `?sessionId=`.
pub async fn create_provenance(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProvenanceQuery>,
    headers: HeaderMap,
    Json(req): Json<CreateProvenanceRequest>,
) -> Result<Json<CreateProvenanceResponse>, AppError> {
    let user_email = get_user_email(&headers);
    let session_id = req
        .session_id
        .or(params.session_id)
        .ok_or_else(|| AppError::bad_request("sessionId is required"))?;

    let id = state.db.insert_provenance(&session_id, &req.record)?;

    state.db.record_audit(
        &user_email,
        "create",
        Some("provenance"),
        Some(&session_id),
        Some(&format!(
            "path={}, method={}",
            req.record.field_path,
            req.record.extraction_method.as_str()
        )),
    );

    Ok(Json(CreateProvenanceResponse { id }))
}
