//! Extraction snapshot handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_user_email, AppError, AppState};
use shuma_core::blob::Blob;
use shuma_core::db::RestoreOutcome;
use shuma_core::models::{AIExtractionSnapshot, ExtractionMetadata, COMBINED_EXTRACTION};

/// Query parameters for listing snapshots
#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    #[serde(rename = "type")]
    pub extraction_type: Option<String>,
}

/// GET /api/session/:id/ai-extractions - Snapshots, newest first
pub async fn list_snapshots(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<SnapshotQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<AIExtractionSnapshot>>, AppError> {
    let user_email = get_user_email(&headers);

    state.db.require_session(&id)?;
    let snapshots = state
        .db
        .list_snapshots(&id, params.extraction_type.as_deref())?;

    state.db.record_audit(
        &user_email,
        "list",
        Some("ai_extraction"),
        Some(&id),
        Some(&format!("count={}", snapshots.len())),
    );

    Ok(Json(snapshots))
}

/// Request body for appending a snapshot
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshotRequest {
    pub extracted_fields: Blob,
    #[serde(default)]
    pub extraction_type: Option<String>,
    #[serde(default)]
    pub metadata: ExtractionMetadata,
}

/// POST /api/session/:id/ai-extractions - Append a snapshot
pub async fn create_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateSnapshotRequest>,
) -> Result<Json<AIExtractionSnapshot>, AppError> {
    let user_email = get_user_email(&headers);
    let extraction_type = req
        .extraction_type
        .as_deref()
        .unwrap_or(COMBINED_EXTRACTION);

    let snapshot =
        state
            .db
            .save_snapshot(&id, &req.extracted_fields, extraction_type, &req.metadata)?;

    state.db.record_audit(
        &user_email,
        "create",
        Some("ai_extraction"),
        Some(&id),
        Some(&format!("snapshot={}, type={}", snapshot.id, extraction_type)),
    );

    Ok(Json(snapshot))
}

/// Request body for acting on a snapshot
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotActionRequest {
    pub extraction_id: i64,
    pub action: String,
}

/// PUT /api/session/:id/ai-extractions - `{extractionId, action: "restore"}`
pub async fn restore_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SnapshotActionRequest>,
) -> Result<Json<RestoreOutcome>, AppError> {
    let user_email = get_user_email(&headers);

    if req.action != "restore" {
        return Err(AppError::bad_request(&format!(
            "Unknown action: {}",
            req.action
        )));
    }

    let outcome = state.db.restore_snapshot(&id, req.extraction_id)?;

    state.db.record_audit(
        &user_email,
        "restore",
        Some("ai_extraction"),
        Some(&id),
        Some(&format!(
            "snapshot={}, changed={}",
            req.extraction_id,
            outcome.changed_keys.join(",")
        )),
    );

    Ok(Json(outcome))
}
