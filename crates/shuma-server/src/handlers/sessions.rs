//! Session handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_user_email, AppError, AppState};
use shuma_core::blob::Blob;
use shuma_core::models::Session;

/// Request body for creating or updating a session
///
/// On update, top-level keys of `data` are shallow-assigned and an
/// `extractedData` object is merged into the stored blob.
#[derive(Debug, Default, Deserialize)]
pub struct SessionDataRequest {
    #[serde(default)]
    pub data: Blob,
}

/// POST /api/session - Create a session
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<SessionDataRequest>>,
) -> Result<Json<Session>, AppError> {
    let user_email = get_user_email(&headers);
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let session = state.db.create_session(Some(&req.data))?;

    state.db.record_audit(
        &user_email,
        "create",
        Some("session"),
        Some(&session.id),
        None,
    );

    Ok(Json(session))
}

/// GET /api/session/:id - Get a session with its data
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Session>, AppError> {
    let user_email = get_user_email(&headers);

    let session = state.db.require_session(&id)?;

    state.db.record_audit(&user_email, "get", Some("session"), Some(&id), None);

    Ok(Json(session))
}

/// PUT /api/session/:id - Partially update session data
pub async fn update_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SessionDataRequest>,
) -> Result<Json<Session>, AppError> {
    let user_email = get_user_email(&headers);

    let session = state.db.update_session(&id, &req.data)?;

    let keys: Vec<&str> = req.data.keys().map(String::as_str).collect();
    state.db.record_audit(
        &user_email,
        "update",
        Some("session"),
        Some(&id),
        Some(&format!("keys={}", keys.join(","))),
    );

    Ok(Json(session))
}
