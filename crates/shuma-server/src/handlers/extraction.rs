//! Extraction handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::{get_user_email, AppError, AppState};
use shuma_core::extraction::{ExtractionOutcome, ExtractionRequest};

/// POST /api/session/:id/extract - Run AI extraction over the session's uploads
///
/// Without a body (or without `selection`) every uploaded document type is
/// reprocessed. With `selection`, only the types marked `true` are, merged
/// onto the current blob. A body that does not parse is rejected rather
/// than read as a full run.
pub async fn run_extraction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ExtractionOutcome>, AppError> {
    let user_email = get_user_email(&headers);
    let req = parse_request(&body)?;

    let orchestrator = state
        .orchestrator
        .as_ref()
        .ok_or_else(|| AppError::unavailable("Extraction backend not configured"))?;

    let outcome = orchestrator.run(&id, req.selection.as_ref()).await?;

    let processed: Vec<&str> = outcome.processed.iter().map(|t| t.as_str()).collect();
    state.db.record_audit(
        &user_email,
        "extract",
        Some("session"),
        Some(&id),
        Some(&format!(
            "processed={}, selective={}, snapshot={}",
            processed.join(","),
            req.selection.is_some(),
            outcome
                .snapshot
                .as_ref()
                .map(|s| s.id.to_string())
                .unwrap_or_else(|| "none".to_string())
        )),
    );

    Ok(Json(outcome))
}

fn parse_request(body: &[u8]) -> Result<ExtractionRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExtractionRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request(&format!("Invalid extraction request: {}", e)))
}
