//! Health check handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use shuma_core::ai::ExtractionBackend;

/// Extraction backend status
#[derive(Serialize)]
pub struct ExtractionStatus {
    pub configured: bool,
    pub available: bool,
    pub model: Option<String>,
    pub host: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub extraction: ExtractionStatus,
}

/// GET /api/health - Server and extraction backend status
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let extraction = match &state.orchestrator {
        Some(orchestrator) => {
            let backend = orchestrator.extractor();
            ExtractionStatus {
                configured: true,
                available: backend.health_check().await,
                model: Some(backend.model().to_string()),
                host: Some(backend.host().to_string()),
            }
        }
        None => ExtractionStatus {
            configured: false,
            available: false,
            model: None,
            host: None,
        },
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        extraction,
    })
}
