//! Test utilities for shuma-core
//!
//! This module provides a mock Anthropic Messages API server that answers
//! extraction requests with the canned responses of [`canned_response`].

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::ai::canned_response;
use crate::models::ExtractionKind;

#[derive(Clone, Default)]
struct MockState {
    failing: Arc<HashSet<ExtractionKind>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// Mock Messages API server for testing and development
pub struct MockMessagesServer {
    addr: SocketAddr,
    state: MockState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockMessagesServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        Self::start_failing(&[]).await
    }

    /// Start a server that answers HTTP 500 for the given kinds
    pub async fn start_failing(failing: &[ExtractionKind]) -> Self {
        let state = MockState {
            failing: Arc::new(failing.iter().copied().collect()),
            requests: Arc::default(),
        };
        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/messages", post(handle_messages))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.state
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockMessagesServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Guess the extraction kind from the system prompt
///
/// These patterns match the prompt files in prompts/*.md
fn detect_kind(system: &str) -> Option<ExtractionKind> {
    if system.contains("land registry") {
        Some(ExtractionKind::LandRegistry)
    } else if system.contains("building permit") {
        Some(ExtractionKind::BuildingPermit)
    } else if system.contains("condominium") {
        Some(ExtractionKind::SharedBuilding)
    } else if system.contains("interior") {
        Some(ExtractionKind::InteriorImages)
    } else if system.contains("exterior") {
        Some(ExtractionKind::ExteriorImages)
    } else {
        None
    }
}

/// Models endpoint (health check)
async fn handle_models() -> Json<Value> {
    Json(json!({
        "data": [{"id": "mock-model", "type": "model"}],
        "has_more": false
    }))
}

/// Messages endpoint
async fn handle_messages(State(state): State<MockState>, Json(request): Json<Value>) -> Response {
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(request.clone());
    }

    let system = request["system"].as_str().unwrap_or_default();
    let Some(kind) = detect_kind(system) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"type": "error", "error": {"message": "unknown prompt"}})),
        )
            .into_response();
    };

    if state.failing.contains(&kind) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"type": "error", "error": {"type": "api_error", "message": "overloaded"}})),
        )
            .into_response();
    }

    // Models often wrap JSON in a fenced block; exercise the recovery path
    let text = format!(
        "Here is the extracted data:\n```json\n{}\n```",
        canned_response(kind)
    );

    Json(json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "model": request["model"].clone(),
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": {"input_tokens": 100, "output_tokens": 50}
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AnthropicBackend, DocumentLoader, ExtractionBackend, ExtractorClient};
    use crate::blob::into_blob;
    use crate::config::ExtractionConfig;
    use crate::db::Database;
    use crate::extraction::ExtractionOrchestrator;
    use crate::models::{DocType, DocTypeStatus};
    use crate::prompts::PromptLibrary;

    fn backend(server: &MockMessagesServer, uploads: &std::path::Path) -> AnthropicBackend {
        AnthropicBackend::new(&server.url(), "test-key", "claude-test")
            .with_prompts(PromptLibrary::embedded_only())
            .with_loader(DocumentLoader::new(uploads))
    }

    fn session_with_uploads(db: &Database) -> String {
        db.create_session(Some(&into_blob(json!({
            "uploads": [
                {"type": "tabu", "name": "נסח.pdf", "url": "/uploads/tabu.pdf"},
                {"type": "permit", "url": "permit.pdf"}
            ]
        }))))
        .unwrap()
        .id
    }

    fn write_uploads(dir: &std::path::Path) {
        std::fs::write(dir.join("tabu.pdf"), b"%PDF-1.4 tabu").unwrap();
        std::fs::write(dir.join("permit.pdf"), b"%PDF-1.4 permit").unwrap();
    }

    #[tokio::test]
    async fn test_anthropic_health_check() {
        let server = MockMessagesServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        assert!(backend(&server, dir.path()).health_check().await);
    }

    #[tokio::test]
    async fn test_anthropic_extract_sends_documents() {
        let server = MockMessagesServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        write_uploads(dir.path());

        let db = Database::in_memory().unwrap();
        let session_id = session_with_uploads(&db);
        let sources = crate::ai::document_sources(&db.require_session(&session_id).unwrap().uploads());
        let tabu = crate::ai::documents_for(ExtractionKind::LandRegistry, &sources);

        let raw = backend(&server, dir.path())
            .extract(ExtractionKind::LandRegistry, &tabu)
            .await
            .unwrap();
        assert_eq!(raw["gush"]["value"], 6158);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["model"], "claude-test");
        let blocks = requests[0]["messages"][0]["content"].as_array().unwrap();
        assert_eq!(blocks[0]["type"], "document");
        assert_eq!(blocks[0]["source"]["media_type"], "application/pdf");
        assert!(blocks[1]["text"].as_str().unwrap().contains("נסח.pdf"));
    }

    #[tokio::test]
    async fn test_orchestrator_over_http_with_failed_type() {
        let server = MockMessagesServer::start_failing(&[ExtractionKind::BuildingPermit]).await;
        let dir = tempfile::tempdir().unwrap();
        write_uploads(dir.path());

        let db = Database::in_memory().unwrap();
        let session_id = session_with_uploads(&db);
        let orchestrator = ExtractionOrchestrator::new(
            db.clone(),
            ExtractorClient::Anthropic(backend(&server, dir.path())),
            ExtractionConfig::default(),
        );

        let outcome = orchestrator.run(&session_id, None).await.unwrap();
        assert!(outcome.statuses[&DocType::Tabu].is_success());
        assert!(matches!(
            outcome.statuses[&DocType::Permit],
            DocTypeStatus::Failed { .. }
        ));
        assert_eq!(outcome.extracted_data["land_registry"]["gush"], 6158);
        assert_eq!(outcome.extracted_data["gush"], 6158);
        assert!(!outcome.extracted_data.contains_key("building_permit"));

        let store = db.provenance_store(&session_id).unwrap();
        let gush = store.lookup("land_registry.gush").unwrap();
        assert_eq!(gush.document_name.as_deref(), Some("נסח.pdf"));
        assert_eq!(gush.page_number, Some(1));
    }

    #[test]
    fn test_detect_kind_from_prompts() {
        let prompts = crate::prompts::PromptLibrary::embedded_only();
        for kind in ExtractionKind::all() {
            let prompt = prompts.load(*kind).unwrap();
            let system = prompt.system_section().unwrap();
            assert_eq!(detect_kind(system), Some(*kind), "kind {}", kind);
        }
    }
}
