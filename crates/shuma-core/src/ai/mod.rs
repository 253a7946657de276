//! Pluggable AI extraction backends
//!
//! # Architecture
//!
//! - `ExtractionBackend` trait: one call turns a set of documents into raw JSON
//! - `ExtractorClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `AnthropicBackend`, `GeminiBackend`, `MockBackend`
//!
//! Raw output is turned into blob fragments by [`normalize`].
//!
//! # Configuration
//!
//! Environment variables:
//! - `EXTRACTION_BACKEND`: Backend to use (anthropic, gemini, mock). Default: anthropic
//! - `ANTHROPIC_API_KEY` / `ANTHROPIC_MODEL` / `ANTHROPIC_BASE_URL`
//! - `GEMINI_API_KEY` / `GEMINI_MODEL` / `GEMINI_BASE_URL`
//! - `SHUMA_UPLOADS_DIR`: where relative upload urls are read from

pub mod anthropic;
pub mod gemini;
mod mock;
pub mod normalize;
pub mod parsing;
pub mod source;
pub mod types;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use mock::{canned_response, MockBackend, MockCall};
pub use normalize::{normalize_fields, FieldSet, NormalizedExtractionResult};
pub use source::{
    document_sources, documents_for, uploaded_document_types, DocumentLoader, DocumentSource,
};
pub use types::*;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::models::ExtractionKind;

/// Trait defining the interface for all extraction backends
///
/// Backends should be Send + Sync so calls can run concurrently.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Run one extraction call over the given documents, returning raw JSON
    async fn extract(&self, kind: ExtractionKind, documents: &[DocumentSource]) -> Result<Value>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name (recorded in snapshot metadata)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Template variables for the user section of a prompt
pub(crate) fn prompt_vars(documents: &[DocumentSource]) -> HashMap<&'static str, String> {
    let names: Vec<&str> = documents.iter().map(|d| d.name.as_str()).collect();
    let mut vars = HashMap::new();
    vars.insert("document_names", names.join(", "));
    vars.insert("document_count", documents.len().to_string());
    vars
}

/// Concrete extractor client enum
#[derive(Clone)]
pub enum ExtractorClient {
    /// Anthropic Messages API
    Anthropic(AnthropicBackend),
    /// Gemini generateContent API
    Gemini(GeminiBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl ExtractorClient {
    /// Create a client from environment variables
    ///
    /// Checks `EXTRACTION_BACKEND` to determine which backend to use.
    /// Returns None if the selected backend's API key is not set.
    pub fn from_env() -> Option<Self> {
        let backend =
            std::env::var("EXTRACTION_BACKEND").unwrap_or_else(|_| "anthropic".to_string());

        match backend.to_lowercase().as_str() {
            "anthropic" | "claude" => AnthropicBackend::from_env().map(ExtractorClient::Anthropic),
            "gemini" | "google" => GeminiBackend::from_env().map(ExtractorClient::Gemini),
            "mock" => Some(ExtractorClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(
                    backend = %backend,
                    "Unknown EXTRACTION_BACKEND, falling back to anthropic"
                );
                AnthropicBackend::from_env().map(ExtractorClient::Anthropic)
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        ExtractorClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            ExtractorClient::Anthropic(b) => ExtractorClient::Anthropic(b.with_model(model)),
            ExtractorClient::Gemini(b) => ExtractorClient::Gemini(b.with_model(model)),
            ExtractorClient::Mock(b) => ExtractorClient::Mock(b.with_model(model)),
        }
    }

    /// Apply per-kind models, timeouts and token limits
    pub fn with_config(self, config: ExtractionConfig) -> Self {
        match self {
            ExtractorClient::Anthropic(b) => ExtractorClient::Anthropic(b.with_config(config)),
            ExtractorClient::Gemini(b) => ExtractorClient::Gemini(b.with_config(config)),
            ExtractorClient::Mock(b) => ExtractorClient::Mock(b),
        }
    }

    /// Read documents through `loader`
    pub fn with_loader(self, loader: DocumentLoader) -> Self {
        match self {
            ExtractorClient::Anthropic(b) => ExtractorClient::Anthropic(b.with_loader(loader)),
            ExtractorClient::Gemini(b) => ExtractorClient::Gemini(b.with_loader(loader)),
            ExtractorClient::Mock(b) => ExtractorClient::Mock(b),
        }
    }
}

impl From<MockBackend> for ExtractorClient {
    fn from(backend: MockBackend) -> Self {
        ExtractorClient::Mock(backend)
    }
}

// Implement ExtractionBackend for ExtractorClient by delegating to the inner backend
#[async_trait]
impl ExtractionBackend for ExtractorClient {
    async fn extract(&self, kind: ExtractionKind, documents: &[DocumentSource]) -> Result<Value> {
        match self {
            ExtractorClient::Anthropic(b) => b.extract(kind, documents).await,
            ExtractorClient::Gemini(b) => b.extract(kind, documents).await,
            ExtractorClient::Mock(b) => b.extract(kind, documents).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ExtractorClient::Anthropic(b) => b.health_check().await,
            ExtractorClient::Gemini(b) => b.health_check().await,
            ExtractorClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            ExtractorClient::Anthropic(b) => b.model(),
            ExtractorClient::Gemini(b) => b.model(),
            ExtractorClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            ExtractorClient::Anthropic(b) => b.host(),
            ExtractorClient::Gemini(b) => b.host(),
            ExtractorClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractor_client_mock() {
        let client = ExtractorClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = ExtractorClient::mock();
        assert!(client.health_check().await);
    }

    #[test]
    fn test_prompt_vars() {
        let docs = document_sources(&[
            crate::models::Upload {
                upload_type: "interior_image".into(),
                name: Some("a.jpg".into()),
                url: Some("a.jpg".into()),
                id: None,
            },
            crate::models::Upload {
                upload_type: "interior_image".into(),
                name: Some("b.jpg".into()),
                url: Some("b.jpg".into()),
                id: None,
            },
        ]);
        let vars = prompt_vars(&docs);
        assert_eq!(vars["document_names"], "a.jpg, b.jpg");
        assert_eq!(vars["document_count"], "2");
    }
}
