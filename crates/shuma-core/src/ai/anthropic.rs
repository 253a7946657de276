//! Anthropic Messages API backend
//!
//! PDFs are sent as `document` blocks and photos as `image` blocks, both
//! base64-encoded, followed by the rendered user prompt.
//!
//! # Configuration
//!
//! Environment variables:
//! - `ANTHROPIC_API_KEY`: API key (required)
//! - `ANTHROPIC_MODEL`: Model to use (default: `claude-sonnet-4-20250514`)
//! - `ANTHROPIC_BASE_URL`: API base URL (default: `https://api.anthropic.com`)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::parsing::extract_json;
use super::source::{DocumentLoader, DocumentSource};
use super::types::LoadedDocument;
use super::{prompt_vars, ExtractionBackend};
use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::models::ExtractionKind;
use crate::prompts::PromptLibrary;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API request
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// Message in conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String, // "user", "assistant"
    pub content: MessageContent,
}

impl Message {
    /// Create a user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a user message with content blocks
    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: "user".into(),
            content: MessageContent::Blocks(blocks),
        }
    }
}

/// Message content (text or blocks)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// Base64 payload of a document or image block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSource {
    #[serde(rename = "type")]
    pub source_type: String, // "base64"
    pub media_type: String,
    pub data: String,
}

/// Content block types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "document")]
    Document { source: MediaSource },

    #[serde(rename = "image")]
    Image { source: MediaSource },

    /// Block types this client does not use
    #[serde(other)]
    Other,
}

impl ContentBlock {
    /// Create a text block
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Embed a loaded document as an image or document block
    pub fn from_document(doc: &LoadedDocument) -> Self {
        let source = MediaSource {
            source_type: "base64".into(),
            media_type: doc.media_type.clone(),
            data: doc.data.clone(),
        };
        if doc.is_image() {
            Self::Image { source }
        } else {
            Self::Document { source }
        }
    }
}

/// Anthropic Messages API response
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub response_type: String,
    pub role: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    pub stop_reason: Option<String>, // "end_turn", "max_tokens"
    pub stop_sequence: Option<String>,
    pub usage: Option<Usage>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl MessagesResponse {
    /// Extract text content from the response
    pub fn text(&self) -> Option<String> {
        let texts: Vec<_> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }
}

/// Extraction backend on the Anthropic Messages API
#[derive(Clone)]
pub struct AnthropicBackend {
    http_client: Client,
    base_url: String,
    api_key: String,
    model: String,
    prompts: PromptLibrary,
    config: ExtractionConfig,
    loader: DocumentLoader,
}

impl AnthropicBackend {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            prompts: PromptLibrary::new(),
            config: ExtractionConfig::default(),
            loader: DocumentLoader::from_env(),
        }
    }

    /// Create from environment (`ANTHROPIC_*`); `None` without an API key
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").ok()?;
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Some(Self::new(&base_url, &api_key, &model))
    }

    /// Create a new backend with a different model (same host)
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_loader(mut self, loader: DocumentLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Send a messages request
    pub async fn messages(
        &self,
        kind: ExtractionKind,
        system: Option<&str>,
        messages: Vec<Message>,
    ) -> Result<MessagesResponse> {
        let model = self
            .config
            .model_for(kind)
            .unwrap_or(self.model.as_str())
            .to_string();
        let request = MessagesRequest {
            model: model.clone(),
            max_tokens: self.config.max_tokens,
            messages,
            system: system.map(String::from),
        };

        debug!(model = %model, kind = %kind, "Sending Anthropic extraction request");

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(self.config.timeout_for(kind))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::InvalidData(format!(
                "Anthropic API error ({}): {}",
                status, body
            )));
        }

        let messages_response: MessagesResponse = response.json().await?;

        debug!(
            stop_reason = ?messages_response.stop_reason,
            output_tokens = ?messages_response.usage.as_ref().map(|u| u.output_tokens),
            "Received Anthropic extraction response"
        );

        Ok(messages_response)
    }
}

#[async_trait]
impl ExtractionBackend for AnthropicBackend {
    async fn extract(&self, kind: ExtractionKind, documents: &[DocumentSource]) -> Result<Value> {
        if documents.is_empty() {
            return Err(Error::InvalidData(format!("No documents for {}", kind)));
        }

        let prompt = self.prompts.load(kind)?;

        let mut blocks = Vec::with_capacity(documents.len() + 1);
        for source in documents {
            let doc = self.loader.load(source).await?;
            blocks.push(ContentBlock::from_document(&doc));
        }
        blocks.push(ContentBlock::text(prompt.render_user(&prompt_vars(documents))));

        let response = self
            .messages(kind, prompt.system_section(), vec![Message::user_blocks(blocks)])
            .await?;

        let text = response
            .text()
            .ok_or_else(|| Error::UnexpectedResponseFormat("No text in response".into()))?;
        extract_json(&text)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/v1/models", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_block_serialization() {
        let doc = LoadedDocument {
            name: "tabu.pdf".into(),
            media_type: "application/pdf".into(),
            data: "JVBERi0=".into(),
        };
        let json = serde_json::to_value(ContentBlock::from_document(&doc)).unwrap();
        assert_eq!(json["type"], "document");
        assert_eq!(json["source"]["type"], "base64");
        assert_eq!(json["source"]["media_type"], "application/pdf");

        let photo = LoadedDocument {
            media_type: "image/jpeg".into(),
            ..doc
        };
        let json = serde_json::to_value(ContentBlock::from_document(&photo)).unwrap();
        assert_eq!(json["type"], "image");
    }

    #[test]
    fn test_response_text_skips_unknown_blocks() {
        let response: MessagesResponse = serde_json::from_value(serde_json::json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "{\"gush\": 1}"}
            ],
            "model": "claude",
            "stop_reason": "end_turn",
            "stop_sequence": null,
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"gush\": 1}"));
    }

    #[test]
    fn test_with_model_keeps_host() {
        let backend = AnthropicBackend::new("http://localhost:1/", "key", "a");
        let other = backend.with_model("b");
        assert_eq!(other.model(), "b");
        assert_eq!(other.host(), "http://localhost:1");
    }
}
