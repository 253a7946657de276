//! Gemini `generateContent` backend
//!
//! # Configuration
//!
//! Environment variables:
//! - `GEMINI_API_KEY`: API key (required)
//! - `GEMINI_MODEL`: Model to use (default: `gemini-2.5-flash`)
//! - `GEMINI_BASE_URL`: API base URL (default: `https://generativelanguage.googleapis.com`)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::parsing::extract_json;
use super::source::{DocumentLoader, DocumentSource};
use super::{prompt_vars, ExtractionBackend};
use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::models::ExtractionKind;
use crate::prompts::PromptLibrary;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<String> {
        let texts: Vec<_> = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }
}

/// Extraction backend on the Gemini API
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    base_url: String,
    api_key: String,
    model: String,
    prompts: PromptLibrary,
    config: ExtractionConfig,
    loader: DocumentLoader,
}

impl GeminiBackend {
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

    /// Create from environment (`GEMINI_*`); `None` without an API key
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").ok()?;
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Some(Self::new(&base_url, &api_key, &model))
    }

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
}

#[async_trait]
impl ExtractionBackend for GeminiBackend {
    async fn extract(&self, kind: ExtractionKind, documents: &[DocumentSource]) -> Result<Value> {
        if documents.is_empty() {
            return Err(Error::InvalidData(format!("No documents for {}", kind)));
        }

        let prompt = self.prompts.load(kind)?;
        let model = self.config.model_for(kind).unwrap_or(self.model.as_str());

        let mut parts = Vec::with_capacity(documents.len() + 1);
        for source in documents {
            let doc = self.loader.load(source).await?;
            parts.push(Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: doc.media_type,
                    data: doc.data,
                }),
            });
        }
        parts.push(Part::text(prompt.render_user(&prompt_vars(documents))));

        let request = GenerateContentRequest {
            system_instruction: prompt.system_section().map(|s| Content {
                role: None,
                parts: vec![Part::text(s)],
            }),
            contents: vec![Content {
                role: Some("user".into()),
                parts,
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.max_tokens,
                response_mime_type: "application/json".into(),
            },
        };

        debug!(model = %model, kind = %kind, "Sending Gemini extraction request");

        let response = self
            .http_client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, model
            ))
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.config.timeout_for(kind))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::InvalidData(format!(
                "Gemini API error ({}): {}",
                status, body
            )));
        }

        let generated: GenerateContentResponse = response.json().await?;

        debug!(
            finish_reason = ?generated.candidates.first().and_then(|c| c.finish_reason.as_deref()),
            output_tokens = ?generated.usage_metadata.as_ref().and_then(|u| u.candidates_token_count),
            "Received Gemini extraction response"
        );

        let text = generated
            .text()
            .ok_or_else(|| Error::UnexpectedResponseFormat("No text in response".into()))?;
        extract_json(&text)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/v1beta/models", self.base_url))
            .header("x-goog-api-key", &self.api_key)
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
