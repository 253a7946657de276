//! Shuma Core Library
//!
//! Shared functionality for the shuma valuation wizard:
//! - Field alias registry and value resolution over extracted/manual data
//! - Session storage, extraction snapshots, edit ledger and provenance
//! - Pluggable AI extraction backends (Anthropic, Gemini, mock)
//! - Extraction orchestrator with selective reprocessing
//! - Prompt library and extraction config with file overrides

pub mod ai;
pub mod blob;
pub mod config;
pub mod db;
pub mod error;
pub mod extraction;
pub mod fields;
pub mod models;
pub mod prompts;
pub mod provenance;

/// Test utilities including a mock Messages API server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AnthropicBackend, DocumentLoader, DocumentSource, ExtractionBackend, ExtractorClient,
    GeminiBackend, MockBackend, NormalizedExtractionResult,
};
pub use blob::Blob;
pub use config::ExtractionConfig;
pub use db::{AuditEntry, Database, RestoreOutcome};
pub use error::{Error, Result};
pub use extraction::{ExtractionOrchestrator, ExtractionOutcome, ExtractionRequest, Selection};
pub use fields::{CanonicalField, ResolvedField, SectionConfig};
pub use models::{
    AIExtractionSnapshot, DocType, DocTypeStatus, ExtractionKind, ExtractionMethod,
    FieldEditRecord, NewProvenanceRecord, ProvenanceRecord, Session,
};
pub use prompts::{Prompt, PromptLibrary};
pub use provenance::ProvenanceStore;
