//! Mock backend for testing
//!
//! Returns canned extraction payloads per call kind. Responses, failures and
//! delays can be overridden per kind, and every call is recorded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::source::DocumentSource;
use super::ExtractionBackend;
use crate::error::{Error, Result};
use crate::models::ExtractionKind;

#[derive(Debug, Clone)]
enum MockReply {
    Json(Value),
    Failure(String),
}

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub kind: ExtractionKind,
    pub documents: Vec<String>,
}

/// Mock extraction backend for testing
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    replies: HashMap<ExtractionKind, MockReply>,
    delays: HashMap<ExtractionKind, Duration>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            replies: HashMap::new(),
            delays: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Create a new instance with a different model (no-op for mock)
    pub fn with_model(&self, _model: &str) -> Self {
        self.clone()
    }

    /// Return `response` for calls of `kind`
    pub fn with_response(mut self, kind: ExtractionKind, response: Value) -> Self {
        self.replies.insert(kind, MockReply::Json(response));
        self
    }

    /// Fail calls of `kind` with `message`
    pub fn with_failure(mut self, kind: ExtractionKind, message: &str) -> Self {
        self.replies
            .insert(kind, MockReply::Failure(message.to_string()));
        self
    }

    /// Sleep before answering calls of `kind`
    pub fn with_delay(mut self, kind: ExtractionKind, delay: Duration) -> Self {
        self.delays.insert(kind, delay);
        self
    }

    /// Calls received so far, in arrival order
    pub fn calls(&self) -> Vec<MockCall> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Kinds called so far, in arrival order
    pub fn called_kinds(&self) -> Vec<ExtractionKind> {
        self.calls().into_iter().map(|c| c.kind).collect()
    }

    fn record(&self, call: MockCall) {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
    }
}

/// Canned payload per kind, in the wrapped `{value, confidence, page}` shape
pub fn canned_response(kind: ExtractionKind) -> Value {
    match kind {
        ExtractionKind::LandRegistry => json!({
            "gush": {"value": 6158, "confidence": 0.97, "page": 1},
            "chelka": {"value": 45, "confidence": 0.96, "page": 1},
            "sub_chelka": {"value": 12, "confidence": 0.9, "page": 1},
            "ownership_type": {"value": "בעלות פרטית", "confidence": 0.85, "page": 1},
            "registered_area": {"value": 85.5, "confidence": 0.92, "page": 2},
            "floor": {"value": 3, "confidence": 0.8, "page": 2},
            "extract_date": {"value": "2024-03-01", "confidence": 0.99, "page": 1},
            "owners": {
                "value": [{"name": "ישראל ישראלי", "id_number": "012345678", "share": "1/1"}],
                "confidence": 0.9,
                "page": 2
            },
            "attachments": {
                "value": [{"description": "חניה", "area": 12}],
                "confidence": 0.8,
                "page": 2
            },
            "mortgages": {"value": "not found"}
        }),
        ExtractionKind::BuildingPermit => json!({
            "permit_number": {"value": "2019-0457", "confidence": 0.93, "page": 1},
            "permit_date": {"value": "2019-06-12", "confidence": 0.9, "page": 1},
            "permitted_use": {"value": "מגורים", "confidence": 0.88, "page": 1},
            "building_year": {"value": 2021, "confidence": 0.7, "page": 3}
        }),
        ExtractionKind::SharedBuilding => json!({
            "order_date": {"value": "2022-01-20", "confidence": 0.9, "page": 1},
            "building_floors": {"value": 8, "confidence": 0.86, "page": 2},
            "total_units": {"value": 32, "confidence": 0.84, "page": 2},
            "floor": {"value": 4, "confidence": 0.82, "page": 5},
            "sub_plots_count": {"value": 34, "confidence": 0.8, "page": 2}
        }),
        ExtractionKind::InteriorImages => json!({
            "property_condition": {"value": "טוב", "confidence": 0.75},
            "finish_level": {"value": "גבוהה", "confidence": 0.7},
            "description": {"value": "דירה מרווחת עם מטבח משופץ", "confidence": 0.6}
        }),
        ExtractionKind::ExteriorImages => json!({
            "building_condition": {"value": "סביר", "confidence": 0.72},
            "building_type": {"value": "בניין מגורים", "confidence": 0.8},
            "number_of_floors": {"value": 8, "confidence": 0.65}
        }),
    }
}

#[async_trait]
impl ExtractionBackend for MockBackend {
    async fn extract(&self, kind: ExtractionKind, documents: &[DocumentSource]) -> Result<Value> {
        self.record(MockCall {
            kind,
            documents: documents.iter().map(|d| d.name.clone()).collect(),
        });

        if let Some(delay) = self.delays.get(&kind) {
            tokio::time::sleep(*delay).await;
        }

        match self.replies.get(&kind) {
            Some(MockReply::Json(value)) => Ok(value.clone()),
            Some(MockReply::Failure(message)) => Err(Error::ExtractionFailed(message.clone())),
            None => Ok(canned_response(kind)),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
