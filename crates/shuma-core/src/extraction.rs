//! Extraction orchestrator
//!
//! One run turns a session's uploads into a new live extracted-data blob:
//!
//! 1. Work set: the uploaded document types, or only those selected.
//! 2. One call per extraction kind, issued in the configured merge order and
//!    run concurrently. Every call settles; a failed call contributes nothing.
//! 3. Fragments are shallow-merged in issue order (not completion order) onto
//!    the merge base: the freshest persisted blob for a selective run, an
//!    empty blob for a full run.
//! 4. The blob, a new active snapshot and AI provenance are committed in one
//!    transaction.

use std::collections::{BTreeMap, BTreeSet};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::ai::{
    document_sources, documents_for, normalize_fields, uploaded_document_types, DocumentSource,
    ExtractionBackend, ExtractorClient, FieldEvidence, FieldSet, NormalizedExtractionResult,
};
use crate::blob::{shallow_merge, Blob};
use crate::config::ExtractionConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    AIExtractionSnapshot, DocType, DocTypeStatus, ExtractionKind, ExtractionMetadata,
    ExtractionMethod, NewProvenanceRecord, COMBINED_EXTRACTION,
};

/// Document types chosen for a selective reprocess
pub type Selection = BTreeMap<DocType, bool>;

/// Request body of an extraction run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionRequest {
    /// `None` reprocesses every uploaded type from an empty base
    #[serde(default)]
    pub selection: Option<Selection>,
}

/// What an extraction run did
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    /// Document types processed, in issue order
    pub processed: Vec<DocType>,
    pub statuses: BTreeMap<DocType, DocTypeStatus>,
    /// Live blob after the run
    pub extracted_data: Blob,
    /// Snapshot appended by the run; `None` when nothing was processed
    pub snapshot: Option<AIExtractionSnapshot>,
}

/// Document types a run will process
///
/// With a selection, only types marked `true` that were also uploaded.
pub fn work_set(uploaded: &BTreeSet<DocType>, selection: Option<&Selection>) -> BTreeSet<DocType> {
    match selection {
        Some(selection) => selection
            .iter()
            .filter(|(doc_type, selected)| **selected && uploaded.contains(*doc_type))
            .map(|(doc_type, _)| *doc_type)
            .collect(),
        None => uploaded.clone(),
    }
}

/// Shallow-assign fragments onto a base, later fragments winning
pub fn merge_results(base: Blob, fragments: &[Blob]) -> Blob {
    fragments.iter().fold(base, |mut merged, fragment| {
        shallow_merge(&mut merged, fragment);
        merged
    })
}

/// Settled outcome of one call
enum CallResult {
    Fields(FieldSet),
    Failed(String),
    /// No uploaded document feeds this kind
    NoDocuments,
}

/// Combine the settled calls of one document type
fn settle_doc_type(
    doc_type: DocType,
    calls: Vec<(ExtractionKind, CallResult)>,
) -> std::result::Result<NormalizedExtractionResult, String> {
    let mut errors = Vec::new();
    let mut fields: BTreeMap<ExtractionKind, FieldSet> = BTreeMap::new();
    for (kind, result) in calls {
        match result {
            CallResult::Fields(f) => {
                fields.insert(kind, f);
            }
            CallResult::Failed(e) => errors.push(format!("{}: {}", kind, e)),
            CallResult::NoDocuments => {}
        }
    }

    if fields.is_empty() {
        return Err(if errors.is_empty() {
            format!("No documents for {}", doc_type)
        } else {
            errors.join("; ")
        });
    }

    Ok(match doc_type {
        DocType::Images => NormalizedExtractionResult::ImageAnalysis {
            interior: fields.remove(&ExtractionKind::InteriorImages),
            exterior: fields.remove(&ExtractionKind::ExteriorImages),
        },
        _ => {
            let (kind, f) = fields
                .into_iter()
                .next()
                .ok_or_else(|| format!("No result for {}", doc_type))?;
            NormalizedExtractionResult::single(kind, f)
        }
    })
}

/// Provenance records for the evidence of one document type
fn provenance_records(
    evidence: Vec<FieldEvidence>,
    sources: &[DocumentSource],
) -> Vec<NewProvenanceRecord> {
    evidence
        .into_iter()
        .map(|e| {
            let docs = documents_for(e.kind, sources);
            let (document_name, document_id) = match docs.as_slice() {
                [single] => (Some(single.name.clone()), Some(single.document_id.clone())),
                [] => (None, None),
                many => (
                    Some(
                        many.iter()
                            .map(|d| d.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    ),
                    None,
                ),
            };
            NewProvenanceRecord {
                field_path: e.path,
                document_name,
                document_id,
                page_number: e.page,
                confidence: e.confidence,
                extraction_method: ExtractionMethod::Ai,
                bbox: None,
            }
        })
        .collect()
}

/// Runs extraction for sessions
#[derive(Clone)]
pub struct ExtractionOrchestrator {
    db: Database,
    extractor: ExtractorClient,
    config: ExtractionConfig,
}

impl ExtractionOrchestrator {
    pub fn new(db: Database, extractor: ExtractorClient, config: ExtractionConfig) -> Self {
        Self {
            db,
            extractor,
            config,
        }
    }

    pub fn extractor(&self) -> &ExtractorClient {
        &self.extractor
    }

    /// Run extraction for a session
    ///
    /// Fails with `ExtractionFailed` (nothing persisted) when every document
    /// type failed. An empty work set makes no calls and changes nothing.
    pub async fn run(
        &self,
        session_id: &str,
        selection: Option<&Selection>,
    ) -> Result<ExtractionOutcome> {
        let session = self.db.require_session(session_id)?;
        let uploads = session.uploads();
        let sources = document_sources(&uploads);
        let work = work_set(&uploaded_document_types(&uploads), selection);

        if work.is_empty() {
            info!(session_id = %session_id, "Nothing to extract");
            return Ok(ExtractionOutcome {
                processed: Vec::new(),
                statuses: BTreeMap::new(),
                extracted_data: session.extracted_data(),
                snapshot: None,
            });
        }

        let order = self.config.ordered(&work);
        let calls: Vec<(DocType, ExtractionKind)> = order
            .iter()
            .flat_map(|doc_type| doc_type.kinds().iter().map(move |kind| (*doc_type, *kind)))
            .collect();

        info!(
            session_id = %session_id,
            doc_types = ?order,
            calls = calls.len(),
            selective = selection.is_some(),
            "Starting extraction"
        );

        // join_all yields results in issue order regardless of completion order
        let settled = join_all(calls.iter().map(|(_, kind)| {
            let documents = documents_for(*kind, &sources);
            async move {
                if documents.is_empty() {
                    return CallResult::NoDocuments;
                }
                let result = self
                    .extractor
                    .extract(*kind, &documents)
                    .await
                    .and_then(|raw| normalize_fields(*kind, &raw));
                match result {
                    Ok(fields) => CallResult::Fields(fields),
                    Err(e) => CallResult::Failed(e.to_string()),
                }
            }
        }))
        .await;

        let mut by_type: BTreeMap<DocType, Vec<(ExtractionKind, CallResult)>> = BTreeMap::new();
        for ((doc_type, kind), result) in calls.into_iter().zip(settled) {
            by_type.entry(doc_type).or_default().push((kind, result));
        }

        let mut statuses = BTreeMap::new();
        let mut fragments = Vec::new();
        let mut provenance = Vec::new();
        for doc_type in &order {
            let doc_calls = by_type.remove(doc_type).unwrap_or_default();
            match settle_doc_type(*doc_type, doc_calls) {
                Ok(result) => {
                    statuses.insert(
                        *doc_type,
                        DocTypeStatus::Succeeded {
                            fields: result.field_count(),
                        },
                    );
                    fragments.push(result.fragment());
                    provenance.extend(provenance_records(result.evidence(), &sources));
                }
                Err(e) => {
                    warn!(
                        session_id = %session_id,
                        doc_type = %doc_type,
                        error = %e,
                        "Extraction failed for document type"
                    );
                    statuses.insert(*doc_type, DocTypeStatus::Failed { error: e });
                }
            }
        }
        if let Some(selection) = selection {
            for (doc_type, selected) in selection {
                if *selected && !work.contains(doc_type) {
                    statuses.insert(*doc_type, DocTypeStatus::Skipped);
                }
            }
        }

        if fragments.is_empty() {
            let summary = statuses
                .iter()
                .filter_map(|(doc_type, status)| match status {
                    DocTypeStatus::Failed { error } => Some(format!("{}: {}", doc_type, error)),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("; ");
            error!(session_id = %session_id, errors = %summary, "All extraction calls failed");
            return Err(Error::ExtractionFailed(summary));
        }

        let metadata = ExtractionMetadata {
            processed: order.clone(),
            selective: selection.is_some(),
            statuses: statuses.clone(),
            model: Some(self.extractor.model().to_string()),
            extra: Default::default(),
        };

        let selective = selection.is_some();
        let (extracted_data, snapshot) = self.db.commit_extraction(
            session_id,
            |base| {
                let base = if selective { base.clone() } else { Blob::new() };
                merge_results(base, &fragments)
            },
            COMBINED_EXTRACTION,
            &metadata,
            &provenance,
        )?;

        info!(
            session_id = %session_id,
            snapshot_id = snapshot.id,
            succeeded = statuses.values().filter(|s| s.is_success()).count(),
            failed = statuses.values().filter(|s| !s.is_success()).count(),
            "Extraction complete"
        );

        Ok(ExtractionOutcome {
            processed: order,
            statuses,
            extracted_data,
            snapshot: Some(snapshot),
        })
    }
}
