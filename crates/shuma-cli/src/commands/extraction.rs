//! Extraction and snapshot command implementations

use anyhow::{anyhow, Context, Result};
use shuma_core::ai::{DocumentLoader, ExtractionBackend, ExtractorClient};
use shuma_core::config::ExtractionConfig;
use shuma_core::db::Database;
use shuma_core::extraction::{ExtractionOrchestrator, ExtractionOutcome, Selection};
use shuma_core::models::{DocType, DocTypeStatus};

use super::truncate;

/// Extraction backend from the environment, or an error explaining how to set one up
///
/// Documents are read from `SHUMA_UPLOADS_DIR`.
pub fn extractor_from_env() -> Result<ExtractorClient> {
    let client = ExtractorClient::from_env().context(
        "No extraction backend configured. Set ANTHROPIC_API_KEY, or EXTRACTION_BACKEND=gemini with GEMINI_API_KEY",
    )?;
    Ok(client.with_loader(DocumentLoader::from_env()))
}

/// Build a selection from `--only` values; empty means a full run
pub fn parse_selection(only: &[String]) -> Result<Option<Selection>> {
    if only.is_empty() {
        return Ok(None);
    }
    let mut selection = Selection::new();
    for raw in only {
        let doc_type: DocType = raw.trim().parse().map_err(|e: String| anyhow!(e))?;
        selection.insert(doc_type, true);
    }
    Ok(Some(selection))
}

pub async fn cmd_extract(
    db: &Database,
    client: ExtractorClient,
    session_id: &str,
    only: &[String],
) -> Result<ExtractionOutcome> {
    let selection = parse_selection(only)?;

    let config = ExtractionConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load extraction config, using defaults");
        ExtractionConfig::default()
    });
    let client = client.with_config(config.clone());

    println!("🤖 Extracting session {}...", session_id);
    println!("   Backend: {} (model: {})", client.host(), client.model());
    match &selection {
        Some(selection) => println!(
            "   Mode: selective ({})",
            selection
                .keys()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
        None => println!("   Mode: all uploaded documents"),
    }

    let orchestrator = ExtractionOrchestrator::new(db.clone(), client, config);
    let outcome = orchestrator
        .run(session_id, selection.as_ref())
        .await
        .context("Extraction failed")?;

    if outcome.processed.is_empty() {
        println!();
        println!("   Nothing to extract: no matching uploads.");
        return Ok(outcome);
    }

    println!();
    println!("📊 Extraction Results");
    println!("   ─────────────────────────────");
    for doc_type in &outcome.processed {
        match outcome.statuses.get(doc_type) {
            Some(DocTypeStatus::Succeeded { fields }) => {
                println!("   ✅ {:<8} {} fields", doc_type.as_str(), fields)
            }
            Some(DocTypeStatus::Failed { error }) => {
                println!("   ❌ {:<8} {}", doc_type.as_str(), truncate(error, 60))
            }
            Some(DocTypeStatus::Skipped) | None => {
                println!("   ⏭️  {:<8} skipped", doc_type.as_str())
            }
        }
    }
    if let Some(snapshot) = &outcome.snapshot {
        println!();
        println!("   Snapshot #{} saved", snapshot.id);
    }

    Ok(outcome)
}

pub fn cmd_snapshots_list(
    db: &Database,
    session_id: &str,
    extraction_type: Option<&str>,
) -> Result<()> {
    db.require_session(session_id)?;
    let snapshots = db.list_snapshots(session_id, extraction_type)?;

    if snapshots.is_empty() {
        println!("No snapshots for session {}.", session_id);
        return Ok(());
    }

    println!();
    println!("🗂️  Extraction Snapshots");
    println!("   ─────────────────────────────────────────────────────────────");

    for snapshot in snapshots {
        let processed: Vec<&str> = snapshot
            .metadata
            .processed
            .iter()
            .map(|t| t.as_str())
            .collect();
        println!(
            "   [{}] {} │ {:<10} │ {:>3} keys │ {}{}",
            snapshot.id,
            snapshot.extraction_date.format("%Y-%m-%d %H:%M:%S"),
            snapshot.extraction_type,
            snapshot.extracted_fields.len(),
            processed.join(","),
            if snapshot.is_active { " (active)" } else { "" }
        );
    }

    println!();
    println!(
        "   Use 'shuma snapshots restore {} <id>' to merge a snapshot back.",
        session_id
    );

    Ok(())
}

pub fn cmd_snapshots_restore(db: &Database, session_id: &str, id: i64) -> Result<()> {
    let outcome = db
        .restore_snapshot(session_id, id)
        .with_context(|| format!("Failed to restore snapshot {}", id))?;

    if outcome.changed_keys.is_empty() {
        println!("✅ Snapshot #{} already matches the current data", id);
    } else {
        println!(
            "✅ Restored snapshot #{} ({} keys changed: {})",
            id,
            outcome.changed_keys.len(),
            outcome.changed_keys.join(", ")
        );
    }

    Ok(())
}
