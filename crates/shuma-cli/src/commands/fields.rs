//! Field view command implementations

use anyhow::{Context, Result};
use shuma_core::db::Database;
use shuma_core::fields::{self, ResolvedField};

use super::{compact, truncate};

fn print_fields(title: &str, resolved: &[ResolvedField]) {
    println!();
    println!("📋 {}", title);
    println!("   ─────────────────────────────────────────────────────────────");

    for field in resolved {
        let source = match (&field.provenance, field.path) {
            (Some(record), _) => match record.page_number {
                Some(page) => format!(
                    "{} p.{}",
                    record.document_name.as_deref().unwrap_or(record.extraction_method.as_str()),
                    page
                ),
                None => record
                    .document_name
                    .as_deref()
                    .unwrap_or(record.extraction_method.as_str())
                    .to_string(),
            },
            (None, Some(path)) => path.to_string(),
            (None, None) => String::new(),
        };
        println!(
            "   {:<22} │ {:<30} │ {}",
            truncate(field.label, 22),
            truncate(&field.display, 30),
            source
        );
    }
}

pub fn cmd_fields(db: &Database, session_id: &str, section: Option<&str>) -> Result<()> {
    let session = db.require_session(session_id)?;
    let provenance = db.provenance_store(session_id)?;
    let extracted = session.extracted_data();

    match section {
        Some(id) => {
            let config = fields::section(id)
                .with_context(|| format!("Unknown section: {} (see 'shuma sections')", id))?;
            let resolved =
                fields::resolve_section(id, &extracted, &session.data, Some(&provenance))
                    .unwrap_or_default();
            print_fields(config.title, &resolved);
        }
        None => {
            for config in fields::sections() {
                let resolved =
                    fields::resolve_section(config.id, &extracted, &session.data, Some(&provenance))
                        .unwrap_or_default();
                print_fields(config.title, &resolved);
            }
        }
    }

    Ok(())
}

pub fn cmd_sections() -> Result<()> {
    println!();
    println!("📚 Field Sections");

    for section in fields::sections() {
        println!();
        println!("   {} ({})", section.title, section.id);
        for field in section.fields {
            println!(
                "     {:<24} {:<24} {}",
                field.key,
                truncate(field.label, 24),
                field.value_paths.join(" | ")
            );
        }
    }

    Ok(())
}

/// Show the provenance record behind a field
///
/// `field` is a registered key, resolved to its winning path first, or a
/// dotted data path.
pub fn cmd_provenance(db: &Database, session_id: &str, field: &str) -> Result<()> {
    let session = db.require_session(session_id)?;
    let store = db.provenance_store(session_id)?;

    let (value, path) = match fields::field_by_key(field) {
        Some(canonical) => {
            let resolution =
                fields::resolve_field(canonical, &session.extracted_data(), &session.data);
            (
                resolution.as_ref().map(|r| r.value.clone()),
                resolution.and_then(|r| r.path),
            )
        }
        None => (None, None),
    };

    let record = path
        .and_then(|p| store.lookup(p))
        .or_else(|| store.lookup(field));

    println!();
    println!("🔎 Provenance for {}", field);
    if let Some(value) = &value {
        println!("   Value: {}", compact(value));
    }
    if let Some(path) = path {
        println!("   Resolved from: {}", path);
    }

    let Some(record) = record else {
        println!("   No provenance recorded.");
        return Ok(());
    };

    println!("   Method: {}", record.extraction_method.as_str());
    println!("   Path: {}", record.field_path);
    if let Some(name) = &record.document_name {
        println!("   Document: {}", name);
    }
    if let Some(page) = record.page_number {
        println!("   Page: {}", page);
    }
    if let Some(confidence) = record.confidence {
        println!("   Confidence: {:.0}%", confidence * 100.0);
    }
    if let Some(bbox) = &record.bbox {
        println!(
            "   Region: x={} y={} w={} h={}",
            bbox.x, bbox.y, bbox.width, bbox.height
        );
    }
    println!("   Recorded: {}", record.created_at.format("%Y-%m-%d %H:%M:%S"));

    Ok(())
}
