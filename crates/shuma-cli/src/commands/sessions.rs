//! Session and edit history command implementations

use anyhow::{bail, Context, Result};
use serde_json::Value;
use shuma_core::blob::Blob;
use shuma_core::db::Database;

use super::{compact, truncate};

/// Create a session, returning its ID
pub fn cmd_session_create(db: &Database, data: Option<&str>) -> Result<String> {
    let initial: Option<Blob> = match data {
        Some(raw) => match serde_json::from_str(raw).context("Invalid --data JSON")? {
            Value::Object(map) => Some(map),
            _ => bail!("--data must be a JSON object"),
        },
        None => None,
    };

    let session = db
        .create_session(initial.as_ref())
        .context("Failed to create session")?;

    println!("✅ Created session {}", session.id);
    println!();
    println!("Next steps:");
    println!("  shuma extract {}", session.id);
    println!("  shuma fields {}", session.id);

    Ok(session.id)
}

pub fn cmd_session_show(db: &Database, id: &str) -> Result<()> {
    let session = db
        .get_session(id)?
        .with_context(|| format!("Session not found: {}", id))?;

    println!();
    println!("📁 Session {}", session.id);
    println!("   Created: {}", session.created_at.format("%Y-%m-%d %H:%M"));
    println!("   Updated: {}", session.updated_at.format("%Y-%m-%d %H:%M"));

    let uploads = session.uploads();
    if !uploads.is_empty() {
        println!();
        println!("   Uploads:");
        for upload in &uploads {
            println!(
                "     {:<16} {}",
                upload.upload_type,
                upload.name.as_deref().or(upload.url.as_deref()).unwrap_or("-")
            );
        }
    }

    let extracted = session.extracted_data();
    println!();
    if extracted.is_empty() {
        println!("   No extracted data yet. Run: shuma extract {}", session.id);
    } else {
        println!("   Extracted data:");
        println!("{}", serde_json::to_string_pretty(&extracted)?);
    }

    Ok(())
}

pub fn cmd_session_list(db: &Database, limit: i64) -> Result<()> {
    let sessions = db.list_sessions(limit)?;

    if sessions.is_empty() {
        println!("No sessions found. Create one with:");
        println!("  shuma session create");
        return Ok(());
    }

    println!();
    println!("📁 Sessions");
    println!("   ─────────────────────────────────────────────────────────────");

    for session in sessions {
        println!(
            "   {} │ {} │ {} uploads",
            session.id,
            session.updated_at.format("%Y-%m-%d %H:%M"),
            session.uploads().len()
        );
    }

    Ok(())
}

pub fn cmd_edits(db: &Database, session_id: &str) -> Result<()> {
    db.require_session(session_id)?;
    let edits = db.list_field_edits(session_id)?;

    if edits.is_empty() {
        println!("No manual edits for session {}.", session_id);
        return Ok(());
    }

    println!();
    println!("✏️  Field Edits ({} total)", edits.len());
    println!("   ─────────────────────────────────────────────────────────────");

    for edit in edits {
        let old = edit.old_value.as_ref().map(compact).unwrap_or_else(|| "∅".into());
        let new = edit.new_value.as_ref().map(compact).unwrap_or_else(|| "∅".into());
        println!(
            "   {} │ {:<20} │ {} → {}",
            edit.timestamp.format("%Y-%m-%d %H:%M:%S"),
            edit.field_key,
            truncate(&old, 25),
            truncate(&new, 25)
        );
    }

    Ok(())
}
