//! Extraction snapshots: append, list, restore, and the extraction commit

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::provenance::supersede_and_insert;
use super::{parse_blob, parse_datetime, read_session_data, write_session_data, Database};
use crate::blob::{changed_keys, shallow_merge, Blob};
use crate::error::{Error, Result};
use crate::models::{
    extracted_data_of, AIExtractionSnapshot, ExtractionMetadata, NewProvenanceRecord,
    EXTRACTED_DATA_KEY,
};

/// Result of restoring a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct RestoreOutcome {
    pub snapshot: AIExtractionSnapshot,
    /// Live blob after the restore
    pub extracted_data: Blob,
    /// Top-level keys whose value changed
    pub changed_keys: Vec<String>,
}

const SNAPSHOT_COLUMNS: &str =
    "id, session_id, extraction_date, extracted_fields, is_active, extraction_type, metadata";

/// Append a snapshot and make it the only active one for its session
fn insert_active_snapshot(
    conn: &Connection,
    session_id: &str,
    fields: &Blob,
    extraction_type: &str,
    metadata: &ExtractionMetadata,
) -> Result<i64> {
    conn.execute(
        "UPDATE ai_extractions SET is_active = 0 WHERE session_id = ? AND is_active = 1",
        params![session_id],
    )?;
    conn.execute(
        "INSERT INTO ai_extractions (session_id, extracted_fields, is_active, extraction_type, metadata)
         VALUES (?, ?, 1, ?, ?)",
        params![
            session_id,
            serde_json::to_string(fields)?,
            extraction_type,
            serde_json::to_string(metadata)?
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn select_snapshot(
    conn: &Connection,
    session_id: &str,
    id: i64,
) -> Result<Option<AIExtractionSnapshot>> {
    let snapshot = conn
        .query_row(
            &format!(
                "SELECT {} FROM ai_extractions WHERE id = ? AND session_id = ?",
                SNAPSHOT_COLUMNS
            ),
            params![id, session_id],
            |row| Database::row_to_snapshot(row),
        )
        .optional()?;
    Ok(snapshot)
}

impl Database {
    /// Append a snapshot of `fields`, flipping the active marker to it
    ///
    /// The live blob is not touched.
    pub fn save_snapshot(
        &self,
        session_id: &str,
        fields: &Blob,
        extraction_type: &str,
        metadata: &ExtractionMetadata,
    ) -> Result<AIExtractionSnapshot> {
        if session_id.trim().is_empty() {
            return Err(Error::MissingSessionId);
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Fails with NotFound for unknown sessions
        read_session_data(&tx, session_id)?;
        let id = insert_active_snapshot(&tx, session_id, fields, extraction_type, metadata)?;
        let snapshot = select_snapshot(&tx, session_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Snapshot {}", id)))?;

        tx.commit()?;
        debug!(session_id = %session_id, snapshot_id = id, "Saved extraction snapshot");
        Ok(snapshot)
    }

    /// Snapshots of a session, newest first, optionally filtered by type
    pub fn list_snapshots(
        &self,
        session_id: &str,
        extraction_type: Option<&str>,
    ) -> Result<Vec<AIExtractionSnapshot>> {
        if session_id.trim().is_empty() {
            return Err(Error::MissingSessionId);
        }
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM ai_extractions
             WHERE session_id = ?1 AND (?2 IS NULL OR extraction_type = ?2)
             ORDER BY extraction_date DESC, id DESC",
            SNAPSHOT_COLUMNS
        ))?;
        let snapshots = stmt
            .query_map(params![session_id, extraction_type], |row| {
                Self::row_to_snapshot(row)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(snapshots)
    }

    /// Get a snapshot of a session by ID
    pub fn get_snapshot(&self, session_id: &str, id: i64) -> Result<Option<AIExtractionSnapshot>> {
        let conn = self.conn()?;
        select_snapshot(&conn, session_id, id)
    }

    /// The currently active snapshot of a session, if any
    pub fn active_snapshot(&self, session_id: &str) -> Result<Option<AIExtractionSnapshot>> {
        let conn = self.conn()?;
        let snapshot = conn
            .query_row(
                &format!(
                    "SELECT {} FROM ai_extractions WHERE session_id = ? AND is_active = 1
                     ORDER BY id DESC LIMIT 1",
                    SNAPSHOT_COLUMNS
                ),
                params![session_id],
                |row| Self::row_to_snapshot(row),
            )
            .optional()?;
        Ok(snapshot)
    }

    /// Restore a snapshot onto the live blob
    ///
    /// Shallow-merges the snapshot's fields over the current blob (snapshot
    /// wins per top-level key) and marks it as the only active snapshot.
    /// Restoring twice is the same as restoring once. One edit ledger entry
    /// is recorded per changed key.
    pub fn restore_snapshot(&self, session_id: &str, id: i64) -> Result<RestoreOutcome> {
        if session_id.trim().is_empty() {
            return Err(Error::MissingSessionId);
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut data = read_session_data(&tx, session_id)?;
        let snapshot = select_snapshot(&tx, session_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Snapshot {}", id)))?;

        let current = extracted_data_of(&data);
        let mut restored = current.clone();
        shallow_merge(&mut restored, &snapshot.extracted_fields);
        let changes = changed_keys(&current, &restored);

        data.insert(
            EXTRACTED_DATA_KEY.to_string(),
            Value::Object(restored.clone()),
        );
        write_session_data(&tx, session_id, &data)?;
        tx.execute(
            "UPDATE ai_extractions SET is_active = (id = ?) WHERE session_id = ?",
            params![id, session_id],
        )?;
        let snapshot = select_snapshot(&tx, session_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Snapshot {}", id)))?;

        tx.commit()?;
        info!(
            session_id = %session_id,
            snapshot_id = id,
            changed = changes.len(),
            "Restored extraction snapshot"
        );

        for (key, old, new) in &changes {
            self.record_edit(session_id, key, old.as_ref(), new.as_ref());
        }

        Ok(RestoreOutcome {
            snapshot,
            extracted_data: restored,
            changed_keys: changes.into_iter().map(|(key, _, _)| key).collect(),
        })
    }

    /// Persist the result of an extraction run in one transaction
    ///
    /// `merge` receives the freshest persisted blob, read under the write
    /// lock, and returns the new live blob. The new blob is written, appended
    /// as the active snapshot, and `provenance` records supersede earlier
    /// ones for their paths.
    pub fn commit_extraction<F>(
        &self,
        session_id: &str,
        merge: F,
        extraction_type: &str,
        metadata: &ExtractionMetadata,
        provenance: &[NewProvenanceRecord],
    ) -> Result<(Blob, AIExtractionSnapshot)>
    where
        F: FnOnce(&Blob) -> Blob,
    {
        if session_id.trim().is_empty() {
            return Err(Error::MissingSessionId);
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut data = read_session_data(&tx, session_id)?;
        let merged = merge(&extracted_data_of(&data));

        data.insert(EXTRACTED_DATA_KEY.to_string(), Value::Object(merged.clone()));
        write_session_data(&tx, session_id, &data)?;

        let id = insert_active_snapshot(&tx, session_id, &merged, extraction_type, metadata)?;
        for record in provenance {
            supersede_and_insert(&tx, session_id, record)?;
        }
        let snapshot = select_snapshot(&tx, session_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Snapshot {}", id)))?;

        tx.commit()?;
        Ok((merged, snapshot))
    }

    pub(crate) fn row_to_snapshot(row: &rusqlite::Row) -> rusqlite::Result<AIExtractionSnapshot> {
        let extraction_date: String = row.get(2)?;
        let fields: String = row.get(3)?;
        let metadata: String = row.get(6)?;
        Ok(AIExtractionSnapshot {
            id: row.get(0)?,
            session_id: row.get(1)?,
            extraction_date: parse_datetime(&extraction_date),
            extracted_fields: parse_blob(&fields),
            is_active: row.get(4)?,
            extraction_type: row.get(5)?,
            metadata: serde_json::from_str(&metadata).unwrap_or_default(),
        })
    }
}
