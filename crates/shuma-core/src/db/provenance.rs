//! Provenance record operations

use rusqlite::{params, Connection};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{ExtractionMethod, NewProvenanceRecord, ProvenanceRecord};
use crate::provenance::ProvenanceStore;

/// Deactivate the active records of a path and insert a new active one
///
/// Takes a plain connection so it can run inside a caller's transaction.
pub(crate) fn supersede_and_insert(
    conn: &Connection,
    session_id: &str,
    record: &NewProvenanceRecord,
) -> Result<i64> {
    if let Some(confidence) = record.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidData(format!(
                "Confidence must be between 0 and 1, got {}",
                confidence
            )));
        }
    }

    conn.execute(
        "UPDATE provenance SET is_active = 0
         WHERE session_id = ? AND field_path = ? AND is_active = 1",
        params![session_id, record.field_path],
    )?;

    let bbox = record.bbox.map(|b| serde_json::to_string(&b)).transpose()?;
    conn.execute(
        "INSERT INTO provenance (session_id, field_path, document_name, document_id,
         page_number, confidence, extraction_method, bbox, is_active)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)",
        params![
            session_id,
            record.field_path,
            record.document_name,
            record.document_id,
            record.page_number,
            record.confidence,
            record.extraction_method.as_str(),
            bbox,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Record where a field value came from, superseding earlier records for the path
    pub fn insert_provenance(&self, session_id: &str, record: &NewProvenanceRecord) -> Result<i64> {
        // Validates that the session exists
        self.require_session(session_id)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let id = supersede_and_insert(&tx, session_id, record)?;
        tx.commit()?;
        Ok(id)
    }

    /// All provenance records of a session, newest first
    pub fn list_provenance(&self, session_id: &str) -> Result<Vec<ProvenanceRecord>> {
        if session_id.trim().is_empty() {
            return Err(Error::MissingSessionId);
        }
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, field_path, document_name, document_id, page_number,
                    confidence, extraction_method, bbox, is_active, created_at
             FROM provenance
             WHERE session_id = ?
             ORDER BY created_at DESC, id DESC",
        )?;
        let records = stmt
            .query_map(params![session_id], |row| Self::row_to_provenance(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Lookup structure over the active records of a session
    pub fn provenance_store(&self, session_id: &str) -> Result<ProvenanceStore> {
        Ok(ProvenanceStore::from_records(
            self.list_provenance(session_id)?,
        ))
    }

    fn row_to_provenance(row: &rusqlite::Row) -> rusqlite::Result<ProvenanceRecord> {
        let method: String = row.get(7)?;
        let bbox: Option<String> = row.get(8)?;
        let created_at: String = row.get(10)?;
        Ok(ProvenanceRecord {
            id: row.get(0)?,
            session_id: row.get(1)?,
            field_path: row.get(2)?,
            document_name: row.get(3)?,
            document_id: row.get(4)?,
            page_number: row.get(5)?,
            confidence: row.get(6)?,
            extraction_method: method.parse().unwrap_or(ExtractionMethod::Ai),
            bbox: bbox.and_then(|b| serde_json::from_str(&b).ok()),
            is_active: row.get(9)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
