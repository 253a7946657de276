//! Session operations

use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use tracing::debug;

use super::{parse_blob, parse_datetime, read_session_data, write_session_data, Database};
use crate::blob::{shallow_merge, Blob};
use crate::error::{Error, Result};
use crate::models::{extracted_data_of, Session, EXTRACTED_DATA_KEY};

/// Apply a partial update to session data
///
/// Top-level keys are shallow-assigned. An `extractedData` object in the
/// patch is itself shallow-merged into the stored blob rather than replacing it.
pub fn merge_session_data(data: &mut Blob, patch: &Blob) {
    for (key, value) in patch {
        match (key.as_str(), value) {
            (EXTRACTED_DATA_KEY, Value::Object(extracted_patch)) => {
                let mut extracted = extracted_data_of(data);
                shallow_merge(&mut extracted, extracted_patch);
                data.insert(key.clone(), Value::Object(extracted));
            }
            _ => {
                data.insert(key.clone(), value.clone());
            }
        }
    }
}

impl Database {
    /// Create a session with a generated id
    pub fn create_session(&self, initial: Option<&Blob>) -> Result<Session> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut data = Blob::new();
        if let Some(initial) = initial {
            merge_session_data(&mut data, initial);
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (id, data) VALUES (?, ?)",
            params![id, serde_json::to_string(&data)?],
        )?;
        debug!(session_id = %id, "Created session");

        self.get_session(&id)?
            .ok_or_else(|| Error::NotFound(format!("Session {}", id)))
    }

    /// Get session by ID
    pub fn get_session(&self, id: &str) -> Result<Option<Session>> {
        if id.trim().is_empty() {
            return Err(Error::MissingSessionId);
        }
        let conn = self.conn()?;
        let session = conn
            .query_row(
                "SELECT id, data, created_at, updated_at FROM sessions WHERE id = ?",
                params![id],
                |row| Self::row_to_session(row),
            )
            .optional()?;
        Ok(session)
    }

    /// Get session by ID, failing with `NotFound` when it does not exist
    pub fn require_session(&self, id: &str) -> Result<Session> {
        self.get_session(id)?
            .ok_or_else(|| Error::NotFound(format!("Session {}", id)))
    }

    /// The live extracted-data blob of a session
    pub fn get_extracted_data(&self, id: &str) -> Result<Blob> {
        Ok(self.require_session(id)?.extracted_data())
    }

    /// Partially update session data (read-merge-write in one transaction)
    pub fn update_session(&self, id: &str, patch: &Blob) -> Result<Session> {
        if id.trim().is_empty() {
            return Err(Error::MissingSessionId);
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut data = read_session_data(&tx, id)?;
        merge_session_data(&mut data, patch);
        write_session_data(&tx, id, &data)?;

        tx.commit()?;
        debug!(session_id = %id, keys = patch.len(), "Updated session");

        self.require_session(id)
    }

    /// List sessions, most recently updated first
    pub fn list_sessions(&self, limit: i64) -> Result<Vec<Session>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, data, created_at, updated_at FROM sessions
             ORDER BY updated_at DESC, rowid DESC
             LIMIT ?",
        )?;
        let sessions = stmt
            .query_map(params![limit], |row| Self::row_to_session(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        let data: String = row.get(1)?;
        let created_at: String = row.get(2)?;
        let updated_at: String = row.get(3)?;
        Ok(Session {
            id: row.get(0)?,
            data: parse_blob(&data),
            created_at: parse_datetime(&created_at),
            updated_at: parse_datetime(&updated_at),
        })
    }
}
