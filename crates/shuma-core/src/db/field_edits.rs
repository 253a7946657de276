//! Manual field edits and the edit ledger

use rusqlite::{params, TransactionBehavior};
use serde_json::Value;
use tracing::{debug, warn};

use super::provenance::supersede_and_insert;
use super::{parse_datetime, read_session_data, write_session_data, Database};
use crate::blob::set_in;
use crate::error::{Error, Result};
use crate::models::{extracted_data_of, FieldEditRecord, NewProvenanceRecord, EXTRACTED_DATA_KEY};

fn encode(value: Option<&Value>) -> Result<Option<String>> {
    Ok(value.map(serde_json::to_string).transpose()?)
}

fn decode(value: Option<String>) -> Option<Value> {
    value.and_then(|v| serde_json::from_str(&v).ok())
}

impl Database {
    /// Overwrite one dotted path of the live extracted blob
    ///
    /// Runs as one read-merge-write transaction, also recording a `manual`
    /// provenance record for the path. Returns the previous value. The edit
    /// ledger row is written afterwards and never fails the edit.
    pub fn update_extracted_field(
        &self,
        session_id: &str,
        field_key: &str,
        path: &str,
        value: Value,
    ) -> Result<Option<Value>> {
        if session_id.trim().is_empty() {
            return Err(Error::MissingSessionId);
        }
        if path.split('.').any(|segment| segment.is_empty()) {
            return Err(Error::InvalidData(format!("Invalid field path: {:?}", path)));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut data = read_session_data(&tx, session_id)?;
        let mut extracted = extracted_data_of(&data);
        let old_value = set_in(&mut extracted, path, value.clone());
        data.insert(EXTRACTED_DATA_KEY.to_string(), Value::Object(extracted));
        write_session_data(&tx, session_id, &data)?;
        supersede_and_insert(&tx, session_id, &NewProvenanceRecord::manual(path))?;

        tx.commit()?;
        debug!(session_id = %session_id, field = %field_key, path = %path, "Field edited");

        self.record_edit(session_id, field_key, old_value.as_ref(), Some(&value));
        Ok(old_value)
    }

    /// Append an edit ledger row; failures are logged, never returned
    pub fn record_edit(
        &self,
        session_id: &str,
        field_key: &str,
        old_value: Option<&Value>,
        new_value: Option<&Value>,
    ) {
        if let Err(e) = self.insert_field_edit(session_id, field_key, old_value, new_value) {
            warn!(
                session_id = %session_id,
                field = %field_key,
                error = %e,
                "Failed to record field edit"
            );
        }
    }

    /// Append an edit ledger row
    pub fn insert_field_edit(
        &self,
        session_id: &str,
        field_key: &str,
        old_value: Option<&Value>,
        new_value: Option<&Value>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO field_edits (session_id, field_key, old_value, new_value)
             VALUES (?, ?, ?, ?)",
            params![
                session_id,
                field_key,
                encode(old_value)?,
                encode(new_value)?
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Edit history of a session, newest first
    pub fn list_field_edits(&self, session_id: &str) -> Result<Vec<FieldEditRecord>> {
        if session_id.trim().is_empty() {
            return Err(Error::MissingSessionId);
        }
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, field_key, old_value, new_value, timestamp
             FROM field_edits
             WHERE session_id = ?
             ORDER BY timestamp DESC, id DESC",
        )?;
        let edits = stmt
            .query_map(params![session_id], |row| {
                let timestamp: String = row.get(5)?;
                Ok(FieldEditRecord {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    field_key: row.get(2)?,
                    old_value: decode(row.get(3)?),
                    new_value: decode(row.get(4)?),
                    timestamp: parse_datetime(&timestamp),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edits)
    }
}
