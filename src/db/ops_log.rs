//! Append-only audit trail: one row per cycle invocation.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::{OpsDb, OpsLogEntry};

impl OpsDb {
    /// Append one audit row. Serialization failures are surfaced rather than
    /// silently dropping the trail.
    pub fn append_ops_log(
        &self,
        cycle_type: &str,
        results: &serde_json::Value,
        success: bool,
        errors: &[String],
        notes: &str,
        now: DateTime<Utc>,
    ) -> Result<String, String> {
        let id = format!("ol-{}", Uuid::new_v4());
        let errors_json = if errors.is_empty() {
            None
        } else {
            Some(serde_json::to_string(errors).map_err(|e| format!("Failed to serialize errors: {}", e))?)
        };

        self.conn_ref()
            .execute(
                "INSERT INTO ops_log (id, cycle_type, results, success, errors, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    cycle_type,
                    results.to_string(),
                    success,
                    errors_json,
                    notes,
                    now.to_rfc3339(),
                ],
            )
            .map_err(|e| format!("Failed to append ops log: {}", e))?;
        Ok(id)
    }

    /// Most recent audit rows, newest first.
    pub fn recent_ops_log(&self, limit: usize) -> Result<Vec<OpsLogEntry>, String> {
        let mut stmt = self
            .conn_ref()
            .prepare(
                "SELECT id, cycle_type, results, success, errors, notes, created_at
                 FROM ops_log
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1",
            )
            .map_err(|e| format!("Failed to prepare ops log query: {}", e))?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let results: String = row.get(2)?;
                let errors: Option<String> = row.get(4)?;
                Ok(OpsLogEntry {
                    id: row.get(0)?,
                    cycle_type: row.get(1)?,
                    results: serde_json::from_str(&results)
                        .unwrap_or(serde_json::Value::Null),
                    success: row.get(3)?,
                    errors: errors.and_then(|e| serde_json::from_str(&e).ok()),
                    notes: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })
            .map_err(|e| format!("Failed to query ops log: {}", e))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| format!("Failed to read ops log row: {}", e))?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;

    #[test]
    fn test_append_and_read_back() {
        let db = test_db();
        let now = Utc::now();

        let results = serde_json::json!({"risksRescored": 3, "invoiceRisksCreated": 2});
        db.append_ops_log("morning", &results, true, &[], "completed in 42ms", now)
            .expect("append");

        let entries = db.recent_ops_log(10).expect("read");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].cycle_type, "morning");
        assert!(entries[0].success);
        assert!(entries[0].errors.is_none(), "empty error list stored as NULL");
        assert_eq!(entries[0].results["risksRescored"], 3);
    }

    #[test]
    fn test_errors_round_trip() {
        let db = test_db();
        let now = Utc::now();

        let errs = vec!["step detect_low_stock failed: boom".to_string()];
        db.append_ops_log("midday", &serde_json::json!({}), false, &errs, "", now)
            .expect("append");

        let entries = db.recent_ops_log(1).expect("read");
        assert!(!entries[0].success);
        assert_eq!(entries[0].errors.as_deref(), Some(&errs[..]));
    }
}
