//! Risk insight queries.
//!
//! Inserts go through `insert_open_risk`, which leans on the partial unique
//! index `idx_risk_open_entity`: a second open row for the same entity key is
//! silently ignored, which makes the detection steps safe to re-run and safe
//! under overlapping invocations.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::{EntityType, OpsDb, RiskInsight};
use crate::risk::RiskLevel;

fn row_to_insight(row: &rusqlite::Row<'_>) -> rusqlite::Result<RiskInsight> {
    let entity_type: String = row.get(1)?;
    let level: String = row.get(5)?;
    Ok(RiskInsight {
        id: row.get(0)?,
        entity_type: entity_type
            .parse()
            .map_err(|_| rusqlite::Error::InvalidQuery)?,
        entity_id: row.get(2)?,
        risk_type: row.get(3)?,
        risk_score: row.get(4)?,
        risk_level: level.parse().map_err(|_| rusqlite::Error::InvalidQuery)?,
        status: row.get(6)?,
        reason: row.get(7)?,
        created_at: row.get(8)?,
        last_scored_at: row.get(9)?,
    })
}

const INSIGHT_COLUMNS: &str = "id, entity_type, entity_id, risk_type, risk_score, risk_level, \
     status, reason, created_at, last_scored_at";

impl OpsDb {
    /// Insert a new open risk row. Returns `true` if a row was created,
    /// `false` when an open row already exists for the entity key.
    ///
    /// The level is always derived from the score here — callers never pass one.
    pub fn insert_open_risk(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        risk_type: &str,
        risk_score: u32,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, String> {
        let id = format!("ri-{}", Uuid::new_v4());
        let ts = now.to_rfc3339();
        let level = RiskLevel::from_score(risk_score);

        let inserted = self
            .conn_ref()
            .execute(
                "INSERT INTO risk_insights
                    (id, entity_type, entity_id, risk_type, risk_score, risk_level, status, reason, created_at, last_scored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'open', ?7, ?8, ?8)
                 ON CONFLICT (entity_type, entity_id) WHERE status = 'open' DO NOTHING",
                params![
                    id,
                    entity_type.as_str(),
                    entity_id,
                    risk_type,
                    risk_score,
                    level.as_str(),
                    reason,
                    ts,
                ],
            )
            .map_err(|e| format!("Failed to insert risk row: {}", e))?;

        Ok(inserted > 0)
    }

    /// All open risk rows, highest score first.
    pub fn open_risks(&self) -> Result<Vec<RiskInsight>, String> {
        let sql = format!(
            "SELECT {} FROM risk_insights WHERE status = 'open' ORDER BY risk_score DESC, id",
            INSIGHT_COLUMNS
        );
        let mut stmt = self
            .conn_ref()
            .prepare(&sql)
            .map_err(|e| format!("Failed to prepare open-risk query: {}", e))?;
        let rows = stmt
            .query_map([], row_to_insight)
            .map_err(|e| format!("Failed to query open risks: {}", e))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| format!("Failed to read risk row: {}", e))?);
        }
        Ok(out)
    }

    /// Open risk rows at or above the critical threshold.
    pub fn open_critical_risks(&self) -> Result<Vec<RiskInsight>, String> {
        let sql = format!(
            "SELECT {} FROM risk_insights
             WHERE status = 'open' AND risk_level = 'critical'
             ORDER BY risk_score DESC, id",
            INSIGHT_COLUMNS
        );
        let mut stmt = self
            .conn_ref()
            .prepare(&sql)
            .map_err(|e| format!("Failed to prepare critical-risk query: {}", e))?;
        let rows = stmt
            .query_map([], row_to_insight)
            .map_err(|e| format!("Failed to query critical risks: {}", e))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| format!("Failed to read risk row: {}", e))?);
        }
        Ok(out)
    }

    /// Does an open risk row exist for the entity key?
    pub fn has_open_risk(&self, entity_type: EntityType, entity_id: &str) -> Result<bool, String> {
        self.conn_ref()
            .prepare(
                "SELECT 1 FROM risk_insights
                 WHERE entity_type = ?1 AND entity_id = ?2 AND status = 'open'",
            )
            .and_then(|mut stmt| stmt.exists(params![entity_type.as_str(), entity_id]))
            .map_err(|e| format!("Failed to check open risk: {}", e))
    }

    /// Apply a rescore to one row: new score, freshly derived level, and the
    /// scoring anchor moved forward. The caller decides whether the write is
    /// needed at all (unchanged scores are skipped).
    pub fn apply_rescore(
        &self,
        risk_id: &str,
        new_score: u32,
        scored_at: DateTime<Utc>,
    ) -> Result<(), String> {
        let level = RiskLevel::from_score(new_score);
        self.conn_ref()
            .execute(
                "UPDATE risk_insights
                 SET risk_score = ?1, risk_level = ?2, last_scored_at = ?3
                 WHERE id = ?4 AND status = 'open'",
                params![new_score, level.as_str(), scored_at.to_rfc3339(), risk_id],
            )
            .map_err(|e| format!("Failed to rescore risk {}: {}", risk_id, e))?;
        Ok(())
    }

    /// Close an open risk row (used by operators, not by the cycles).
    pub fn close_risk(&self, risk_id: &str, now: DateTime<Utc>) -> Result<bool, String> {
        let changed = self
            .conn_ref()
            .execute(
                "UPDATE risk_insights
                 SET status = 'closed', closed_at = ?1
                 WHERE id = ?2 AND status = 'open'",
                params![now.to_rfc3339(), risk_id],
            )
            .map_err(|e| format!("Failed to close risk {}: {}", risk_id, e))?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;

    #[test]
    fn test_insert_derives_level_from_score() {
        let db = test_db();
        let now = Utc::now();

        assert!(db
            .insert_open_risk(EntityType::Invoice, "inv-1", "overdue_invoice", 85, "10 days overdue", now)
            .expect("insert"));

        let risks = db.open_risks().expect("query");
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].risk_level, RiskLevel::Critical);
        assert_eq!(risks[0].last_scored_at, risks[0].created_at);
    }

    #[test]
    fn test_duplicate_open_risk_suppressed() {
        let db = test_db();
        let now = Utc::now();

        assert!(db
            .insert_open_risk(EntityType::Invoice, "inv-X", "overdue_invoice", 70, "r", now)
            .expect("first insert"));
        assert!(!db
            .insert_open_risk(EntityType::Invoice, "inv-X", "overdue_invoice", 90, "r2", now)
            .expect("second insert is a no-op"));

        let risks = db.open_risks().expect("query");
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].risk_score, 70, "original row untouched");
    }

    #[test]
    fn test_closed_entity_can_reopen() {
        let db = test_db();
        let now = Utc::now();

        db.insert_open_risk(EntityType::Store, "st-1", "churn", 50, "r", now)
            .expect("insert");
        let id = db.open_risks().expect("query")[0].id.clone();
        assert!(db.close_risk(&id, now).expect("close"));

        assert!(db
            .insert_open_risk(EntityType::Store, "st-1", "churn", 60, "again", now)
            .expect("reopen after close"));
    }

    #[test]
    fn test_apply_rescore_rederives_level() {
        let db = test_db();
        let now = Utc::now();

        db.insert_open_risk(EntityType::Store, "st-2", "churn", 75, "r", now)
            .expect("insert");
        let id = db.open_risks().expect("query")[0].id.clone();

        db.apply_rescore(&id, 81, now).expect("rescore");
        let risks = db.open_risks().expect("query");
        assert_eq!(risks[0].risk_score, 81);
        assert_eq!(risks[0].risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_critical_filter() {
        let db = test_db();
        let now = Utc::now();

        db.insert_open_risk(EntityType::Store, "a", "churn", 85, "r", now)
            .expect("insert");
        db.insert_open_risk(EntityType::Store, "b", "churn", 65, "r", now)
            .expect("insert");
        db.insert_open_risk(EntityType::Store, "c", "churn", 30, "r", now)
            .expect("insert");

        let critical = db.open_critical_risks().expect("query");
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].entity_id, "a");
    }
}
