//! Communication queue queries.
//!
//! At most one pending item per entity key, enforced by the partial unique
//! index `idx_queue_pending_entity` plus a conflict-ignoring insert.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::{EntityType, OpsDb, QueueItem};

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueItem> {
    let entity_type: String = row.get(1)?;
    Ok(QueueItem {
        id: row.get(0)?,
        entity_type: entity_type
            .parse()
            .map_err(|_| rusqlite::Error::InvalidQuery)?,
        entity_id: row.get(2)?,
        suggested_action: row.get(3)?,
        reason: row.get(4)?,
        urgency: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl OpsDb {
    /// Queue a pending follow-up unless one already pends for the entity key.
    /// Returns `true` if a row was created.
    pub fn enqueue_pending(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        suggested_action: &str,
        reason: &str,
        urgency: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, String> {
        let id = format!("cq-{}", Uuid::new_v4());
        let inserted = self
            .conn_ref()
            .execute(
                "INSERT INTO communication_queue
                    (id, entity_type, entity_id, suggested_action, reason, urgency, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)
                 ON CONFLICT (entity_type, entity_id) WHERE status = 'pending' DO NOTHING",
                params![
                    id,
                    entity_type.as_str(),
                    entity_id,
                    suggested_action,
                    reason,
                    urgency,
                    now.to_rfc3339(),
                ],
            )
            .map_err(|e| format!("Failed to enqueue follow-up: {}", e))?;
        Ok(inserted > 0)
    }

    /// Pending items at or above an urgency floor, most urgent first,
    /// bounded by `limit`.
    pub fn pending_escalations(&self, min_urgency: u32, limit: usize) -> Result<Vec<QueueItem>, String> {
        let mut stmt = self
            .conn_ref()
            .prepare(
                "SELECT id, entity_type, entity_id, suggested_action, reason, urgency, status, created_at
                 FROM communication_queue
                 WHERE status = 'pending' AND urgency >= ?1
                 ORDER BY urgency DESC, created_at ASC, id
                 LIMIT ?2",
            )
            .map_err(|e| format!("Failed to prepare escalation query: {}", e))?;
        let rows = stmt
            .query_map(params![min_urgency, limit as i64], row_to_item)
            .map_err(|e| format!("Failed to query escalations: {}", e))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| format!("Failed to read queue row: {}", e))?);
        }
        Ok(out)
    }

    /// Count of all pending queue items.
    pub fn pending_queue_count(&self) -> Result<u32, String> {
        self.conn_ref()
            .query_row(
                "SELECT COUNT(*) FROM communication_queue WHERE status = 'pending'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| format!("Failed to count pending queue items: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;

    #[test]
    fn test_pending_dedup_per_entity() {
        let db = test_db();
        let now = Utc::now();

        assert!(db
            .enqueue_pending(EntityType::Store, "st-1", "Call owner", "critical risk", 95, now)
            .expect("first"));
        assert!(!db
            .enqueue_pending(EntityType::Store, "st-1", "Call owner again", "still critical", 99, now)
            .expect("duplicate suppressed"));
        assert!(db
            .enqueue_pending(EntityType::Invoice, "st-1", "Chase payment", "overdue", 95, now)
            .expect("same id, different entity type"));

        assert_eq!(db.pending_queue_count().expect("count"), 2);
    }

    #[test]
    fn test_escalations_ordered_and_bounded() {
        let db = test_db();
        let now = Utc::now();

        for (i, urgency) in [95u32, 72, 88, 40, 70].iter().enumerate() {
            db.enqueue_pending(
                EntityType::Store,
                &format!("st-{}", i),
                "Check in",
                "test",
                *urgency,
                now,
            )
            .expect("enqueue");
        }

        let top = db.pending_escalations(70, 3).expect("query");
        assert_eq!(top.len(), 3);
        let urgencies: Vec<u32> = top.iter().map(|i| i.urgency).collect();
        assert_eq!(urgencies, vec![95, 88, 72], "urgency 40 filtered, sorted desc");
    }
}
