//! Read side of the business ledger the detection steps and the briefing
//! builder consume: invoices, inventory, completed actions, KPI snapshots.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::{ActionsTaken, Invoice, InventoryItem, KpiSnapshot, OpsDb};

impl OpsDb {
    /// Unpaid invoices, oldest due date first.
    pub fn unpaid_invoices(&self) -> Result<Vec<Invoice>, String> {
        let mut stmt = self
            .conn_ref()
            .prepare(
                "SELECT id, store_id, amount, due_date, status
                 FROM invoices
                 WHERE status = 'unpaid'
                 ORDER BY due_date ASC, id",
            )
            .map_err(|e| format!("Failed to prepare invoice query: {}", e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Invoice {
                    id: row.get(0)?,
                    store_id: row.get(1)?,
                    amount: row.get(2)?,
                    due_date: row.get(3)?,
                    status: row.get(4)?,
                })
            })
            .map_err(|e| format!("Failed to query invoices: {}", e))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| format!("Failed to read invoice row: {}", e))?);
        }
        Ok(out)
    }

    /// All inventory rows. Threshold comparison happens in the step, where the
    /// reorder-point default lives.
    pub fn inventory_items(&self) -> Result<Vec<InventoryItem>, String> {
        let mut stmt = self
            .conn_ref()
            .prepare(
                "SELECT id, store_id, name, quantity, reorder_point
                 FROM inventory_items
                 ORDER BY id",
            )
            .map_err(|e| format!("Failed to prepare inventory query: {}", e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(InventoryItem {
                    id: row.get(0)?,
                    store_id: row.get(1)?,
                    name: row.get(2)?,
                    quantity: row.get(3)?,
                    reorder_point: row.get(4)?,
                })
            })
            .map_err(|e| format!("Failed to query inventory: {}", e))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| format!("Failed to read inventory row: {}", e))?);
        }
        Ok(out)
    }

    /// Bucketed counts of actions completed on the given day.
    pub fn actions_completed_on(&self, date: NaiveDate) -> Result<ActionsTaken, String> {
        let day = date.format("%Y-%m-%d").to_string();
        let mut stmt = self
            .conn_ref()
            .prepare(
                "SELECT category, COUNT(*)
                 FROM actions
                 WHERE status = 'completed'
                   AND completed_at IS NOT NULL
                   AND substr(completed_at, 1, 10) = ?1
                 GROUP BY category",
            )
            .map_err(|e| format!("Failed to prepare actions query: {}", e))?;
        let rows = stmt
            .query_map(params![day], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
            })
            .map_err(|e| format!("Failed to query completed actions: {}", e))?;

        let mut taken = ActionsTaken::default();
        for row in rows {
            let (category, count) = row.map_err(|e| format!("Failed to read action row: {}", e))?;
            match category.as_str() {
                "follow_up" => taken.follow_ups_sent = count,
                "collection" => taken.collections_logged = count,
                "restock" => taken.restocks_ordered = count,
                _ => {}
            }
            taken.total_completed += count;
        }
        Ok(taken)
    }

    /// Record a completed automation action (used by the cycles when a
    /// follow-up is queued, so the evening briefing can count it).
    pub fn record_completed_action(
        &self,
        title: &str,
        category: &str,
        now: DateTime<Utc>,
    ) -> Result<(), String> {
        let id = format!("ac-{}", Uuid::new_v4());
        let ts = now.to_rfc3339();
        self.conn_ref()
            .execute(
                "INSERT INTO actions (id, title, category, status, created_at, completed_at)
                 VALUES (?1, ?2, ?3, 'completed', ?4, ?4)",
                params![id, title, category, ts],
            )
            .map_err(|e| format!("Failed to record action: {}", e))?;
        Ok(())
    }

    /// Most recent KPI snapshot, if any.
    pub fn latest_kpi_snapshot(&self) -> Result<Option<KpiSnapshot>, String> {
        let mut stmt = self
            .conn_ref()
            .prepare(
                "SELECT snapshot_date, revenue, orders, active_stores
                 FROM kpi_snapshots
                 ORDER BY snapshot_date DESC, created_at DESC
                 LIMIT 1",
            )
            .map_err(|e| format!("Failed to prepare KPI query: {}", e))?;
        let mut rows = stmt
            .query_map([], |row| {
                Ok(KpiSnapshot {
                    snapshot_date: row.get(0)?,
                    revenue: row.get(1)?,
                    orders: row.get(2)?,
                    active_stores: row.get(3)?,
                })
            })
            .map_err(|e| format!("Failed to query KPI snapshots: {}", e))?;

        match rows.next() {
            Some(row) => Ok(Some(
                row.map_err(|e| format!("Failed to read KPI row: {}", e))?,
            )),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;

    #[test]
    fn test_unpaid_invoices_filter_and_order() {
        let db = test_db();
        db.conn_ref()
            .execute_batch(
                "INSERT INTO invoices (id, store_id, amount, due_date, status, created_at) VALUES
                 ('inv-1', 'st-1', 100.0, '2026-02-10', 'unpaid', '2026-01-01T00:00:00Z'),
                 ('inv-2', 'st-1', 500.0, '2026-01-20', 'unpaid', '2026-01-01T00:00:00Z'),
                 ('inv-3', 'st-2', 250.0, '2026-01-01', 'paid',   '2026-01-01T00:00:00Z');",
            )
            .expect("seed");

        let invoices = db.unpaid_invoices().expect("query");
        assert_eq!(invoices.len(), 2);
        assert_eq!(invoices[0].id, "inv-2", "oldest due date first");
    }

    #[test]
    fn test_actions_completed_on_buckets() {
        let db = test_db();
        db.conn_ref()
            .execute_batch(
                "INSERT INTO actions (id, title, category, status, created_at, completed_at) VALUES
                 ('a1', 'Chase inv-1',  'collection', 'completed', '2026-02-18T08:00:00Z', '2026-02-18T08:00:00Z'),
                 ('a2', 'Ping st-1',    'follow_up',  'completed', '2026-02-18T09:00:00Z', '2026-02-18T09:00:00Z'),
                 ('a3', 'Ping st-2',    'follow_up',  'completed', '2026-02-18T10:00:00Z', '2026-02-18T10:00:00Z'),
                 ('a4', 'Restock cola', 'restock',    'completed', '2026-02-17T10:00:00Z', '2026-02-17T10:00:00Z'),
                 ('a5', 'Open task',    'follow_up',  'pending',   '2026-02-18T10:00:00Z', NULL);",
            )
            .expect("seed");

        let day = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        let taken = db.actions_completed_on(day).expect("query");
        assert_eq!(taken.follow_ups_sent, 2);
        assert_eq!(taken.collections_logged, 1);
        assert_eq!(taken.restocks_ordered, 0, "yesterday's restock excluded");
        assert_eq!(taken.total_completed, 3);
    }

    #[test]
    fn test_latest_kpi_snapshot() {
        let db = test_db();
        assert!(db.latest_kpi_snapshot().expect("empty").is_none());

        db.conn_ref()
            .execute_batch(
                "INSERT INTO kpi_snapshots (id, snapshot_date, revenue, orders, active_stores, created_at) VALUES
                 ('k1', '2026-02-17', 1200.0, 40, 12, '2026-02-17T23:00:00Z'),
                 ('k2', '2026-02-18', 1500.0, 52, 13, '2026-02-18T23:00:00Z');",
            )
            .expect("seed");

        let snap = db.latest_kpi_snapshot().expect("query").expect("present");
        assert_eq!(snap.snapshot_date, "2026-02-18");
        assert_eq!(snap.revenue, Some(1500.0));
    }
}
