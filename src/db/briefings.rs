//! Briefing persistence: one document per (date, type), replaced on
//! re-generation rather than duplicated.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::OpsDb;
use crate::briefing::{BriefingContent, BriefingKind};

impl OpsDb {
    /// Upsert the briefing for its (date, type) key.
    pub fn save_briefing(&self, briefing: &BriefingContent, now: DateTime<Utc>) -> Result<(), String> {
        let id = format!("bf-{}", Uuid::new_v4());
        let content = serde_json::to_string(briefing)
            .map_err(|e| format!("Failed to serialize briefing: {}", e))?;

        self.conn_ref()
            .execute(
                "INSERT INTO briefings (id, briefing_date, briefing_type, content, generated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (briefing_date, briefing_type) DO UPDATE SET
                     content = excluded.content,
                     generated_at = excluded.generated_at",
                params![
                    id,
                    briefing.date,
                    briefing.kind.as_str(),
                    content,
                    now.to_rfc3339(),
                ],
            )
            .map_err(|e| format!("Failed to save briefing: {}", e))?;
        Ok(())
    }

    /// The stored briefing for a (date, type), if one was generated.
    pub fn get_briefing(
        &self,
        date: NaiveDate,
        kind: BriefingKind,
    ) -> Result<Option<BriefingContent>, String> {
        let day = date.format("%Y-%m-%d").to_string();
        let mut stmt = self
            .conn_ref()
            .prepare(
                "SELECT content FROM briefings
                 WHERE briefing_date = ?1 AND briefing_type = ?2",
            )
            .map_err(|e| format!("Failed to prepare briefing query: {}", e))?;
        let mut rows = stmt
            .query_map(params![day, kind.as_str()], |row| row.get::<_, String>(0))
            .map_err(|e| format!("Failed to query briefing: {}", e))?;

        match rows.next() {
            Some(row) => {
                let content = row.map_err(|e| format!("Failed to read briefing row: {}", e))?;
                let briefing = serde_json::from_str(&content)
                    .map_err(|e| format!("Failed to parse stored briefing: {}", e))?;
                Ok(Some(briefing))
            }
            None => Ok(None),
        }
    }

    /// Latest morning and evening briefings for a date, in that order.
    pub fn latest_briefings(&self, date: NaiveDate) -> Result<Vec<BriefingContent>, String> {
        let mut out = Vec::new();
        for kind in [BriefingKind::Morning, BriefingKind::Evening] {
            if let Some(b) = self.get_briefing(date, kind)? {
                out.push(b);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::briefing::BriefingSummary;
    use crate::db::test_utils::test_db;
    use crate::db::ActionsTaken;

    fn sample_briefing(date: &str, kind: BriefingKind) -> BriefingContent {
        BriefingContent {
            date: date.to_string(),
            kind,
            summary: BriefingSummary {
                at_risk_stores: 2,
                ..Default::default()
            },
            actions_taken: ActionsTaken::default(),
            escalations: Vec::new(),
            recommendations: vec!["Steady state.".to_string()],
            top_priorities: Vec::new(),
            tomorrow_plan: None,
            commentary: None,
        }
    }

    #[test]
    fn test_regeneration_replaces_not_duplicates() {
        let db = test_db();
        let now = Utc::now();
        let date = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();

        let mut first = sample_briefing("2026-02-18", BriefingKind::Morning);
        db.save_briefing(&first, now).expect("first save");

        first.summary.at_risk_stores = 7;
        db.save_briefing(&first, now).expect("re-save");

        let count: i32 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM briefings", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1, "upsert, not append");

        let stored = db
            .get_briefing(date, BriefingKind::Morning)
            .expect("query")
            .expect("present");
        assert_eq!(stored.summary.at_risk_stores, 7);
    }

    #[test]
    fn test_latest_briefings_pairs_by_type() {
        let db = test_db();
        let now = Utc::now();
        let date = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();

        db.save_briefing(&sample_briefing("2026-02-18", BriefingKind::Morning), now)
            .expect("save morning");
        let mut evening = sample_briefing("2026-02-18", BriefingKind::Evening);
        evening.tomorrow_plan = Some(vec!["x".to_string()]);
        db.save_briefing(&evening, now).expect("save evening");

        let latest = db.latest_briefings(date).expect("query");
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].kind, BriefingKind::Morning);
        assert_eq!(latest[1].kind, BriefingKind::Evening);
    }

    #[test]
    fn test_missing_briefing_is_none() {
        let db = test_db();
        let date = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        assert!(db
            .get_briefing(date, BriefingKind::Evening)
            .expect("query")
            .is_none());
    }
}
