//! Daily briefing generation.
//!
//! `build_briefing` is a deterministic, side-effect-free aggregation of the
//! day's risk/action/escalation state: identical underlying data always
//! produces an identical document. Prose commentary is layered on separately
//! by `narrative` (best-effort, never fatal), and the recommendation strings
//! come from the fixed rule chain in `rules` — the two are deliberately kept
//! apart.

pub mod narrative;
pub mod rules;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{ActionsTaken, EntityType, KpiSnapshot, OpsDb, QueueItem};
use crate::risk::RiskLevel;

/// Escalations surface only at or above this urgency.
pub const ESCALATION_URGENCY_FLOOR: u32 = 70;

/// Bound on the escalation list in a briefing.
pub const ESCALATION_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BriefingKind {
    Morning,
    Evening,
}

impl BriefingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BriefingKind::Morning => "morning",
            BriefingKind::Evening => "evening",
        }
    }
}

impl std::str::FromStr for BriefingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(BriefingKind::Morning),
            "evening" => Ok(BriefingKind::Evening),
            other => Err(format!("Unknown briefing type: {}", other)),
        }
    }
}

/// Fixed count buckets reduced from the open risk set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefingSummary {
    pub at_risk_stores: u32,
    pub unpaid_invoices: u32,
    pub low_stock_items: u32,
    pub stockouts: u32,
    pub open_risks: u32,
    pub critical_risks: u32,
    pub pending_escalations: u32,
}

/// The per-day, per-shift briefing document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefingContent {
    pub date: String,
    #[serde(rename = "type")]
    pub kind: BriefingKind,
    pub summary: BriefingSummary,
    pub actions_taken: ActionsTaken,
    pub escalations: Vec<QueueItem>,
    pub recommendations: Vec<String>,
    pub top_priorities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tomorrow_plan: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commentary: Option<String>,
}

/// Everything `build_briefing` read, for callers that also want the KPI
/// context (the narrative layer feeds it into the fallback template).
#[derive(Debug, Clone)]
pub struct BuiltBriefing {
    pub content: BriefingContent,
    pub kpi: Option<KpiSnapshot>,
}

/// Aggregate the day's state into a briefing document.
///
/// Four reads: open risks, the day's completed actions, top pending
/// escalations, and the latest KPI snapshot. No writes, no randomness.
pub fn build_briefing(db: &OpsDb, date: NaiveDate, kind: BriefingKind) -> Result<BuiltBriefing, String> {
    let open_risks = db.open_risks()?;
    let actions_taken = db.actions_completed_on(date)?;
    let escalations = db.pending_escalations(ESCALATION_URGENCY_FLOOR, ESCALATION_LIMIT)?;
    let kpi = db.latest_kpi_snapshot()?;

    let mut summary = BriefingSummary {
        open_risks: open_risks.len() as u32,
        pending_escalations: escalations.len() as u32,
        ..Default::default()
    };
    for risk in &open_risks {
        match risk.entity_type {
            EntityType::Store => summary.at_risk_stores += 1,
            EntityType::Invoice => summary.unpaid_invoices += 1,
            EntityType::Inventory => {
                summary.low_stock_items += 1;
                if risk.risk_type == "low_stock" && risk.risk_score == 100 {
                    summary.stockouts += 1;
                }
            }
            EntityType::Driver | EntityType::Ambassador => {}
        }
        if risk.risk_level == RiskLevel::Critical {
            summary.critical_risks += 1;
        }
    }

    let recommendations = rules::recommendations(&summary);
    let top_priorities = rules::top_priorities(&summary);
    let tomorrow_plan = match kind {
        BriefingKind::Evening => Some(rules::tomorrow_plan()),
        BriefingKind::Morning => None,
    };

    Ok(BuiltBriefing {
        content: BriefingContent {
            date: date.format("%Y-%m-%d").to_string(),
            kind,
            summary,
            actions_taken,
            escalations,
            recommendations,
            top_priorities,
            tomorrow_plan,
            commentary: None,
        },
        kpi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use chrono::Utc;

    fn seed(db: &OpsDb) {
        let now = Utc::now();
        db.insert_open_risk(EntityType::Store, "st-1", "churn", 85, "silent 14d", now)
            .expect("risk");
        db.insert_open_risk(EntityType::Invoice, "inv-1", "overdue_invoice", 70, "10d", now)
            .expect("risk");
        db.insert_open_risk(EntityType::Inventory, "it-1", "low_stock", 100, "stockout", now)
            .expect("risk");
        db.enqueue_pending(EntityType::Store, "st-1", "Call owner", "critical", 95, now)
            .expect("queue");
        db.enqueue_pending(EntityType::Store, "st-2", "Check in", "drifting", 40, now)
            .expect("queue");
        db.record_completed_action("Chased inv-9", "collection", now)
            .expect("action");
    }

    #[test]
    fn test_summary_buckets_by_entity_type() {
        let db = test_db();
        seed(&db);
        let today = Utc::now().date_naive();

        let built = build_briefing(&db, today, BriefingKind::Morning).expect("build");
        let s = &built.content.summary;
        assert_eq!(s.open_risks, 3);
        assert_eq!(s.at_risk_stores, 1);
        assert_eq!(s.unpaid_invoices, 1);
        assert_eq!(s.low_stock_items, 1);
        assert_eq!(s.stockouts, 1);
        assert_eq!(s.critical_risks, 2, "85-store and 100-stockout");
        assert_eq!(s.pending_escalations, 1, "urgency 40 stays below the floor");
        assert_eq!(built.content.actions_taken.collections_logged, 1);
    }

    #[test]
    fn test_determinism_for_identical_data() {
        let db = test_db();
        seed(&db);
        let today = Utc::now().date_naive();

        let a = build_briefing(&db, today, BriefingKind::Morning).expect("first");
        let b = build_briefing(&db, today, BriefingKind::Morning).expect("second");
        assert_eq!(a.content.summary, b.content.summary);
        assert_eq!(a.content.actions_taken, b.content.actions_taken);
        assert_eq!(
            serde_json::to_string(&a.content.escalations).unwrap(),
            serde_json::to_string(&b.content.escalations).unwrap()
        );
        assert_eq!(a.content.recommendations, b.content.recommendations);
        assert_eq!(a.content.top_priorities, b.content.top_priorities);
    }

    #[test]
    fn test_tomorrow_plan_evening_only() {
        let db = test_db();
        let today = Utc::now().date_naive();

        let morning = build_briefing(&db, today, BriefingKind::Morning).expect("morning");
        assert!(morning.content.tomorrow_plan.is_none());

        let evening = build_briefing(&db, today, BriefingKind::Evening).expect("evening");
        let plan = evening.content.tomorrow_plan.expect("plan present");
        assert_eq!(plan.len(), 5, "fixed five-item checklist");
    }

    #[test]
    fn test_serialized_shape_uses_type_field() {
        let db = test_db();
        let today = Utc::now().date_naive();
        let built = build_briefing(&db, today, BriefingKind::Morning).expect("build");

        let json = serde_json::to_value(&built.content).expect("serialize");
        assert_eq!(json["type"], "morning");
        assert!(json.get("tomorrowPlan").is_none(), "absent field omitted");
        assert!(json["summary"].get("atRiskStores").is_some());
    }
}
