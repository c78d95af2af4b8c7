//! Best-effort prose commentary for a briefing.
//!
//! Prefers the remote summarizer; any failure — no remote configured, HTTP
//! error, empty response — falls back to the deterministic local template.
//! This function never fails and never touches the briefing's priority list,
//! so the pipeline always produces displayable text.

use crate::db::KpiSnapshot;
use crate::remote::RemoteClient;

use super::{BriefingContent, BriefingKind};

/// Produce commentary for a built briefing. Infallible by contract.
pub async fn generate_commentary(
    remote: Option<&RemoteClient>,
    content: &BriefingContent,
    kpi: Option<&KpiSnapshot>,
) -> String {
    if let Some(client) = remote {
        let payload = serde_json::json!({
            "date": content.date,
            "type": content.kind.as_str(),
            "summary": content.summary,
            "actionsTaken": content.actions_taken,
            "topPriorities": content.top_priorities,
        });
        match client.summarize_briefing(&payload).await {
            Ok(summary) => return summary,
            Err(e) => {
                log::warn!("Remote summarizer unavailable, using template: {}", e);
            }
        }
    }

    fallback_commentary(content, kpi)
}

/// Deterministic template driven by the same counts the summarizer sees.
pub fn fallback_commentary(content: &BriefingContent, kpi: Option<&KpiSnapshot>) -> String {
    let s = &content.summary;
    let shift = match content.kind {
        BriefingKind::Morning => "Morning",
        BriefingKind::Evening => "Evening",
    };

    let mut text = format!(
        "{} briefing for {}: {} open risks ({} critical). \
         {} invoices overdue, {} items low on stock ({} fully out). \
         {} automated actions completed today.",
        shift,
        content.date,
        s.open_risks,
        s.critical_risks,
        s.unpaid_invoices,
        s.low_stock_items,
        s.stockouts,
        content.actions_taken.total_completed,
    );

    if let Some(snapshot) = kpi {
        if let Some(revenue) = snapshot.revenue {
            text.push_str(&format!(
                " Last KPI snapshot ({}): ${:.2} revenue.",
                snapshot.snapshot_date, revenue
            ));
        }
    }

    if let Some(first) = content.top_priorities.first() {
        text.push_str(&format!(" Top priority: {}.", first));
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::briefing::BriefingSummary;
    use crate::db::ActionsTaken;
    use crate::remote::{RemoteClient, RemoteConfig};

    fn sample_content() -> BriefingContent {
        BriefingContent {
            date: "2026-02-18".to_string(),
            kind: BriefingKind::Morning,
            summary: BriefingSummary {
                at_risk_stores: 3,
                unpaid_invoices: 2,
                low_stock_items: 1,
                stockouts: 1,
                open_risks: 6,
                critical_risks: 2,
                pending_escalations: 1,
            },
            actions_taken: ActionsTaken {
                follow_ups_sent: 4,
                total_completed: 5,
                ..Default::default()
            },
            escalations: Vec::new(),
            recommendations: Vec::new(),
            top_priorities: vec!["Resolve 2 critical risks".to_string()],
            tomorrow_plan: None,
            commentary: None,
        }
    }

    #[tokio::test]
    async fn test_no_remote_falls_back() {
        let content = sample_content();
        let priorities_before = content.top_priorities.clone();

        let text = generate_commentary(None, &content, None).await;
        assert!(!text.is_empty());
        assert!(text.contains("6 open risks"));
        assert_eq!(content.top_priorities, priorities_before);
    }

    #[tokio::test]
    async fn test_failing_remote_falls_back() {
        let client = RemoteClient::new(RemoteConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            service_token: "t".to_string(),
        })
        .expect("client");

        let content = sample_content();
        let text = generate_commentary(Some(&client), &content, None).await;
        assert!(!text.is_empty(), "fallback must produce text");
        assert!(text.starts_with("Morning briefing for 2026-02-18"));
    }

    #[test]
    fn test_fallback_mentions_priority_and_kpi() {
        let content = sample_content();
        let kpi = KpiSnapshot {
            snapshot_date: "2026-02-17".to_string(),
            revenue: Some(1234.5),
            orders: Some(40),
            active_stores: Some(12),
        };
        let text = fallback_commentary(&content, Some(&kpi));
        assert!(text.contains("Top priority: Resolve 2 critical risks."));
        assert!(text.contains("$1234.50 revenue"));
    }

    #[test]
    fn test_fallback_without_priorities() {
        let mut content = sample_content();
        content.top_priorities.clear();
        let text = fallback_commentary(&content, None);
        assert!(!text.contains("Top priority"));
        assert!(!text.is_empty());
    }
}
