//! Deterministic recommendation and priority rules.
//!
//! A fixed if-chain of thresholds over the summary counts. No model calls,
//! no ranking — the narrative layer is where prose generation lives.

use super::BriefingSummary;

/// Threshold above which store risk suggests a bulk route visit.
const BULK_ROUTE_STORE_THRESHOLD: u32 = 10;

/// Threshold above which unpaid invoices suggest a collections push.
const COLLECTIONS_INVOICE_THRESHOLD: u32 = 5;

/// Threshold above which critical risks get escalated to the ops lead.
const ESCALATE_CRITICAL_THRESHOLD: u32 = 3;

/// Rule-generated recommendation strings, in rule order.
pub fn recommendations(summary: &BriefingSummary) -> Vec<String> {
    let mut recs = Vec::new();

    if summary.at_risk_stores > BULK_ROUTE_STORE_THRESHOLD {
        recs.push(format!(
            "{} stores at risk — plan a bulk route visit instead of one-off check-ins.",
            summary.at_risk_stores
        ));
    }
    if summary.unpaid_invoices > COLLECTIONS_INVOICE_THRESHOLD {
        recs.push(format!(
            "{} invoices overdue — run a collections push this week.",
            summary.unpaid_invoices
        ));
    }
    if summary.stockouts > 0 {
        recs.push(format!(
            "{} items fully out of stock — order emergency restocks before routine ones.",
            summary.stockouts
        ));
    }
    if summary.critical_risks > ESCALATE_CRITICAL_THRESHOLD {
        recs.push(format!(
            "{} critical risks open — escalate to the ops lead for triage.",
            summary.critical_risks
        ));
    }
    if summary.pending_escalations > 0 {
        recs.push(format!(
            "{} escalations waiting in the queue — work those before new outreach.",
            summary.pending_escalations
        ));
    }

    if recs.is_empty() {
        recs.push("Steady state — no thresholds tripped today.".to_string());
    }
    recs
}

/// Priority strings ordered by severity, capped at five.
pub fn top_priorities(summary: &BriefingSummary) -> Vec<String> {
    let mut priorities = Vec::new();

    if summary.critical_risks > 0 {
        priorities.push(format!(
            "Resolve {} critical risk{}",
            summary.critical_risks,
            plural(summary.critical_risks)
        ));
    }
    if summary.unpaid_invoices > 0 {
        priorities.push(format!(
            "Chase {} overdue invoice{}",
            summary.unpaid_invoices,
            plural(summary.unpaid_invoices)
        ));
    }
    if summary.stockouts > 0 {
        priorities.push(format!(
            "Restock {} stocked-out item{}",
            summary.stockouts,
            plural(summary.stockouts)
        ));
    } else if summary.low_stock_items > 0 {
        priorities.push(format!(
            "Reorder {} low-stock item{}",
            summary.low_stock_items,
            plural(summary.low_stock_items)
        ));
    }
    if summary.pending_escalations > 0 {
        priorities.push(format!(
            "Clear {} pending escalation{}",
            summary.pending_escalations,
            plural(summary.pending_escalations)
        ));
    }
    if summary.at_risk_stores > 0 {
        priorities.push(format!(
            "Check in on {} at-risk store{}",
            summary.at_risk_stores,
            plural(summary.at_risk_stores)
        ));
    }

    priorities.truncate(5);
    priorities
}

/// The evening checklist. Hardcoded, not derived from data.
pub fn tomorrow_plan() -> Vec<String> {
    vec![
        "Review overnight risk changes before the morning cycle".to_string(),
        "Work the escalation queue top-down by urgency".to_string(),
        "Confirm restock orders placed for low-stock items".to_string(),
        "Follow up on invoices promised for payment".to_string(),
        "Close out risks resolved during the day".to_string(),
    ]
}

fn plural(n: u32) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_day_yields_steady_state() {
        let recs = recommendations(&BriefingSummary::default());
        assert_eq!(recs.len(), 1);
        assert!(recs[0].contains("Steady state"));
        assert!(top_priorities(&BriefingSummary::default()).is_empty());
    }

    #[test]
    fn test_thresholds_are_strict_greater_than() {
        let at_edge = BriefingSummary {
            at_risk_stores: 10,
            unpaid_invoices: 5,
            critical_risks: 3,
            open_risks: 18,
            ..Default::default()
        };
        let recs = recommendations(&at_edge);
        assert_eq!(recs.len(), 1, "edge values trip nothing");

        let over = BriefingSummary {
            at_risk_stores: 11,
            unpaid_invoices: 6,
            critical_risks: 4,
            open_risks: 21,
            ..Default::default()
        };
        let recs = recommendations(&over);
        assert_eq!(recs.len(), 3);
        assert!(recs[0].contains("bulk route"));
        assert!(recs[1].contains("collections"));
        assert!(recs[2].contains("escalate"));
    }

    #[test]
    fn test_priorities_ordered_by_severity_and_capped() {
        let busy = BriefingSummary {
            at_risk_stores: 4,
            unpaid_invoices: 7,
            low_stock_items: 3,
            stockouts: 1,
            open_risks: 14,
            critical_risks: 2,
            pending_escalations: 6,
        };
        let priorities = top_priorities(&busy);
        assert_eq!(priorities.len(), 5);
        assert!(priorities[0].starts_with("Resolve 2 critical"));
        assert!(priorities[1].starts_with("Chase 7 overdue"));
        assert!(priorities[2].starts_with("Restock 1 stocked-out item"));
        assert!(priorities[3].starts_with("Clear 6 pending"));
        assert!(priorities[4].starts_with("Check in on 4"));
    }

    #[test]
    fn test_tomorrow_plan_is_five_items() {
        assert_eq!(tomorrow_plan().len(), 5);
    }
}
