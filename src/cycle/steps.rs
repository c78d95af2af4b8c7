//! Detection and maintenance steps.
//!
//! Each step is a pure-SQL-plus-Rust function over the store: it reads a
//! filtered view, computes a derived value, and writes back only when the
//! derived value differs (idempotent re-application) or when no open/pending
//! row exists for the entity key (duplicate suppression via the partial
//! unique indexes). Steps never call the network.

use chrono::{DateTime, NaiveTime, Utc};

use super::runner::StepContext;
use crate::db::{EntityType, OpsDb};
use crate::risk::{
    low_stock_score, overdue_invoice_score, rescored, whole_days_between,
    CRITICAL_FOLLOWUP_URGENCY, DEFAULT_REORDER_POINT,
};

/// Age open risk scores: `min(100, old + days_old * 2)`, anchored on
/// `last_scored_at` so re-running without elapsed time writes nothing.
/// Returns the number of rows updated.
pub fn rescore_stale_risks(db: &OpsDb, ctx: &StepContext) -> Result<u32, String> {
    let mut updated = 0u32;

    for insight in db.open_risks()? {
        let anchored = match DateTime::parse_from_rfc3339(&insight.last_scored_at) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                log::warn!(
                    "Skipping rescore of {}: bad last_scored_at {:?}: {}",
                    insight.id,
                    insight.last_scored_at,
                    e
                );
                continue;
            }
        };

        let days_old = whole_days_between(anchored, ctx.now);
        let new_score = rescored(insight.risk_score, days_old);
        if new_score == insight.risk_score {
            continue;
        }

        db.apply_rescore(&insight.id, new_score, ctx.now)?;
        updated += 1;
    }

    Ok(updated)
}

/// Raise a risk row for each unpaid invoice past its due date. Returns the
/// number of risk rows created.
pub fn detect_overdue_invoices(db: &OpsDb, ctx: &StepContext) -> Result<u32, String> {
    let mut created = 0u32;

    for invoice in db.unpaid_invoices()? {
        let due = match chrono::NaiveDate::parse_from_str(&invoice.due_date, "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                log::warn!(
                    "Skipping invoice {}: bad due_date {:?}: {}",
                    invoice.id,
                    invoice.due_date,
                    e
                );
                continue;
            }
        };
        let due_midnight = due
            .and_time(NaiveTime::MIN)
            .and_utc();

        let days_overdue = whole_days_between(due_midnight, ctx.now);
        if days_overdue <= 0 {
            continue;
        }

        let score = overdue_invoice_score(days_overdue);
        let reason = format!(
            "Invoice ${:.2} is {} day{} overdue",
            invoice.amount,
            days_overdue,
            if days_overdue == 1 { "" } else { "s" }
        );
        if db.insert_open_risk(
            EntityType::Invoice,
            &invoice.id,
            "overdue_invoice",
            score,
            &reason,
            ctx.now,
        )? {
            created += 1;
        }
    }

    Ok(created)
}

/// Raise a risk row for each inventory item below its reorder threshold.
/// Returns the number of risk rows created.
pub fn detect_low_stock(db: &OpsDb, ctx: &StepContext) -> Result<u32, String> {
    let mut created = 0u32;

    for item in db.inventory_items()? {
        let threshold = item.reorder_point.unwrap_or(DEFAULT_REORDER_POINT);
        if item.quantity >= threshold {
            continue;
        }

        let score = low_stock_score(item.quantity, threshold);
        let reason = if item.quantity == 0 {
            format!("{} is out of stock", item.name)
        } else {
            format!(
                "{} at {} units, below reorder point {}",
                item.name, item.quantity, threshold
            )
        };
        if db.insert_open_risk(
            EntityType::Inventory,
            &item.id,
            "low_stock",
            score,
            &reason,
            ctx.now,
        )? {
            created += 1;
        }
    }

    Ok(created)
}

/// Queue a pending follow-up (fixed urgency 95) for every open critical risk
/// that doesn't already have one. Each enqueued item is also recorded as a
/// completed automation action so the day's briefing can count it.
/// Returns the number of queue items created.
pub fn queue_critical_followups(db: &OpsDb, ctx: &StepContext) -> Result<u32, String> {
    let mut created = 0u32;

    for insight in db.open_critical_risks()? {
        let action = format!(
            "Contact {} {} about {}",
            insight.entity_type.as_str(),
            insight.entity_id,
            insight.risk_type
        );
        let reason = insight
            .reason
            .clone()
            .unwrap_or_else(|| format!("Risk score {}", insight.risk_score));

        if db.enqueue_pending(
            insight.entity_type,
            &insight.entity_id,
            &action,
            &reason,
            CRITICAL_FOLLOWUP_URGENCY,
            ctx.now,
        )? {
            db.record_completed_action(
                &format!(
                    "Queued follow-up for {} {}",
                    insight.entity_type.as_str(),
                    insight.entity_id
                ),
                "follow_up",
                ctx.now,
            )?;
            created += 1;
        }
    }

    Ok(created)
}
