//! Risk scoring primitives.
//!
//! Every score-to-level derivation in the codebase goes through
//! [`RiskLevel::from_score`] — levels are never stored independently of a
//! fresh computation. The scoring formulas are pure functions so the cycle
//! steps stay testable without a database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity band derived from a 0–100 risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// critical ≥ 80, high ≥ 60, medium ≥ 40, else low.
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => RiskLevel::Critical,
            60..=79 => RiskLevel::High,
            40..=59 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "critical",
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(RiskLevel::Critical),
            "high" => Ok(RiskLevel::High),
            "medium" => Ok(RiskLevel::Medium),
            "low" => Ok(RiskLevel::Low),
            other => Err(format!("Unknown risk level: {}", other)),
        }
    }
}

/// Fixed urgency assigned to queue items promoted from critical risks.
pub const CRITICAL_FOLLOWUP_URGENCY: u32 = 95;

/// Default low-stock threshold when an item has no reorder point.
pub const DEFAULT_REORDER_POINT: i64 = 10;

/// Age-based rescore: `min(100, old + days_old * 2)`.
pub fn rescored(old_score: u32, days_old: i64) -> u32 {
    let bump = days_old.max(0).saturating_mul(2);
    (old_score as i64 + bump).min(100) as u32
}

/// Overdue-invoice score: `min(100, 40 + days_overdue * 3)`.
pub fn overdue_invoice_score(days_overdue: i64) -> u32 {
    (40 + days_overdue.max(0).saturating_mul(3)).min(100) as u32
}

/// Low-stock score: 100 on a full stockout, otherwise
/// `min(95, 60 + (threshold - quantity) * 5)`.
pub fn low_stock_score(quantity: i64, threshold: i64) -> u32 {
    if quantity == 0 {
        return 100;
    }
    (60 + (threshold - quantity).max(0).saturating_mul(5)).min(95) as u32
}

/// Whole elapsed days between two instants, floored, never negative.
pub fn whole_days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_days().max(0)
}
