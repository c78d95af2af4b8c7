//! Cycle runner: a registry of steps, per-step failure isolation, and an
//! always-written audit row.
//!
//! Each registered step runs inside its own transaction with one bounded
//! retry. A step failure is appended to the run's error list and logged;
//! later steps still run — the run favors "best effort, always produce an
//! audit trail" over all-or-nothing semantics, and that is a deliberate
//! policy, not an accident of error plumbing.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::briefing::{self, narrative, BriefingKind};
use crate::db::OpsDb;
use crate::remote::RemoteClient;

use super::steps;

/// Transaction attempts per step before the step is recorded as failed.
const MAX_STEP_ATTEMPTS: u32 = 2;

/// Which scheduled shift is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    Morning,
    Midday,
}

impl CycleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleKind::Morning => "morning",
            CycleKind::Midday => "midday",
        }
    }

    /// Settings key gating this cycle.
    fn enabled_key(&self) -> &'static str {
        match self {
            CycleKind::Morning => "morning_enabled",
            CycleKind::Midday => "midday_enabled",
        }
    }
}

/// Context passed to each step. Carrying the clock explicitly keeps the
/// steps deterministic under test.
pub struct StepContext {
    pub now: DateTime<Utc>,
}

type StepFn = fn(&OpsDb, &StepContext) -> Result<u32, String>;

struct StepEntry {
    name: &'static str,
    /// Counter key in the results blob (camelCase, matches the audit shape).
    counter: &'static str,
    cycles: &'static [CycleKind],
    run: StepFn,
}

/// Outcome of one cycle invocation, also the HTTP response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub success: bool,
    pub cycle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub duration_ms: u64,
    pub results: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl CycleReport {
    fn skipped(kind: CycleKind, reason: &str) -> Self {
        CycleReport {
            success: true,
            cycle: kind.as_str().to_string(),
            skipped: Some(true),
            reason: Some(reason.to_string()),
            duration_ms: 0,
            results: serde_json::json!({}),
            errors: None,
        }
    }
}

pub struct CycleRunner {
    steps: Vec<StepEntry>,
}

impl CycleRunner {
    /// Build a runner with the four standard steps registered.
    pub fn with_default_steps() -> Self {
        const BOTH: &[CycleKind] = &[CycleKind::Morning, CycleKind::Midday];
        CycleRunner {
            steps: vec![
                StepEntry {
                    name: "rescore_stale_risks",
                    counter: "risksRescored",
                    cycles: BOTH,
                    run: steps::rescore_stale_risks,
                },
                StepEntry {
                    name: "detect_overdue_invoices",
                    counter: "invoiceRisksCreated",
                    cycles: BOTH,
                    run: steps::detect_overdue_invoices,
                },
                StepEntry {
                    name: "detect_low_stock",
                    counter: "stockRisksCreated",
                    cycles: BOTH,
                    run: steps::detect_low_stock,
                },
                StepEntry {
                    name: "queue_critical_followups",
                    counter: "queueItemsCreated",
                    cycles: BOTH,
                    run: steps::queue_critical_followups,
                },
            ],
        }
    }

    /// Run one cycle end to end: gate check, remote pre-step, registry steps,
    /// briefing/follow-up post-step, audit row.
    pub async fn run(
        &self,
        db: &mut OpsDb,
        remote: Option<&RemoteClient>,
        kind: CycleKind,
        now: DateTime<Utc>,
    ) -> CycleReport {
        // Gate read once at invocation start; missing key means enabled.
        match db.get_setting(kind.enabled_key()) {
            Ok(Some(v)) if v == "false" => {
                log::info!("{} cycle disabled via settings, skipping", kind.as_str());
                return CycleReport::skipped(kind, &format!("{} is false", kind.enabled_key()));
            }
            Ok(_) => {}
            Err(e) => {
                // An unreadable gate is a step-grade failure, not a skip.
                log::warn!("Failed to read cycle gate, proceeding: {}", e);
            }
        }

        let started = Instant::now();
        let mut errors: Vec<String> = Vec::new();
        let mut results = serde_json::Map::new();

        // Morning pre-step: remote risk scan (non-fatal).
        if kind == CycleKind::Morning {
            let triggered = self
                .run_remote(remote, "risk-scan", &mut errors, |c| c.trigger_risk_scan())
                .await;
            results.insert("riskScanTriggered".to_string(), triggered.into());
        }

        // Registry steps, in registration order.
        for entry in self.steps.iter().filter(|s| s.cycles.contains(&kind)) {
            match run_step_with_retry(db, entry, now) {
                Ok(count) => {
                    results.insert(entry.counter.to_string(), count.into());
                }
                Err(e) => {
                    let msg = format!("step {} failed: {}", entry.name, e);
                    log::error!("{}", msg);
                    errors.push(msg);
                    results.insert(entry.counter.to_string(), 0.into());
                }
            }
        }

        // Post-steps.
        match kind {
            CycleKind::Morning => {
                let saved = match self.generate_and_save_briefing(db, remote, now).await {
                    Ok(()) => true,
                    Err(e) => {
                        let msg = format!("briefing generation failed: {}", e);
                        log::error!("{}", msg);
                        errors.push(msg);
                        false
                    }
                };
                results.insert("briefingSaved".to_string(), saved.into());
            }
            CycleKind::Midday => {
                let triggered = self
                    .run_remote(remote, "follow-up-engine", &mut errors, |c| {
                        c.trigger_follow_up_engine()
                    })
                    .await;
                results.insert("followUpTriggered".to_string(), triggered.into());
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        let success = errors.is_empty();
        let results = serde_json::Value::Object(results);
        let notes = format!("completed in {}ms", duration_ms);

        // The audit row is written no matter what happened above. If even
        // this fails we log it and still return the report.
        if let Err(e) = db.append_ops_log(kind.as_str(), &results, success, &errors, &notes, now) {
            log::error!("Failed to write ops log for {} cycle: {}", kind.as_str(), e);
        }

        log::info!(
            "{} cycle finished in {}ms (success: {}, errors: {})",
            kind.as_str(),
            duration_ms,
            success,
            errors.len()
        );

        CycleReport {
            success,
            cycle: kind.as_str().to_string(),
            skipped: None,
            reason: None,
            duration_ms,
            results,
            errors: if errors.is_empty() { None } else { Some(errors) },
        }
    }

    /// Invoke a remote function, treating absence of a configured remote as a
    /// quiet no-op and any failure as a logged, non-fatal error.
    async fn run_remote<'c, F, Fut>(
        &self,
        remote: Option<&'c RemoteClient>,
        label: &str,
        errors: &mut Vec<String>,
        call: F,
    ) -> bool
    where
        F: FnOnce(&'c RemoteClient) -> Fut,
        Fut: std::future::Future<Output = Result<(), crate::remote::RemoteError>>,
    {
        let Some(client) = remote else {
            log::info!("No remote configured, skipping {}", label);
            return false;
        };
        match call(client).await {
            Ok(()) => true,
            Err(e) => {
                let msg = format!("remote {} failed: {}", label, e);
                log::warn!("{}", msg);
                errors.push(msg);
                false
            }
        }
    }

    /// Build today's morning briefing, attach commentary, and upsert it.
    async fn generate_and_save_briefing(
        &self,
        db: &mut OpsDb,
        remote: Option<&RemoteClient>,
        now: DateTime<Utc>,
    ) -> Result<(), String> {
        let date = now.date_naive();
        let built = briefing::build_briefing(db, date, BriefingKind::Morning)?;
        let commentary =
            narrative::generate_commentary(remote, &built.content, built.kpi.as_ref()).await;

        let mut content = built.content;
        content.commentary = Some(commentary);
        db.save_briefing(&content, now)
    }
}

fn run_step_with_retry(db: &OpsDb, entry: &StepEntry, now: DateTime<Utc>) -> Result<u32, String> {
    let ctx = StepContext { now };
    let mut last_err = String::new();
    for attempt in 1..=MAX_STEP_ATTEMPTS {
        match db.with_transaction(|db| (entry.run)(db, &ctx)) {
            Ok(count) => return Ok(count),
            Err(e) => {
                log::warn!(
                    "step {} attempt {}/{} failed: {}",
                    entry.name,
                    attempt,
                    MAX_STEP_ATTEMPTS,
                    e
                );
                last_err = e;
            }
        }
    }
    Err(last_err)
}
