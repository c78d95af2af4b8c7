//! HTTP surface: thin axum handlers over the cycle runner and briefing store.
//!
//! The store is a single SQLite connection behind an async mutex; handlers
//! hold the lock only for the duration of one operation. Cycle endpoints
//! return the runner's report as-is — partial failure is a 200 with
//! `success: false`, matching the audit row.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::briefing::{self, narrative, BriefingKind};
use crate::cycle::{CycleKind, CycleRunner};
use crate::db::OpsDb;
use crate::remote::RemoteClient;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<OpsDb>>,
    pub remote: Option<Arc<RemoteClient>>,
}

impl AppState {
    pub fn new(db: OpsDb, remote: Option<RemoteClient>) -> Self {
        AppState {
            db: Arc::new(Mutex::new(db)),
            remote: remote.map(Arc::new),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/cycles/{cycle}", post(run_cycle))
        .route("/v1/briefings/{kind}", post(generate_briefing))
        .route("/v1/briefings/latest", get(latest_briefings))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 400 with a JSON error body.
fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "success": false, "error": message })),
    )
        .into_response()
}

/// 500 with a JSON error body.
fn internal_error(message: String) -> Response {
    log::error!("{}", message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "success": false, "error": message })),
    )
        .into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn run_cycle(State(state): State<AppState>, Path(cycle): Path<String>) -> Response {
    let kind = match cycle.as_str() {
        "morning" => CycleKind::Morning,
        "midday" => CycleKind::Midday,
        other => return bad_request(format!("Unknown cycle: {}", other)),
    };

    let runner = CycleRunner::with_default_steps();
    let mut db = state.db.lock().await;
    let report = runner
        .run(&mut db, state.remote.as_deref(), kind, Utc::now())
        .await;
    Json(report).into_response()
}

async fn generate_briefing(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    let kind: BriefingKind = match kind.parse() {
        Ok(k) => k,
        Err(e) => return bad_request(e),
    };

    let now = Utc::now();
    let db = state.db.lock().await;

    let built = match briefing::build_briefing(&db, now.date_naive(), kind) {
        Ok(b) => b,
        Err(e) => return internal_error(format!("Failed to build briefing: {}", e)),
    };

    let commentary =
        narrative::generate_commentary(state.remote.as_deref(), &built.content, built.kpi.as_ref())
            .await;
    let mut content = built.content;
    content.commentary = Some(commentary);

    if let Err(e) = db.save_briefing(&content, now) {
        return internal_error(format!("Failed to save briefing: {}", e));
    }
    Json(content).into_response()
}

#[derive(Deserialize)]
struct LatestParams {
    date: Option<String>,
}

async fn latest_briefings(
    State(state): State<AppState>,
    Query(params): Query<LatestParams>,
) -> Response {
    let date = match params.date {
        Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => return bad_request(format!("Invalid date: {}", raw)),
        },
        None => Utc::now().date_naive(),
    };

    let db = state.db.lock().await;
    match db.latest_briefings(date) {
        Ok(list) => Json(serde_json::json!({
            "date": date.format("%Y-%m-%d").to_string(),
            "briefings": list,
        }))
        .into_response(),
        Err(e) => internal_error(format!("Failed to load briefings: {}", e)),
    }
}
