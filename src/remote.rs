//! Client for the downstream operations functions.
//!
//! The cycles invoke three named remote functions over HTTP with a
//! service-role bearer token: `risk-scan`, `follow-up-engine`, and
//! `summarize-briefing`. Responses are parsed defensively — a non-2xx
//! status or an unexpected body is an error for the caller to log, never
//! a panic, and callers treat all of these as non-fatal to the cycle.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// A hung downstream call must not wedge a cycle.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error calling {function}: {source}")]
    Http {
        function: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{function} returned status {status}")]
    BadStatus {
        function: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("{function} returned an unusable body: {detail}")]
    BadBody {
        function: &'static str,
        detail: String,
    },
}

/// Connection settings for the remote function host.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub service_token: String,
}

pub struct RemoteClient {
    http: reqwest::Client,
    config: RemoteConfig,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    summary: Option<String>,
}

impl RemoteClient {
    pub fn new(config: RemoteConfig) -> Result<Self, String> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self { http, config })
    }

    fn function_url(&self, name: &str) -> String {
        format!("{}/functions/{}", self.config.base_url.trim_end_matches('/'), name)
    }

    async fn invoke(
        &self,
        function: &'static str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, RemoteError> {
        let response = self
            .http
            .post(self.function_url(function))
            .bearer_auth(&self.config.service_token)
            .json(body)
            .send()
            .await
            .map_err(|source| RemoteError::Http { function, source })?;

        if !response.status().is_success() {
            return Err(RemoteError::BadStatus {
                function,
                status: response.status(),
            });
        }
        Ok(response)
    }

    /// Kick off the remote risk scan. Fire-and-forget beyond the status check.
    pub async fn trigger_risk_scan(&self) -> Result<(), RemoteError> {
        self.invoke("risk-scan", &serde_json::json!({})).await?;
        Ok(())
    }

    /// Kick off the remote follow-up engine.
    pub async fn trigger_follow_up_engine(&self) -> Result<(), RemoteError> {
        self.invoke("follow-up-engine", &serde_json::json!({}))
            .await?;
        Ok(())
    }

    /// Ask the remote summarizer to narrate the briefing counts.
    /// An empty or missing `summary` field counts as failure.
    pub async fn summarize_briefing(
        &self,
        payload: &serde_json::Value,
    ) -> Result<String, RemoteError> {
        let function = "summarize-briefing";
        let response = self.invoke(function, payload).await?;

        let parsed: SummaryResponse =
            response.json().await.map_err(|e| RemoteError::BadBody {
                function,
                detail: e.to_string(),
            })?;

        match parsed.summary {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(RemoteError::BadBody {
                function,
                detail: "response had no summary text".to_string(),
            }),
        }
    }
}
