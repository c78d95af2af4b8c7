//! Process configuration, read once at startup from the environment.
//!
//! Everything has a sensible local default except the remote function host:
//! when `OPSPULSE_REMOTE_BASE_URL` is unset the service runs with no remote
//! client and every remote-dependent path takes its local fallback.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::remote::RemoteConfig;

const DEFAULT_BIND: &str = "127.0.0.1:8787";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPSPULSE_BIND is not a valid socket address: {0}")]
    BadBindAddr(String),

    #[error("OPSPULSE_REMOTE_BASE_URL is set but OPSPULSE_SERVICE_TOKEN is missing")]
    MissingServiceToken,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Override for the database location. `None` means the default
    /// `~/.opspulse/opspulse.db`.
    pub db_path: Option<PathBuf>,
    pub bind_addr: SocketAddr,
    pub remote: Option<RemoteConfig>,
}

impl Config {
    /// Read configuration from `OPSPULSE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = std::env::var("OPSPULSE_DB_PATH").ok().map(PathBuf::from);

        let bind_raw =
            std::env::var("OPSPULSE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw
            .parse()
            .map_err(|_| ConfigError::BadBindAddr(bind_raw))?;

        let remote = match std::env::var("OPSPULSE_REMOTE_BASE_URL") {
            Ok(base_url) if !base_url.trim().is_empty() => {
                let service_token = std::env::var("OPSPULSE_SERVICE_TOKEN")
                    .ok()
                    .filter(|t| !t.trim().is_empty())
                    .ok_or(ConfigError::MissingServiceToken)?;
                Some(RemoteConfig {
                    base_url,
                    service_token,
                })
            }
            _ => None,
        };

        Ok(Config {
            db_path,
            bind_addr,
            remote,
        })
    }
}
