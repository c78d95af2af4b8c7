use opspulse::config::Config;
use opspulse::db::OpsDb;
use opspulse::remote::RemoteClient;
use opspulse::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;

    let db = match &config.db_path {
        Some(path) => OpsDb::open_at(path.clone())?,
        None => OpsDb::open()?,
    };

    let remote = match config.remote.clone() {
        Some(remote_config) => {
            log::info!("Remote functions enabled at {}", remote_config.base_url);
            Some(RemoteClient::new(remote_config)?)
        }
        None => {
            log::info!("No remote configured; running with local fallbacks only");
            None
        }
    };

    let app = server::router(AppState::new(db, remote));

    log::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
