use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use moka::future::Cache;
use sea_orm::Database;
use serde::Deserialize;
use tracing::{debug, info};

use crate::schemas::AppState;
use crate::subscribers::SubscriberRegistry;

/// Resolved application configuration.
///
/// Values are layered: built-in defaults, then an optional `userhub`
/// config file in the working directory, then `USERHUB_*` environment
/// variables. `DATABASE_URL` and `BIND_ADDRESS` are honored as plain
/// environment variables on top, since deployments commonly set those.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Location unauthenticated callers are redirected to
    pub login_url: String,
    /// Optional manifest of event subscribers loaded at startup
    pub subscribers_file: PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut cfg: AppConfig = config::Config::builder()
            .set_default("database_url", "sqlite://userhub.db")?
            .set_default("bind_address", "0.0.0.0:3000")?
            .set_default("login_url", "/accounts/login/")?
            .set_default("subscribers_file", "subscribers.yaml")?
            .add_source(config::File::with_name("userhub").required(false))
            .add_source(config::Environment::with_prefix("USERHUB"))
            .build()?
            .try_deserialize()?;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            cfg.database_url = url;
        }
        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            cfg.bind_address = addr;
        }

        Ok(cfg)
    }
}

/// Sessions expire after a week of inactivity.
const SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Initialize application state: database, session and notice stores,
/// and the optional subscriber registry.
pub async fn initialize_app_state(config: AppConfig) -> Result<AppState> {
    info!("Connecting to database: {}", config.database_url);
    let db = Database::connect(&config.database_url).await?;

    // Load event subscribers. A missing manifest means no subscribers;
    // any other failure aborts startup.
    let subscribers = SubscriberRegistry::load_optional(&config.subscribers_file)?;
    if subscribers.is_empty() {
        debug!(
            "no subscribers registered from {}",
            config.subscribers_file.display()
        );
    } else {
        info!(
            "loaded {} event subscriber(s) from {}",
            subscribers.len(),
            config.subscribers_file.display()
        );
    }

    let sessions = Cache::builder()
        .max_capacity(10_000)
        .time_to_idle(SESSION_TTL)
        .build();

    let notices = Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(24 * 60 * 60))
        .build();

    Ok(AppState {
        db,
        config,
        sessions,
        notices,
        subscribers: Arc::new(subscribers),
    })
}
