pub mod audit;
pub mod auth;
pub mod cart_lock;
pub mod commands;
pub mod config;
pub mod database;
pub mod errors;
pub mod logger;
pub mod models;
pub mod pricing;
pub mod store;
pub mod validation;

#[cfg(test)]
mod test_support;

use auth::session::SessionStore;
use cart_lock::CartLocks;
use std::path::Path;
use std::sync::Mutex;

use crate::errors::{AppError, AppResult};

/// Shared state handed to every command.
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub sessions: Mutex<SessionStore>,
    pub cart_locks: CartLocks,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool) -> Self {
        Self {
            db,
            sessions: Mutex::new(SessionStore::new()),
            cart_locks: CartLocks::from_config(),
        }
    }
}

/// Loads configuration (including `<data_dir>/.env`), starts the logger and opens the database under
/// `data_dir`.
pub async fn bootstrap(data_dir: &Path) -> AppResult<AppState> {
    // Values from <data_dir>/.env land in the environment before the config is read
    config::AppConfig::load_from_file(&data_dir.join(".env"));
    let config = config::init_config();
    config.validate().map_err(AppError::Validation)?;

    if let Err(e) = logger::init_global_logger(data_dir, &config.logging) {
        eprintln!("Warning: failed to initialize logger: {}", e);
    }

    log_info!("APP", "Pricing engine starting", serde_json::json!({
        "version": config.version,
        "environment": config.environment.as_str(),
        "data_dir": data_dir.to_string_lossy(),
    }));

    let pool = database::connection::init_db(data_dir).await.map_err(|e| {
        log_error!("DATABASE", "Failed to initialize database", e);
        e
    })?;

    Ok(AppState::new(pool))
}
