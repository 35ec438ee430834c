use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

use super::migrations::run_migrations;
use crate::config::get_config;
use crate::errors::{AppError, AppResult};
use crate::log_info;

/// Open the SQLite database under `data_dir` and run migrations.
///
/// - WAL mode for concurrent reads/writes
/// - Connection pooling with configurable size
/// - Foreign keys enforcement
/// - Busy timeout for concurrent access
pub async fn init_db(data_dir: &Path) -> AppResult<SqlitePool> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| AppError::Internal(format!("Cannot create data dir: {}", e)))?;

    let config = get_config();
    let db_path = config.get_database_path(data_dir);
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(
            config.database.connect_timeout_secs,
        ))
        .idle_timeout(std::time::Duration::from_secs(
            config.database.idle_timeout_secs,
        ))
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    log_info!("DATABASE", "Connection pool initialized", serde_json::json!({
        "min": config.database.min_connections,
        "max": config.database.max_connections,
        "db": db_path.display().to_string(),
    }));

    Ok(pool)
}

/// Single-connection in-memory database with the full schema.
///
/// The connection is never recycled: closing it would drop the database.
pub async fn init_memory_db() -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Returns Ok(()) if the database is reachable
pub async fn health_check(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").fetch_one(pool).await?;
    Ok(())
}
