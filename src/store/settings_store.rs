use sqlx::SqliteConnection;
use std::collections::HashMap;

use crate::config::get_config;
use crate::errors::AppResult;
use crate::models::points::PointsSettings;

/// Convert boolean to database string ("1" or "0")
#[inline]
fn bool_to_db(b: bool) -> &'static str {
    if b { "1" } else { "0" }
}

pub async fn load_all(conn: &mut SqliteConnection) -> AppResult<HashMap<String, String>> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().collect())
}

/// `points.*` settings; absent or unparsable keys fall back to the configured defaults.
pub async fn load_points_settings(conn: &mut SqliteConnection) -> AppResult<PointsSettings> {
    let map = load_all(conn).await?;
    let defaults = &get_config().loyalty;

    Ok(PointsSettings {
        is_enabled: map
            .get("points.is_enabled")
            .map(|v| v == "1")
            .unwrap_or(defaults.enabled),
        earn_type: map
            .get("points.earn_type")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.earn_type),
        earn_rate: map
            .get("points.earn_rate")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.earn_rate),
        redemption_rate: map
            .get("points.redemption_rate")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.redemption_rate),
        min_redeem: map
            .get("points.min_redeem")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.min_redeem_points),
        max_redeem: map
            .get("points.max_redeem")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_redeem_points),
    })
}

pub async fn save_points_settings(conn: &mut SqliteConnection, settings: &PointsSettings) -> AppResult<()> {
    let kvs = vec![
        ("points.is_enabled", bool_to_db(settings.is_enabled).to_string()),
        ("points.earn_type", settings.earn_type.as_str().to_string()),
        ("points.earn_rate", settings.earn_rate.to_string()),
        ("points.redemption_rate", settings.redemption_rate.to_string()),
        ("points.min_redeem", settings.min_redeem.to_string()),
        ("points.max_redeem", settings.max_redeem.to_string()),
    ];

    for (k, v) in kvs {
        sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = ?")
            .bind(k)
            .bind(&v)
            .bind(&v)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
