use sqlx::SqliteConnection;

use crate::errors::AppResult;
use crate::models::points::{LoyaltyTier, PointsBalance, PointsTransaction, PointsTransactionKind};

pub async fn fetch_balance(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> AppResult<Option<PointsBalance>> {
    let balance = sqlx::query_as::<_, PointsBalance>(
        "SELECT customer_id, balance, total_earned, total_redeemed, updated_at
         FROM points_balances WHERE customer_id = ?",
    )
    .bind(customer_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(balance)
}

/// Balance row, created at zero when the customer has none yet.
pub async fn ensure_balance(conn: &mut SqliteConnection, customer_id: &str) -> AppResult<PointsBalance> {
    sqlx::query("INSERT OR IGNORE INTO points_balances (customer_id) VALUES (?)")
        .bind(customer_id)
        .execute(&mut *conn)
        .await?;

    let balance = sqlx::query_as::<_, PointsBalance>(
        "SELECT customer_id, balance, total_earned, total_redeemed, updated_at
         FROM points_balances WHERE customer_id = ?",
    )
    .bind(customer_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(balance)
}

pub async fn save_balance(conn: &mut SqliteConnection, balance: &PointsBalance) -> AppResult<()> {
    sqlx::query(
        "UPDATE points_balances
         SET balance = ?, total_earned = ?, total_redeemed = ?, updated_at = CURRENT_TIMESTAMP
         WHERE customer_id = ?",
    )
    .bind(balance.balance)
    .bind(balance.total_earned)
    .bind(balance.total_redeemed)
    .bind(&balance.customer_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub struct NewPointsTransaction<'a> {
    pub customer_id: &'a str,
    pub kind: PointsTransactionKind,
    /// Signed: positive credits, negative debits
    pub points: i64,
    pub balance_after: i64,
    pub reference_id: Option<&'a str>,
    pub description: &'a str,
    pub created_by: Option<&'a str>,
}

pub async fn insert_transaction(
    conn: &mut SqliteConnection,
    entry: &NewPointsTransaction<'_>,
) -> AppResult<i64> {
    let result = sqlx::query(
        "INSERT INTO points_transactions (
            customer_id, kind, points, balance_after, reference_id, description, created_by
        ) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.customer_id)
    .bind(entry.kind)
    .bind(entry.points)
    .bind(entry.balance_after)
    .bind(entry.reference_id)
    .bind(entry.description)
    .bind(entry.created_by)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn recent_transactions(
    conn: &mut SqliteConnection,
    customer_id: &str,
    limit: i64,
) -> AppResult<Vec<PointsTransaction>> {
    let rows = sqlx::query_as::<_, PointsTransaction>(
        "SELECT * FROM points_transactions WHERE customer_id = ? ORDER BY id DESC LIMIT ?",
    )
    .bind(customer_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn list_tiers(conn: &mut SqliteConnection) -> AppResult<Vec<LoyaltyTier>> {
    let tiers = sqlx::query_as::<_, LoyaltyTier>("SELECT * FROM loyalty_tiers ORDER BY min_points")
        .fetch_all(&mut *conn)
        .await?;
    Ok(tiers)
}

pub async fn insert_tier(
    conn: &mut SqliteConnection,
    name: &str,
    min_points: i64,
    points_multiplier: f64,
) -> AppResult<i64> {
    let result = sqlx::query(
        "INSERT INTO loyalty_tiers (name, min_points, points_multiplier) VALUES (?, ?, ?)",
    )
    .bind(name)
    .bind(min_points)
    .bind(points_multiplier)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}
