use sqlx::SqliteConnection;

use crate::errors::AppResult;
use crate::models::coupon::{Coupon, CreateCouponPayload};
use crate::models::discount::RuleStatus;

/// Lookup by code; codes are stored uppercase.
pub async fn find_by_code(conn: &mut SqliteConnection, code: &str) -> AppResult<Option<Coupon>> {
    let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = ?")
        .bind(code.trim().to_uppercase())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(coupon)
}

pub async fn find_by_id(conn: &mut SqliteConnection, coupon_id: i64) -> AppResult<Option<Coupon>> {
    let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE id = ?")
        .bind(coupon_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(coupon)
}

pub async fn insert(conn: &mut SqliteConnection, payload: &CreateCouponPayload) -> AppResult<i64> {
    let result = sqlx::query(
        "INSERT INTO coupons (code, name, discount_type, value, starts_at, ends_at, usage_limit)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(payload.code.trim().to_uppercase())
    .bind(payload.name.trim())
    .bind(payload.discount_type)
    .bind(payload.value)
    .bind(payload.starts_at)
    .bind(payload.ends_at)
    .bind(payload.usage_limit)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn set_status(conn: &mut SqliteConnection, coupon_id: i64, status: RuleStatus) -> AppResult<()> {
    sqlx::query("UPDATE coupons SET status = ? WHERE id = ?")
        .bind(status)
        .bind(coupon_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Counts one use unless the limit is already reached. Returns false when exhausted.
pub async fn increment_usage(conn: &mut SqliteConnection, coupon_id: i64) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE coupons SET usage_count = usage_count + 1
         WHERE id = ? AND (usage_limit IS NULL OR usage_count < usage_limit)",
    )
    .bind(coupon_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
