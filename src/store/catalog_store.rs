use sqlx::SqliteConnection;

use crate::errors::AppResult;
use crate::models::catalog::{CreatePricePayload, CreateVariantPayload, PriceEntry, Variant};

pub async fn fetch_variant(conn: &mut SqliteConnection, variant_id: i64) -> AppResult<Option<Variant>> {
    let variant = sqlx::query_as::<_, Variant>("SELECT id, product_id, title FROM product_variants WHERE id = ?")
        .bind(variant_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(variant)
}

/// Price list of a variant in one currency, cheapest tier last.
pub async fn list_prices(
    conn: &mut SqliteConnection,
    variant_id: i64,
    currency_code: &str,
) -> AppResult<Vec<PriceEntry>> {
    let prices = sqlx::query_as::<_, PriceEntry>(
        "SELECT * FROM prices
         WHERE variant_id = ? AND currency_code = ?
         ORDER BY COALESCE(min_quantity, 0), amount DESC",
    )
    .bind(variant_id)
    .bind(currency_code)
    .fetch_all(&mut *conn)
    .await?;
    Ok(prices)
}

pub async fn insert_variant(conn: &mut SqliteConnection, payload: &CreateVariantPayload) -> AppResult<i64> {
    let result = sqlx::query("INSERT INTO product_variants (product_id, title) VALUES (?, ?)")
        .bind(payload.product_id)
        .bind(&payload.title)
        .execute(&mut *conn)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_price(conn: &mut SqliteConnection, payload: &CreatePricePayload) -> AppResult<i64> {
    let result = sqlx::query(
        "INSERT INTO prices (variant_id, currency_code, amount, min_quantity, max_quantity, compare_at_amount)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(payload.variant_id)
    .bind(payload.currency_code.to_uppercase())
    .bind(payload.amount)
    .bind(payload.min_quantity)
    .bind(payload.max_quantity)
    .bind(payload.compare_at_amount)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}
