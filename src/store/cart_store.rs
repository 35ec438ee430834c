use sqlx::SqliteConnection;

use crate::errors::{AppError, AppResult};
use crate::models::cart::{
    Cart, CartRow, CartStatus, LineItem, LineItemRow, PointsRedemption, PricingReason,
};
use crate::models::discount::{AppliedDiscount, CartDiscountRow, DiscountKind};

const LINE_ITEM_COLUMNS: &str = "id, cart_id, variant_id, product_id, title, quantity, unit_price,
    pricing_kind, pwp_rule_id, bulk_min_quantity, bulk_tier_price, original_price";

pub async fn insert_cart(
    conn: &mut SqliteConnection,
    cart_id: &str,
    customer_id: Option<&str>,
    currency_code: &str,
) -> AppResult<()> {
    sqlx::query("INSERT INTO carts (id, customer_id, currency_code) VALUES (?, ?, ?)")
        .bind(cart_id)
        .bind(customer_id)
        .bind(currency_code)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn fetch_cart_row(conn: &mut SqliteConnection, cart_id: &str) -> AppResult<Option<CartRow>> {
    let row = sqlx::query_as::<_, CartRow>(
        "SELECT id, customer_id, currency_code, status, points_redeemed, points_discount,
                created_at, updated_at
         FROM carts WHERE id = ?",
    )
    .bind(cart_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn fetch_items(conn: &mut SqliteConnection, cart_id: &str) -> AppResult<Vec<LineItem>> {
    let rows = sqlx::query_as::<_, LineItemRow>(&format!(
        "SELECT {} FROM line_items WHERE cart_id = ? ORDER BY rowid",
        LINE_ITEM_COLUMNS
    ))
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(LineItem::try_from).collect()
}

pub async fn fetch_discounts(
    conn: &mut SqliteConnection,
    cart_id: &str,
) -> AppResult<Vec<AppliedDiscount>> {
    let rows = sqlx::query_as::<_, CartDiscountRow>(
        "SELECT * FROM cart_discounts WHERE cart_id = ? ORDER BY id",
    )
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(AppliedDiscount::try_from).collect()
}

/// Cart with items and applied discounts. Missing cart is `NotFound`.
pub async fn load_cart(conn: &mut SqliteConnection, cart_id: &str) -> AppResult<Cart> {
    let row = fetch_cart_row(conn, cart_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cart {}", cart_id)))?;
    let items = fetch_items(conn, cart_id).await?;
    let discounts = fetch_discounts(conn, cart_id).await?;
    Ok(Cart::from_parts(row, items, discounts))
}

pub struct NewLineItem<'a> {
    pub cart_id: &'a str,
    pub variant_id: i64,
    pub product_id: i64,
    pub title: &'a str,
    pub quantity: i64,
    pub unit_price: i64,
    pub pricing: PricingReason,
}

pub async fn insert_item(conn: &mut SqliteConnection, item: &NewLineItem<'_>) -> AppResult<String> {
    let item_id = uuid::Uuid::new_v4().to_string();
    let cols = item.pricing.columns();

    sqlx::query(
        "INSERT INTO line_items (
            id, cart_id, variant_id, product_id, title, quantity, unit_price,
            pricing_kind, pwp_rule_id, bulk_min_quantity, bulk_tier_price, original_price
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&item_id)
    .bind(item.cart_id)
    .bind(item.variant_id)
    .bind(item.product_id)
    .bind(item.title)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(cols.kind)
    .bind(cols.pwp_rule_id)
    .bind(cols.bulk_min_quantity)
    .bind(cols.bulk_tier_price)
    .bind(cols.original_price)
    .execute(&mut *conn)
    .await?;

    Ok(item_id)
}

pub async fn update_item_quantity(
    conn: &mut SqliteConnection,
    item_id: &str,
    quantity: i64,
) -> AppResult<()> {
    sqlx::query("UPDATE line_items SET quantity = ? WHERE id = ?")
        .bind(quantity)
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Rewrites the price and every pricing column, clearing stale ones.
pub async fn update_item_pricing(
    conn: &mut SqliteConnection,
    item_id: &str,
    unit_price: i64,
    pricing: &PricingReason,
) -> AppResult<()> {
    let cols = pricing.columns();
    sqlx::query(
        "UPDATE line_items SET
            unit_price = ?, pricing_kind = ?, pwp_rule_id = ?,
            bulk_min_quantity = ?, bulk_tier_price = ?, original_price = ?
         WHERE id = ?",
    )
    .bind(unit_price)
    .bind(cols.kind)
    .bind(cols.pwp_rule_id)
    .bind(cols.bulk_min_quantity)
    .bind(cols.bulk_tier_price)
    .bind(cols.original_price)
    .bind(item_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete_item(conn: &mut SqliteConnection, item_id: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM line_items WHERE id = ?")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert_discount(
    conn: &mut SqliteConnection,
    cart_id: &str,
    discount: &AppliedDiscount,
) -> AppResult<()> {
    let code = match discount {
        AppliedDiscount::Coupon(c) => Some(c.code.as_str()),
        AppliedDiscount::MembershipPromo(_) => None,
    };

    sqlx::query(
        "INSERT INTO cart_discounts (
            cart_id, kind, adjustment_code, source_id, code, name,
            discount_type, value, amount, currency_code
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(cart_id)
    .bind(discount.kind())
    .bind(discount.adjustment_code())
    .bind(discount.source_id())
    .bind(code)
    .bind(discount.name())
    .bind(discount.discount_type())
    .bind(discount.value())
    .bind(discount.amount())
    .bind(discount.currency_code())
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        let duplicate = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
        if duplicate {
            let what = match discount.kind() {
                DiscountKind::Coupon => "coupon",
                DiscountKind::MembershipPromo => "membership promo",
            };
            AppError::Validation(format!("Cart {} already has a {} applied", cart_id, what))
        } else {
            AppError::Database(e)
        }
    })?;
    Ok(())
}

/// Deletes one discount row by adjustment code. Returns whether a row matched.
pub async fn delete_discount(
    conn: &mut SqliteConnection,
    cart_id: &str,
    kind: DiscountKind,
    adjustment_code: &str,
) -> AppResult<bool> {
    let result = sqlx::query(
        "DELETE FROM cart_discounts WHERE cart_id = ? AND kind = ? AND adjustment_code = ?",
    )
    .bind(cart_id)
    .bind(kind)
    .bind(adjustment_code)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_points_redemption(
    conn: &mut SqliteConnection,
    cart_id: &str,
    redemption: Option<PointsRedemption>,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE carts SET points_redeemed = ?, points_discount = ?, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?",
    )
    .bind(redemption.map(|r| r.points))
    .bind(redemption.map(|r| r.discount_amount))
    .bind(cart_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn set_status(conn: &mut SqliteConnection, cart_id: &str, status: CartStatus) -> AppResult<()> {
    sqlx::query("UPDATE carts SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(status)
        .bind(cart_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn touch(conn: &mut SqliteConnection, cart_id: &str) -> AppResult<()> {
    sqlx::query("UPDATE carts SET updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(cart_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
