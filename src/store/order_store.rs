use sqlx::SqliteConnection;

use crate::errors::AppResult;
use crate::models::order::{Order, OrderStatus};

pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO orders (
            id, cart_id, customer_id, currency_code, subtotal, discount_total,
            coupon_id, coupon_code, promo_id, points_redeemed, points_discount,
            total, points_earned, refunded_amount, status
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&order.id)
    .bind(&order.cart_id)
    .bind(&order.customer_id)
    .bind(&order.currency_code)
    .bind(order.subtotal)
    .bind(order.discount_total)
    .bind(order.coupon_id)
    .bind(&order.coupon_code)
    .bind(order.promo_id)
    .bind(order.points_redeemed)
    .bind(order.points_discount)
    .bind(order.total)
    .bind(order.points_earned)
    .bind(order.refunded_amount)
    .bind(order.status)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn fetch(conn: &mut SqliteConnection, order_id: &str) -> AppResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(order)
}

pub async fn set_points_earned(conn: &mut SqliteConnection, order_id: &str, points: i64) -> AppResult<()> {
    sqlx::query("UPDATE orders SET points_earned = ? WHERE id = ?")
        .bind(points)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Running totals written after each return.
#[derive(Debug, Clone, Copy)]
pub struct RefundProgress {
    pub refunded_amount: i64,
    pub earned_reversed: i64,
    pub redeemed_restored: i64,
    pub status: OrderStatus,
}

pub async fn update_refund(
    conn: &mut SqliteConnection,
    order_id: &str,
    progress: RefundProgress,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE orders
         SET refunded_amount = ?, earned_reversed = ?, redeemed_restored = ?, status = ?
         WHERE id = ?",
    )
    .bind(progress.refunded_amount)
    .bind(progress.earned_reversed)
    .bind(progress.redeemed_restored)
    .bind(progress.status)
    .bind(order_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn set_status(conn: &mut SqliteConnection, order_id: &str, status: OrderStatus) -> AppResult<()> {
    sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
        .bind(status)
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
