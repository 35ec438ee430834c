//! Turning a cart into an order, and undoing orders.
//!
//! Coupon usage is only counted here, when the order is written. Points earned
//! on the order are credited in the same transaction.

use sqlx::SqlitePool;

use super::points::{credit_order_points, reverse_points};
use super::{compute_totals, ensure_active};
use crate::errors::{AppError, AppResult};
use crate::log_info;
use crate::models::cart::CartStatus;
use crate::models::order::{Order, OrderStatus};
use crate::models::points::{ReversalKind, ReversalOutcome};
use crate::models::response::OrderReversal;
use crate::store::order_store::RefundProgress;
use crate::store::{cart_store, coupon_store, order_store};

pub async fn complete_order(pool: &SqlitePool, cart_id: &str) -> AppResult<Order> {
    let mut tx = pool.begin().await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    ensure_active(&cart)?;
    if cart.is_empty() {
        return Err(AppError::Validation("Cannot check out an empty cart".into()));
    }

    let totals = compute_totals(&cart);
    let coupon = cart.coupon().cloned();

    if let Some(coupon) = &coupon {
        let counted = coupon_store::increment_usage(&mut *tx, coupon.coupon_id).await?;
        if !counted {
            return Err(AppError::Validation(format!(
                "Coupon {} has reached its usage limit",
                coupon.code
            )));
        }
    }

    let order = Order {
        id: uuid::Uuid::new_v4().to_string(),
        cart_id: cart.id.clone(),
        customer_id: cart.customer_id.clone(),
        currency_code: cart.currency_code.clone(),
        subtotal: totals.subtotal,
        discount_total: totals.discount_total,
        coupon_id: coupon.as_ref().map(|c| c.coupon_id),
        coupon_code: coupon.as_ref().map(|c| c.code.clone()),
        promo_id: cart.membership_promo().map(|p| p.promo_id),
        points_redeemed: cart.points_redemption.map_or(0, |r| r.points),
        points_discount: totals.points_discount,
        total: totals.total,
        points_earned: 0,
        refunded_amount: 0,
        earned_reversed: 0,
        redeemed_restored: 0,
        status: OrderStatus::Completed,
        created_at: None,
    };
    order_store::insert(&mut *tx, &order).await?;
    cart_store::set_status(&mut *tx, cart_id, CartStatus::Completed).await?;

    if let Some(customer_id) = order.customer_id.as_deref() {
        let earned = credit_order_points(&mut *tx, customer_id, &order.id, order.total)
            .await
            .map_err(|e| e.context("earning points"))?;
        if earned > 0 {
            order_store::set_points_earned(&mut *tx, &order.id, earned).await?;
        }
    }

    let order = order_store::fetch(&mut *tx, &order.id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Order {} vanished after insert", order.id)))?;
    tx.commit().await?;

    log_info!("ORDER", "Order completed", serde_json::json!({
        "order_id": order.id,
        "cart_id": cart_id,
        "total": order.total,
        "coupon": order.coupon_code,
        "points_earned": order.points_earned,
    }));

    Ok(order)
}

async fn fetch_order(conn: &mut sqlx::SqliteConnection, order_id: &str) -> AppResult<Order> {
    order_store::fetch(conn, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {}", order_id)))
}

/// Cancels a completed order: all earned points come back off the balance
/// (capped) and all redeemed points are returned.
pub async fn cancel_order(pool: &SqlitePool, order_id: &str) -> AppResult<OrderReversal> {
    let mut tx = pool.begin().await?;

    let order = fetch_order(&mut *tx, order_id).await?;
    if order.status != OrderStatus::Completed {
        return Err(AppError::Validation(format!(
            "Only completed orders can be cancelled (order {} is {:?})",
            order_id, order.status
        )));
    }

    let points = match order.customer_id.as_deref() {
        Some(customer_id) => {
            reverse_points(
                &mut *tx,
                customer_id,
                &order.id,
                order.points_earned,
                order.points_redeemed,
                ReversalKind::Cancel,
            )
            .await?
        }
        None => ReversalOutcome::default(),
    };

    order_store::set_status(&mut *tx, order_id, OrderStatus::Cancelled).await?;
    let order = fetch_order(&mut *tx, order_id).await?;
    tx.commit().await?;

    log_info!("ORDER", "Order cancelled", serde_json::json!({
        "order_id": order_id,
        "points_deducted": points.points_deducted,
        "points_restored": points.points_restored,
    }));

    Ok(OrderReversal {
        refund_amount: order.total,
        order,
        points,
    })
}

/// Refunds part or all of an order, reversing points in proportion.
pub async fn return_order(pool: &SqlitePool, order_id: &str, refund_amount: i64) -> AppResult<OrderReversal> {
    let mut tx = pool.begin().await?;

    let order = fetch_order(&mut *tx, order_id).await?;
    if !order.status.is_open() {
        return Err(AppError::Validation(format!(
            "Order {} can no longer be returned",
            order_id
        )));
    }
    let refundable = order.refundable_amount();
    if refund_amount <= 0 || refund_amount > refundable {
        return Err(AppError::Validation(format!(
            "Refund must be between 1 and {}",
            refundable
        )));
    }

    let (earned_share, redeemed_share) = order.return_points(refund_amount);
    let points = match order.customer_id.as_deref() {
        Some(customer_id) => {
            reverse_points(
                &mut *tx,
                customer_id,
                &order.id,
                earned_share,
                redeemed_share,
                ReversalKind::Return,
            )
            .await?
        }
        None => ReversalOutcome::default(),
    };

    let refunded = order.refunded_amount + refund_amount;
    let status = if refunded >= order.total {
        OrderStatus::Returned
    } else {
        OrderStatus::PartiallyReturned
    };
    order_store::update_refund(
        &mut *tx,
        order_id,
        RefundProgress {
            refunded_amount: refunded,
            earned_reversed: order.earned_reversed + earned_share,
            redeemed_restored: order.redeemed_restored + redeemed_share,
            status,
        },
    )
    .await?;
    let order = fetch_order(&mut *tx, order_id).await?;
    tx.commit().await?;

    log_info!("ORDER", "Order returned", serde_json::json!({
        "order_id": order_id,
        "refund_amount": refund_amount,
        "status": status,
        "points_deducted": points.points_deducted,
        "points_restored": points.points_restored,
    }));

    Ok(OrderReversal {
        order,
        refund_amount,
        points,
    })
}
