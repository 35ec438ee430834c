use super::authorize_cart;
use crate::audit::{log_discount_action, DiscountAuditAction};
use crate::auth::guard::{validate_admin, validate_session};
use crate::errors::AppResult;
use crate::models::order::Order;
use crate::models::response::OrderReversal;
use crate::pricing::checkout;
use crate::AppState;

pub async fn complete_order(state: &AppState, session_token: &str, cart_id: &str) -> AppResult<Order> {
    let session = validate_session(state, session_token)?;
    let _guard = state.cart_locks.acquire(cart_id).await?;
    authorize_cart(state, &session, cart_id).await?;

    let order = checkout::complete_order(&state.db, cart_id).await?;

    log_discount_action(
        &state.db,
        order.customer_id.as_deref(),
        DiscountAuditAction::OrderComplete,
        &format!("Order {} completed from cart {}", order.id, cart_id),
        Some(&serde_json::json!({
            "order_id": order.id,
            "total": order.total,
            "discount_total": order.discount_total,
            "coupon_code": order.coupon_code,
            "points_earned": order.points_earned,
        })),
    )
    .await;

    Ok(order)
}

/// Cancels a completed order (admin only).
pub async fn cancel_order(state: &AppState, session_token: &str, order_id: &str) -> AppResult<OrderReversal> {
    let admin = validate_admin(state, session_token)?;

    let result = checkout::cancel_order(&state.db, order_id).await?;

    log_discount_action(
        &state.db,
        result.order.customer_id.as_deref(),
        DiscountAuditAction::OrderCancel,
        &format!("Order {} cancelled", order_id),
        Some(&serde_json::json!({
            "admin_id": admin.customer_id,
            "points": result.points,
        })),
    )
    .await;

    Ok(result)
}

/// Refunds `refund_amount` of an order (admin only).
pub async fn return_order(
    state: &AppState,
    session_token: &str,
    order_id: &str,
    refund_amount: i64,
) -> AppResult<OrderReversal> {
    let admin = validate_admin(state, session_token)?;

    let result = checkout::return_order(&state.db, order_id, refund_amount).await?;

    log_discount_action(
        &state.db,
        result.order.customer_id.as_deref(),
        DiscountAuditAction::OrderReturn,
        &format!("Order {} returned: {}", order_id, refund_amount),
        Some(&serde_json::json!({
            "admin_id": admin.customer_id,
            "refund_amount": refund_amount,
            "status": result.order.status,
            "points": result.points,
        })),
    )
    .await;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart_cmd::{add_item, create_cart};
    use crate::errors::AppError;
    use crate::models::customer::CustomerRole;
    use crate::models::order::OrderStatus;
    use crate::test_support::*;

    #[tokio::test]
    async fn test_checkout_then_admin_return() {
        let state = test_state().await;
        let (customer, token) = login(&state, "Aina", CustomerRole::Customer).await;
        let (_, admin) = login(&state, "Boss", CustomerRole::Admin).await;
        let tea = seed_variant(&state.db, 1, "Tea", 10_000).await;
        let cart = create_cart(&state, &token, None).await.expect("cart");
        add_item(&state, &token, &cart.id, tea, 1).await.expect("add");

        let order = complete_order(&state, &token, &cart.id).await.expect("order");
        assert_eq!(order.customer_id.as_deref(), Some(customer.as_str()));

        let denied = return_order(&state, &token, &order.id, 100).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        let result = return_order(&state, &admin, &order.id, 10_000).await.expect("return");
        assert_eq!(result.order.status, OrderStatus::Returned);

        let logs = crate::audit::recent_actions(&state.db, Some(&customer), 10).await.expect("logs");
        assert_eq!(logs[0].action, "ORDER_RETURN");
        assert_eq!(logs[1].action, "ORDER_COMPLETE");
    }
}
