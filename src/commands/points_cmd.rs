use super::{authorize_cart, cart_customer};
use crate::audit::{log_discount_action, DiscountAuditAction};
use crate::auth::guard::{validate_admin, validate_session};
use crate::errors::AppResult;
use crate::models::points::{PointsBalance, PointsSummary};
use crate::models::response::RedemptionResult;
use crate::pricing::points;
use crate::AppState;

/// Points summary of the session's own customer.
pub async fn get_points(state: &AppState, session_token: &str) -> AppResult<PointsSummary> {
    let session = validate_session(state, session_token)?;
    points::get_points_summary(&state.db, &session.customer_id).await
}

/// Admin view of any customer's points.
pub async fn get_customer_points(
    state: &AppState,
    session_token: &str,
    customer_id: &str,
) -> AppResult<PointsSummary> {
    validate_admin(state, session_token)?;
    points::get_points_summary(&state.db, customer_id).await
}

pub async fn redeem_points(
    state: &AppState,
    session_token: &str,
    cart_id: &str,
    points_to_redeem: i64,
) -> AppResult<RedemptionResult> {
    let session = validate_session(state, session_token)?;
    let _guard = state.cart_locks.acquire(cart_id).await?;
    let cart = authorize_cart(state, &session, cart_id).await?;
    let customer_id = cart_customer(&session, &cart);

    let result = points::redeem_points(&state.db, cart_id, customer_id, points_to_redeem).await?;

    log_discount_action(
        &state.db,
        Some(customer_id),
        DiscountAuditAction::PointsRedeem,
        &format!("{} points redeemed on cart {}", result.points_redeemed, cart_id),
        Some(&serde_json::json!({
            "cart_id": cart_id,
            "points": result.points_redeemed,
            "discount_amount": result.discount_amount,
            "new_balance": result.new_balance,
        })),
    )
    .await;

    Ok(result)
}

pub async fn cancel_points_redemption(
    state: &AppState,
    session_token: &str,
    cart_id: &str,
) -> AppResult<PointsBalance> {
    let session = validate_session(state, session_token)?;
    let _guard = state.cart_locks.acquire(cart_id).await?;
    let cart = authorize_cart(state, &session, cart_id).await?;
    let customer_id = cart_customer(&session, &cart);

    points::cancel_cart_redemption(&state.db, cart_id, customer_id).await
}

/// Manual balance correction (admin only).
pub async fn adjust_points(
    state: &AppState,
    session_token: &str,
    customer_id: &str,
    delta: i64,
    reason: &str,
) -> AppResult<PointsBalance> {
    let admin = validate_admin(state, session_token)?;

    let balance = points::adjust_points(&state.db, customer_id, delta, reason, &admin.customer_id).await?;

    log_discount_action(
        &state.db,
        Some(customer_id),
        DiscountAuditAction::PointsAdjust,
        &format!("Points adjusted by {}: {}", delta, reason.trim()),
        Some(&serde_json::json!({
            "delta": delta,
            "balance_after": balance.balance,
            "admin_id": admin.customer_id,
        })),
    )
    .await;

    Ok(balance)
}
