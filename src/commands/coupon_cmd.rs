use chrono::Utc;

use super::authorize_cart;
use crate::audit::{log_discount_action, DiscountAuditAction};
use crate::auth::guard::validate_session;
use crate::errors::{AppError, AppResult};
use crate::models::response::{CouponApplication, CouponRemoval, CouponValidation};
use crate::pricing::coupon;
use crate::validation::validate_coupon_code;
use crate::AppState;

pub async fn validate_coupon(
    state: &AppState,
    session_token: &str,
    cart_id: &str,
    code: &str,
) -> AppResult<CouponValidation> {
    let session = validate_session(state, session_token)?;
    validate_coupon_code(code).map_err(AppError::Validation)?;
    authorize_cart(state, &session, cart_id).await?;
    coupon::validate_coupon(&state.db, cart_id, code, Utc::now()).await
}

pub async fn apply_coupon(
    state: &AppState,
    session_token: &str,
    cart_id: &str,
    code: &str,
) -> AppResult<CouponApplication> {
    let session = validate_session(state, session_token)?;
    validate_coupon_code(code).map_err(AppError::Validation)?;
    let _guard = state.cart_locks.acquire(cart_id).await?;
    authorize_cart(state, &session, cart_id).await?;

    let result = coupon::apply_coupon(&state.db, cart_id, code, Utc::now()).await?;

    log_discount_action(
        &state.db,
        Some(&session.customer_id),
        DiscountAuditAction::CouponApply,
        &format!("Coupon {} applied to cart {}", result.coupon.code, cart_id),
        Some(&serde_json::json!({
            "cart_id": cart_id,
            "coupon_id": result.coupon.coupon_id,
            "amount": result.discount.amount,
        })),
    )
    .await;

    Ok(result)
}

pub async fn remove_coupon(state: &AppState, session_token: &str, cart_id: &str) -> AppResult<CouponRemoval> {
    let session = validate_session(state, session_token)?;
    let _guard = state.cart_locks.acquire(cart_id).await?;
    authorize_cart(state, &session, cart_id).await?;

    let result = coupon::remove_coupon(&state.db, cart_id).await?;

    log_discount_action(
        &state.db,
        Some(&session.customer_id),
        DiscountAuditAction::CouponRemove,
        &format!("Coupon {} removed from cart {}", result.removed_code, cart_id),
        None,
    )
    .await;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cart_cmd::{add_item, create_cart};
    use crate::models::customer::CustomerRole;
    use crate::models::discount::DiscountType;
    use crate::test_support::*;

    #[tokio::test]
    async fn test_apply_and_remove_through_commands() {
        let state = test_state().await;
        let (customer, token) = login(&state, "Aina", CustomerRole::Customer).await;
        seed_coupon(&state.db, "SUMMER20", DiscountType::Percentage, 20).await;
        let tea = seed_variant(&state.db, 1, "Tea", 10_000).await;
        let cart = create_cart(&state, &token, None).await.expect("cart");
        add_item(&state, &token, &cart.id, tea, 1).await.expect("add");

        let check = validate_coupon(&state, &token, &cart.id, "summer20").await.expect("check");
        assert_eq!(check.new_total, 8000);

        let applied = apply_coupon(&state, &token, &cart.id, "SUMMER20").await.expect("apply");
        assert_eq!(applied.totals.total, 8000);
        let twice = apply_coupon(&state, &token, &cart.id, "SUMMER20").await;
        assert!(matches!(twice, Err(AppError::Validation(_))));

        remove_coupon(&state, &token, &cart.id).await.expect("remove");

        let logs = crate::audit::recent_actions(&state.db, Some(&customer), 10).await.expect("logs");
        let actions: Vec<&str> = logs.iter().map(|l| l.action.as_str()).collect();
        assert_eq!(actions, vec!["COUPON_REMOVE", "COUPON_APPLY"]);
    }

    #[tokio::test]
    async fn test_malformed_code_rejected_before_lookup() {
        let state = test_state().await;
        let (_, token) = login(&state, "Aina", CustomerRole::Customer).await;
        let cart = create_cart(&state, &token, None).await.expect("cart");
        let result = apply_coupon(&state, &token, &cart.id, "no spaces!").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
