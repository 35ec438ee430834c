use super::authorize_cart;
use crate::audit::{log_discount_action, DiscountAuditAction};
use crate::auth::guard::validate_session;
use crate::errors::AppResult;
use crate::models::cart::Cart;
use crate::models::response::{CartValidation, CartWithTotals};
use crate::pricing::{cart, pwp, validator};
use crate::AppState;

/// New cart owned by the session's customer.
pub async fn create_cart(
    state: &AppState,
    session_token: &str,
    currency_code: Option<String>,
) -> AppResult<Cart> {
    let session = validate_session(state, session_token)?;
    cart::create_cart(&state.db, Some(&session.customer_id), currency_code.as_deref()).await
}

pub async fn get_cart(state: &AppState, session_token: &str, cart_id: &str) -> AppResult<CartWithTotals> {
    let session = validate_session(state, session_token)?;
    authorize_cart(state, &session, cart_id).await?;
    cart::get_cart_with_totals(&state.db, cart_id).await
}

pub async fn add_item(
    state: &AppState,
    session_token: &str,
    cart_id: &str,
    variant_id: i64,
    quantity: i64,
) -> AppResult<Cart> {
    let session = validate_session(state, session_token)?;
    let _guard = state.cart_locks.acquire(cart_id).await?;
    authorize_cart(state, &session, cart_id).await?;
    cart::add_item(&state.db, cart_id, variant_id, quantity).await
}

pub async fn update_item_quantity(
    state: &AppState,
    session_token: &str,
    cart_id: &str,
    item_id: &str,
    quantity: i64,
) -> AppResult<Cart> {
    let session = validate_session(state, session_token)?;
    let _guard = state.cart_locks.acquire(cart_id).await?;
    authorize_cart(state, &session, cart_id).await?;
    cart::update_item_quantity(&state.db, cart_id, item_id, quantity).await
}

pub async fn add_pwp_item(
    state: &AppState,
    session_token: &str,
    cart_id: &str,
    rule_id: i64,
) -> AppResult<Cart> {
    let session = validate_session(state, session_token)?;
    let _guard = state.cart_locks.acquire(cart_id).await?;
    authorize_cart(state, &session, cart_id).await?;
    pwp::add_pwp_item(&state.db, cart_id, rule_id).await
}

/// Checks PWP and bulk pricing on every line; with `auto_fix` the problems
/// that can be repaired are repaired.
pub async fn validate_cart(
    state: &AppState,
    session_token: &str,
    cart_id: &str,
    auto_fix: bool,
) -> AppResult<CartValidation> {
    let session = validate_session(state, session_token)?;
    let _guard = state.cart_locks.acquire(cart_id).await?;
    authorize_cart(state, &session, cart_id).await?;

    let result = validator::validate_cart_pricing(&state.db, cart_id, auto_fix).await?;

    if !result.fixes_applied.is_empty() {
        log_discount_action(
            &state.db,
            Some(&session.customer_id),
            DiscountAuditAction::CartAutoFix,
            &format!("{} pricing fix(es) applied to cart {}", result.fixes_applied.len(), cart_id),
            Some(&serde_json::json!({
                "cart_id": cart_id,
                "fixes": result.fixes_applied,
            })),
        )
        .await;
    }

    Ok(result)
}
