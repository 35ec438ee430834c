use chrono::Utc;

use super::{authorize_cart, cart_customer};
use crate::audit::{log_discount_action, DiscountAuditAction};
use crate::auth::guard::validate_session;
use crate::errors::AppResult;
use crate::models::response::{PromoApplication, PromoRemoval};
use crate::pricing::membership;
use crate::AppState;

/// Picks and applies the best running promo for the cart's member. Not being
/// eligible is reported in the response, not as an error.
pub async fn apply_membership_promo(
    state: &AppState,
    session_token: &str,
    cart_id: &str,
) -> AppResult<PromoApplication> {
    let session = validate_session(state, session_token)?;
    let _guard = state.cart_locks.acquire(cart_id).await?;
    let cart = authorize_cart(state, &session, cart_id).await?;
    let customer_id = cart_customer(&session, &cart);

    let result = membership::apply_best_membership_promo(&state.db, cart_id, customer_id, Utc::now()).await?;

    if let (true, Some(promo)) = (result.applied, result.promo.as_ref()) {
        log_discount_action(
            &state.db,
            Some(&session.customer_id),
            DiscountAuditAction::PromoApply,
            &format!("Membership promo '{}' applied to cart {}", promo.name, cart_id),
            Some(&serde_json::json!({
                "cart_id": cart_id,
                "promo_id": promo.id,
                "amount": result.discount.as_ref().map(|d| d.amount),
            })),
        )
        .await;
    }

    Ok(result)
}

pub async fn remove_membership_promo(
    state: &AppState,
    session_token: &str,
    cart_id: &str,
) -> AppResult<PromoRemoval> {
    let session = validate_session(state, session_token)?;
    let _guard = state.cart_locks.acquire(cart_id).await?;
    authorize_cart(state, &session, cart_id).await?;

    let result = membership::remove_membership_promo(&state.db, cart_id).await?;

    log_discount_action(
        &state.db,
        Some(&session.customer_id),
        DiscountAuditAction::PromoRemove,
        &format!("Membership promo {} removed from cart {}", result.removed_promo_id, cart_id),
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
    use crate::models::promo::MembershipStatus;
    use crate::store::promo_store;
    use crate::test_support::*;

    #[tokio::test]
    async fn test_member_gets_best_promo() {
        let state = test_state().await;
        let (customer, token) = login(&state, "Aina", CustomerRole::Customer).await;
        {
            let mut conn = state.db.acquire().await.expect("conn");
            promo_store::upsert_membership(&mut *conn, &customer, MembershipStatus::Active)
                .await
                .expect("membership");
        }
        seed_promo(&state.db, "Five", DiscountType::Fixed, 500, 0).await;
        seed_promo(&state.db, "Eight", DiscountType::Fixed, 800, 0).await;
        let tea = seed_variant(&state.db, 1, "Tea", 10_000).await;
        let cart = create_cart(&state, &token, None).await.expect("cart");
        add_item(&state, &token, &cart.id, tea, 1).await.expect("add");

        let result = apply_membership_promo(&state, &token, &cart.id).await.expect("apply");
        assert!(result.applied);
        assert_eq!(result.discount.map(|d| d.amount), Some(800));

        let removed = remove_membership_promo(&state, &token, &cart.id).await.expect("remove");
        assert_eq!(removed.totals.total, 10_000);
    }
}
