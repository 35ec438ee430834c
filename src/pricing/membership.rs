//! Automatic selection of the best membership promo for a member's cart.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{compute_subtotal, compute_totals, discount_amount, ensure_active, format_discount};
use crate::errors::{AppError, AppResult};
use crate::log_info;
use crate::models::discount::{promo_adjustment_code, AppliedDiscount, AppliedPromo, DiscountKind};
use crate::models::promo::{MembershipPromo, MembershipStatus};
use crate::models::response::{DiscountSummary, PromoApplication, PromoRemoval};
use crate::store::{cart_store, promo_store};

/// Promo giving the largest discount on `subtotal` among those whose minimum
/// purchase is met. The first of equal discounts wins; a promo worth nothing
/// never wins.
pub fn select_best_promo(promos: &[MembershipPromo], subtotal: i64) -> Option<(&MembershipPromo, i64)> {
    let mut best: Option<(&MembershipPromo, i64)> = None;

    for promo in promos.iter().filter(|p| subtotal >= p.min_purchase) {
        let amount = discount_amount(promo.discount_type, promo.value, subtotal);
        if amount <= 0 {
            continue;
        }
        if best.map_or(true, |(_, best_amount)| amount > best_amount) {
            best = Some((promo, amount));
        }
    }

    best
}

pub async fn apply_best_membership_promo(
    pool: &SqlitePool,
    cart_id: &str,
    customer_id: &str,
    now: DateTime<Utc>,
) -> AppResult<PromoApplication> {
    let mut tx = pool.begin().await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    ensure_active(&cart)?;

    if cart.membership_promo().is_some() {
        return Ok(PromoApplication::not_applied("A membership promo is already applied"));
    }
    if cart.is_empty() {
        return Ok(PromoApplication::not_applied("Cart is empty"));
    }

    let is_member = promo_store::fetch_membership(&mut *tx, customer_id)
        .await?
        .map_or(false, |m| m.status == MembershipStatus::Active);
    if !is_member {
        return Ok(PromoApplication::not_applied("Customer is not an active member"));
    }

    let running: Vec<MembershipPromo> = promo_store::list_active(&mut *tx)
        .await?
        .into_iter()
        .filter(|p| p.is_running(now))
        .collect();

    let subtotal = compute_subtotal(&cart.items);
    let Some((promo, amount)) = select_best_promo(&running, subtotal) else {
        return Ok(PromoApplication::not_applied("No membership promo applies to this cart"));
    };

    let applied = AppliedPromo {
        promo_id: promo.id,
        name: promo.name.clone(),
        discount_type: promo.discount_type,
        value: promo.value,
        amount,
        currency_code: cart.currency_code.clone(),
    };
    cart_store::insert_discount(&mut *tx, cart_id, &AppliedDiscount::MembershipPromo(applied)).await?;
    cart_store::touch(&mut *tx, cart_id).await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    tx.commit().await?;

    log_info!("PROMO", "Membership promo applied", serde_json::json!({
        "cart_id": cart_id,
        "promo_id": promo.id,
        "amount": amount,
        "candidates": running.len(),
    }));

    Ok(PromoApplication {
        applied: true,
        message: format!("Applied membership promo '{}'", promo.name),
        discount: Some(DiscountSummary {
            amount,
            formatted: format_discount(promo.discount_type, promo.value, &cart.currency_code),
        }),
        promo: Some(promo.clone()),
        cart: Some(cart),
    })
}

pub async fn remove_membership_promo(pool: &SqlitePool, cart_id: &str) -> AppResult<PromoRemoval> {
    let mut tx = pool.begin().await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    ensure_active(&cart)?;

    let promo_id = cart
        .membership_promo()
        .map(|p| p.promo_id)
        .ok_or_else(|| AppError::Validation("No membership promo is applied to this cart".into()))?;

    cart_store::delete_discount(
        &mut *tx,
        cart_id,
        DiscountKind::MembershipPromo,
        &promo_adjustment_code(promo_id),
    )
    .await?;
    cart_store::touch(&mut *tx, cart_id).await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    tx.commit().await?;

    log_info!("PROMO", "Membership promo removed", serde_json::json!({
        "cart_id": cart_id,
        "promo_id": promo_id,
    }));

    Ok(PromoRemoval {
        removed_promo_id: promo_id,
        totals: compute_totals(&cart),
        cart,
    })
}
