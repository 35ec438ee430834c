//! Coupon validation, application and removal.
//!
//! Applying a coupon does not consume it; usage is counted when the order
//! completes.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{compute_subtotal, compute_totals, discount_amount, ensure_active, format_discount};
use crate::errors::{AppError, AppResult};
use crate::log_info;
use crate::models::cart::Cart;
use crate::models::coupon::{Coupon, CouponRejection};
use crate::models::discount::{coupon_adjustment_code, AppliedCoupon, AppliedDiscount, DiscountKind};
use crate::models::response::{CouponApplication, CouponRemoval, CouponValidation, DiscountSummary};
use crate::store::{cart_store, coupon_store};

/// Pure evaluation of `coupon` against `cart` at `now`.
pub fn evaluate_coupon(cart: &Cart, coupon: &Coupon, now: DateTime<Utc>) -> CouponValidation {
    let subtotal = compute_subtotal(&cart.items);
    let formatted = format_discount(coupon.discount_type, coupon.value, &cart.currency_code);

    let rejection = coupon.check_availability(now).err().or_else(|| {
        if cart.is_empty() {
            Some(CouponRejection::EmptyCart)
        } else {
            None
        }
    });

    let amount = match rejection {
        Some(_) => 0,
        None => discount_amount(coupon.discount_type, coupon.value, subtotal),
    };

    CouponValidation {
        valid: rejection.is_none(),
        reason: rejection,
        message: rejection.map(|r| r.message().to_string()),
        coupon: Some(coupon.clone()),
        discount: DiscountSummary { amount, formatted },
        cart_subtotal: subtotal,
        new_total: subtotal - amount,
    }
}

async fn find_coupon(conn: &mut sqlx::SqliteConnection, code: &str) -> AppResult<Coupon> {
    coupon_store::find_by_code(conn, code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Coupon {}", code.trim().to_uppercase())))
}

/// Read-only check. Unknown codes are `NotFound`; every other failure is
/// reported as `valid: false` with a reason.
pub async fn validate_coupon(
    pool: &SqlitePool,
    cart_id: &str,
    code: &str,
    now: DateTime<Utc>,
) -> AppResult<CouponValidation> {
    let mut conn = pool.acquire().await?;
    let cart = cart_store::load_cart(&mut *conn, cart_id).await?;
    let coupon = find_coupon(&mut *conn, code).await?;
    Ok(evaluate_coupon(&cart, &coupon, now))
}

pub async fn apply_coupon(
    pool: &SqlitePool,
    cart_id: &str,
    code: &str,
    now: DateTime<Utc>,
) -> AppResult<CouponApplication> {
    let mut tx = pool.begin().await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    ensure_active(&cart)?;

    if let Some(existing) = cart.coupon() {
        return Err(AppError::Validation(format!(
            "Coupon {} is already applied; remove it first",
            existing.code
        )));
    }

    let coupon = find_coupon(&mut *tx, code).await?;
    let validation = evaluate_coupon(&cart, &coupon, now);
    if !validation.valid {
        let message = validation
            .message
            .unwrap_or_else(|| "Coupon cannot be applied".to_string());
        return Err(AppError::Validation(message));
    }

    let applied = AppliedCoupon {
        coupon_id: coupon.id,
        code: coupon.code.clone(),
        name: coupon.name.clone(),
        discount_type: coupon.discount_type,
        value: coupon.value,
        amount: validation.discount.amount,
        currency_code: cart.currency_code.clone(),
    };
    cart_store::insert_discount(&mut *tx, cart_id, &AppliedDiscount::Coupon(applied.clone())).await?;
    cart_store::touch(&mut *tx, cart_id).await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    tx.commit().await?;

    log_info!("COUPON", "Coupon applied", serde_json::json!({
        "cart_id": cart_id,
        "code": applied.code,
        "amount": applied.amount,
    }));

    Ok(CouponApplication {
        totals: compute_totals(&cart),
        discount: validation.discount,
        coupon: applied,
        cart,
    })
}

/// Removes the applied coupon; other discounts stay.
pub async fn remove_coupon(pool: &SqlitePool, cart_id: &str) -> AppResult<CouponRemoval> {
    let mut tx = pool.begin().await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    ensure_active(&cart)?;

    let code = cart
        .coupon()
        .map(|c| c.code.clone())
        .ok_or_else(|| AppError::Validation("No coupon is applied to this cart".into()))?;

    let removed = cart_store::delete_discount(
        &mut *tx,
        cart_id,
        DiscountKind::Coupon,
        &coupon_adjustment_code(&code),
    )
    .await?;
    if !removed {
        return Err(AppError::Internal(format!(
            "Coupon {} is listed on cart {} but has no matching adjustment",
            code, cart_id
        )));
    }
    cart_store::touch(&mut *tx, cart_id).await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    tx.commit().await?;

    log_info!("COUPON", "Coupon removed", serde_json::json!({
        "cart_id": cart_id,
        "code": code,
    }));

    Ok(CouponRemoval {
        removed_code: code,
        totals: compute_totals(&cart),
        cart,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::coupon::CreateCouponPayload;
    use crate::models::discount::DiscountType;
    use crate::pricing::cart::{add_item, create_cart};
    use crate::test_support::*;
    use chrono::Duration;

    async fn cart_worth(pool: &SqlitePool, amount: i64) -> String {
        let variant = seed_variant(pool, 1, "Item", amount).await;
        let cart = create_cart(pool, None, None).await.expect("cart");
        add_item(pool, &cart.id, variant, 1).await.expect("add");
        cart.id
    }

    #[tokio::test]
    async fn test_summer20_on_10000() {
        let pool = memory_pool().await;
        seed_coupon(&pool, "SUMMER20", DiscountType::Percentage, 20).await;
        let cart_id = cart_worth(&pool, 10_000).await;

        let result = validate_coupon(&pool, &cart_id, "summer20", Utc::now()).await.expect("validate");
        assert!(result.valid);
        assert_eq!(result.discount.amount, 2000);
        assert_eq!(result.discount.formatted, "20%");
        assert_eq!(result.cart_subtotal, 10_000);
        assert_eq!(result.new_total, 8000);
    }

    #[tokio::test]
    async fn test_fixed_coupon_clamped_to_subtotal() {
        let pool = memory_pool().await;
        seed_coupon(&pool, "FIFTY", DiscountType::Fixed, 5000).await;
        let cart_id = cart_worth(&pool, 3000).await;

        let result = validate_coupon(&pool, &cart_id, "FIFTY", Utc::now()).await.expect("validate");
        assert_eq!(result.discount.amount, 3000);
        assert_eq!(result.new_total, 0);
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found_but_expired_is_invalid() {
        let pool = memory_pool().await;
        let cart_id = cart_worth(&pool, 1000).await;
        let now = Utc::now();
        seed_coupon_with(
            &pool,
            CreateCouponPayload {
                code: "OLD".into(),
                name: "Old".into(),
                discount_type: DiscountType::Fixed,
                value: 100,
                starts_at: Some(now - Duration::days(10)),
                ends_at: Some(now - Duration::days(1)),
                usage_limit: None,
            },
        )
        .await;

        let missing = validate_coupon(&pool, &cart_id, "NOPE", now).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let expired = validate_coupon(&pool, &cart_id, "OLD", now).await.expect("validate");
        assert!(!expired.valid);
        assert_eq!(expired.reason, Some(CouponRejection::Expired));
        assert_eq!(expired.discount.amount, 0);
    }

    #[tokio::test]
    async fn test_empty_cart_is_invalid() {
        let pool = memory_pool().await;
        seed_coupon(&pool, "SUMMER20", DiscountType::Percentage, 20).await;
        let cart = create_cart(&pool, None, None).await.expect("cart");
        let result = validate_coupon(&pool, &cart.id, "SUMMER20", Utc::now()).await.expect("validate");
        assert_eq!(result.reason, Some(CouponRejection::EmptyCart));
    }

    #[tokio::test]
    async fn test_second_coupon_is_rejected() {
        let pool = memory_pool().await;
        seed_coupon(&pool, "SUMMER20", DiscountType::Percentage, 20).await;
        seed_coupon(&pool, "FIFTY", DiscountType::Fixed, 5000).await;
        let cart_id = cart_worth(&pool, 10_000).await;

        apply_coupon(&pool, &cart_id, "SUMMER20", Utc::now()).await.expect("first");
        let second = apply_coupon(&pool, &cart_id, "FIFTY", Utc::now()).await;
        assert!(matches!(second, Err(AppError::Validation(_))));
        let same = apply_coupon(&pool, &cart_id, "SUMMER20", Utc::now()).await;
        assert!(matches!(same, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_apply_then_remove_restores_discount_list() {
        let pool = memory_pool().await;
        seed_coupon(&pool, "SUMMER20", DiscountType::Percentage, 20).await;
        let cart_id = cart_worth(&pool, 10_000).await;
        let before = crate::pricing::cart::get_cart(&pool, &cart_id).await.expect("cart");

        let applied = apply_coupon(&pool, &cart_id, "SUMMER20", Utc::now()).await.expect("apply");
        assert_eq!(applied.coupon.amount, 2000);
        assert_eq!(applied.totals.total, 8000);
        assert_eq!(applied.cart.discounts[0].adjustment_code(), "COUPON_SUMMER20");

        let removed = remove_coupon(&pool, &cart_id).await.expect("remove");
        assert_eq!(removed.removed_code, "SUMMER20");
        assert_eq!(removed.cart.discounts, before.discounts);
        assert!(removed.cart.coupon().is_none());
        assert_eq!(removed.totals.total, 10_000);

        let again = remove_coupon(&pool, &cart_id).await;
        assert!(matches!(again, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_apply_does_not_consume_usage() {
        let pool = memory_pool().await;
        let coupon_id = seed_coupon(&pool, "SUMMER20", DiscountType::Percentage, 20).await;
        let cart_id = cart_worth(&pool, 10_000).await;
        apply_coupon(&pool, &cart_id, "SUMMER20", Utc::now()).await.expect("apply");

        let mut conn = pool.acquire().await.expect("conn");
        let coupon = coupon_store::find_by_id(&mut *conn, coupon_id).await.expect("q").expect("coupon");
        assert_eq!(coupon.usage_count, 0);
    }
}
