//! Cart pricing engine.
//!
//! Amounts are integer minor currency units throughout. Every figure shown to a
//! caller is recomputed from line items with [`compute_subtotal`] and
//! [`compute_totals`]; nothing derived from line items is cached.

pub mod bulk;
pub mod cart;
pub mod checkout;
pub mod coupon;
pub mod membership;
pub mod points;
pub mod pwp;
pub mod validator;

use crate::errors::{AppError, AppResult};
use crate::models::cart::{Cart, CartTotals, LineItem};
use crate::models::discount::DiscountType;

/// Σ unit_price × quantity over every line item.
pub fn compute_subtotal(items: &[LineItem]) -> i64 {
    items.iter().map(LineItem::line_total).sum()
}

/// Subtotal of the items that can unlock PWP rewards (rewards themselves excluded).
pub fn cart_value_excluding_pwp(items: &[LineItem]) -> i64 {
    items
        .iter()
        .filter(|item| !item.pricing.is_pwp())
        .map(LineItem::line_total)
        .sum()
}

/// Discount for `subtotal`, clamped to `[0, subtotal]`.
/// Percentages round half up to the nearest minor unit.
pub fn discount_amount(discount_type: DiscountType, value: i64, subtotal: i64) -> i64 {
    if subtotal <= 0 || value <= 0 {
        return 0;
    }
    let raw = match discount_type {
        DiscountType::Percentage => {
            ((subtotal as i128 * value as i128 + 50) / 100).min(i64::MAX as i128) as i64
        }
        DiscountType::Fixed => value,
    };
    raw.clamp(0, subtotal)
}

/// `MYR 12.50` style rendering of a minor-unit amount.
pub fn format_amount(amount: i64, currency_code: &str) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{} {}{}.{:02}", currency_code.to_uppercase(), sign, abs / 100, abs % 100)
}

/// Display form of a rule value: `20%` or `MYR 50.00`.
pub fn format_discount(discount_type: DiscountType, value: i64, currency_code: &str) -> String {
    match discount_type {
        DiscountType::Percentage => format!("{}%", value),
        DiscountType::Fixed => format_amount(value, currency_code),
    }
}

/// Aggregation pass. Coupon, then membership promo, then points; each is
/// re-derived against the current subtotal and clamped to what is left.
pub fn compute_totals(cart: &Cart) -> CartTotals {
    let subtotal = compute_subtotal(&cart.items);
    let mut remaining = subtotal.max(0);

    let coupon_discount = cart
        .coupon()
        .map(|c| discount_amount(c.discount_type, c.value, subtotal).min(remaining))
        .unwrap_or(0);
    remaining -= coupon_discount;

    let promo_discount = cart
        .membership_promo()
        .map(|p| discount_amount(p.discount_type, p.value, subtotal).min(remaining))
        .unwrap_or(0);
    remaining -= promo_discount;

    let points_discount = cart
        .points_redemption
        .map(|r| r.discount_amount.clamp(0, remaining))
        .unwrap_or(0);
    remaining -= points_discount;

    CartTotals {
        subtotal,
        coupon_discount,
        promo_discount,
        points_discount,
        discount_total: coupon_discount + promo_discount + points_discount,
        total: remaining,
    }
}

/// Mutations are only allowed while the cart is open.
pub(crate) fn ensure_active(cart: &Cart) -> AppResult<()> {
    if !cart.is_active() {
        return Err(AppError::Validation(format!("Cart {} is already completed", cart.id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cart::{CartStatus, PointsRedemption, PricingReason};
    use crate::models::discount::{AppliedCoupon, AppliedDiscount, AppliedPromo};

    fn item(id: &str, price: i64, qty: i64, pricing: PricingReason) -> LineItem {
        LineItem {
            id: id.into(),
            cart_id: "cart".into(),
            variant_id: 1,
            product_id: 1,
            title: id.into(),
            quantity: qty,
            unit_price: price,
            pricing,
        }
    }

    fn cart(items: Vec<LineItem>, discounts: Vec<AppliedDiscount>) -> Cart {
        Cart {
            id: "cart".into(),
            customer_id: None,
            currency_code: "MYR".into(),
            status: CartStatus::Active,
            items,
            discounts,
            points_redemption: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn coupon(discount_type: DiscountType, value: i64) -> AppliedDiscount {
        AppliedDiscount::Coupon(AppliedCoupon {
            coupon_id: 1,
            code: "SAVE".into(),
            name: "Save".into(),
            discount_type,
            value,
            amount: 0,
            currency_code: "MYR".into(),
        })
    }

    #[test]
    fn test_pwp_items_never_count_towards_cart_value() {
        let items = vec![
            item("reward", 100, 1, PricingReason::Pwp { rule_id: 1 }),
            item("tea", 1500, 2, PricingReason::Regular),
            item("reward2", 900, 3, PricingReason::Pwp { rule_id: 2 }),
        ];
        assert_eq!(cart_value_excluding_pwp(&items), 3000);
        assert_eq!(compute_subtotal(&items), 100 + 3000 + 2700);
    }

    #[test]
    fn test_percentage_discount() {
        assert_eq!(discount_amount(DiscountType::Percentage, 20, 10_000), 2000);
        // 333 * 15% = 49.95 rounds to 50
        assert_eq!(discount_amount(DiscountType::Percentage, 15, 333), 50);
    }

    #[test]
    fn test_fixed_discount_is_clamped_to_subtotal() {
        assert_eq!(discount_amount(DiscountType::Fixed, 5000, 3000), 3000);
        assert_eq!(discount_amount(DiscountType::Fixed, 5000, 0), 0);
        assert_eq!(discount_amount(DiscountType::Percentage, 100, 4321), 4321);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_discount(DiscountType::Percentage, 20, "MYR"), "20%");
        assert_eq!(format_discount(DiscountType::Fixed, 5000, "myr"), "MYR 50.00");
        assert_eq!(format_amount(1205, "USD"), "USD 12.05");
        assert_eq!(format_amount(-7, "USD"), "USD -0.07");
    }

    #[test]
    fn test_totals_apply_in_order_and_never_go_negative() {
        let mut c = cart(
            vec![item("a", 4000, 1, PricingReason::Regular)],
            vec![
                coupon(DiscountType::Fixed, 3000),
                AppliedDiscount::MembershipPromo(AppliedPromo {
                    promo_id: 1,
                    name: "Members".into(),
                    discount_type: DiscountType::Fixed,
                    value: 2000,
                    amount: 2000,
                    currency_code: "MYR".into(),
                }),
            ],
        );
        c.points_redemption = Some(PointsRedemption { points: 500, discount_amount: 5 });

        let totals = compute_totals(&c);
        assert_eq!(totals.coupon_discount, 3000);
        assert_eq!(totals.promo_discount, 1000);
        assert_eq!(totals.points_discount, 0);
        assert_eq!(totals.discount_total, 4000);
        assert_eq!(totals.total, 0);
    }

    #[test]
    fn test_totals_rederive_percentage_after_items_change() {
        let mut c = cart(
            vec![item("a", 10_000, 1, PricingReason::Regular)],
            vec![coupon(DiscountType::Percentage, 20)],
        );
        assert_eq!(compute_totals(&c).total, 8000);

        c.items[0].quantity = 2;
        let totals = compute_totals(&c);
        assert_eq!(totals.coupon_discount, 4000);
        assert_eq!(totals.total, 16_000);
    }
}
