//! Tier selection over a variant's price list.

use crate::models::cart::PricingReason;
use crate::models::catalog::PriceEntry;

/// Bulk tier with the greatest minimum that `quantity` reaches, honouring
/// `max_quantity`. Ties go to the cheaper entry.
pub fn select_tier(prices: &[PriceEntry], quantity: i64) -> Option<&PriceEntry> {
    prices
        .iter()
        .filter(|p| p.is_bulk_tier() && p.covers(quantity))
        .max_by(|a, b| {
            a.min_quantity
                .cmp(&b.min_quantity)
                .then_with(|| b.amount.cmp(&a.amount))
        })
}

/// The no-minimum price. Prefers an entry whose range also covers `quantity`.
pub fn base_price(prices: &[PriceEntry], quantity: i64) -> Option<&PriceEntry> {
    prices
        .iter()
        .find(|p| p.is_base() && p.covers(quantity))
        .or_else(|| prices.iter().find(|p| p.is_base()))
}

/// Tier that beats `current_price` for `quantity`, if any.
pub fn cheaper_tier(prices: &[PriceEntry], quantity: i64, current_price: i64) -> Option<&PriceEntry> {
    select_tier(prices, quantity).filter(|tier| tier.amount < current_price)
}

pub fn bulk_reason(tier: &PriceEntry) -> PricingReason {
    PricingReason::Bulk {
        min_quantity: tier.min_quantity.unwrap_or(1),
        tier_price: tier.amount,
    }
}

/// Regular price for a base entry; a higher compare-at price marks a sale.
pub fn base_reason(base: &PriceEntry) -> PricingReason {
    match base.compare_at_amount {
        Some(original_price) if base.is_discounted() => {
            PricingReason::VariantDiscount { original_price }
        }
        _ => PricingReason::Regular,
    }
}

/// Unit price and reason for adding `quantity` units: the qualifying bulk tier
/// when it is cheaper than the base price, otherwise the base price.
pub fn price_for_quantity(prices: &[PriceEntry], quantity: i64) -> Option<(i64, PricingReason)> {
    let base = base_price(prices, quantity);
    let tier = select_tier(prices, quantity);

    match (base, tier) {
        (Some(base), Some(tier)) if tier.amount < base.amount => Some((tier.amount, bulk_reason(tier))),
        (Some(base), _) => Some((base.amount, base_reason(base))),
        (None, Some(tier)) => Some((tier.amount, bulk_reason(tier))),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(id: i64, amount: i64, min: Option<i64>, max: Option<i64>) -> PriceEntry {
        PriceEntry {
            id,
            variant_id: 1,
            currency_code: "MYR".into(),
            amount,
            min_quantity: min,
            max_quantity: max,
            compare_at_amount: None,
        }
    }

    fn price_list() -> Vec<PriceEntry> {
        vec![
            price(1, 1000, None, None),
            price(2, 900, Some(5), Some(9)),
            price(3, 800, Some(10), None),
        ]
    }

    #[test]
    fn test_select_tier_picks_greatest_reached_minimum() {
        let prices = price_list();
        assert!(select_tier(&prices, 4).is_none());
        assert_eq!(select_tier(&prices, 5).map(|p| p.id), Some(2));
        assert_eq!(select_tier(&prices, 12).map(|p| p.id), Some(3));
    }

    #[test]
    fn test_select_tier_respects_max_quantity() {
        let prices = vec![price(1, 1000, None, None), price(2, 900, Some(5), Some(9))];
        assert!(select_tier(&prices, 10).is_none());
    }

    #[test]
    fn test_price_for_quantity() {
        let prices = price_list();
        assert_eq!(price_for_quantity(&prices, 1), Some((1000, PricingReason::Regular)));
        assert_eq!(
            price_for_quantity(&prices, 6),
            Some((900, PricingReason::Bulk { min_quantity: 5, tier_price: 900 }))
        );
        assert_eq!(price_for_quantity(&[], 1), None);
    }

    #[test]
    fn test_sale_price_is_variant_discount() {
        let mut base = price(1, 800, None, None);
        base.compare_at_amount = Some(1000);
        assert_eq!(
            price_for_quantity(&[base], 1),
            Some((800, PricingReason::VariantDiscount { original_price: 1000 }))
        );
    }

    #[test]
    fn test_cheaper_tier_requires_strict_improvement() {
        let prices = price_list();
        assert!(cheaper_tier(&prices, 6, 900).is_none());
        assert_eq!(cheaper_tier(&prices, 6, 1000).map(|p| p.id), Some(2));
    }
}
