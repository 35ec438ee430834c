//! Purchase-with-purchase rule evaluation and reward items.

use sqlx::SqlitePool;
use std::collections::HashSet;

use super::{cart_value_excluding_pwp, ensure_active, format_amount};
use crate::errors::{AppError, AppResult};
use crate::log_info;
use crate::models::cart::{Cart, LineItem, PricingReason};
use crate::models::pwp::{PwpRule, PwpTrigger};
use crate::models::response::PricingIssueKind;
use crate::store::cart_store::{self, NewLineItem};
use crate::store::{catalog_store, pwp_store};

/// Products on non-PWP lines; these are what product triggers look for.
pub fn trigger_products(items: &[LineItem]) -> HashSet<i64> {
    items
        .iter()
        .filter(|item| !item.pricing.is_pwp())
        .map(|item| item.product_id)
        .collect()
}

/// First reason `rule` does not hold for the cart, if any.
pub fn rule_violation(
    rule: &PwpRule,
    cart_value: i64,
    products: &HashSet<i64>,
    currency_code: &str,
) -> Option<(PricingIssueKind, String)> {
    if !rule.status.is_active() {
        return Some((
            PricingIssueKind::PwpRuleInactive,
            format!("Purchase-with-purchase offer '{}' is no longer active", rule.name),
        ));
    }

    match rule.trigger {
        PwpTrigger::CartValue { threshold } if threshold > cart_value => Some((
            PricingIssueKind::PwpThresholdNotMet,
            format!(
                "Cart value {} is below the {} required for '{}'",
                format_amount(cart_value, currency_code),
                format_amount(threshold, currency_code),
                rule.name
            ),
        )),
        PwpTrigger::Product { product_id } if !products.contains(&product_id) => Some((
            PricingIssueKind::PwpTriggerProductMissing,
            format!("'{}' requires product {} in the cart", rule.name, product_id),
        )),
        _ => None,
    }
}

/// Adds the reward of `rule_id` at its PWP price. One reward per rule per cart.
pub async fn add_pwp_item(pool: &SqlitePool, cart_id: &str, rule_id: i64) -> AppResult<Cart> {
    let mut tx = pool.begin().await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    ensure_active(&cart)?;

    let rule = pwp_store::find_rule(&mut *tx, rule_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("PWP rule {}", rule_id)))?;

    let cart_value = cart_value_excluding_pwp(&cart.items);
    let products = trigger_products(&cart.items);
    if let Some((_, message)) = rule_violation(&rule, cart_value, &products, &cart.currency_code) {
        return Err(AppError::Validation(message));
    }

    let already_added = cart
        .items
        .iter()
        .any(|item| item.pricing == PricingReason::Pwp { rule_id });
    if already_added {
        return Err(AppError::Validation(format!(
            "The reward for '{}' is already in the cart",
            rule.name
        )));
    }

    let variant = catalog_store::fetch_variant(&mut *tx, rule.reward_variant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Variant {}", rule.reward_variant_id)))?;

    let item_id = cart_store::insert_item(
        &mut *tx,
        &NewLineItem {
            cart_id,
            variant_id: variant.id,
            product_id: variant.product_id,
            title: &variant.title,
            quantity: 1,
            unit_price: rule.reward_price,
            pricing: PricingReason::Pwp { rule_id },
        },
    )
    .await?;
    cart_store::touch(&mut *tx, cart_id).await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    tx.commit().await?;

    log_info!("PWP", "Reward item added", serde_json::json!({
        "cart_id": cart_id,
        "rule_id": rule_id,
        "item_id": item_id,
        "reward_price": rule.reward_price,
    }));

    Ok(cart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::discount::RuleStatus;
    use crate::pricing::cart::{add_item, create_cart};
    use crate::test_support::*;

    fn rule(trigger: PwpTrigger) -> PwpRule {
        PwpRule {
            id: 1,
            name: "Mug deal".into(),
            trigger,
            reward_variant_id: 2,
            reward_product_id: 20,
            reward_price: 100,
            status: RuleStatus::Active,
        }
    }

    #[test]
    fn test_rule_violation_kinds() {
        let products: HashSet<i64> = [10].into_iter().collect();

        let threshold = rule(PwpTrigger::CartValue { threshold: 5000 });
        assert!(rule_violation(&threshold, 5000, &products, "MYR").is_none());
        assert_eq!(
            rule_violation(&threshold, 4999, &products, "MYR").map(|(k, _)| k),
            Some(PricingIssueKind::PwpThresholdNotMet)
        );

        let product = rule(PwpTrigger::Product { product_id: 11 });
        assert_eq!(
            rule_violation(&product, 0, &products, "MYR").map(|(k, _)| k),
            Some(PricingIssueKind::PwpTriggerProductMissing)
        );

        let mut inactive = rule(PwpTrigger::Product { product_id: 10 });
        inactive.status = RuleStatus::Inactive;
        assert_eq!(
            rule_violation(&inactive, 0, &products, "MYR").map(|(k, _)| k),
            Some(PricingIssueKind::PwpRuleInactive)
        );
    }

    #[tokio::test]
    async fn test_add_pwp_item_once_per_rule() {
        let pool = memory_pool().await;
        let tea = seed_variant(&pool, 10, "Tea", 3000).await;
        let mug = seed_variant(&pool, 20, "Mug", 2500).await;
        let rule_id = seed_pwp_rule(&pool, PwpTrigger::CartValue { threshold: 5000 }, mug, 500).await;

        let cart = create_cart(&pool, None, Some("MYR")).await.expect("cart");
        add_item(&pool, &cart.id, tea, 1).await.expect("tea");

        let err = add_pwp_item(&pool, &cart.id, rule_id).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        add_item(&pool, &cart.id, tea, 1).await.expect("more tea");
        let cart = add_pwp_item(&pool, &cart.id, rule_id).await.expect("reward");
        let reward = cart.items.iter().find(|i| i.pricing.is_pwp()).expect("reward line");
        assert_eq!(reward.unit_price, 500);
        assert_eq!(reward.variant_id, mug);

        let again = add_pwp_item(&pool, &cart.id, rule_id).await.unwrap_err();
        assert!(matches!(again, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_rule_is_not_found() {
        let pool = memory_pool().await;
        let cart = create_cart(&pool, None, None).await.expect("cart");
        let err = add_pwp_item(&pool, &cart.id, 404).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
