//! Line-item pricing validation: PWP rewards and bulk tiers.
//!
//! Fixes are best effort. A collaborator failure on one item is logged, leaves
//! that item untouched and keeps its issue unresolved; it never aborts the run.

use sqlx::{SqliteConnection, SqlitePool};

use super::bulk::{base_price, bulk_reason, cheaper_tier, select_tier};
use super::pwp::{rule_violation, trigger_products};
use super::cart_value_excluding_pwp;
use crate::errors::AppResult;
use crate::models::cart::{LineItem, PricingReason};
use crate::models::response::{
    CartValidation, FixAction, PricingFix, PricingIssue, PricingIssueKind, RecommendedAction,
};
use crate::store::{cart_store, catalog_store, pwp_store};
use crate::{log_info, log_warn};

pub async fn validate_cart_pricing(
    pool: &SqlitePool,
    cart_id: &str,
    auto_fix: bool,
) -> AppResult<CartValidation> {
    let mut conn = pool.acquire().await?;

    let cart = cart_store::load_cart(&mut *conn, cart_id).await?;
    let cart_value = cart_value_excluding_pwp(&cart.items);
    let products = trigger_products(&cart.items);

    let mut issues: Vec<PricingIssue> = Vec::new();
    let mut unresolved: Vec<PricingIssue> = Vec::new();
    let mut fixes: Vec<PricingFix> = Vec::new();

    for item in &cart.items {
        match item.pricing {
            PricingReason::Pwp { rule_id } => {
                let violation = match pwp_store::find_rule(&mut *conn, rule_id).await {
                    Ok(Some(rule)) => rule_violation(&rule, cart_value, &products, &cart.currency_code),
                    Ok(None) => Some((
                        PricingIssueKind::PwpRuleNotFound,
                        format!("Purchase-with-purchase rule {} no longer exists", rule_id),
                    )),
                    Err(e) => {
                        log_warn!("PWP", "Rule lookup failed", serde_json::json!({
                            "rule_id": rule_id,
                            "error": e.to_string(),
                        }));
                        Some((
                            PricingIssueKind::PwpRuleNotFound,
                            format!("Purchase-with-purchase rule {} could not be loaded", rule_id),
                        ))
                    }
                };

                let Some((kind, message)) = violation else { continue };
                let issue = PricingIssue {
                    item_id: item.id.clone(),
                    variant_id: item.variant_id,
                    kind,
                    message,
                    action: RecommendedAction::RemoveItem,
                };

                if auto_fix {
                    match remove_item(&mut *conn, item).await {
                        Some(fix) => fixes.push(fix),
                        None => unresolved.push(issue.clone()),
                    }
                }
                issues.push(issue);
            }
            PricingReason::Bulk { min_quantity, .. } if item.quantity < min_quantity => {
                let issue = PricingIssue {
                    item_id: item.id.clone(),
                    variant_id: item.variant_id,
                    kind: PricingIssueKind::BulkQuantityBelowMinimum,
                    message: format!(
                        "Quantity {} is below the bulk minimum of {}",
                        item.quantity, min_quantity
                    ),
                    action: RecommendedAction::RevertToRegularPrice,
                };

                if auto_fix {
                    match reprice_below_minimum(&mut *conn, item, &cart.currency_code).await {
                        Some(fix) => fixes.push(fix),
                        None => unresolved.push(issue.clone()),
                    }
                }
                issues.push(issue);
            }
            _ => {}
        }
    }

    if auto_fix {
        // Items that now qualify for a cheaper tier
        match cart_store::fetch_items(&mut *conn, cart_id).await {
            Ok(items) => {
                for item in items.iter().filter(|i| {
                    matches!(i.pricing, PricingReason::Regular | PricingReason::Bulk { .. })
                }) {
                    if let Some(fix) = upgrade_tier(&mut *conn, item, &cart.currency_code).await {
                        fixes.push(fix);
                    }
                }
            }
            Err(e) => {
                log_warn!("BULK", "Could not reload items for tier upgrades", serde_json::json!({
                    "cart_id": cart_id,
                    "error": e.to_string(),
                }));
            }
        }

        if !fixes.is_empty() {
            cart_store::touch(&mut *conn, cart_id).await?;
        }
    }

    let refreshed = if auto_fix {
        Some(cart_store::load_cart(&mut *conn, cart_id).await?)
    } else {
        None
    };
    let cart_value_excluding_pwp = refreshed
        .as_ref()
        .map_or(cart_value, |c| super::cart_value_excluding_pwp(&c.items));

    let is_valid = issues.is_empty() || (auto_fix && unresolved.is_empty());
    let reported = if auto_fix { unresolved } else { issues };

    if auto_fix && !fixes.is_empty() {
        log_info!("CART", "Pricing fixes applied", serde_json::json!({
            "cart_id": cart_id,
            "fixes": fixes.len(),
            "unresolved": reported.len(),
        }));
    }

    Ok(CartValidation {
        is_valid,
        issues: reported,
        fixes_applied: fixes,
        cart_value_excluding_pwp,
        cart: refreshed,
    })
}

async fn remove_item(conn: &mut SqliteConnection, item: &LineItem) -> Option<PricingFix> {
    match cart_store::delete_item(conn, &item.id).await {
        Ok(()) => Some(PricingFix {
            item_id: item.id.clone(),
            action: FixAction::RemovedItem,
            old_price: item.unit_price,
            new_price: None,
            description: format!("Removed '{}': offer conditions no longer met", item.title),
        }),
        Err(e) => {
            log_warn!("PWP", "Could not remove reward item", serde_json::json!({
                "item_id": item.id,
                "error": e.to_string(),
            }));
            None
        }
    }
}

/// Lower tier that still applies, else the base price.
async fn reprice_below_minimum(
    conn: &mut SqliteConnection,
    item: &LineItem,
    currency_code: &str,
) -> Option<PricingFix> {
    let prices = match catalog_store::list_prices(conn, item.variant_id, currency_code).await {
        Ok(prices) => prices,
        Err(e) => {
            log_warn!("BULK", "Price lookup failed", serde_json::json!({
                "variant_id": item.variant_id,
                "error": e.to_string(),
            }));
            return None;
        }
    };

    let (unit_price, pricing, action, description) = if let Some(tier) = select_tier(&prices, item.quantity) {
        (
            tier.amount,
            bulk_reason(tier),
            FixAction::AppliedLowerTier,
            format!(
                "Applied the {}+ tier price for quantity {}",
                tier.min_quantity.unwrap_or(1),
                item.quantity
            ),
        )
    } else if let Some(base) = base_price(&prices, item.quantity) {
        (
            base.amount,
            PricingReason::Regular,
            FixAction::RevertedToRegularPrice,
            format!("Reverted '{}' to the regular price", item.title),
        )
    } else {
        log_warn!("BULK", "No base price to revert to", serde_json::json!({
            "item_id": item.id,
            "variant_id": item.variant_id,
            "currency": currency_code,
        }));
        return None;
    };

    match cart_store::update_item_pricing(conn, &item.id, unit_price, &pricing).await {
        Ok(()) => Some(PricingFix {
            item_id: item.id.clone(),
            action,
            old_price: item.unit_price,
            new_price: Some(unit_price),
            description,
        }),
        Err(e) => {
            log_warn!("BULK", "Could not reprice item", serde_json::json!({
                "item_id": item.id,
                "error": e.to_string(),
            }));
            None
        }
    }
}

async fn upgrade_tier(conn: &mut SqliteConnection, item: &LineItem, currency_code: &str) -> Option<PricingFix> {
    let prices = catalog_store::list_prices(conn, item.variant_id, currency_code).await.ok()?;
    let tier = cheaper_tier(&prices, item.quantity, item.unit_price)?;
    let pricing = bulk_reason(tier);

    if let Err(e) = cart_store::update_item_pricing(conn, &item.id, tier.amount, &pricing).await {
        log_warn!("BULK", "Could not upgrade tier", serde_json::json!({
            "item_id": item.id,
            "error": e.to_string(),
        }));
        return None;
    }

    Some(PricingFix {
        item_id: item.id.clone(),
        action: FixAction::UpgradedBulkTier,
        old_price: item.unit_price,
        new_price: Some(tier.amount),
        description: format!(
            "Quantity {} qualifies for the {}+ tier price",
            item.quantity,
            tier.min_quantity.unwrap_or(1)
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pwp::PwpTrigger;
    use crate::pricing::cart::{add_item, create_cart, update_item_quantity};
    use crate::pricing::pwp::add_pwp_item;
    use crate::test_support::*;

    #[tokio::test]
    async fn test_clean_cart_is_valid() {
        let pool = memory_pool().await;
        let soap = seed_variant(&pool, 1, "Soap", 1000).await;
        let cart = create_cart(&pool, None, None).await.expect("cart");
        add_item(&pool, &cart.id, soap, 2).await.expect("add");

        let result = validate_cart_pricing(&pool, &cart.id, false).await.expect("validate");
        assert!(result.is_valid);
        assert!(result.issues.is_empty());
        assert!(result.cart.is_none());
        assert_eq!(result.cart_value_excluding_pwp, 2000);
    }

    #[tokio::test]
    async fn test_bulk_below_minimum_reverts_to_base_price() {
        let pool = memory_pool().await;
        let soap = seed_variant(&pool, 1, "Soap", 1000).await;
        seed_tier(&pool, soap, 800, 5, None).await;

        let cart = create_cart(&pool, None, None).await.expect("cart");
        let cart = add_item(&pool, &cart.id, soap, 5).await.expect("add");
        let item_id = cart.items[0].id.clone();
        update_item_quantity(&pool, &cart.id, &item_id, 3).await.expect("shrink");

        let report = validate_cart_pricing(&pool, &cart.id, false).await.expect("report");
        assert!(!report.is_valid);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, PricingIssueKind::BulkQuantityBelowMinimum);
        assert_eq!(report.issues[0].action, RecommendedAction::RevertToRegularPrice);

        let fixed = validate_cart_pricing(&pool, &cart.id, true).await.expect("fix");
        assert!(fixed.is_valid);
        assert!(fixed.issues.is_empty());
        assert_eq!(fixed.fixes_applied[0].action, FixAction::RevertedToRegularPrice);

        let cart = fixed.cart.expect("refreshed cart");
        assert_eq!(cart.items[0].unit_price, 1000);
        assert_eq!(cart.items[0].pricing, PricingReason::Regular);
        assert!(!cart.items[0].pricing.is_bulk());
    }

    #[tokio::test]
    async fn test_bulk_below_minimum_falls_to_lower_tier() {
        let pool = memory_pool().await;
        let soap = seed_variant(&pool, 1, "Soap", 1000).await;
        seed_tier(&pool, soap, 900, 3, Some(9)).await;
        seed_tier(&pool, soap, 800, 10, None).await;

        let cart = create_cart(&pool, None, None).await.expect("cart");
        let cart = add_item(&pool, &cart.id, soap, 10).await.expect("add");
        let item_id = cart.items[0].id.clone();
        update_item_quantity(&pool, &cart.id, &item_id, 4).await.expect("shrink");

        let fixed = validate_cart_pricing(&pool, &cart.id, true).await.expect("fix");
        assert!(fixed.is_valid);
        assert_eq!(fixed.fixes_applied[0].action, FixAction::AppliedLowerTier);
        let cart = fixed.cart.expect("cart");
        assert_eq!(cart.items[0].pricing, PricingReason::Bulk { min_quantity: 3, tier_price: 900 });
    }

    #[tokio::test]
    async fn test_regular_item_upgraded_to_tier() {
        let pool = memory_pool().await;
        let soap = seed_variant(&pool, 1, "Soap", 1000).await;
        seed_tier(&pool, soap, 800, 5, None).await;

        let cart = create_cart(&pool, None, None).await.expect("cart");
        let cart = add_item(&pool, &cart.id, soap, 1).await.expect("add");
        let item_id = cart.items[0].id.clone();
        update_item_quantity(&pool, &cart.id, &item_id, 6).await.expect("grow");

        let fixed = validate_cart_pricing(&pool, &cart.id, true).await.expect("fix");
        assert!(fixed.is_valid);
        assert_eq!(fixed.fixes_applied.len(), 1);
        assert_eq!(fixed.fixes_applied[0].action, FixAction::UpgradedBulkTier);
        assert_eq!(fixed.cart.expect("cart").items[0].unit_price, 800);
    }

    #[tokio::test]
    async fn test_pwp_reward_removed_when_threshold_lost() {
        let pool = memory_pool().await;
        let tea = seed_variant(&pool, 10, "Tea", 3000).await;
        let mug = seed_variant(&pool, 20, "Mug", 2500).await;
        let rule_id = seed_pwp_rule(&pool, PwpTrigger::CartValue { threshold: 5000 }, mug, 500).await;

        let cart = create_cart(&pool, None, None).await.expect("cart");
        let cart = add_item(&pool, &cart.id, tea, 2).await.expect("tea");
        let tea_line = cart.items[0].id.clone();
        add_pwp_item(&pool, &cart.id, rule_id).await.expect("reward");
        update_item_quantity(&pool, &cart.id, &tea_line, 1).await.expect("shrink");

        let report = validate_cart_pricing(&pool, &cart.id, false).await.expect("report");
        assert!(!report.is_valid);
        assert_eq!(report.issues[0].kind, PricingIssueKind::PwpThresholdNotMet);
        assert_eq!(report.issues[0].action, RecommendedAction::RemoveItem);
        assert_eq!(report.cart_value_excluding_pwp, 3000);

        let fixed = validate_cart_pricing(&pool, &cart.id, true).await.expect("fix");
        assert!(fixed.is_valid);
        assert_eq!(fixed.fixes_applied[0].action, FixAction::RemovedItem);
        let cart = fixed.cart.expect("cart");
        assert_eq!(cart.items.len(), 1);
        assert!(!cart.items[0].pricing.is_pwp());
    }

    #[tokio::test]
    async fn test_unresolvable_bulk_issue_stays_invalid() {
        let pool = memory_pool().await;
        let soap = seed_variant(&pool, 1, "Soap", 1000).await;
        seed_tier(&pool, soap, 800, 5, None).await;

        let cart = create_cart(&pool, None, None).await.expect("cart");
        let cart = add_item(&pool, &cart.id, soap, 5).await.expect("add");
        let item_id = cart.items[0].id.clone();
        update_item_quantity(&pool, &cart.id, &item_id, 2).await.expect("shrink");

        // Drop every base price: nothing to revert to
        sqlx::query("DELETE FROM prices WHERE min_quantity IS NULL")
            .execute(&pool)
            .await
            .expect("delete base");

        let fixed = validate_cart_pricing(&pool, &cart.id, true).await.expect("fix");
        assert!(!fixed.is_valid);
        assert_eq!(fixed.issues.len(), 1);
        assert!(fixed.fixes_applied.is_empty());
        assert_eq!(fixed.cart.expect("cart").items[0].unit_price, 800);
    }
}
