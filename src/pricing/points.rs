//! Loyalty points: earning, redemption against a cart, reversals and admin
//! adjustments.
//!
//! Every mutation reads the balance (creating a zero row if needed), updates it
//! and appends one ledger row whose `balance_after` is the new balance, inside a
//! single database transaction.

use sqlx::{SqliteConnection, SqlitePool};

use super::{compute_totals, ensure_active};
use crate::errors::{AppError, AppResult};
use crate::log_ledger;
use crate::models::cart::PointsRedemption;
use crate::models::points::{
    tier_for, PointsBalance, PointsSettings, PointsSummary, PointsTransactionKind, ReversalKind,
    ReversalOutcome, UpdatePointsSettingsPayload,
};
use crate::models::response::RedemptionResult;
use crate::store::points_store::{self, NewPointsTransaction};
use crate::store::{cart_store, customer_store, settings_store};
use crate::validation::{validate_points_settings, validate_reason};

const RECENT_TRANSACTIONS: i64 = 20;

/// Writes the new balance, then the ledger row that explains it.
async fn record(
    conn: &mut SqliteConnection,
    balance: &PointsBalance,
    kind: PointsTransactionKind,
    points: i64,
    reference_id: Option<&str>,
    description: &str,
    created_by: Option<&str>,
) -> AppResult<()> {
    points_store::save_balance(conn, balance).await?;
    points_store::insert_transaction(
        conn,
        &NewPointsTransaction {
            customer_id: &balance.customer_id,
            kind,
            points,
            balance_after: balance.balance,
            reference_id,
            description,
            created_by,
        },
    )
    .await?;

    log_ledger!(
        "points_transaction",
        &serde_json::json!({
            "customer_id": balance.customer_id,
            "kind": kind,
            "points": points,
            "balance_after": balance.balance,
            "reference_id": reference_id,
        })
    );
    Ok(())
}

/// Credits points for a completed order on an open connection or transaction.
/// Returns the points credited; 0 writes nothing.
pub(crate) async fn credit_order_points(
    conn: &mut SqliteConnection,
    customer_id: &str,
    order_id: &str,
    order_total: i64,
) -> AppResult<i64> {
    let settings = settings_store::load_points_settings(conn).await?;
    if !settings.is_enabled {
        return Ok(0);
    }

    let mut balance = points_store::ensure_balance(conn, customer_id).await?;
    let tiers = points_store::list_tiers(conn).await?;
    let multiplier = tier_for(&tiers, balance.total_earned).map_or(1.0, |t| t.points_multiplier);

    let points = settings.points_for(order_total, multiplier);
    if points <= 0 {
        return Ok(0);
    }

    balance.balance += points;
    balance.total_earned += points;
    record(
        conn,
        &balance,
        PointsTransactionKind::Earned,
        points,
        Some(order_id),
        &format!("Earned from order {}", order_id),
        None,
    )
    .await?;

    Ok(points)
}

pub async fn earn_points(
    pool: &SqlitePool,
    customer_id: &str,
    order_id: &str,
    order_total: i64,
) -> AppResult<i64> {
    let mut tx = pool.begin().await?;
    let points = credit_order_points(&mut *tx, customer_id, order_id, order_total).await?;
    tx.commit().await?;
    Ok(points)
}

/// Spends `points` as a discount on the customer's cart.
pub async fn redeem_points(
    pool: &SqlitePool,
    cart_id: &str,
    customer_id: &str,
    points: i64,
) -> AppResult<RedemptionResult> {
    let mut tx = pool.begin().await?;

    let settings = settings_store::load_points_settings(&mut *tx).await?;
    if !settings.is_enabled {
        return Err(AppError::Validation("The points system is disabled".into()));
    }
    if points < 1 {
        return Err(AppError::Validation("Points to redeem must be at least 1".into()));
    }

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    ensure_active(&cart)?;
    if !cart.is_owned_by(customer_id) {
        return Err(AppError::Forbidden(format!("Cart {} belongs to another customer", cart_id)));
    }
    if cart.points_redemption.is_some() {
        return Err(AppError::Validation("Points are already redeemed on this cart".into()));
    }

    let mut balance = points_store::fetch_balance(&mut *tx, customer_id)
        .await?
        .ok_or_else(|| AppError::Validation("Customer has no points balance".into()))?;

    if points < settings.min_redeem {
        return Err(AppError::Validation(format!(
            "Minimum redemption is {} points",
            settings.min_redeem
        )));
    }
    if let Some(max) = settings.max_redeem_limit() {
        if points > max {
            return Err(AppError::Validation(format!("Maximum redemption is {} points", max)));
        }
    }
    if points > balance.balance {
        return Err(AppError::Validation(format!(
            "Insufficient points: {} available",
            balance.balance
        )));
    }

    let discount_amount = settings.redemption_value(points);
    if discount_amount < 1 {
        return Err(AppError::Validation(format!(
            "{} points are not worth any discount",
            points
        )));
    }
    let payable = compute_totals(&cart).total;
    if discount_amount > payable {
        return Err(AppError::Validation(
            "Points discount exceeds the cart total after other discounts".into(),
        ));
    }

    balance.balance -= points;
    balance.total_redeemed += points;
    record(
        &mut *tx,
        &balance,
        PointsTransactionKind::Redeemed,
        -points,
        Some(cart_id),
        &format!("Redeemed on cart {}", cart_id),
        None,
    )
    .await?;

    cart_store::set_points_redemption(
        &mut *tx,
        cart_id,
        Some(PointsRedemption { points, discount_amount }),
    )
    .await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    tx.commit().await?;

    Ok(RedemptionResult {
        points_redeemed: points,
        discount_amount,
        new_balance: balance.balance,
        totals: compute_totals(&cart),
    })
}

/// Gives back the points redeemed on a cart that has not been checked out.
pub async fn cancel_cart_redemption(
    pool: &SqlitePool,
    cart_id: &str,
    customer_id: &str,
) -> AppResult<PointsBalance> {
    let mut tx = pool.begin().await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    ensure_active(&cart)?;
    if !cart.is_owned_by(customer_id) {
        return Err(AppError::Forbidden(format!("Cart {} belongs to another customer", cart_id)));
    }
    let redemption = cart
        .points_redemption
        .ok_or_else(|| AppError::Validation("No points are redeemed on this cart".into()))?;

    let mut balance = points_store::ensure_balance(&mut *tx, customer_id).await?;
    balance.balance += redemption.points;
    balance.total_redeemed = (balance.total_redeemed - redemption.points).max(0);
    record(
        &mut *tx,
        &balance,
        PointsTransactionKind::CancelAdjustment,
        redemption.points,
        Some(cart_id),
        &format!("Redemption cancelled on cart {}", cart_id),
        None,
    )
    .await?;

    cart_store::set_points_redemption(&mut *tx, cart_id, None).await?;
    tx.commit().await?;
    Ok(balance)
}

/// Two independent legs: take back earned points (capped at the balance) and
/// return redeemed points (always in full). A zero leg writes nothing.
pub(crate) async fn reverse_points(
    conn: &mut SqliteConnection,
    customer_id: &str,
    order_id: &str,
    earned_to_deduct: i64,
    redeemed_to_restore: i64,
    kind: ReversalKind,
) -> AppResult<ReversalOutcome> {
    let mut balance = points_store::ensure_balance(conn, customer_id).await?;
    let mut outcome = ReversalOutcome::default();
    let label = match kind {
        ReversalKind::Return => "return",
        ReversalKind::Cancel => "cancellation",
    };

    let deduct = earned_to_deduct.max(0).min(balance.balance);
    if deduct > 0 {
        balance.balance -= deduct;
        balance.total_earned = (balance.total_earned - deduct).max(0);
        record(
            conn,
            &balance,
            kind.transaction_kind(),
            -deduct,
            Some(order_id),
            &format!("Earned points reversed for {} of order {}", label, order_id),
            None,
        )
        .await?;
        outcome.points_deducted = deduct;
    }

    if redeemed_to_restore > 0 {
        balance.balance += redeemed_to_restore;
        balance.total_redeemed = (balance.total_redeemed - redeemed_to_restore).max(0);
        record(
            conn,
            &balance,
            kind.transaction_kind(),
            redeemed_to_restore,
            Some(order_id),
            &format!("Redeemed points restored for {} of order {}", label, order_id),
            None,
        )
        .await?;
        outcome.points_restored = redeemed_to_restore;
    }

    outcome.balance_after = balance.balance;
    Ok(outcome)
}

pub async fn reverse_order_points(
    pool: &SqlitePool,
    customer_id: &str,
    order_id: &str,
    earned_to_deduct: i64,
    redeemed_to_restore: i64,
    kind: ReversalKind,
) -> AppResult<ReversalOutcome> {
    let mut tx = pool.begin().await?;
    let outcome = reverse_points(
        &mut *tx,
        customer_id,
        order_id,
        earned_to_deduct,
        redeemed_to_restore,
        kind,
    )
    .await?;
    tx.commit().await?;
    Ok(outcome)
}

/// Manual correction by an admin. Lifetime totals are left alone.
pub async fn adjust_points(
    pool: &SqlitePool,
    customer_id: &str,
    delta: i64,
    reason: &str,
    actor_id: &str,
) -> AppResult<PointsBalance> {
    if delta == 0 {
        return Err(AppError::Validation("Adjustment must not be zero".into()));
    }
    validate_reason(reason).map_err(AppError::Validation)?;

    let mut tx = pool.begin().await?;

    customer_store::fetch(&mut *tx, customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer {}", customer_id)))?;

    let mut balance = points_store::ensure_balance(&mut *tx, customer_id).await?;
    let new_balance = balance.balance.checked_add(delta).ok_or_else(|| {
        AppError::Validation(format!("Adjustment of {} is out of range", delta))
    })?;
    if new_balance < 0 {
        return Err(AppError::Validation(format!(
            "Adjustment of {} would leave a negative balance ({} available)",
            delta, balance.balance
        )));
    }

    balance.balance = new_balance;
    record(
        &mut *tx,
        &balance,
        PointsTransactionKind::AdminAdjustment,
        delta,
        None,
        reason.trim(),
        Some(actor_id),
    )
    .await?;

    tx.commit().await?;
    Ok(balance)
}

pub async fn get_points_summary(pool: &SqlitePool, customer_id: &str) -> AppResult<PointsSummary> {
    let mut conn = pool.acquire().await?;

    let balance = points_store::fetch_balance(&mut *conn, customer_id)
        .await?
        .unwrap_or_else(|| PointsBalance {
            customer_id: customer_id.to_string(),
            ..PointsBalance::default()
        });
    let tiers = points_store::list_tiers(&mut *conn).await?;
    let recent_transactions =
        points_store::recent_transactions(&mut *conn, customer_id, RECENT_TRANSACTIONS).await?;
    let settings = settings_store::load_points_settings(&mut *conn).await?;

    Ok(PointsSummary {
        tier: tier_for(&tiers, balance.total_earned).cloned(),
        balance,
        recent_transactions,
        settings,
    })
}

/// Merges the given fields over the stored settings.
pub async fn update_points_settings(
    pool: &SqlitePool,
    payload: &UpdatePointsSettingsPayload,
) -> AppResult<PointsSettings> {
    let mut tx = pool.begin().await?;

    let current = settings_store::load_points_settings(&mut *tx).await?;
    let updated = PointsSettings {
        is_enabled: payload.is_enabled.unwrap_or(current.is_enabled),
        earn_type: payload.earn_type.unwrap_or(current.earn_type),
        earn_rate: payload.earn_rate.unwrap_or(current.earn_rate),
        redemption_rate: payload.redemption_rate.unwrap_or(current.redemption_rate),
        min_redeem: payload.min_redeem.unwrap_or(current.min_redeem),
        max_redeem: payload.max_redeem.unwrap_or(current.max_redeem),
    };
    validate_points_settings(&updated).map_err(AppError::Validation)?;

    settings_store::save_points_settings(&mut *tx, &updated).await?;
    tx.commit().await?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::customer::CustomerRole;
    use crate::pricing::cart::{add_item, create_cart};
    use crate::test_support::*;

    async fn ledger(pool: &SqlitePool, customer_id: &str) -> Vec<(String, i64, i64)> {
        sqlx::query_as(
            "SELECT kind, points, balance_after FROM points_transactions
             WHERE customer_id = ? ORDER BY id",
        )
        .bind(customer_id)
        .fetch_all(pool)
        .await
        .expect("ledger")
    }

    async fn balance_of(pool: &SqlitePool, customer_id: &str) -> PointsBalance {
        get_points_summary(pool, customer_id).await.expect("summary").balance
    }

    #[tokio::test]
    async fn test_earn_uses_tier_multiplier() {
        let pool = memory_pool().await;
        let customer = seed_customer(&pool, "Aina", CustomerRole::Customer).await;
        {
            let mut conn = pool.acquire().await.expect("conn");
            points_store::insert_tier(&mut *conn, "Base", 0, 2.0).await.expect("tier");
        }

        // per_currency at 1.0: 123.45 * 2.0 = 246.9
        let earned = earn_points(&pool, &customer, "ord_1", 12_345).await.expect("earn");
        assert_eq!(earned, 246);

        let balance = balance_of(&pool, &customer).await;
        assert_eq!(balance.balance, 246);
        assert_eq!(balance.total_earned, 246);
        assert_eq!(ledger(&pool, &customer).await, vec![("earned".to_string(), 246, 246)]);
    }

    #[tokio::test]
    async fn test_earn_disabled_or_zero_writes_nothing() {
        let pool = memory_pool().await;
        let customer = seed_customer(&pool, "Aina", CustomerRole::Customer).await;

        assert_eq!(earn_points(&pool, &customer, "ord_1", 50).await.expect("earn"), 0);
        set_setting(&pool, "points.is_enabled", "0").await;
        assert_eq!(earn_points(&pool, &customer, "ord_2", 50_000).await.expect("earn"), 0);
        assert!(ledger(&pool, &customer).await.is_empty());
    }

    #[tokio::test]
    async fn test_redeem_against_cart() {
        let pool = memory_pool().await;
        let customer = seed_customer(&pool, "Aina", CustomerRole::Customer).await;
        give_points(&pool, &customer, 1000).await;
        set_setting(&pool, "points.redemption_rate", "1").await;

        let variant = seed_variant(&pool, 1, "Tea", 5000).await;
        let cart = create_cart(&pool, Some(&customer), None).await.expect("cart");
        add_item(&pool, &cart.id, variant, 1).await.expect("add");

        let result = redeem_points(&pool, &cart.id, &customer, 300).await.expect("redeem");
        assert_eq!(result.discount_amount, 300);
        assert_eq!(result.new_balance, 700);
        assert_eq!(result.totals.total, 4700);

        let twice = redeem_points(&pool, &cart.id, &customer, 100).await;
        assert!(matches!(twice, Err(AppError::Validation(_))));

        let balance = cancel_cart_redemption(&pool, &cart.id, &customer).await.expect("cancel");
        assert_eq!(balance.balance, 1000);
        assert_eq!(balance.total_redeemed, 0);

        let kinds: Vec<String> = ledger(&pool, &customer).await.into_iter().map(|(k, _, _)| k).collect();
        assert_eq!(kinds, vec!["redeemed", "cancel_adjustment"]);
    }

    #[tokio::test]
    async fn test_redeem_rejections() {
        let pool = memory_pool().await;
        let customer = seed_customer(&pool, "Aina", CustomerRole::Customer).await;
        let variant = seed_variant(&pool, 1, "Tea", 500).await;
        let cart = create_cart(&pool, Some(&customer), None).await.expect("cart");
        add_item(&pool, &cart.id, variant, 1).await.expect("add");

        // No balance row yet
        let none = redeem_points(&pool, &cart.id, &customer, 100).await;
        assert!(matches!(none, Err(AppError::Validation(_))));

        give_points(&pool, &customer, 200).await;
        let below_min = redeem_points(&pool, &cart.id, &customer, 50).await;
        assert!(matches!(below_min, Err(AppError::Validation(_))));
        let too_many = redeem_points(&pool, &cart.id, &customer, 500).await;
        assert!(matches!(too_many, Err(AppError::Validation(_))));

        set_setting(&pool, "points.redemption_rate", "10").await;
        let exceeds_total = redeem_points(&pool, &cart.id, &customer, 100).await;
        assert!(matches!(exceeds_total, Err(AppError::Validation(_))));

        assert_eq!(balance_of(&pool, &customer).await.balance, 200);
    }

    #[tokio::test]
    async fn test_reversal_caps_deduction_but_restores_fully() {
        let pool = memory_pool().await;
        let customer = seed_customer(&pool, "Aina", CustomerRole::Customer).await;
        give_points(&pool, &customer, 30).await;

        let outcome = reverse_order_points(&pool, &customer, "ord_1", 100, 40, ReversalKind::Return)
            .await
            .expect("reverse");
        assert_eq!(outcome.points_deducted, 30);
        assert_eq!(outcome.points_restored, 40);
        assert_eq!(outcome.balance_after, 40);

        let rows = ledger(&pool, &customer).await;
        assert_eq!(
            rows,
            vec![
                ("return_adjustment".to_string(), -30, 0),
                ("return_adjustment".to_string(), 40, 40),
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_legs_write_nothing() {
        let pool = memory_pool().await;
        let customer = seed_customer(&pool, "Aina", CustomerRole::Customer).await;
        let outcome = reverse_order_points(&pool, &customer, "ord_1", 10, 0, ReversalKind::Cancel)
            .await
            .expect("reverse");
        assert_eq!(outcome, ReversalOutcome::default());
        assert!(ledger(&pool, &customer).await.is_empty());
    }

    #[tokio::test]
    async fn test_admin_adjustment() {
        let pool = memory_pool().await;
        let customer = seed_customer(&pool, "Aina", CustomerRole::Customer).await;
        let admin = seed_customer(&pool, "Boss", CustomerRole::Admin).await;

        let balance = adjust_points(&pool, &customer, 50, "Goodwill", &admin).await.expect("credit");
        assert_eq!(balance.balance, 50);
        assert_eq!(balance.total_earned, 0);

        let negative = adjust_points(&pool, &customer, -51, "Oops", &admin).await;
        assert!(matches!(negative, Err(AppError::Validation(_))));
        let no_reason = adjust_points(&pool, &customer, 5, "  ", &admin).await;
        assert!(matches!(no_reason, Err(AppError::Validation(_))));
        let zero = adjust_points(&pool, &customer, 0, "Nothing", &admin).await;
        assert!(matches!(zero, Err(AppError::Validation(_))));

        let created_by: (Option<String>,) =
            sqlx::query_as("SELECT created_by FROM points_transactions WHERE customer_id = ?")
                .bind(&customer)
                .fetch_one(&pool)
                .await
                .expect("row");
        assert_eq!(created_by.0.as_deref(), Some(admin.as_str()));
    }

    #[tokio::test]
    async fn test_admin_adjustment_out_of_range() {
        let pool = memory_pool().await;
        let customer = seed_customer(&pool, "Aina", CustomerRole::Customer).await;
        give_points(&pool, &customer, 10).await;

        let huge = adjust_points(&pool, &customer, i64::MAX, "Bonus", "admin").await;
        assert!(matches!(huge, Err(AppError::Validation(_))));
        let tiny = adjust_points(&pool, &customer, i64::MIN, "Bonus", "admin").await;
        assert!(matches!(tiny, Err(AppError::Validation(_))));

        let summary = get_points_summary(&pool, &customer).await.expect("summary");
        assert_eq!(summary.balance.balance, 10);
        assert!(summary.recent_transactions.is_empty());
    }

    #[tokio::test]
    async fn test_update_settings_merges_and_validates() {
        let pool = memory_pool().await;
        let updated = update_points_settings(
            &pool,
            &UpdatePointsSettingsPayload {
                is_enabled: None,
                earn_type: None,
                earn_rate: Some(2.5),
                redemption_rate: None,
                min_redeem: None,
                max_redeem: Some(5000),
            },
        )
        .await
        .expect("update");
        assert_eq!(updated.earn_rate, 2.5);
        assert_eq!(updated.max_redeem, 5000);

        let bad = update_points_settings(
            &pool,
            &UpdatePointsSettingsPayload {
                is_enabled: None,
                earn_type: None,
                earn_rate: None,
                redemption_rate: Some(0.0),
                min_redeem: None,
                max_redeem: None,
            },
        )
        .await;
        assert!(matches!(bad, Err(AppError::Validation(_))));
    }
}
