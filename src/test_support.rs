//! Fixtures for engine tests: an in-memory database plus seeding helpers.

use sqlx::SqlitePool;

use crate::database::connection::init_memory_db;
use crate::models::catalog::{CreatePricePayload, CreateVariantPayload};
use crate::models::coupon::CreateCouponPayload;
use crate::models::customer::{CreateCustomerPayload, CustomerRole};
use crate::models::discount::DiscountType;
use crate::models::points::PointsBalance;
use crate::models::promo::{CreateMembershipPromoPayload, MembershipStatus};
use crate::models::pwp::{CreatePwpRulePayload, PwpTrigger};
use crate::store::{catalog_store, coupon_store, customer_store, points_store, promo_store, pwp_store};

pub async fn memory_pool() -> SqlitePool {
    init_memory_db().await.expect("memory db")
}

pub async fn seed_customer(pool: &SqlitePool, name: &str, role: CustomerRole) -> String {
    let mut conn = pool.acquire().await.expect("conn");
    let payload = CreateCustomerPayload {
        email: format!("{}@shop.test", name.to_lowercase().replace(' ', ".")),
        name: name.to_string(),
        role: Some(role),
    };
    customer_store::insert(&mut *conn, &payload).await.expect("customer")
}

pub async fn seed_member(pool: &SqlitePool, name: &str) -> String {
    let customer_id = seed_customer(pool, name, CustomerRole::Customer).await;
    let mut conn = pool.acquire().await.expect("conn");
    promo_store::upsert_membership(&mut *conn, &customer_id, MembershipStatus::Active)
        .await
        .expect("membership");
    customer_id
}

/// Variant with a single base price in MYR.
pub async fn seed_variant(pool: &SqlitePool, product_id: i64, title: &str, base_price: i64) -> i64 {
    let mut conn = pool.acquire().await.expect("conn");
    let variant_id = catalog_store::insert_variant(
        &mut *conn,
        &CreateVariantPayload { product_id, title: title.to_string() },
    )
    .await
    .expect("variant");
    catalog_store::insert_price(
        &mut *conn,
        &CreatePricePayload {
            variant_id,
            currency_code: "MYR".into(),
            amount: base_price,
            min_quantity: None,
            max_quantity: None,
            compare_at_amount: None,
        },
    )
    .await
    .expect("base price");
    variant_id
}

pub async fn seed_tier(pool: &SqlitePool, variant_id: i64, amount: i64, min: i64, max: Option<i64>) {
    let mut conn = pool.acquire().await.expect("conn");
    catalog_store::insert_price(
        &mut *conn,
        &CreatePricePayload {
            variant_id,
            currency_code: "MYR".into(),
            amount,
            min_quantity: Some(min),
            max_quantity: max,
            compare_at_amount: None,
        },
    )
    .await
    .expect("tier price");
}

pub async fn seed_coupon(pool: &SqlitePool, code: &str, discount_type: DiscountType, value: i64) -> i64 {
    seed_coupon_with(
        pool,
        CreateCouponPayload {
            code: code.to_string(),
            name: format!("{} coupon", code),
            discount_type,
            value,
            starts_at: None,
            ends_at: None,
            usage_limit: None,
        },
    )
    .await
}

pub async fn seed_coupon_with(pool: &SqlitePool, payload: CreateCouponPayload) -> i64 {
    let mut conn = pool.acquire().await.expect("conn");
    coupon_store::insert(&mut *conn, &payload).await.expect("coupon")
}

pub async fn seed_promo(
    pool: &SqlitePool,
    name: &str,
    discount_type: DiscountType,
    value: i64,
    min_purchase: i64,
) -> i64 {
    let mut conn = pool.acquire().await.expect("conn");
    promo_store::insert(
        &mut *conn,
        &CreateMembershipPromoPayload {
            name: name.to_string(),
            discount_type,
            value,
            min_purchase,
            start_date: None,
            end_date: None,
        },
    )
    .await
    .expect("promo")
}

pub async fn seed_pwp_rule(
    pool: &SqlitePool,
    trigger: PwpTrigger,
    reward_variant_id: i64,
    reward_price: i64,
) -> i64 {
    let mut conn = pool.acquire().await.expect("conn");
    let variant = catalog_store::fetch_variant(&mut *conn, reward_variant_id)
        .await
        .expect("lookup")
        .expect("reward variant");
    pwp_store::insert(
        &mut *conn,
        &CreatePwpRulePayload {
            name: "Reward".into(),
            trigger,
            reward_variant_id,
            reward_price,
        },
        variant.product_id,
    )
    .await
    .expect("pwp rule")
}

/// Sets a customer's balance directly, bypassing the ledger.
pub async fn give_points(pool: &SqlitePool, customer_id: &str, balance: i64) {
    let mut conn = pool.acquire().await.expect("conn");
    let current = points_store::ensure_balance(&mut *conn, customer_id).await.expect("balance");
    points_store::save_balance(
        &mut *conn,
        &PointsBalance { balance, ..current },
    )
    .await
    .expect("save balance");
}

pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) {
    sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value")
        .bind(key)
        .bind(value)
        .execute(pool)
        .await
        .expect("setting");
}

pub async fn test_state() -> crate::AppState {
    crate::AppState::new(memory_pool().await)
}

/// Seeds a customer and opens a session; returns `(customer_id, token)`.
pub async fn login(state: &crate::AppState, name: &str, role: CustomerRole) -> (String, String) {
    let customer_id = seed_customer(&state.db, name, role).await;
    let info = crate::commands::auth_cmd::open_session(state, &customer_id)
        .await
        .expect("session");
    (customer_id, info.token)
}
