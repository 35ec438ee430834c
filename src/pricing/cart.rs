//! Cart lifecycle: creation, adding and updating items, reading totals.

use sqlx::SqlitePool;

use super::bulk::price_for_quantity;
use super::{cart_value_excluding_pwp, compute_totals, ensure_active};
use crate::config::get_config;
use crate::errors::{AppError, AppResult};
use crate::log_debug;
use crate::models::cart::Cart;
use crate::models::response::CartWithTotals;
use crate::store::cart_store::{self, NewLineItem};
use crate::store::{catalog_store, customer_store};
use crate::validation::{validate_currency_code, validate_quantity};

pub async fn create_cart(
    pool: &SqlitePool,
    customer_id: Option<&str>,
    currency_code: Option<&str>,
) -> AppResult<Cart> {
    let currency = currency_code
        .map(|c| c.trim().to_uppercase())
        .unwrap_or_else(|| get_config().pricing.default_currency.clone());
    validate_currency_code(&currency).map_err(AppError::Validation)?;

    let cart_id = uuid::Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;

    if let Some(customer_id) = customer_id {
        customer_store::fetch(&mut *tx, customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Customer {}", customer_id)))?;
    }

    cart_store::insert_cart(&mut *tx, &cart_id, customer_id, &currency).await?;
    let cart = cart_store::load_cart(&mut *tx, &cart_id).await?;
    tx.commit().await?;

    log_debug!("CART", "Cart created", serde_json::json!({
        "cart_id": cart_id,
        "currency": currency,
    }));

    Ok(cart)
}

/// Adds `quantity` units of a variant, priced from its price list. A non-PWP
/// line of the same variant absorbs the units and is repriced for the new
/// quantity.
pub async fn add_item(pool: &SqlitePool, cart_id: &str, variant_id: i64, quantity: i64) -> AppResult<Cart> {
    validate_quantity(quantity, Some(1), None).map_err(AppError::Validation)?;

    let mut tx = pool.begin().await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    ensure_active(&cart)?;

    let variant = catalog_store::fetch_variant(&mut *tx, variant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Variant {}", variant_id)))?;

    let existing = cart
        .items
        .iter()
        .find(|item| item.variant_id == variant_id && !item.pricing.is_pwp());
    let new_quantity = existing.map_or(0, |item| item.quantity) + quantity;
    validate_quantity(new_quantity, Some(1), None).map_err(AppError::Validation)?;

    let prices = catalog_store::list_prices(&mut *tx, variant_id, &cart.currency_code).await?;
    let (unit_price, pricing) = price_for_quantity(&prices, new_quantity).ok_or_else(|| {
        AppError::Validation(format!(
            "Variant {} has no price in {}",
            variant_id, cart.currency_code
        ))
    })?;

    match existing {
        Some(item) => {
            cart_store::update_item_quantity(&mut *tx, &item.id, new_quantity).await?;
            cart_store::update_item_pricing(&mut *tx, &item.id, unit_price, &pricing).await?;
        }
        None => {
            cart_store::insert_item(
                &mut *tx,
                &NewLineItem {
                    cart_id,
                    variant_id,
                    product_id: variant.product_id,
                    title: &variant.title,
                    quantity,
                    unit_price,
                    pricing,
                },
            )
            .await?;
        }
    }
    cart_store::touch(&mut *tx, cart_id).await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    tx.commit().await?;

    log_debug!("CART", "Item added", serde_json::json!({
        "cart_id": cart_id,
        "variant_id": variant_id,
        "quantity": new_quantity,
        "unit_price": unit_price,
    }));

    Ok(cart)
}

/// Sets a line's quantity; 0 removes the line. Pricing is left as is.
pub async fn update_item_quantity(
    pool: &SqlitePool,
    cart_id: &str,
    item_id: &str,
    quantity: i64,
) -> AppResult<Cart> {
    validate_quantity(quantity, None, None).map_err(AppError::Validation)?;

    let mut tx = pool.begin().await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    ensure_active(&cart)?;

    let item = cart
        .find_item(item_id)
        .ok_or_else(|| AppError::NotFound(format!("Line item {} in cart {}", item_id, cart_id)))?;

    if quantity == 0 {
        cart_store::delete_item(&mut *tx, &item.id).await?;
    } else {
        if item.pricing.is_pwp() && quantity != 1 {
            return Err(AppError::Validation(
                "Purchase-with-purchase rewards are limited to one unit".into(),
            ));
        }
        cart_store::update_item_quantity(&mut *tx, &item.id, quantity).await?;
    }
    cart_store::touch(&mut *tx, cart_id).await?;

    let cart = cart_store::load_cart(&mut *tx, cart_id).await?;
    tx.commit().await?;
    Ok(cart)
}

pub async fn get_cart(pool: &SqlitePool, cart_id: &str) -> AppResult<Cart> {
    let mut conn = pool.acquire().await?;
    cart_store::load_cart(&mut *conn, cart_id).await
}

pub async fn get_cart_with_totals(pool: &SqlitePool, cart_id: &str) -> AppResult<CartWithTotals> {
    let cart = get_cart(pool, cart_id).await?;
    Ok(CartWithTotals {
        totals: compute_totals(&cart),
        cart_value_excluding_pwp: cart_value_excluding_pwp(&cart.items),
        cart,
    })
}
