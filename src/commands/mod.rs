//! Boundary layer. Every command resolves the session first, takes the cart
//! lock for cart mutations, calls the engine and records the audit trail.

pub mod activity_cmd;
pub mod auth_cmd;
pub mod cart_cmd;
pub mod coupon_cmd;
pub mod discount_cmd;
pub mod order_cmd;
pub mod points_cmd;
pub mod promo_cmd;

use crate::auth::guard::ensure_cart_access;
use crate::auth::session::SessionData;
use crate::errors::AppResult;
use crate::models::cart::Cart;
use crate::pricing::cart::get_cart;
use crate::AppState;

/// Loads the cart and checks the session may act on it.
pub(crate) async fn authorize_cart(state: &AppState, session: &SessionData, cart_id: &str) -> AppResult<Cart> {
    let cart = get_cart(&state.db, cart_id).await?;
    ensure_cart_access(session, &cart)?;
    Ok(cart)
}

/// Customer whose membership and points a cart uses: its owner, or the
/// caller for guest carts.
pub(crate) fn cart_customer<'a>(session: &'a SessionData, cart: &'a Cart) -> &'a str {
    cart.customer_id.as_deref().unwrap_or(&session.customer_id)
}
