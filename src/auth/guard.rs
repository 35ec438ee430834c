use super::session::SessionData;
use crate::errors::{AppError, AppResult};
use crate::models::cart::Cart;
use crate::AppState;

/// Resolves a session token to a cloned [`SessionData`].
pub fn validate_session(state: &AppState, token: &str) -> AppResult<SessionData> {
    let store = state
        .sessions
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    store.validate(token).cloned()
}

/// Same as [`validate_session`], but the session must belong to an admin.
pub fn validate_admin(state: &AppState, token: &str) -> AppResult<SessionData> {
    let store = state
        .sessions
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    store.validate_admin(token).cloned()
}

/// Customers may only touch their own carts; admins may touch any. Guest
/// carts are open to any session.
pub fn ensure_cart_access(session: &SessionData, cart: &Cart) -> AppResult<()> {
    if session.is_admin() {
        return Ok(());
    }
    match cart.customer_id.as_deref() {
        Some(owner) if owner != session.customer_id => Err(AppError::Forbidden(format!(
            "Cart {} belongs to another customer",
            cart.id
        ))),
        _ => Ok(()),
    }
}
