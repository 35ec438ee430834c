//! Data access. Every function runs on a single borrowed connection so callers
//! can pass either a pooled connection (`&mut *conn`) or an open transaction
//! (`&mut *tx`).

pub mod cart_store;
pub mod catalog_store;
pub mod coupon_store;
pub mod customer_store;
pub mod order_store;
pub mod points_store;
pub mod promo_store;
pub mod pwp_store;
pub mod settings_store;
