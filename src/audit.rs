use sqlx::SqlitePool;

use crate::log_warn;
use crate::models::activity::ActivityLog;

/// Audit actions for discount and loyalty changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountAuditAction {
    CouponApply,
    CouponRemove,
    PromoApply,
    PromoRemove,
    CartAutoFix,
    PointsRedeem,
    PointsAdjust,
    OrderComplete,
    OrderCancel,
    OrderReturn,
}

impl DiscountAuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountAuditAction::CouponApply => "COUPON_APPLY",
            DiscountAuditAction::CouponRemove => "COUPON_REMOVE",
            DiscountAuditAction::PromoApply => "PROMO_APPLY",
            DiscountAuditAction::PromoRemove => "PROMO_REMOVE",
            DiscountAuditAction::CartAutoFix => "CART_AUTO_FIX",
            DiscountAuditAction::PointsRedeem => "POINTS_REDEEM",
            DiscountAuditAction::PointsAdjust => "POINTS_ADJUST",
            DiscountAuditAction::OrderComplete => "ORDER_COMPLETE",
            DiscountAuditAction::OrderCancel => "ORDER_CANCEL",
            DiscountAuditAction::OrderReturn => "ORDER_RETURN",
        }
    }
}

/// Appends to `activity_logs`. Failures are logged and swallowed so the
/// caller's operation still succeeds.
pub async fn log_discount_action(
    db: &SqlitePool,
    customer_id: Option<&str>,
    action: DiscountAuditAction,
    description: &str,
    metadata: Option<&serde_json::Value>,
) {
    let metadata_str = metadata.map(|m| m.to_string());

    let sql = "INSERT INTO activity_logs (customer_id, action, description, metadata) VALUES (?, ?, ?, ?)";

    let result = sqlx::query(sql)
        .bind(customer_id)
        .bind(action.as_str())
        .bind(description)
        .bind(metadata_str.as_deref())
        .execute(db)
        .await;

    if let Err(e) = result {
        log_warn!("DATABASE", "Failed to write audit entry", serde_json::json!({
            "action": action.as_str(),
            "error": e.to_string(),
        }));
    }
}

/// Most recent entries first, optionally for one customer.
pub async fn recent_actions(
    db: &SqlitePool,
    customer_id: Option<&str>,
    limit: i64,
) -> Result<Vec<ActivityLog>, sqlx::Error> {
    sqlx::query_as::<_, ActivityLog>(
        "SELECT id, customer_id, action, description, metadata, created_at
         FROM activity_logs
         WHERE (? IS NULL OR customer_id = ?)
         ORDER BY id DESC LIMIT ?",
    )
    .bind(customer_id)
    .bind(customer_id)
    .bind(limit)
    .fetch_all(db)
    .await
}
