//! Serialisable results returned by the engine and the command layer.

use serde::{Deserialize, Serialize};

use super::cart::{Cart, CartTotals};
use super::coupon::{Coupon, CouponRejection};
use super::discount::AppliedCoupon;
use super::order::Order;
use super::points::ReversalOutcome;
use super::promo::MembershipPromo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountSummary {
    /// Minor currency units
    pub amount: i64,
    /// Display form of the rule value, e.g. `20%` or `MYR 5.00`
    pub formatted: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponValidation {
    pub valid: bool,
    pub reason: Option<CouponRejection>,
    pub message: Option<String>,
    pub coupon: Option<Coupon>,
    pub discount: DiscountSummary,
    pub cart_subtotal: i64,
    pub new_total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponApplication {
    pub coupon: AppliedCoupon,
    pub discount: DiscountSummary,
    pub cart: Cart,
    pub totals: CartTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponRemoval {
    pub removed_code: String,
    pub cart: Cart,
    pub totals: CartTotals,
}

/// `applied: false` is an ordinary outcome, with `message` saying why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoApplication {
    pub applied: bool,
    pub message: String,
    pub promo: Option<MembershipPromo>,
    pub discount: Option<DiscountSummary>,
    pub cart: Option<Cart>,
}

impl PromoApplication {
    pub fn not_applied(message: impl Into<String>) -> Self {
        Self {
            applied: false,
            message: message.into(),
            promo: None,
            discount: None,
            cart: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoRemoval {
    pub removed_promo_id: i64,
    pub cart: Cart,
    pub totals: CartTotals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingIssueKind {
    PwpRuleNotFound,
    PwpRuleInactive,
    PwpThresholdNotMet,
    PwpTriggerProductMissing,
    BulkQuantityBelowMinimum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    RemoveItem,
    RevertToRegularPrice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingIssue {
    pub item_id: String,
    pub variant_id: i64,
    pub kind: PricingIssueKind,
    pub message: String,
    pub action: RecommendedAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixAction {
    RemovedItem,
    AppliedLowerTier,
    RevertedToRegularPrice,
    UpgradedBulkTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingFix {
    pub item_id: String,
    pub action: FixAction,
    pub old_price: i64,
    /// None when the item was removed
    pub new_price: Option<i64>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartValidation {
    pub is_valid: bool,
    pub issues: Vec<PricingIssue>,
    pub fixes_applied: Vec<PricingFix>,
    pub cart_value_excluding_pwp: i64,
    /// Refreshed cart, present when fixes were attempted
    pub cart: Option<Cart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionResult {
    pub points_redeemed: i64,
    pub discount_amount: i64,
    pub new_balance: i64,
    pub totals: CartTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartWithTotals {
    pub cart: Cart,
    pub totals: CartTotals,
    pub cart_value_excluding_pwp: i64,
}

/// Result of cancelling or refunding an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReversal {
    pub order: Order,
    pub refund_amount: i64,
    pub points: ReversalOutcome,
}
