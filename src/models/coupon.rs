use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::discount::{DiscountType, RuleStatus};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: i64,
    /// Unique, stored uppercase
    pub code: String,
    pub name: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    /// None = unlimited
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
    pub status: RuleStatus,
    pub created_at: Option<String>,
}

/// Reason a coupon cannot be used right now. Not an error: validation
/// reports these as `valid: false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponRejection {
    Inactive,
    NotStarted,
    Expired,
    UsageLimitReached,
    EmptyCart,
}

impl CouponRejection {
    pub fn message(&self) -> &'static str {
        match self {
            CouponRejection::Inactive => "This coupon is not active",
            CouponRejection::NotStarted => "This coupon is not valid yet",
            CouponRejection::Expired => "This coupon has expired",
            CouponRejection::UsageLimitReached => "This coupon has reached its usage limit",
            CouponRejection::EmptyCart => "Cart is empty",
        }
    }
}

impl Coupon {
    /// Status, active window and usage checks, in that order.
    pub fn check_availability(&self, now: DateTime<Utc>) -> Result<(), CouponRejection> {
        if !self.status.is_active() {
            return Err(CouponRejection::Inactive);
        }
        if let Some(starts_at) = self.starts_at {
            if now < starts_at {
                return Err(CouponRejection::NotStarted);
            }
        }
        if let Some(ends_at) = self.ends_at {
            if now > ends_at {
                return Err(CouponRejection::Expired);
            }
        }
        if let Some(limit) = self.usage_limit {
            if self.usage_count >= limit {
                return Err(CouponRejection::UsageLimitReached);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCouponPayload {
    pub code: String,
    pub name: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i64>,
}
