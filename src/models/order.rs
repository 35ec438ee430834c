use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderStatus {
    Completed,
    Cancelled,
    Returned,
    PartiallyReturned,
}

impl OrderStatus {
    /// Orders that can still be cancelled or refunded.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::PartiallyReturned)
    }
}

/// Snapshot of a cart's totals at checkout. All amounts in minor units.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: String,
    pub cart_id: String,
    pub customer_id: Option<String>,
    pub currency_code: String,
    pub subtotal: i64,
    pub discount_total: i64,
    pub coupon_id: Option<i64>,
    pub coupon_code: Option<String>,
    pub promo_id: Option<i64>,
    pub points_redeemed: i64,
    pub points_discount: i64,
    pub total: i64,
    pub points_earned: i64,
    pub refunded_amount: i64,
    /// Earned points already taken back by returns.
    pub earned_reversed: i64,
    /// Redeemed points already given back by returns.
    pub redeemed_restored: i64,
    pub status: OrderStatus,
    pub created_at: Option<String>,
}

impl Order {
    pub fn refundable_amount(&self) -> i64 {
        (self.total - self.refunded_amount).max(0)
    }

    /// Share of `points` proportional to `refund / total`, floored.
    pub fn proportional_points(&self, points: i64, refund: i64) -> i64 {
        if self.total <= 0 || points <= 0 {
            return 0;
        }
        ((points as i128 * refund as i128) / self.total as i128) as i64
    }

    /// Earned points to deduct and redeemed points to restore for a refund
    /// of `refund`. Shares follow the cumulative refunded amount, so returns
    /// adding up to the total reverse every point.
    pub fn return_points(&self, refund: i64) -> (i64, i64) {
        let refunded = self.refunded_amount + refund;
        let earned = self.proportional_points(self.points_earned, refunded) - self.earned_reversed;
        let redeemed = self.proportional_points(self.points_redeemed, refunded) - self.redeemed_restored;
        (earned.max(0), redeemed.max(0))
    }
}
