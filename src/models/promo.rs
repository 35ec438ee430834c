use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::discount::{DiscountType, RuleStatus};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MembershipPromo {
    pub id: i64,
    pub name: String,
    pub discount_type: DiscountType,
    pub value: i64,
    /// Minimum cart subtotal in minor units
    pub min_purchase: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: RuleStatus,
    pub created_at: Option<String>,
}

impl MembershipPromo {
    /// Date window check; a missing bound is open.
    pub fn is_running(&self, now: DateTime<Utc>) -> bool {
        self.start_date.map_or(true, |start| start <= now)
            && self.end_date.map_or(true, |end| now <= end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum MembershipStatus {
    Active,
    Inactive,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub customer_id: String,
    pub status: MembershipStatus,
    pub joined_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMembershipPromoPayload {
    pub name: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub min_purchase: i64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_running_window() {
        let now = Utc::now();
        let mut promo = MembershipPromo {
            id: 1,
            name: "Members".into(),
            discount_type: DiscountType::Fixed,
            value: 500,
            min_purchase: 0,
            start_date: None,
            end_date: None,
            status: RuleStatus::Active,
            created_at: None,
        };
        assert!(promo.is_running(now));

        promo.end_date = Some(now - Duration::seconds(1));
        assert!(!promo.is_running(now));

        promo.end_date = None;
        promo.start_date = Some(now + Duration::days(1));
        assert!(!promo.is_running(now));
    }
}
