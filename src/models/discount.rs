use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::AppError;

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a whole percent of the subtotal
    Percentage,
    /// `value` is an amount in minor currency units
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            other => Err(format!("Unknown discount type '{}'", other)),
        }
    }
}

/// Status shared by coupons, PWP rules and membership promos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RuleStatus {
    Active,
    Inactive,
}

impl RuleStatus {
    pub fn is_active(&self) -> bool {
        *self == RuleStatus::Active
    }

    pub fn toggled(&self) -> Self {
        match self {
            RuleStatus::Active => RuleStatus::Inactive,
            RuleStatus::Inactive => RuleStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DiscountKind {
    Coupon,
    MembershipPromo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub coupon_id: i64,
    pub code: String,
    pub name: String,
    pub discount_type: DiscountType,
    pub value: i64,
    /// Amount computed when the coupon was applied
    pub amount: i64,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedPromo {
    pub promo_id: i64,
    pub name: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub amount: i64,
    pub currency_code: String,
}

/// A cart-level discount. A cart holds at most one of each variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppliedDiscount {
    Coupon(AppliedCoupon),
    MembershipPromo(AppliedPromo),
}

impl AppliedDiscount {
    pub fn kind(&self) -> DiscountKind {
        match self {
            AppliedDiscount::Coupon(_) => DiscountKind::Coupon,
            AppliedDiscount::MembershipPromo(_) => DiscountKind::MembershipPromo,
        }
    }

    /// Stable code identifying the adjustment row, e.g. `COUPON_SUMMER20`.
    pub fn adjustment_code(&self) -> String {
        match self {
            AppliedDiscount::Coupon(c) => coupon_adjustment_code(&c.code),
            AppliedDiscount::MembershipPromo(p) => promo_adjustment_code(p.promo_id),
        }
    }

    pub fn source_id(&self) -> i64 {
        match self {
            AppliedDiscount::Coupon(c) => c.coupon_id,
            AppliedDiscount::MembershipPromo(p) => p.promo_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AppliedDiscount::Coupon(c) => &c.name,
            AppliedDiscount::MembershipPromo(p) => &p.name,
        }
    }

    pub fn discount_type(&self) -> DiscountType {
        match self {
            AppliedDiscount::Coupon(c) => c.discount_type,
            AppliedDiscount::MembershipPromo(p) => p.discount_type,
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            AppliedDiscount::Coupon(c) => c.value,
            AppliedDiscount::MembershipPromo(p) => p.value,
        }
    }

    pub fn amount(&self) -> i64 {
        match self {
            AppliedDiscount::Coupon(c) => c.amount,
            AppliedDiscount::MembershipPromo(p) => p.amount,
        }
    }

    pub fn currency_code(&self) -> &str {
        match self {
            AppliedDiscount::Coupon(c) => &c.currency_code,
            AppliedDiscount::MembershipPromo(p) => &p.currency_code,
        }
    }
}

pub fn coupon_adjustment_code(code: &str) -> String {
    format!("COUPON_{}", code.to_uppercase())
}

pub fn promo_adjustment_code(promo_id: i64) -> String {
    format!("PROMO_{}", promo_id)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartDiscountRow {
    pub id: i64,
    pub cart_id: String,
    pub kind: DiscountKind,
    pub adjustment_code: String,
    pub source_id: i64,
    pub code: Option<String>,
    pub name: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub amount: i64,
    pub currency_code: String,
    pub created_at: Option<String>,
}

impl TryFrom<CartDiscountRow> for AppliedDiscount {
    type Error = AppError;

    fn try_from(row: CartDiscountRow) -> Result<Self, Self::Error> {
        Ok(match row.kind {
            DiscountKind::Coupon => AppliedDiscount::Coupon(AppliedCoupon {
                coupon_id: row.source_id,
                code: row.code.ok_or_else(|| {
                    AppError::Internal(format!("Coupon discount {} has no code", row.id))
                })?,
                name: row.name,
                discount_type: row.discount_type,
                value: row.value,
                amount: row.amount,
                currency_code: row.currency_code,
            }),
            DiscountKind::MembershipPromo => AppliedDiscount::MembershipPromo(AppliedPromo {
                promo_id: row.source_id,
                name: row.name,
                discount_type: row.discount_type,
                value: row.value,
                amount: row.amount,
                currency_code: row.currency_code,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjustment_codes() {
        let coupon = AppliedDiscount::Coupon(AppliedCoupon {
            coupon_id: 1,
            code: "summer20".into(),
            name: "Summer".into(),
            discount_type: DiscountType::Percentage,
            value: 20,
            amount: 2000,
            currency_code: "MYR".into(),
        });
        assert_eq!(coupon.adjustment_code(), "COUPON_SUMMER20");
        assert_eq!(promo_adjustment_code(7), "PROMO_7");
    }

    #[test]
    fn test_discount_type_parse() {
        assert_eq!("Percentage".parse::<DiscountType>(), Ok(DiscountType::Percentage));
        assert_eq!("fixed".parse::<DiscountType>(), Ok(DiscountType::Fixed));
        assert!("bogo".parse::<DiscountType>().is_err());
    }

    #[test]
    fn test_coupon_row_without_code_is_rejected() {
        let row = CartDiscountRow {
            id: 3,
            cart_id: "c".into(),
            kind: DiscountKind::Coupon,
            adjustment_code: "COUPON_X".into(),
            source_id: 1,
            code: None,
            name: "x".into(),
            discount_type: DiscountType::Fixed,
            value: 100,
            amount: 100,
            currency_code: "MYR".into(),
            created_at: None,
        };
        assert!(AppliedDiscount::try_from(row).is_err());
    }
}
