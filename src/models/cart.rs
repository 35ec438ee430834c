use serde::{Deserialize, Serialize};

use super::discount::{AppliedCoupon, AppliedDiscount, AppliedPromo};
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CartStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PricingKind {
    Regular,
    Pwp,
    Bulk,
    VariantDiscount,
}

/// Why a line item carries its current unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingReason {
    Regular,
    /// Reward item granted by a purchase-with-purchase rule
    Pwp { rule_id: i64 },
    /// Quantity-break tier price
    Bulk { min_quantity: i64, tier_price: i64 },
    /// Sale price; `original_price` is the pre-discount price
    VariantDiscount { original_price: i64 },
}

/// Column projection of a [`PricingReason`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingColumns {
    pub kind: PricingKind,
    pub pwp_rule_id: Option<i64>,
    pub bulk_min_quantity: Option<i64>,
    pub bulk_tier_price: Option<i64>,
    pub original_price: Option<i64>,
}

impl PricingReason {
    pub fn is_pwp(&self) -> bool {
        matches!(self, PricingReason::Pwp { .. })
    }

    pub fn is_bulk(&self) -> bool {
        matches!(self, PricingReason::Bulk { .. })
    }

    pub fn columns(&self) -> PricingColumns {
        let mut cols = PricingColumns {
            kind: PricingKind::Regular,
            pwp_rule_id: None,
            bulk_min_quantity: None,
            bulk_tier_price: None,
            original_price: None,
        };
        match *self {
            PricingReason::Regular => {}
            PricingReason::Pwp { rule_id } => {
                cols.kind = PricingKind::Pwp;
                cols.pwp_rule_id = Some(rule_id);
            }
            PricingReason::Bulk { min_quantity, tier_price } => {
                cols.kind = PricingKind::Bulk;
                cols.bulk_min_quantity = Some(min_quantity);
                cols.bulk_tier_price = Some(tier_price);
            }
            PricingReason::VariantDiscount { original_price } => {
                cols.kind = PricingKind::VariantDiscount;
                cols.original_price = Some(original_price);
            }
        }
        cols
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LineItemRow {
    pub id: String,
    pub cart_id: String,
    pub variant_id: i64,
    pub product_id: i64,
    pub title: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub pricing_kind: PricingKind,
    pub pwp_rule_id: Option<i64>,
    pub bulk_min_quantity: Option<i64>,
    pub bulk_tier_price: Option<i64>,
    pub original_price: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub cart_id: String,
    pub variant_id: i64,
    pub product_id: i64,
    pub title: String,
    pub quantity: i64,
    /// Authoritative price per unit in minor units
    pub unit_price: i64,
    pub pricing: PricingReason,
}

impl LineItem {
    pub fn line_total(&self) -> i64 {
        self.unit_price * self.quantity
    }
}

impl TryFrom<LineItemRow> for LineItem {
    type Error = AppError;

    fn try_from(row: LineItemRow) -> Result<Self, Self::Error> {
        let missing =
            |col: &str| AppError::Internal(format!("Line item {} is missing {}", row.id, col));

        let pricing = match row.pricing_kind {
            PricingKind::Regular => PricingReason::Regular,
            PricingKind::Pwp => PricingReason::Pwp {
                rule_id: row.pwp_rule_id.ok_or_else(|| missing("pwp_rule_id"))?,
            },
            PricingKind::Bulk => PricingReason::Bulk {
                min_quantity: row.bulk_min_quantity.ok_or_else(|| missing("bulk_min_quantity"))?,
                tier_price: row.bulk_tier_price.ok_or_else(|| missing("bulk_tier_price"))?,
            },
            PricingKind::VariantDiscount => PricingReason::VariantDiscount {
                original_price: row.original_price.ok_or_else(|| missing("original_price"))?,
            },
        };

        Ok(LineItem {
            id: row.id,
            cart_id: row.cart_id,
            variant_id: row.variant_id,
            product_id: row.product_id,
            title: row.title,
            quantity: row.quantity,
            unit_price: row.unit_price,
            pricing,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartRow {
    pub id: String,
    pub customer_id: Option<String>,
    pub currency_code: String,
    pub status: CartStatus,
    pub points_redeemed: Option<i64>,
    pub points_discount: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsRedemption {
    pub points: i64,
    /// Minor currency units
    pub discount_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    pub customer_id: Option<String>,
    pub currency_code: String,
    pub status: CartStatus,
    pub items: Vec<LineItem>,
    pub discounts: Vec<AppliedDiscount>,
    pub points_redemption: Option<PointsRedemption>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Cart {
    pub fn from_parts(row: CartRow, items: Vec<LineItem>, discounts: Vec<AppliedDiscount>) -> Self {
        let points_redemption = match (row.points_redeemed, row.points_discount) {
            (Some(points), Some(discount_amount)) if points > 0 => {
                Some(PointsRedemption { points, discount_amount })
            }
            _ => None,
        };

        Cart {
            id: row.id,
            customer_id: row.customer_id,
            currency_code: row.currency_code,
            status: row.status,
            items,
            discounts,
            points_redemption,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.status == CartStatus::Active
    }

    pub fn coupon(&self) -> Option<&AppliedCoupon> {
        self.discounts.iter().find_map(|d| match d {
            AppliedDiscount::Coupon(c) => Some(c),
            _ => None,
        })
    }

    pub fn membership_promo(&self) -> Option<&AppliedPromo> {
        self.discounts.iter().find_map(|d| match d {
            AppliedDiscount::MembershipPromo(p) => Some(p),
            _ => None,
        })
    }

    pub fn find_item(&self, item_id: &str) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn is_owned_by(&self, customer_id: &str) -> bool {
        self.customer_id.as_deref() == Some(customer_id)
    }
}

/// Output of the aggregation pass over a cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: i64,
    pub coupon_discount: i64,
    pub promo_discount: i64,
    pub points_discount: i64,
    pub discount_total: i64,
    pub total: i64,
}
