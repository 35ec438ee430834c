use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Variant {
    pub id: i64,
    pub product_id: i64,
    pub title: String,
}

/// One row of a variant's price list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PriceEntry {
    pub id: i64,
    pub variant_id: i64,
    pub currency_code: String,
    pub amount: i64,
    pub min_quantity: Option<i64>,
    pub max_quantity: Option<i64>,
    /// Pre-sale price when the variant is on sale
    pub compare_at_amount: Option<i64>,
}

impl PriceEntry {
    /// A quantity-break tier: requires more than one unit.
    pub fn is_bulk_tier(&self) -> bool {
        self.min_quantity.map_or(false, |min| min > 1)
    }

    /// The regular price, applicable from a single unit.
    pub fn is_base(&self) -> bool {
        self.min_quantity.map_or(true, |min| min <= 1)
    }

    pub fn covers(&self, quantity: i64) -> bool {
        self.min_quantity.map_or(true, |min| quantity >= min)
            && self.max_quantity.map_or(true, |max| quantity <= max)
    }

    /// Sale price with a higher compare-at price set.
    pub fn is_discounted(&self) -> bool {
        self.compare_at_amount.map_or(false, |orig| orig > self.amount)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVariantPayload {
    pub product_id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePricePayload {
    pub variant_id: i64,
    pub currency_code: String,
    pub amount: i64,
    pub min_quantity: Option<i64>,
    pub max_quantity: Option<i64>,
    pub compare_at_amount: Option<i64>,
}
