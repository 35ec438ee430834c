use serde::{Deserialize, Serialize};

use super::discount::RuleStatus;
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PwpTriggerType {
    CartValue,
    Product,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PwpRuleRow {
    pub id: i64,
    pub name: String,
    pub trigger_type: PwpTriggerType,
    pub trigger_cart_value: Option<i64>,
    pub trigger_product_id: Option<i64>,
    pub reward_variant_id: i64,
    pub reward_product_id: i64,
    pub reward_price: i64,
    pub status: RuleStatus,
    pub created_at: Option<String>,
}

/// What unlocks the reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PwpTrigger {
    /// Cart value (excluding PWP rewards) at or above `threshold`
    CartValue { threshold: i64 },
    /// `product_id` present among non-PWP items
    Product { product_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PwpRule {
    pub id: i64,
    pub name: String,
    pub trigger: PwpTrigger,
    pub reward_variant_id: i64,
    pub reward_product_id: i64,
    pub reward_price: i64,
    pub status: RuleStatus,
}

impl TryFrom<PwpRuleRow> for PwpRule {
    type Error = AppError;

    fn try_from(row: PwpRuleRow) -> Result<Self, Self::Error> {
        let trigger = match row.trigger_type {
            PwpTriggerType::CartValue => PwpTrigger::CartValue {
                threshold: row.trigger_cart_value.ok_or_else(|| {
                    AppError::Internal(format!("PWP rule {} has no cart value threshold", row.id))
                })?,
            },
            PwpTriggerType::Product => PwpTrigger::Product {
                product_id: row.trigger_product_id.ok_or_else(|| {
                    AppError::Internal(format!("PWP rule {} has no trigger product", row.id))
                })?,
            },
        };

        Ok(PwpRule {
            id: row.id,
            name: row.name,
            trigger,
            reward_variant_id: row.reward_variant_id,
            reward_product_id: row.reward_product_id,
            reward_price: row.reward_price,
            status: row.status,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePwpRulePayload {
    pub name: String,
    pub trigger: PwpTrigger,
    pub reward_variant_id: i64,
    pub reward_price: i64,
}
