use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How earned points are derived from an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarnType {
    /// `earn_rate` percent of the order total in minor units
    Percentage,
    /// `earn_rate` points per major currency unit
    PerCurrency,
}

impl EarnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EarnType::Percentage => "percentage",
            EarnType::PerCurrency => "per_currency",
        }
    }
}

impl FromStr for EarnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "percentage" => Ok(EarnType::Percentage),
            "per_currency" | "fixed" => Ok(EarnType::PerCurrency),
            other => Err(format!("Unknown earn type '{}'", other)),
        }
    }
}

/// Loyalty settings as read from the `settings` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsSettings {
    pub is_enabled: bool,
    pub earn_type: EarnType,
    pub earn_rate: f64,
    pub redemption_rate: f64,
    pub min_redeem: i64,
    /// 0 = unlimited
    pub max_redeem: i64,
}

impl PointsSettings {
    /// Unrounded points for an order total in minor units.
    pub fn base_points_for(&self, total_minor: i64) -> f64 {
        if total_minor <= 0 {
            return 0.0;
        }
        match self.earn_type {
            EarnType::Percentage => total_minor as f64 * self.earn_rate / 100.0,
            EarnType::PerCurrency => total_minor as f64 / 100.0 * self.earn_rate,
        }
    }

    /// Points credited for an order after the tier multiplier.
    pub fn points_for(&self, total_minor: i64, multiplier: f64) -> i64 {
        (self.base_points_for(total_minor) * multiplier).floor().max(0.0) as i64
    }

    /// Discount in minor units for redeeming `points`.
    pub fn redemption_value(&self, points: i64) -> i64 {
        ((points as f64) * self.redemption_rate).floor().max(0.0) as i64
    }

    pub fn max_redeem_limit(&self) -> Option<i64> {
        (self.max_redeem > 0).then_some(self.max_redeem)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PointsBalance {
    pub customer_id: String,
    pub balance: i64,
    pub total_earned: i64,
    pub total_redeemed: i64,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PointsTransactionKind {
    Earned,
    Redeemed,
    AdminAdjustment,
    ReturnAdjustment,
    CancelAdjustment,
}

/// Ledger row. `points` is signed; `balance_after` is the running balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PointsTransaction {
    pub id: i64,
    pub customer_id: String,
    pub kind: PointsTransactionKind,
    pub points: i64,
    pub balance_after: i64,
    pub reference_id: Option<String>,
    pub description: String,
    pub created_by: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoyaltyTier {
    pub id: i64,
    pub name: String,
    pub min_points: i64,
    pub points_multiplier: f64,
}

/// Picks the highest tier whose threshold `lifetime_points` reaches.
pub fn tier_for(tiers: &[LoyaltyTier], lifetime_points: i64) -> Option<&LoyaltyTier> {
    tiers
        .iter()
        .filter(|t| t.min_points <= lifetime_points)
        .max_by_key(|t| t.min_points)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalKind {
    Return,
    Cancel,
}

impl ReversalKind {
    pub fn transaction_kind(&self) -> PointsTransactionKind {
        match self {
            ReversalKind::Return => PointsTransactionKind::ReturnAdjustment,
            ReversalKind::Cancel => PointsTransactionKind::CancelAdjustment,
        }
    }
}

/// Net effect of reversing an order's points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalOutcome {
    /// Earned points taken back (after clamping to the balance)
    pub points_deducted: i64,
    /// Redeemed points given back
    pub points_restored: i64,
    pub balance_after: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsSummary {
    pub balance: PointsBalance,
    pub tier: Option<LoyaltyTier>,
    pub recent_transactions: Vec<PointsTransaction>,
    pub settings: PointsSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePointsSettingsPayload {
    pub is_enabled: Option<bool>,
    pub earn_type: Option<EarnType>,
    pub earn_rate: Option<f64>,
    pub redemption_rate: Option<f64>,
    pub min_redeem: Option<i64>,
    pub max_redeem: Option<i64>,
}
