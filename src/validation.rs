//! Input validation module
//!
//! Centralised checks for:
//! - Customer input (names, emails)
//! - Money and quantities (minor units, whole items)
//! - Discount rules (coupon codes, values, active windows)
//! - Loyalty settings

use chrono::{DateTime, Utc};

use crate::models::coupon::CreateCouponPayload;
use crate::models::discount::DiscountType;
use crate::models::points::PointsSettings;
use crate::models::promo::CreateMembershipPromoPayload;
use crate::models::pwp::{CreatePwpRulePayload, PwpTrigger};

/// Validation result type
pub type ValidationResult = Result<(), String>;

/// Largest amount accepted anywhere, in minor units
const MAX_AMOUNT: i64 = 100_000_000_000;

/// Validate a display name
/// - Length: 2-100 characters
pub fn validate_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("Name must not be empty".into());
    }

    if trimmed.chars().count() < 2 || trimmed.chars().count() > 100 {
        return Err("Name must be 2-100 characters".into());
    }

    Ok(())
}

/// Validate a coupon code
/// - Length: 3-50 characters
/// - Allowed: letters, digits, hyphen, underscore
pub fn validate_coupon_code(code: &str) -> ValidationResult {
    let trimmed = code.trim();

    if trimmed.is_empty() {
        return Err("Coupon code must not be empty".into());
    }

    if trimmed.len() < 3 || trimmed.len() > 50 {
        return Err("Coupon code must be 3-50 characters".into());
    }

    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err("Coupon code may only contain letters, digits, '-' and '_'".into());
    }

    Ok(())
}

/// Validate an ISO 4217 currency code
pub fn validate_currency_code(code: &str) -> ValidationResult {
    let trimmed = code.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(format!("Invalid currency code '{}'", trimmed));
    }
    Ok(())
}

/// Validate an amount in minor units
pub fn validate_amount(amount: i64, min: Option<i64>, max: Option<i64>) -> ValidationResult {
    let min_val = min.unwrap_or(0);
    let max_val = max.unwrap_or(MAX_AMOUNT);

    if amount < min_val {
        return Err(format!("Amount must be at least {}", min_val));
    }

    if amount > max_val {
        return Err(format!("Amount must be at most {}", max_val));
    }

    Ok(())
}

/// Validate an item quantity
pub fn validate_quantity(qty: i64, min: Option<i64>, max: Option<i64>) -> ValidationResult {
    if qty < 0 {
        return Err("Quantity must not be negative".into());
    }

    let min_val = min.unwrap_or(0);
    let max_val = max.unwrap_or(10_000);

    if qty < min_val {
        return Err(format!("Quantity must be at least {}", min_val));
    }

    if qty > max_val {
        return Err(format!("Quantity must be at most {}", max_val));
    }

    Ok(())
}

/// Percentages are whole percents in 1..=100; fixed values are positive minor units.
pub fn validate_discount_value(discount_type: DiscountType, value: i64) -> ValidationResult {
    match discount_type {
        DiscountType::Percentage if !(1..=100).contains(&value) => {
            Err("Percentage discount must be between 1 and 100".into())
        }
        DiscountType::Fixed if value <= 0 => Err("Fixed discount must be positive".into()),
        DiscountType::Fixed => validate_amount(value, Some(1), None),
        _ => Ok(()),
    }
}

/// Validate an optional active window
pub fn validate_window(starts_at: Option<DateTime<Utc>>, ends_at: Option<DateTime<Utc>>) -> ValidationResult {
    match (starts_at, ends_at) {
        (Some(start), Some(end)) if end <= start => {
            Err("End date must be after the start date".into())
        }
        _ => Ok(()),
    }
}

/// Validate a free-text reason (points adjustments)
pub fn validate_reason(reason: &str) -> ValidationResult {
    let trimmed = reason.trim();

    if trimmed.is_empty() {
        return Err("A reason is required".into());
    }

    if trimmed.len() > 500 {
        return Err("Reason is too long (max 500 characters)".into());
    }

    Ok(())
}

pub fn validate_create_coupon(payload: &CreateCouponPayload) -> ValidationResult {
    validate_coupon_code(&payload.code)?;
    validate_name(&payload.name)?;
    validate_discount_value(payload.discount_type, payload.value)?;
    validate_window(payload.starts_at, payload.ends_at)?;

    if let Some(limit) = payload.usage_limit {
        if limit < 1 {
            return Err("Usage limit must be at least 1".into());
        }
    }

    Ok(())
}

pub fn validate_create_promo(payload: &CreateMembershipPromoPayload) -> ValidationResult {
    validate_name(&payload.name)?;
    validate_discount_value(payload.discount_type, payload.value)?;
    validate_amount(payload.min_purchase, Some(0), None)?;
    validate_window(payload.start_date, payload.end_date)
}

pub fn validate_create_pwp_rule(payload: &CreatePwpRulePayload) -> ValidationResult {
    validate_name(&payload.name)?;
    validate_amount(payload.reward_price, Some(0), None)?;

    match payload.trigger {
        PwpTrigger::CartValue { threshold } if threshold <= 0 => {
            Err("Cart value threshold must be positive".into())
        }
        PwpTrigger::Product { product_id } if product_id <= 0 => {
            Err("Trigger product is required".into())
        }
        _ => Ok(()),
    }
}

pub fn validate_points_settings(settings: &PointsSettings) -> ValidationResult {
    if !settings.earn_rate.is_finite() || settings.earn_rate < 0.0 {
        return Err("Earn rate must not be negative".into());
    }

    if !settings.redemption_rate.is_finite() || settings.redemption_rate <= 0.0 {
        return Err("Redemption rate must be positive".into());
    }

    if settings.min_redeem < 0 || settings.max_redeem < 0 {
        return Err("Redemption bounds must not be negative".into());
    }

    if settings.max_redeem > 0 && settings.max_redeem < settings.min_redeem {
        return Err("Maximum redemption must not be below the minimum".into());
    }

    Ok(())
}
