use crate::auth::guard::validate_admin;
use crate::errors::{AppError, AppResult};
use crate::log_info;
use crate::models::coupon::{Coupon, CreateCouponPayload};
use crate::models::points::{PointsSettings, UpdatePointsSettingsPayload};
use crate::models::promo::{CreateMembershipPromoPayload, MembershipPromo};
use crate::models::pwp::{CreatePwpRulePayload, PwpRule};
use crate::pricing::points::update_points_settings;
use crate::store::{catalog_store, coupon_store, promo_store, pwp_store};
use crate::validation::{validate_create_coupon, validate_create_promo, validate_create_pwp_rule};
use crate::AppState;

/// Create a coupon (admin only). Codes are stored uppercase and must be unique.
pub async fn create_coupon(
    state: &AppState,
    session_token: &str,
    payload: CreateCouponPayload,
) -> AppResult<Coupon> {
    validate_admin(state, session_token)?;
    validate_create_coupon(&payload).map_err(AppError::Validation)?;

    let mut conn = state.db.acquire().await?;
    if coupon_store::find_by_code(&mut *conn, &payload.code).await?.is_some() {
        return Err(AppError::Validation(format!(
            "Coupon code {} already exists",
            payload.code.trim().to_uppercase()
        )));
    }

    let id = coupon_store::insert(&mut *conn, &payload).await?;
    let coupon = coupon_store::find_by_id(&mut *conn, id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Coupon {} missing after insert", id)))?;

    log_info!("COUPON", "Coupon created", serde_json::json!({
        "coupon_id": coupon.id,
        "code": coupon.code,
    }));

    Ok(coupon)
}

/// Flip a coupon between active and inactive (admin only).
pub async fn toggle_coupon(state: &AppState, session_token: &str, coupon_id: i64) -> AppResult<Coupon> {
    validate_admin(state, session_token)?;

    let mut conn = state.db.acquire().await?;
    let coupon = coupon_store::find_by_id(&mut *conn, coupon_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Coupon {}", coupon_id)))?;

    let status = coupon.status.toggled();
    coupon_store::set_status(&mut *conn, coupon_id, status).await?;

    Ok(Coupon { status, ..coupon })
}

/// Create a purchase-with-purchase rule (admin only).
pub async fn create_pwp_rule(
    state: &AppState,
    session_token: &str,
    payload: CreatePwpRulePayload,
) -> AppResult<PwpRule> {
    validate_admin(state, session_token)?;
    validate_create_pwp_rule(&payload).map_err(AppError::Validation)?;

    let mut conn = state.db.acquire().await?;
    let variant = catalog_store::fetch_variant(&mut *conn, payload.reward_variant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Variant {}", payload.reward_variant_id)))?;

    let id = pwp_store::insert(&mut *conn, &payload, variant.product_id).await?;
    let rule = pwp_store::find_rule(&mut *conn, id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("PWP rule {} missing after insert", id)))?;

    log_info!("PWP", "Rule created", serde_json::json!({ "rule_id": id }));

    Ok(rule)
}

/// Create a membership promo (admin only).
pub async fn create_membership_promo(
    state: &AppState,
    session_token: &str,
    payload: CreateMembershipPromoPayload,
) -> AppResult<MembershipPromo> {
    validate_admin(state, session_token)?;
    validate_create_promo(&payload).map_err(AppError::Validation)?;

    let mut conn = state.db.acquire().await?;
    let id = promo_store::insert(&mut *conn, &payload).await?;
    let promo = promo_store::find_by_id(&mut *conn, id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Membership promo {} missing after insert", id)))?;

    log_info!("PROMO", "Membership promo created", serde_json::json!({ "promo_id": id }));

    Ok(promo)
}

/// Update the loyalty settings (admin only). Omitted fields keep their value.
pub async fn upsert_points_settings(
    state: &AppState,
    session_token: &str,
    payload: UpdatePointsSettingsPayload,
) -> AppResult<PointsSettings> {
    let admin = validate_admin(state, session_token)?;

    let settings = update_points_settings(&state.db, &payload).await?;

    log_info!("POINTS", "Points settings updated", serde_json::json!({
        "admin_id": admin.customer_id,
        "settings": settings,
    }));

    Ok(settings)
}
