use sqlx::SqliteConnection;

use crate::errors::AppResult;
use crate::models::pwp::{CreatePwpRulePayload, PwpRule, PwpRuleRow, PwpTrigger, PwpTriggerType};

pub async fn find_rule(conn: &mut SqliteConnection, rule_id: i64) -> AppResult<Option<PwpRule>> {
    let row = sqlx::query_as::<_, PwpRuleRow>("SELECT * FROM pwp_rules WHERE id = ?")
        .bind(rule_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(PwpRule::try_from).transpose()
}

pub async fn insert(
    conn: &mut SqliteConnection,
    payload: &CreatePwpRulePayload,
    reward_product_id: i64,
) -> AppResult<i64> {
    let (trigger_type, cart_value, product_id) = match payload.trigger {
        PwpTrigger::CartValue { threshold } => (PwpTriggerType::CartValue, Some(threshold), None),
        PwpTrigger::Product { product_id } => (PwpTriggerType::Product, None, Some(product_id)),
    };

    let result = sqlx::query(
        "INSERT INTO pwp_rules (
            name, trigger_type, trigger_cart_value, trigger_product_id,
            reward_variant_id, reward_product_id, reward_price
        ) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(payload.name.trim())
    .bind(trigger_type)
    .bind(cart_value)
    .bind(product_id)
    .bind(payload.reward_variant_id)
    .bind(reward_product_id)
    .bind(payload.reward_price)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}
