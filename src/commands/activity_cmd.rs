use crate::auth::guard::validate_admin;
use crate::errors::AppResult;
use crate::models::activity::ActivityLogWithCustomer;
use crate::AppState;

const MAX_LIMIT: i64 = 500;

/// Audit trail, newest first, optionally for one customer (admin only).
pub async fn get_activity_logs(
    state: &AppState,
    session_token: &str,
    customer_id: Option<String>,
    limit: i64,
) -> AppResult<Vec<ActivityLogWithCustomer>> {
    validate_admin(state, session_token)?;

    let mut query = r#"
        SELECT al.id, al.customer_id, c.name as customer_name, al.action,
               al.description, al.metadata, al.created_at
        FROM activity_logs al
        LEFT JOIN customers c ON al.customer_id = c.id
    "#
    .to_string();

    if customer_id.is_some() {
        query.push_str(" WHERE al.customer_id = ?");
    }

    query.push_str(" ORDER BY al.id DESC LIMIT ?");

    let mut sql_query = sqlx::query_as::<_, ActivityLogWithCustomer>(&query);

    if let Some(id) = customer_id {
        sql_query = sql_query.bind(id);
    }

    let logs = sql_query
        .bind(limit.clamp(1, MAX_LIMIT))
        .fetch_all(&state.db)
        .await?;

    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{log_discount_action, DiscountAuditAction};
    use crate::errors::AppError;
    use crate::models::customer::CustomerRole;
    use crate::test_support::*;

    #[tokio::test]
    async fn test_logs_are_joined_with_customer_names() {
        let state = test_state().await;
        let (customer, token) = login(&state, "Aina", CustomerRole::Customer).await;
        let (_, admin) = login(&state, "Boss", CustomerRole::Admin).await;

        log_discount_action(&state.db, Some(&customer), DiscountAuditAction::PointsAdjust, "Bonus", None).await;
        log_discount_action(&state.db, None, DiscountAuditAction::OrderCancel, "Guest order", None).await;

        let denied = get_activity_logs(&state, &token, None, 10).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        let all = get_activity_logs(&state, &admin, None, 10).await.expect("all");
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].customer_name.as_deref(), Some("Aina"));

        let mine = get_activity_logs(&state, &admin, Some(customer), 10).await.expect("mine");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].action, "POINTS_ADJUST");
    }
}
