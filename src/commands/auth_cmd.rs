use crate::auth::guard::validate_session;
use crate::auth::session::SessionData;
use crate::errors::{AppError, AppResult};
use crate::log_info;
use crate::models::customer::SessionInfo;
use crate::store::customer_store;
use crate::AppState;

/// Opens a session for a customer the host has already authenticated.
pub async fn open_session(state: &AppState, customer_id: &str) -> AppResult<SessionInfo> {
    let mut conn = state.db.acquire().await?;
    let customer = customer_store::fetch(&mut *conn, customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer {}", customer_id)))?;
    drop(conn);

    let mut sessions = state
        .sessions
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    sessions.purge_expired();
    let token = sessions.create(&customer);
    let expires_at = sessions.validate(&token)?.expires_at;
    drop(sessions);

    log_info!("APP", "Session opened", serde_json::json!({
        "customer_id": customer.id,
        "role": customer.role.as_str(),
    }));

    Ok(SessionInfo {
        token,
        customer,
        expires_at,
    })
}

pub async fn close_session(state: &AppState, session_token: &str) -> AppResult<()> {
    let mut sessions = state
        .sessions
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    sessions.destroy(session_token);
    Ok(())
}

pub async fn check_session(state: &AppState, session_token: &str) -> AppResult<SessionData> {
    validate_session(state, session_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::customer::CustomerRole;
    use crate::test_support::*;

    #[tokio::test]
    async fn test_open_check_close() {
        let state = test_state().await;
        let customer = seed_customer(&state.db, "Aina", CustomerRole::Customer).await;

        let info = open_session(&state, &customer).await.expect("open");
        assert_eq!(info.customer.id, customer);

        let session = check_session(&state, &info.token).await.expect("check");
        assert_eq!(session.customer_id, customer);

        close_session(&state, &info.token).await.expect("close");
        assert!(matches!(
            check_session(&state, &info.token).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let state = test_state().await;
        assert!(matches!(open_session(&state, "ghost").await, Err(AppError::NotFound(_))));
    }
}
