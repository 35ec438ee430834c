use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::get_config;
use crate::errors::{AppError, AppResult};
use crate::models::customer::{Customer, CustomerRole};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionData {
    pub customer_id: String,
    pub email: String,
    pub name: String,
    pub role: CustomerRole,
    pub login_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_admin(&self) -> bool {
        self.role == CustomerRole::Admin
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: HashMap<String, SessionData>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for an already authenticated customer and returns its
    /// token (UUID v4).
    pub fn create(&mut self, customer: &Customer) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let ttl = Duration::minutes(get_config().pricing.session_timeout_mins);
        self.sessions.insert(
            token.clone(),
            SessionData {
                customer_id: customer.id.clone(),
                email: customer.email.clone(),
                name: customer.name.clone(),
                role: customer.role,
                login_at: now,
                expires_at: now + ttl,
            },
        );
        token
    }

    /// Token must exist and not be expired.
    pub fn validate(&self, token: &str) -> AppResult<&SessionData> {
        match self.sessions.get(token) {
            None => Err(AppError::Unauthorized("Invalid session, please sign in again".into())),
            Some(s) if Utc::now() > s.expires_at => {
                Err(AppError::Unauthorized("Session expired, please sign in again".into()))
            }
            Some(s) => Ok(s),
        }
    }

    pub fn validate_admin(&self, token: &str) -> AppResult<&SessionData> {
        let s = self.validate(token)?;
        if !s.is_admin() {
            return Err(AppError::Forbidden("Only admins can do this".into()));
        }
        Ok(s)
    }

    pub fn destroy(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drops expired sessions, returning how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.expires_at >= now);
        before - self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(role: CustomerRole) -> Customer {
        Customer {
            id: "cus_1".into(),
            email: "aina@shop.test".into(),
            name: "Aina".into(),
            role,
            created_at: None,
        }
    }

    #[test]
    fn test_create_and_validate() {
        let mut store = SessionStore::new();
        let token = store.create(&customer(CustomerRole::Customer));

        let session = store.validate(&token).expect("session");
        assert_eq!(session.customer_id, "cus_1");
        assert!(matches!(store.validate_admin(&token), Err(AppError::Forbidden(_))));
        assert!(matches!(store.validate("bogus"), Err(AppError::Unauthorized(_))));

        assert!(store.destroy(&token));
        assert!(store.validate(&token).is_err());
    }

    #[test]
    fn test_expired_session_is_rejected_and_purged() {
        let mut store = SessionStore::new();
        let token = store.create(&customer(CustomerRole::Admin));
        if let Some(s) = store.sessions.get_mut(&token) {
            s.expires_at = Utc::now() - Duration::minutes(1);
        }

        assert!(matches!(store.validate(&token), Err(AppError::Unauthorized(_))));
        assert_eq!(store.purge_expired(), 1);
    }
}
