use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CustomerRole {
    Customer,
    Admin,
}

impl CustomerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerRole::Customer => "customer",
            CustomerRole::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: CustomerRole,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCustomerPayload {
    pub email: String,
    pub name: String,
    pub role: Option<CustomerRole>,
}

/// Returned to the host when a session is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub token: String,
    pub customer: Customer,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}
