use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLog {
    pub id: i64,
    pub customer_id: Option<String>,
    pub action: String,
    pub description: String,
    pub metadata: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLogWithCustomer {
    pub id: i64,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub action: String,
    pub description: String,
    pub metadata: Option<String>,
    pub created_at: Option<String>,
}
