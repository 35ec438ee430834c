use sqlx::SqliteConnection;

use crate::errors::AppResult;
use crate::models::customer::{CreateCustomerPayload, Customer, CustomerRole};

pub async fn fetch(conn: &mut SqliteConnection, customer_id: &str) -> AppResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(customer)
}

pub async fn insert(conn: &mut SqliteConnection, payload: &CreateCustomerPayload) -> AppResult<String> {
    let customer_id = uuid::Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO customers (id, email, name, role) VALUES (?, ?, ?, ?)")
        .bind(&customer_id)
        .bind(payload.email.trim().to_lowercase())
        .bind(payload.name.trim())
        .bind(payload.role.unwrap_or(CustomerRole::Customer))
        .execute(&mut *conn)
        .await?;
    Ok(customer_id)
}
