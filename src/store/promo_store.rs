use sqlx::SqliteConnection;

use crate::errors::AppResult;
use crate::models::promo::{CreateMembershipPromoPayload, Membership, MembershipPromo, MembershipStatus};

/// Active promos by id. Date windows are checked by the caller.
pub async fn list_active(conn: &mut SqliteConnection) -> AppResult<Vec<MembershipPromo>> {
    let promos = sqlx::query_as::<_, MembershipPromo>(
        "SELECT * FROM membership_promos WHERE status = 'active' ORDER BY id",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(promos)
}

pub async fn find_by_id(conn: &mut SqliteConnection, promo_id: i64) -> AppResult<Option<MembershipPromo>> {
    let promo = sqlx::query_as::<_, MembershipPromo>("SELECT * FROM membership_promos WHERE id = ?")
        .bind(promo_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(promo)
}

pub async fn insert(conn: &mut SqliteConnection, payload: &CreateMembershipPromoPayload) -> AppResult<i64> {
    let result = sqlx::query(
        "INSERT INTO membership_promos (name, discount_type, value, min_purchase, start_date, end_date)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(payload.name.trim())
    .bind(payload.discount_type)
    .bind(payload.value)
    .bind(payload.min_purchase)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn fetch_membership(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> AppResult<Option<Membership>> {
    let membership = sqlx::query_as::<_, Membership>("SELECT * FROM memberships WHERE customer_id = ?")
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(membership)
}

pub async fn upsert_membership(
    conn: &mut SqliteConnection,
    customer_id: &str,
    status: MembershipStatus,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO memberships (customer_id, status) VALUES (?, ?)
         ON CONFLICT(customer_id) DO UPDATE SET status = excluded.status",
    )
    .bind(customer_id)
    .bind(status)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
