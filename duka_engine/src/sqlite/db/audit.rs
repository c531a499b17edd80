use log::trace;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{AuditEntry, NewAuditEntry},
    events::AuditTrail,
    traits::AuditQueryFilter,
};

pub async fn insert_entry(entry: &NewAuditEntry, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO audit_log (user_id, order_id, action_type, description) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(entry.user_id)
    .bind(entry.order_id)
    .bind(entry.action_type)
    .bind(&entry.description)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Audit entry #{id}: {}", entry.description);
    Ok(id)
}

/// Appends every audit entry the event produces. Call this inside the transaction that made the change.
pub async fn record<E: AuditTrail>(event: &E, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    for entry in event.audit_entries() {
        insert_entry(&entry, &mut *conn).await?;
    }
    Ok(())
}

pub async fn search_entries(
    filter: AuditQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<AuditEntry>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM audit_log");
    if !filter.is_empty() {
        builder.push(" WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = filter.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id);
    }
    if let Some(user_id) = filter.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(action) = filter.action_type {
        where_clause.push("action_type = ");
        where_clause.push_bind_unseparated(action);
    }
    builder.push(" ORDER BY created_at DESC, id DESC");
    if let Some(limit) = filter.limit {
        builder.push(" LIMIT ").push_bind(limit);
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as::<AuditEntry>().fetch_all(conn).await
}
