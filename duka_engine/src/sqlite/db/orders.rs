use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Money, Order, OrderItem, OrderStatusType},
    order_objects::{FullOrder, OrderQueryFilter},
};

/// Orders carry no stored total. It is always summed from the unit prices captured on the items.
const ORDER_SELECT: &str = r#"
    SELECT
        o.id,
        o.user_id,
        o.status,
        COALESCE((SELECT SUM(i.unit_price * i.quantity) FROM order_items i WHERE i.order_id = o.id), 0) AS total_price,
        o.last_modified_by,
        o.created_at,
        o.updated_at
    FROM orders o
"#;

/// Inserts a bare `pending` order row and returns its id. This is not atomic. Embed the call in a transaction
/// together with [`insert_item`].
pub async fn insert_order(user_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id: i64 = sqlx::query_scalar("INSERT INTO orders (user_id, status) VALUES ($1, 'pending') RETURNING id")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    debug!("🗃️ Order #{id} inserted for user #{user_id}");
    Ok(id)
}

pub async fn insert_item(
    order_id: i64,
    variant_id: i64,
    quantity: i64,
    unit_price: Money,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, variant_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(variant_id)
    .bind(quantity)
    .bind(unit_price)
    .fetch_one(conn)
    .await
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(ORDER_SELECT);
    builder.push(" WHERE o.id = ").push_bind(id);
    builder.build_query_as::<Order>().fetch_optional(conn).await
}

pub async fn fetch_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

pub async fn fetch_full_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<FullOrder>, sqlx::Error> {
    let order = match fetch_order(id, &mut *conn).await? {
        Some(order) => order,
        None => return Ok(None),
    };
    let items = fetch_items(id, conn).await?;
    Ok(Some(FullOrder::new(order, items)))
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(filter: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(ORDER_SELECT);
    if !filter.is_empty() {
        builder.push(" WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = filter.user_id {
        where_clause.push("o.user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(statuses) = filter.status.as_ref().filter(|s| !s.is_empty()) {
        // Statuses come from a closed enum, so formatting them into the query is safe
        let status_clause = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("o.status IN ({status_clause})"));
    }
    builder.push(" ORDER BY o.created_at ASC, o.id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as::<Order>().fetch_all(conn).await
}

pub async fn search_full_orders(
    filter: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<FullOrder>, sqlx::Error> {
    let orders = search_orders(filter, &mut *conn).await?;
    let mut result = Vec::with_capacity(orders.len());
    for order in orders {
        let items = fetch_items(order.id, &mut *conn).await?;
        result.push(FullOrder::new(order, items));
    }
    Ok(result)
}

/// Compare-and-set on the order status. The update only happens if the order is still in `old_status`. Returns
/// `false` if another writer got there first.
pub async fn update_status(
    order_id: i64,
    old_status: OrderStatusType,
    new_status: OrderStatusType,
    modified_by: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE orders
            SET status = $1,
                last_modified_by = COALESCE($2, last_modified_by),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = $4
        "#,
    )
    .bind(new_status)
    .bind(modified_by)
    .bind(order_id)
    .bind(old_status)
    .execute(conn)
    .await?;
    let updated = result.rows_affected() > 0;
    trace!("🗃️ Order #{order_id} {old_status} -> {new_status}: {updated}");
    Ok(updated)
}
