use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Money, NewPayment, Payment, PaymentMethod, PaymentStatus, ProviderCorrelation},
    payment_objects::PaymentQueryFilter,
};

pub async fn insert_payment(
    payment: NewPayment,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<Payment, sqlx::Error> {
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, user_id, payment_method, phone_number, amount, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(payment.user_id)
    .bind(payment.payment_method)
    .bind(payment.phone_number)
    .bind(amount)
    .fetch_one(&mut *conn)
    .await?;
    debug!("🗃️ Payment #{} of {amount} inserted for order #{}", payment.id, payment.order_id);
    match payment.payment_method.merchant_reference(payment.id) {
        Some(reference) => {
            sqlx::query_as("UPDATE payments SET provider_reference = $1 WHERE id = $2 RETURNING *")
                .bind(reference)
                .bind(payment.id)
                .fetch_one(conn)
                .await
        },
        None => Ok(payment),
    }
}

pub async fn fetch_payment(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// M-Pesa callbacks are matched on the checkout request id, everything else on the provider reference.
pub async fn fetch_payment_by_correlation_id(
    method: PaymentMethod,
    correlation_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let sql = match method {
        PaymentMethod::Mpesa => "SELECT * FROM payments WHERE payment_method = $1 AND checkout_request_id = $2",
        PaymentMethod::Airtel => "SELECT * FROM payments WHERE payment_method = $1 AND provider_reference = $2",
    };
    sqlx::query_as(sql).bind(method).bind(correlation_id).fetch_optional(conn).await
}

/// Fetches payments matching the filter, newest first.
pub async fn search_payments(
    filter: PaymentQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM payments");
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
    if let Some(status) = filter.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status);
    }
    if let Some(method) = filter.method {
        where_clause.push("payment_method = ");
        where_clause.push_bind_unseparated(method);
    }
    builder.push(" ORDER BY created_at DESC, id DESC");
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as::<Payment>().fetch_all(conn).await
}

/// Stores the provider correlation ids on a payment that is still pending.
pub async fn record_correlation(
    payment_id: i64,
    correlation: &ProviderCorrelation,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let (merchant_request_id, checkout_request_id, provider_reference) = match correlation {
        ProviderCorrelation::Mpesa { merchant_request_id, checkout_request_id } => {
            (Some(merchant_request_id.as_str()), Some(checkout_request_id.as_str()), None)
        },
        ProviderCorrelation::Generic { transaction_ref } => (None, None, Some(transaction_ref.as_str())),
    };
    let result = sqlx::query(
        r#"
            UPDATE payments
            SET merchant_request_id = $1,
                checkout_request_id = $2,
                provider_reference = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4 AND status = 'pending'
        "#,
    )
    .bind(merchant_request_id)
    .bind(checkout_request_id)
    .bind(provider_reference)
    .bind(payment_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Compare-and-set from `pending` to a terminal status. Returns `false` if the payment was no longer pending, in which
/// case nothing is changed.
pub async fn settle(
    payment_id: i64,
    status: PaymentStatus,
    transaction_id: Option<&str>,
    result_desc: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE payments
            SET status = $1,
                transaction_id = COALESCE($2, transaction_id),
                result_desc = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4 AND status = 'pending'
        "#,
    )
    .bind(status)
    .bind(transaction_id)
    .bind(result_desc)
    .bind(payment_id)
    .execute(conn)
    .await?;
    let settled = result.rows_affected() > 0;
    trace!("🗃️ Payment #{payment_id} -> {status}: {settled}");
    Ok(settled)
}

/// The number of completed payments for the order, not counting `except_payment_id`.
pub async fn count_completed_for_order(
    order_id: i64,
    except_payment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE order_id = $1 AND id != $2 AND status = 'completed'")
        .bind(order_id)
        .bind(except_payment_id)
        .fetch_one(conn)
        .await
}
