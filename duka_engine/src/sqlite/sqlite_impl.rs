//! `SqliteDatabase` is a concrete implementation of a Duka engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the management traits defined in the
//! [`traits`](crate::traits) module.
//!
//! ## Isolation
//! SQLite admits a single writer at a time. Every mutating method takes the database's writer lock before `BEGIN`
//! and holds it until `COMMIT` or `ROLLBACK`, so concurrent requests queue instead of failing with `SQLITE_BUSY`
//! halfway through a transaction. On top of that, every state change is a guarded `UPDATE`: status changes are
//! compare-and-set on the previous status, and stock deductions only apply while `stock >= quantity`. A guard that
//! matches no rows aborts the transaction.
//!
//! Reads go straight to the pool and run concurrently with writers (the database runs in WAL mode).
use std::{fmt::Debug, sync::Arc};

use log::*;
use sqlx::{migrate, migrate::MigrateError, Sqlite, SqlitePool, Transaction};
use tokio::sync::{Mutex, MutexGuard};

use super::db::{audit, catalog, db_url, new_pool, orders, payments, users};
use crate::{
    db_types::{
        AuditEntry,
        NewPayment,
        NewProduct,
        NewUser,
        NewVariant,
        OrderLine,
        OrderStatusType,
        Payment,
        PaymentMethod,
        PaymentStatus,
        Product,
        ProductVariant,
        ProviderCorrelation,
        User,
    },
    events::{
        OrderCancelledEvent,
        OrderCreatedEvent,
        OrderStatusChangedEvent,
        PaymentSettledEvent,
        StockRestockedEvent,
    },
    order_objects::{FullOrder, OrderQueryFilter},
    payment_objects::{PaymentQueryFilter, Settlement, SettlementOutcome},
    traits::{
        AuditManagement,
        AuditQueryFilter,
        CatalogManagement,
        OrderManagement,
        PaymentManagement,
        SettlePaymentResult,
        ShopError,
        StatusChangeResult,
        UserManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

type WriteTx<'a> = (MutexGuard<'a, ()>, Transaction<'static, Sqlite>);

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `DUKA_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool for {url}");
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool, writer: Arc::new(Mutex::new(())) })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }

    /// Takes the writer lock, then opens a transaction. Keep the guard alive until the transaction is finished.
    async fn begin_write(&self) -> Result<WriteTx<'_>, ShopError> {
        let guard = self.writer.lock().await;
        let tx = self.pool.begin().await?;
        Ok((guard, tx))
    }
}

/// Rolls the transaction back explicitly before reporting `err`, so that the write lock is released only once the
/// database is clean.
async fn abort<T>(tx: Transaction<'static, Sqlite>, err: ShopError) -> Result<T, ShopError> {
    tx.rollback().await?;
    Err(err)
}

impl UserManagement for SqliteDatabase {
    async fn insert_user(&self, user: NewUser) -> Result<User, ShopError> {
        let (_guard, mut tx) = self.begin_write().await?;
        let user = users::insert_user(user, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ User {} (#{}) added as {}", user.username, user.id, user.role);
        Ok(user)
    }

    async fn fetch_user(&self, id: i64) -> Result<Option<User>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user(id, &mut conn).await?)
    }

    async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user_by_username(username, &mut conn).await?)
    }

    async fn delete_user(&self, id: i64) -> Result<bool, ShopError> {
        let (_guard, mut tx) = self.begin_write().await?;
        let deleted = users::delete_user(id, &mut tx).await?;
        tx.commit().await?;
        if deleted {
            info!("🗃️ User #{id} deleted");
        }
        Ok(deleted)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, ShopError> {
        if product.name.trim().is_empty() {
            return Err(ShopError::ValidationError("Product name cannot be empty".into()));
        }
        let (_guard, mut tx) = self.begin_write().await?;
        let product = catalog::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Product #{} ({}) added", product.id, product.name);
        Ok(product)
    }

    async fn insert_variant(&self, variant: NewVariant) -> Result<ProductVariant, ShopError> {
        if variant.price.is_negative() {
            return Err(ShopError::ValidationError(format!("Price cannot be negative: {}", variant.price)));
        }
        if variant.stock < 0 {
            return Err(ShopError::ValidationError(format!("Stock cannot be negative: {}", variant.stock)));
        }
        let (_guard, mut tx) = self.begin_write().await?;
        if catalog::fetch_product(variant.product_id, &mut tx).await?.is_none() {
            return abort(tx, ShopError::ProductNotFound(variant.product_id)).await;
        }
        let variant = catalog::insert_variant(variant, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Variant #{} added to product #{}", variant.id, variant.product_id);
        Ok(variant)
    }

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_product(id, &mut conn).await?)
    }

    async fn fetch_products(&self) -> Result<Vec<Product>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_products(&mut conn).await?)
    }

    async fn fetch_variant(&self, id: i64) -> Result<Option<ProductVariant>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_variant(id, &mut conn).await?)
    }

    async fn fetch_variants_for_product(&self, product_id: i64) -> Result<Vec<ProductVariant>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_variants_for_product(product_id, &mut conn).await?)
    }

    async fn restock_variant(
        &self,
        variant_id: i64,
        amount: i64,
        acting_user: &User,
    ) -> Result<StockRestockedEvent, ShopError> {
        if amount < 1 {
            return Err(ShopError::ValidationError(format!("Restock amount must be positive, not {amount}")));
        }
        let (_guard, mut tx) = self.begin_write().await?;
        let Some(current) = catalog::fetch_variant(variant_id, &mut tx).await? else {
            return abort(tx, ShopError::VariantNotFound(variant_id)).await;
        };
        if current.stock.checked_add(amount).is_none() {
            let stock = current.stock;
            let err = format!("Restocking variant #{variant_id} by {amount} would overflow its stock of {stock}");
            return abort(tx, ShopError::ValidationError(err)).await;
        }
        if !catalog::add_stock(variant_id, amount, &mut tx).await? {
            return abort(tx, ShopError::VariantNotFound(variant_id)).await;
        }
        let variant = catalog::fetch_variant(variant_id, &mut tx)
            .await?
            .ok_or_else(|| ShopError::Internal(format!("Variant #{variant_id} vanished during restock")))?;
        let event = StockRestockedEvent { variant, amount, restocked_by: acting_user.clone() };
        audit::record(&event, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Variant #{variant_id} restocked with {amount} units. Stock is now {}", event.variant.stock);
        Ok(event)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn create_order(&self, user: &User, lines: &[OrderLine]) -> Result<OrderCreatedEvent, ShopError> {
        let (_guard, mut tx) = self.begin_write().await?;
        let mut priced = Vec::with_capacity(lines.len());
        for line in lines {
            let variant = match catalog::fetch_variant(line.variant_id, &mut tx).await? {
                Some(v) => v,
                None => return abort(tx, ShopError::VariantNotFound(line.variant_id)).await,
            };
            if variant.stock < line.quantity {
                debug!(
                    "🗃️ Cannot create order for {}. Variant #{} has {} in stock, {} requested",
                    user.username, variant.id, variant.stock, line.quantity
                );
                let err = ShopError::InsufficientStock {
                    variant_id: variant.id,
                    requested: line.quantity,
                    available: variant.stock,
                };
                return abort(tx, err).await;
            }
            priced.push((line, variant.price));
        }
        let order_id = orders::insert_order(user.id, &mut tx).await?;
        for (line, price) in priced {
            orders::insert_item(order_id, line.variant_id, line.quantity, price, &mut tx).await?;
        }
        let order = orders::fetch_full_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| ShopError::Internal(format!("Order #{order_id} vanished during creation")))?;
        let event = OrderCreatedEvent { order, created_by: user.clone() };
        audit::record(&event, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{order_id} created for {} with total {}", user.username, event.order.order.total_price);
        Ok(event)
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<FullOrder>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_full_order(id, &mut conn).await?)
    }

    async fn fetch_orders(&self, filter: OrderQueryFilter) -> Result<Vec<FullOrder>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_full_orders(filter, &mut conn).await?)
    }

    async fn set_order_status(
        &self,
        order_id: i64,
        new_status: OrderStatusType,
        acting_user: &User,
    ) -> Result<StatusChangeResult, ShopError> {
        let (_guard, mut tx) = self.begin_write().await?;
        let order = match orders::fetch_full_order(order_id, &mut tx).await? {
            Some(o) => o,
            None => return abort(tx, ShopError::OrderNotFound(order_id)).await,
        };
        let old_status = order.status();
        if old_status == new_status {
            tx.commit().await?;
            trace!("🗃️ Order #{order_id} is already {new_status}. Nothing to do.");
            return Ok(StatusChangeResult::Unchanged(order));
        }
        if old_status.is_terminal() {
            let err = ShopError::InvalidOrderTransition { order_id, from: old_status, to: new_status };
            return abort(tx, err).await;
        }
        if new_status == OrderStatusType::Completed {
            for item in &order.items {
                if !catalog::deduct_stock(item.variant_id, item.quantity, &mut tx).await? {
                    let available =
                        catalog::fetch_variant(item.variant_id, &mut tx).await?.map(|v| v.stock).unwrap_or_default();
                    warn!(
                        "🗃️ Order #{order_id} cannot be completed. Variant #{} has {available} in stock, {} needed",
                        item.variant_id, item.quantity
                    );
                    let err = ShopError::InsufficientStock {
                        variant_id: item.variant_id,
                        requested: item.quantity,
                        available,
                    };
                    return abort(tx, err).await;
                }
            }
        }
        if !orders::update_status(order_id, old_status, new_status, Some(acting_user.id), &mut tx).await? {
            let err = ShopError::InvalidTransition(format!("Order #{order_id} was modified concurrently"));
            return abort(tx, err).await;
        }
        let order = orders::fetch_full_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| ShopError::Internal(format!("Order #{order_id} vanished during status update")))?;
        let event = OrderStatusChangedEvent {
            order: order.order.clone(),
            old_status,
            new_status,
            changed_by: Some(acting_user.clone()),
        };
        audit::record(&event, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Order #{order_id} moved from {old_status} to {new_status} by {}", acting_user.username);
        Ok(StatusChangeResult::Changed { order, event })
    }

    async fn cancel_order(&self, order_id: i64, acting_user: &User) -> Result<OrderCancelledEvent, ShopError> {
        let (_guard, mut tx) = self.begin_write().await?;
        let order = match orders::fetch_order(order_id, &mut tx).await? {
            Some(o) => o,
            None => return abort(tx, ShopError::OrderNotFound(order_id)).await,
        };
        let previous_status = order.status;
        if previous_status.is_terminal() {
            let err =
                ShopError::InvalidOrderTransition { order_id, from: previous_status, to: OrderStatusType::Cancelled };
            return abort(tx, err).await;
        }
        let updated = orders::update_status(
            order_id,
            previous_status,
            OrderStatusType::Cancelled,
            Some(acting_user.id),
            &mut tx,
        )
        .await?;
        if !updated {
            let err = ShopError::InvalidTransition(format!("Order #{order_id} was modified concurrently"));
            return abort(tx, err).await;
        }
        let order = orders::fetch_full_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| ShopError::Internal(format!("Order #{order_id} vanished during cancellation")))?;
        let event = OrderCancelledEvent { order, previous_status, cancelled_by: acting_user.clone() };
        audit::record(&event, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Order #{order_id} cancelled by {}", acting_user.username);
        Ok(event)
    }
}

impl PaymentManagement for SqliteDatabase {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, ShopError> {
        let (_guard, mut tx) = self.begin_write().await?;
        let order = match orders::fetch_order(payment.order_id, &mut tx).await? {
            Some(o) => o,
            None => return abort(tx, ShopError::OrderNotFound(payment.order_id)).await,
        };
        if order.status != OrderStatusType::Pending {
            let err = ShopError::InvalidTransition(format!(
                "Order #{} is {}. Only pending orders can be paid for",
                order.id, order.status
            ));
            return abort(tx, err).await;
        }
        let payment = payments::insert_payment(payment, order.total_price, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn record_correlation(
        &self,
        payment_id: i64,
        correlation: &ProviderCorrelation,
    ) -> Result<Payment, ShopError> {
        let (_guard, mut tx) = self.begin_write().await?;
        if !payments::record_correlation(payment_id, correlation, &mut tx).await? {
            let err = match payments::fetch_payment(payment_id, &mut tx).await? {
                Some(p) => ShopError::InvalidTransition(format!("Payment #{payment_id} is already {}", p.status)),
                None => ShopError::PaymentNotFound(payment_id),
            };
            return abort(tx, err).await;
        }
        let payment = payments::fetch_payment(payment_id, &mut tx)
            .await?
            .ok_or_else(|| ShopError::Internal(format!("Payment #{payment_id} vanished")))?;
        tx.commit().await?;
        debug!("🗃️ Payment #{payment_id} correlated with {}", correlation.callback_id());
        Ok(payment)
    }

    async fn record_initiation_failure(&self, payment_id: i64, reason: &str) -> Result<PaymentSettledEvent, ShopError> {
        let (_guard, mut tx) = self.begin_write().await?;
        if !payments::settle(payment_id, PaymentStatus::Failed, None, reason, &mut tx).await? {
            let err = match payments::fetch_payment(payment_id, &mut tx).await? {
                Some(p) => ShopError::InvalidTransition(format!("Payment #{payment_id} is already {}", p.status)),
                None => ShopError::PaymentNotFound(payment_id),
            };
            return abort(tx, err).await;
        }
        let payment = payments::fetch_payment(payment_id, &mut tx)
            .await?
            .ok_or_else(|| ShopError::Internal(format!("Payment #{payment_id} vanished")))?;
        let event = PaymentSettledEvent {
            payment,
            previous_status: PaymentStatus::Pending,
            settled_by: None,
            order_change: None,
        };
        audit::record(&event, &mut tx).await?;
        tx.commit().await?;
        Ok(event)
    }

    async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment(id, &mut conn).await?)
    }

    async fn fetch_payment_by_correlation_id(
        &self,
        method: PaymentMethod,
        correlation_id: &str,
    ) -> Result<Option<Payment>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment_by_correlation_id(method, correlation_id, &mut conn).await?)
    }

    async fn fetch_payments(&self, filter: PaymentQueryFilter) -> Result<Vec<Payment>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::search_payments(filter, &mut conn).await?)
    }

    async fn settle_payment(
        &self,
        payment_id: i64,
        settlement: Settlement,
        acting_user: Option<&User>,
    ) -> Result<SettlePaymentResult, ShopError> {
        let (_guard, mut tx) = self.begin_write().await?;
        let payment = match payments::fetch_payment(payment_id, &mut tx).await? {
            Some(p) => p,
            None => return abort(tx, ShopError::PaymentNotFound(payment_id)).await,
        };
        if payment.status.is_terminal() {
            tx.commit().await?;
            debug!("🗃️ Payment #{payment_id} is already {}. Ignoring settlement", payment.status);
            return Ok(SettlePaymentResult::AlreadySettled(payment));
        }
        let new_status = settlement.outcome.payment_status();
        let tx_id = settlement.transaction_id.as_deref();
        if !payments::settle(payment_id, new_status, tx_id, &settlement.message, &mut tx).await? {
            let current = payments::fetch_payment(payment_id, &mut tx)
                .await?
                .ok_or_else(|| ShopError::Internal(format!("Payment #{payment_id} vanished")))?;
            tx.commit().await?;
            return Ok(SettlePaymentResult::AlreadySettled(current));
        }
        let order = match orders::fetch_order(payment.order_id, &mut tx).await? {
            Some(o) => o,
            None => return abort(tx, ShopError::OrderNotFound(payment.order_id)).await,
        };
        let transition = match settlement.outcome {
            SettlementOutcome::Completed if order.status == OrderStatusType::Pending => {
                Some((OrderStatusType::Pending, OrderStatusType::Paid))
            },
            SettlementOutcome::Completed => {
                warn!(
                    "🗃️ Payment #{payment_id} completed, but order #{} is {}. The order status is left as is.",
                    order.id, order.status
                );
                None
            },
            SettlementOutcome::Failed if order.status == OrderStatusType::Paid => {
                let others = payments::count_completed_for_order(order.id, payment_id, &mut tx).await?;
                (others == 0).then_some((OrderStatusType::Paid, OrderStatusType::Pending))
            },
            SettlementOutcome::Failed => None,
        };
        let mut order_change = None;
        if let Some((old_status, new_status)) = transition {
            let modified_by = acting_user.map(|u| u.id);
            if orders::update_status(order.id, old_status, new_status, modified_by, &mut tx).await? {
                let order = orders::fetch_order(order.id, &mut tx)
                    .await?
                    .ok_or_else(|| ShopError::Internal(format!("Order #{} vanished", payment.order_id)))?;
                order_change =
                    Some(OrderStatusChangedEvent { order, old_status, new_status, changed_by: acting_user.cloned() });
            }
        }
        let updated = payments::fetch_payment(payment_id, &mut tx)
            .await?
            .ok_or_else(|| ShopError::Internal(format!("Payment #{payment_id} vanished")))?;
        let event = PaymentSettledEvent {
            payment: updated,
            previous_status: payment.status,
            settled_by: acting_user.cloned(),
            order_change,
        };
        audit::record(&event, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Payment #{payment_id} settled as {new_status}");
        Ok(SettlePaymentResult::Settled(event))
    }
}

impl AuditManagement for SqliteDatabase {
    async fn fetch_audit_entries(&self, filter: AuditQueryFilter) -> Result<Vec<AuditEntry>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        Ok(audit::search_entries(filter, &mut conn).await?)
    }
}
