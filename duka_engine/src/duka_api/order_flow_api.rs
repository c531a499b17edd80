use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{OrderLine, OrderStatusType, User},
    events::EventProducers,
    order_objects::{normalize_lines, FullOrder, OrderQueryFilter},
    traits::{OrderManagement, ShopError, StatusChangeResult},
};

/// `OrderFlowApi` drives orders through their lifecycle: creation from a cart, staff status changes and
/// cancellation. Domain events are published to the hooks once the backing transaction has committed.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

pub(crate) fn require_elevated(user: &User, action: &str) -> Result<(), ShopError> {
    if user.has_elevated_role() {
        Ok(())
    } else {
        warn!("🔄️🚫️ {} (#{}, {}) tried to {action}", user.username, user.id, user.role);
        Err(ShopError::PermissionDenied(format!("Only staff can {action}")))
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Creates a `pending` order for `user` from the cart lines.
    ///
    /// Lines for the same variant are merged. Each variant must exist and have at least the requested quantity in
    /// stock, otherwise nothing is created. Stock is not deducted here; that happens when the order is completed.
    pub async fn create_order(&self, user: &User, lines: &[OrderLine]) -> Result<FullOrder, ShopError> {
        let lines = normalize_lines(lines).map_err(ShopError::ValidationError)?;
        let event = self.db.create_order(user, &lines).await?;
        debug!("🔄️📦️ Order #{} created for {}. Notifying hooks.", event.order.id(), user.username);
        self.producers.publish_order_created(&event).await;
        Ok(event.order)
    }

    /// Moves an order to `status`. Only staff and admins may do this.
    ///
    /// | From \ To    | completed     | cancelled | other |
    /// |--------------|---------------|-----------|-------|
    /// | non-terminal | deducts stock | ok        | ok    |
    /// | completed    | no-op         | Err       | Err   |
    /// | cancelled    | Err           | no-op     | Err   |
    ///
    /// Asking for the status the order already has succeeds without writing anything.
    pub async fn set_status(&self, order_id: i64, status: &str, acting_user: &User) -> Result<FullOrder, ShopError> {
        require_elevated(acting_user, "change order statuses")?;
        let new_status = status
            .parse::<OrderStatusType>()
            .map_err(|e| ShopError::ValidationError(format!("Invalid order status. {e}")))?;
        match self.db.set_order_status(order_id, new_status, acting_user).await? {
            StatusChangeResult::Unchanged(order) => Ok(order),
            StatusChangeResult::Changed { order, event } => {
                debug!("🔄️📦️ Order #{order_id} is now {new_status}. Notifying hooks.");
                self.producers.publish_order_status_changed(&event).await;
                Ok(order)
            },
        }
    }

    pub async fn cancel(&self, order_id: i64, acting_user: &User) -> Result<FullOrder, ShopError> {
        require_elevated(acting_user, "cancel orders")?;
        let event = self.db.cancel_order(order_id, acting_user).await?;
        self.producers.publish_order_cancelled(&event).await;
        Ok(event.order)
    }

    /// Fetches an order. Customers only see their own orders; to them, other orders do not exist.
    pub async fn order_for_user(&self, order_id: i64, user: &User) -> Result<FullOrder, ShopError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(ShopError::OrderNotFound(order_id))?;
        if order.order.user_id != user.id && !user.has_elevated_role() {
            debug!("🔄️📦️ {} asked for order #{order_id}, which belongs to someone else", user.username);
            return Err(ShopError::OrderNotFound(order_id));
        }
        Ok(order)
    }

    /// Staff see every order, customers only their own.
    pub async fn orders_for_user(
        &self,
        user: &User,
        status: Option<Vec<OrderStatusType>>,
    ) -> Result<Vec<FullOrder>, ShopError> {
        let mut filter = OrderQueryFilter::default();
        if !user.has_elevated_role() {
            filter = filter.with_user_id(user.id);
        }
        filter.status = status;
        self.db.fetch_orders(filter).await
    }
}
