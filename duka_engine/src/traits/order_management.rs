use crate::{
    db_types::{OrderLine, OrderStatusType, User},
    events::{OrderCancelledEvent, OrderCreatedEvent},
    order_objects::{FullOrder, OrderQueryFilter},
    traits::{ShopError, StatusChangeResult},
};

/// Order storage and the order state machine.
///
/// Implementations must make each mutating call a single all-or-nothing transaction, including the audit entry
/// derived from the returned event. Permission checks are the caller's responsibility.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Creates a `pending` order for `user` from the cart lines.
    ///
    /// Lines must already be validated and merged (one line per variant, positive quantities). Every variant must
    /// exist and currently have at least the requested quantity in stock, otherwise nothing is written. Stock is not
    /// deducted; that happens when the order is completed. Each item records the variant price at this moment.
    async fn create_order(&self, user: &User, lines: &[OrderLine]) -> Result<OrderCreatedEvent, ShopError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<FullOrder>, ShopError>;

    async fn fetch_orders(&self, filter: OrderQueryFilter) -> Result<Vec<FullOrder>, ShopError>;

    /// Moves the order to `new_status`.
    ///
    /// * Same status: returns [`StatusChangeResult::Unchanged`], writes nothing.
    /// * From a terminal status: `InvalidOrderTransition`.
    /// * To `completed`: deducts stock for every item, failing with `InsufficientStock` (and touching nothing) if any
    ///   variant cannot cover its item.
    async fn set_order_status(
        &self,
        order_id: i64,
        new_status: OrderStatusType,
        acting_user: &User,
    ) -> Result<StatusChangeResult, ShopError>;

    /// Cancels a non-terminal order. Stock is not restored since it is only deducted on completion.
    async fn cancel_order(&self, order_id: i64, acting_user: &User) -> Result<OrderCancelledEvent, ShopError>;
}
