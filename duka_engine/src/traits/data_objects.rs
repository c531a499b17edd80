use serde::{Deserialize, Serialize};

use crate::{
    db_types::{AuditAction, Payment},
    events::{OrderStatusChangedEvent, PaymentSettledEvent},
    order_objects::FullOrder,
};

/// The outcome of a status change request. Asking for the status an order already has is not an error, but nothing
/// is written.
#[derive(Debug, Clone)]
pub enum StatusChangeResult {
    Unchanged(FullOrder),
    Changed { order: FullOrder, event: OrderStatusChangedEvent },
}

impl StatusChangeResult {
    pub fn order(&self) -> &FullOrder {
        match self {
            Self::Unchanged(order) => order,
            Self::Changed { order, .. } => order,
        }
    }

    pub fn into_order(self) -> FullOrder {
        match self {
            Self::Unchanged(order) => order,
            Self::Changed { order, .. } => order,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SettlePaymentResult {
    /// The payment had already reached a terminal state. Nothing was changed.
    AlreadySettled(Payment),
    Settled(PaymentSettledEvent),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditQueryFilter {
    pub order_id: Option<i64>,
    pub user_id: Option<i64>,
    pub action_type: Option<AuditAction>,
    pub limit: Option<i64>,
}

impl AuditQueryFilter {
    pub fn with_order_id(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_action(mut self, action: AuditAction) -> Self {
        self.action_type = Some(action);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() && self.user_id.is_none() && self.action_type.is_none()
    }
}
