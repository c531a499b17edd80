use serde::{Deserialize, Serialize};

use crate::{
    db_types::{AuditAction, NewAuditEntry, Order, OrderStatusType, Payment, PaymentStatus, ProductVariant, User},
    order_objects::FullOrder,
};

/// Domain events know how they are recorded in the audit trail. The store appends these entries in the same
/// transaction as the change that produced the event.
pub trait AuditTrail {
    fn audit_entries(&self) -> Vec<NewAuditEntry>;
}

fn actor(user: Option<&User>) -> String {
    match user {
        Some(u) => format!("{} (#{})", u.username, u.id),
        None => "the payment provider".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: FullOrder,
    pub created_by: User,
}

impl AuditTrail for OrderCreatedEvent {
    fn audit_entries(&self) -> Vec<NewAuditEntry> {
        let order = &self.order.order;
        vec![NewAuditEntry {
            user_id: Some(self.created_by.id),
            order_id: Some(order.id),
            action_type: AuditAction::OrderCreate,
            description: format!(
                "Order #{} created by {} with {} item(s), total {}",
                order.id,
                actor(Some(&self.created_by)),
                self.order.items.len(),
                order.total_price
            ),
        }]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
    pub new_status: OrderStatusType,
    /// `None` when the change was driven by a provider callback
    pub changed_by: Option<User>,
}

impl AuditTrail for OrderStatusChangedEvent {
    fn audit_entries(&self) -> Vec<NewAuditEntry> {
        vec![NewAuditEntry {
            user_id: self.changed_by.as_ref().map(|u| u.id),
            order_id: Some(self.order.id),
            action_type: AuditAction::OrderStatusUpdate,
            description: format!(
                "Order #{} status changed from {} to {} by {}",
                self.order.id,
                self.old_status,
                self.new_status,
                actor(self.changed_by.as_ref())
            ),
        }]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: FullOrder,
    pub previous_status: OrderStatusType,
    pub cancelled_by: User,
}

impl AuditTrail for OrderCancelledEvent {
    fn audit_entries(&self) -> Vec<NewAuditEntry> {
        vec![NewAuditEntry {
            user_id: Some(self.cancelled_by.id),
            order_id: Some(self.order.order.id),
            action_type: AuditAction::OrderCancel,
            description: format!(
                "Order #{} cancelled by {} (was {})",
                self.order.order.id,
                actor(Some(&self.cancelled_by)),
                self.previous_status
            ),
        }]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRestockedEvent {
    pub variant: ProductVariant,
    pub amount: i64,
    pub restocked_by: User,
}

impl AuditTrail for StockRestockedEvent {
    fn audit_entries(&self) -> Vec<NewAuditEntry> {
        vec![NewAuditEntry {
            user_id: Some(self.restocked_by.id),
            order_id: None,
            action_type: AuditAction::ProductRestock,
            description: format!(
                "Variant #{} of product #{} restocked with {} unit(s) by {}. Stock is now {}",
                self.variant.id,
                self.variant.product_id,
                self.amount,
                actor(Some(&self.restocked_by)),
                self.variant.stock
            ),
        }]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettledEvent {
    pub payment: Payment,
    pub previous_status: PaymentStatus,
    /// `None` for provider callbacks and failed initiations
    pub settled_by: Option<User>,
    /// Set when settling the payment also moved its order
    pub order_change: Option<OrderStatusChangedEvent>,
}

impl PaymentSettledEvent {
    pub fn is_success(&self) -> bool {
        self.payment.status == PaymentStatus::Completed
    }
}

impl AuditTrail for PaymentSettledEvent {
    fn audit_entries(&self) -> Vec<NewAuditEntry> {
        let p = &self.payment;
        let detail = match (&p.transaction_id, &p.result_desc) {
            (Some(tx), _) if self.is_success() => format!(" Transaction {tx}."),
            (_, Some(desc)) => format!(" {desc}"),
            _ => String::new(),
        };
        let mut entries = vec![NewAuditEntry {
            user_id: self.settled_by.as_ref().map(|u| u.id),
            order_id: Some(p.order_id),
            action_type: AuditAction::PaymentUpdate,
            description: format!(
                "Payment #{} ({}, {}) moved from {} to {} by {}.{detail}",
                p.id,
                p.payment_method,
                p.amount,
                self.previous_status,
                p.status,
                actor(self.settled_by.as_ref())
            ),
        }];
        if let Some(change) = &self.order_change {
            entries.extend(change.audit_entries());
        }
        entries
    }
}
