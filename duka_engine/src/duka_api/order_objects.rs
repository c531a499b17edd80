use serde::{Deserialize, Serialize};

use crate::db_types::{Money, Order, OrderItem, OrderLine, OrderStatusType};

/// An order together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullOrder {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl FullOrder {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self { order, items }
    }

    pub fn id(&self) -> i64 {
        self.order.id
    }

    pub fn status(&self) -> OrderStatusType {
        self.order.status
    }

    /// Sum of the item subtotals, using the prices captured when the order was placed.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::subtotal).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    pub user_id: Option<i64>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        let mut statuses = self.status.take().unwrap_or_default();
        statuses.push(status);
        self.status = Some(statuses);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
    }
}

/// Validates cart lines and merges repeated variants into a single line by summing their quantities. The first
/// occurrence of a variant determines its position.
pub fn normalize_lines(lines: &[OrderLine]) -> Result<Vec<OrderLine>, String> {
    if lines.is_empty() {
        return Err("An order must contain at least one item".to_string());
    }
    let mut merged: Vec<OrderLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity < 1 {
            return Err(format!("Quantity for variant #{} must be at least 1", line.variant_id));
        }
        match merged.iter_mut().find(|l| l.variant_id == line.variant_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| format!("Quantity for variant #{} is too large", line.variant_id))?;
            },
            None => merged.push(*line),
        }
    }
    Ok(merged)
}
