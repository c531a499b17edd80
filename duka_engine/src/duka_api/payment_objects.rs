use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Payment, PaymentMethod, PaymentStatus},
    traits::CallbackResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementOutcome {
    Completed,
    Failed,
}

impl SettlementOutcome {
    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            Self::Completed => PaymentStatus::Completed,
            Self::Failed => PaymentStatus::Failed,
        }
    }
}

impl TryFrom<PaymentStatus> for SettlementOutcome {
    type Error = String;

    fn try_from(status: PaymentStatus) -> Result<Self, Self::Error> {
        match status {
            PaymentStatus::Completed => Ok(Self::Completed),
            PaymentStatus::Failed => Ok(Self::Failed),
            s => Err(format!("A payment can only be reconciled as completed or failed, not {s}")),
        }
    }
}

/// The final word on a payment, from a provider callback or a manual reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub outcome: SettlementOutcome,
    pub transaction_id: Option<String>,
    pub message: String,
}

impl Settlement {
    pub fn completed<S: Into<String>>(transaction_id: Option<String>, message: S) -> Self {
        Self { outcome: SettlementOutcome::Completed, transaction_id, message: message.into() }
    }

    pub fn failed<S: Into<String>>(message: S) -> Self {
        Self { outcome: SettlementOutcome::Failed, transaction_id: None, message: message.into() }
    }
}

impl From<CallbackResult> for Settlement {
    fn from(result: CallbackResult) -> Self {
        let outcome = if result.success { SettlementOutcome::Completed } else { SettlementOutcome::Failed };
        Self { outcome, transaction_id: result.settled_transaction_id, message: result.message }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentQueryFilter {
    pub order_id: Option<i64>,
    pub user_id: Option<i64>,
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
}

impl PaymentQueryFilter {
    pub fn with_order_id(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() && self.user_id.is_none() && self.status.is_none() && self.method.is_none()
    }
}

/// The response to a checkout request. A gateway failure still produces an order and a (failed) payment so that
/// the customer can retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order_id: i64,
    pub payment: Payment,
}

impl CheckoutResult {
    /// The charge reached the provider. A fast callback may already have completed it.
    pub fn is_success(&self) -> bool {
        matches!(self.payment.status, PaymentStatus::Pending | PaymentStatus::Completed)
    }
}
