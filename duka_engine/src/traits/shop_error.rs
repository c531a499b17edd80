use thiserror::Error;

use crate::{db_types::OrderStatusType, traits::GatewayError};

/// The error taxonomy shared by every engine operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShopError {
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("Insufficient stock for variant #{variant_id}. Requested {requested}, but only {available} available.")]
    InsufficientStock { variant_id: i64, requested: i64, available: i64 },
    #[error("Cannot move order #{order_id} from {from} to {to}.")]
    InvalidOrderTransition { order_id: i64, from: OrderStatusType, to: OrderStatusType },
    #[error("Invalid state transition. {0}")]
    InvalidTransition(String),
    #[error("Permission denied. {0}")]
    PermissionDenied(String),
    #[error("Order #{0} does not exist")]
    OrderNotFound(i64),
    #[error("Payment #{0} does not exist")]
    PaymentNotFound(i64),
    #[error("Product #{0} does not exist")]
    ProductNotFound(i64),
    #[error("Product variant #{0} does not exist")]
    VariantNotFound(i64),
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
    #[error("The payment provider could not be reached. {0}")]
    GatewayUnavailable(String),
    #[error("The payment provider rejected the request. {0}")]
    GatewayRejected(String),
    #[error("Malformed provider callback. {0}")]
    MalformedCallback(String),
    #[error("Payment method {0} is not configured")]
    GatewayNotConfigured(String),
    #[error("We have an internal database engine error: {0}")]
    DatabaseError(String),
    #[error("Internal error. {0}")]
    Internal(String),
}

impl ShopError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::OrderNotFound(_)
                | Self::PaymentNotFound(_)
                | Self::ProductNotFound(_)
                | Self::VariantNotFound(_)
                | Self::UserNotFound(_)
        )
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidOrderTransition { .. } | Self::InvalidTransition(_))
    }
}

impl From<sqlx::Error> for ShopError {
    fn from(e: sqlx::Error) -> Self {
        ShopError::DatabaseError(e.to_string())
    }
}

impl From<GatewayError> for ShopError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unavailable(s) => ShopError::GatewayUnavailable(s),
            GatewayError::Rejected(s) => ShopError::GatewayRejected(s),
            GatewayError::MalformedCallback(s) => ShopError::MalformedCallback(s),
            GatewayError::InvalidPhoneNumber(s) => ShopError::ValidationError(format!("Invalid phone number: {s}")),
        }
    }
}
