use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db_types::{Money, PaymentMethod, ProviderCorrelation};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    MalformedCallback(String),
    #[error("{0}")]
    InvalidPhoneNumber(String),
}

/// Everything an adapter needs to push a charge to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateRequest {
    pub payment_id: i64,
    pub phone: String,
    pub amount: Money,
    pub reference: String,
    pub description: String,
}

/// A provider callback, normalised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackResult {
    /// Matches [`ProviderCorrelation::callback_id`] of the payment the callback is about
    pub correlation_id: String,
    pub success: bool,
    pub settled_transaction_id: Option<String>,
    pub message: String,
}

/// What we tell the provider after processing its callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAck {
    pub accepted: bool,
    pub message: String,
}

impl CallbackAck {
    pub fn accepted<S: Into<String>>(message: S) -> Self {
        Self { accepted: true, message: message.into() }
    }

    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self { accepted: false, message: message.into() }
    }
}

/// A mobile-money provider.
///
/// Implementations must not touch the database. `initiate` is always called outside of any transaction.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn method(&self) -> PaymentMethod;

    /// Validates the subscriber number and returns it in the form the provider expects.
    fn normalize_phone(&self, phone: &str) -> Result<String, GatewayError>;

    /// Submits the charge. On success, the returned correlation is stored on the payment so that the provider's
    /// callback can be matched to it.
    async fn initiate(&self, request: &InitiateRequest) -> Result<ProviderCorrelation, GatewayError>;

    /// Interprets a raw callback payload. Fails with [`GatewayError::MalformedCallback`] if required fields are
    /// missing.
    fn describe_callback(&self, raw: &Value) -> Result<CallbackResult, GatewayError>;

    /// The provider-specific response body for a callback.
    fn acknowledge(&self, ack: &CallbackAck) -> Value;
}
