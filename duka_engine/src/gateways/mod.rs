//! Payment gateway adapters.
//!
//! Each adapter wraps one of the REST clients from `mobile_money_tools` and implements [`PaymentGateway`], so that
//! the payment flow never sees provider-specific request or callback shapes. [`PaymentGateways`] is the registry the
//! flow APIs use to find the adapter for a payment method.
mod airtel;
mod mpesa;

use std::{collections::HashMap, fmt::Debug, sync::Arc};

pub use airtel::AirtelGateway;
use log::*;
use mobile_money_tools::MobileMoneyApiError;
pub use mpesa::MpesaGateway;
use serde_json::Value;

use crate::{
    db_types::PaymentMethod,
    traits::{CallbackAck, GatewayError, PaymentGateway, ShopError},
};

impl From<MobileMoneyApiError> for GatewayError {
    fn from(e: MobileMoneyApiError) -> Self {
        match e {
            MobileMoneyApiError::InvalidPhoneNumber(s) => GatewayError::InvalidPhoneNumber(s),
            MobileMoneyApiError::Rejected { code, message } => GatewayError::Rejected(format!("{message} ({code})")),
            e => GatewayError::Unavailable(e.to_string()),
        }
    }
}

#[derive(Clone, Default)]
pub struct PaymentGateways {
    gateways: HashMap<PaymentMethod, Arc<dyn PaymentGateway>>,
}

impl Debug for PaymentGateways {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentGateways({:?})", self.methods())
    }
}

impl PaymentGateways {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `gateway` under its own payment method, replacing any adapter already registered for it.
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.register(gateway);
        self
    }

    pub fn register(&mut self, gateway: Arc<dyn PaymentGateway>) {
        let method = gateway.method();
        if self.gateways.insert(method, gateway).is_some() {
            warn!("💳️ The {method} gateway was registered twice. The last one wins.");
        }
    }

    pub fn get(&self, method: PaymentMethod) -> Result<Arc<dyn PaymentGateway>, ShopError> {
        self.gateways.get(&method).cloned().ok_or_else(|| ShopError::GatewayNotConfigured(method.to_string()))
    }

    pub fn methods(&self) -> Vec<PaymentMethod> {
        let mut methods = self.gateways.keys().copied().collect::<Vec<_>>();
        methods.sort_by_key(|m| m.to_string());
        methods
    }

    /// The acknowledgement body for `method`. Unconfigured methods get the generic JSON form of the ack.
    pub fn acknowledge(&self, method: PaymentMethod, ack: &CallbackAck) -> Value {
        match self.gateways.get(&method) {
            Some(gateway) => gateway.acknowledge(ack),
            None => serde_json::to_value(ack).unwrap_or(Value::Null),
        }
    }
}
