use async_trait::async_trait;
use log::*;
use mobile_money_tools::{
    data_objects::{AirtelAck, AirtelCallback, AirtelStatus},
    helpers::normalize_phone,
    AirtelApi,
    AirtelConfig,
    MobileMoneyApiError,
};
use serde_json::Value;

use crate::{
    db_types::{PaymentMethod, ProviderCorrelation},
    traits::{CallbackAck, CallbackResult, GatewayError, InitiateRequest, PaymentGateway},
};

/// Airtel Money collections. We choose the transaction id ourselves (`TXN-<payment id>`), and Airtel echoes it in
/// the callback, so it doubles as the correlation id.
#[derive(Clone)]
pub struct AirtelGateway {
    api: AirtelApi,
}

impl AirtelGateway {
    pub fn new(config: AirtelConfig) -> Result<Self, MobileMoneyApiError> {
        let api = AirtelApi::new(config)?;
        Ok(Self { api })
    }

    pub fn transaction_id(payment_id: i64) -> String {
        PaymentMethod::Airtel.merchant_reference(payment_id).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for AirtelGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Airtel
    }

    fn normalize_phone(&self, phone: &str) -> Result<String, GatewayError> {
        Ok(normalize_phone(phone, &self.api.config().country_code)?)
    }

    async fn initiate(&self, request: &InitiateRequest) -> Result<ProviderCorrelation, GatewayError> {
        let transaction_ref = Self::transaction_id(request.payment_id);
        let response =
            self.api.initiate_payment(&request.phone, request.amount, &request.reference, &transaction_ref).await?;
        if let Some(id) = response.transaction_id().filter(|id| *id != transaction_ref) {
            let payment_id = request.payment_id;
            warn!("💳️ Airtel answered payment #{payment_id} with transaction id {id}, expected {transaction_ref}");
        }
        Ok(ProviderCorrelation::Generic { transaction_ref })
    }

    fn describe_callback(&self, raw: &Value) -> Result<CallbackResult, GatewayError> {
        let callback = serde_json::from_value::<AirtelCallback>(raw.clone())
            .map_err(|e| GatewayError::MalformedCallback(format!("Not an Airtel callback. {e}")))?;
        let tx = callback.transaction;
        if tx.id.trim().is_empty() {
            return Err(GatewayError::MalformedCallback("transaction.id is missing".into()));
        }
        let success = tx.is_success();
        let settled_transaction_id = if success { tx.airtel_money_id.clone() } else { None };
        Ok(CallbackResult { correlation_id: tx.id, success, settled_transaction_id, message: tx.message })
    }

    fn acknowledge(&self, ack: &CallbackAck) -> Value {
        let body = AirtelAck {
            status: AirtelStatus {
                code: if ack.accepted { "200" } else { "400" }.to_string(),
                message: ack.message.clone(),
                success: ack.accepted,
                result_code: None,
            },
        };
        serde_json::to_value(body).unwrap_or(Value::Null)
    }
}
