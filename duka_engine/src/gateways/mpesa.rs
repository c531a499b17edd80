use async_trait::async_trait;
use log::*;
use mobile_money_tools::{
    data_objects::{MpesaAck, MpesaCallback},
    helpers::normalize_phone,
    MobileMoneyApiError,
    MpesaApi,
    MpesaConfig,
};
use serde_json::Value;

use crate::{
    db_types::{PaymentMethod, ProviderCorrelation},
    traits::{CallbackAck, CallbackResult, GatewayError, InitiateRequest, PaymentGateway},
};

/// Lipa na M-Pesa Online (STK push). Callbacks are matched on the `CheckoutRequestID`.
#[derive(Clone)]
pub struct MpesaGateway {
    api: MpesaApi,
}

impl MpesaGateway {
    pub fn new(config: MpesaConfig) -> Result<Self, MobileMoneyApiError> {
        let api = MpesaApi::new(config)?;
        Ok(Self { api })
    }
}

#[async_trait]
impl PaymentGateway for MpesaGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Mpesa
    }

    fn normalize_phone(&self, phone: &str) -> Result<String, GatewayError> {
        Ok(normalize_phone(phone, &self.api.config().country_code)?)
    }

    async fn initiate(&self, request: &InitiateRequest) -> Result<ProviderCorrelation, GatewayError> {
        let response = self.api.stk_push(&request.phone, request.amount, &request.description).await?;
        if response.checkout_request_id.is_empty() {
            return Err(GatewayError::Unavailable("M-Pesa accepted the request without a CheckoutRequestID".into()));
        }
        debug!("💳️ STK push for payment #{} is {}", request.payment_id, response.checkout_request_id);
        Ok(ProviderCorrelation::Mpesa {
            merchant_request_id: response.merchant_request_id,
            checkout_request_id: response.checkout_request_id,
        })
    }

    fn describe_callback(&self, raw: &Value) -> Result<CallbackResult, GatewayError> {
        let callback = serde_json::from_value::<MpesaCallback>(raw.clone())
            .map_err(|e| GatewayError::MalformedCallback(format!("Not an STK callback. {e}")))?;
        let stk = callback.body.stk_callback;
        if stk.checkout_request_id.trim().is_empty() {
            return Err(GatewayError::MalformedCallback("CheckoutRequestID is missing".into()));
        }
        let success = stk.is_success();
        let settled_transaction_id = if success { stk.receipt_number() } else { None };
        Ok(CallbackResult {
            correlation_id: stk.checkout_request_id,
            success,
            settled_transaction_id,
            message: stk.result_desc,
        })
    }

    fn acknowledge(&self, ack: &CallbackAck) -> Value {
        let body = MpesaAck { result_code: if ack.accepted { 0 } else { 1 }, result_desc: ack.message.clone() };
        serde_json::to_value(body).unwrap_or(Value::Null)
    }
}
