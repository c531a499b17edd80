use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use mobile_money_tools::{AirtelConfig, MpesaConfig};
use serde_json::{json, Value};

use crate::{
    db_types::{PaymentMethod, ProviderCorrelation},
    gateways::{AirtelGateway, MpesaGateway},
    traits::{CallbackAck, CallbackResult, GatewayError, InitiateRequest, PaymentGateway},
};

/// A gateway that never leaves the process. Callback parsing, phone validation and acknowledgements are those of the
/// real adapter for `method`; `initiate` answers from a script.
///
/// Unscripted M-Pesa charges are accepted with checkout request id `ws_CO_<payment id>`, Airtel charges with
/// `TXN-<payment id>`.
#[derive(Clone)]
pub struct FakeGateway {
    method: PaymentMethod,
    parser: Arc<dyn PaymentGateway>,
    script: Arc<Mutex<VecDeque<Result<ProviderCorrelation, GatewayError>>>>,
    requests: Arc<Mutex<Vec<InitiateRequest>>>,
}

impl FakeGateway {
    pub fn new(method: PaymentMethod) -> Self {
        let parser: Arc<dyn PaymentGateway> = match method {
            PaymentMethod::Mpesa => {
                let config = MpesaConfig { country_code: "254".into(), ..Default::default() };
                Arc::new(MpesaGateway::new(config).expect("Could not create M-Pesa client"))
            },
            PaymentMethod::Airtel => {
                let config = AirtelConfig { country_code: "254".into(), ..Default::default() };
                Arc::new(AirtelGateway::new(config).expect("Could not create Airtel client"))
            },
        };
        Self { method, parser, script: Arc::default(), requests: Arc::default() }
    }

    /// The next call to `initiate` returns `response`.
    pub fn push_response(&self, response: Result<ProviderCorrelation, GatewayError>) {
        self.script.lock().expect("poisoned").push_back(response);
    }

    pub fn requests(&self) -> Vec<InitiateRequest> {
        self.requests.lock().expect("poisoned").clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn method(&self) -> PaymentMethod {
        self.method
    }

    fn normalize_phone(&self, phone: &str) -> Result<String, GatewayError> {
        self.parser.normalize_phone(phone)
    }

    async fn initiate(&self, request: &InitiateRequest) -> Result<ProviderCorrelation, GatewayError> {
        self.requests.lock().expect("poisoned").push(request.clone());
        let scripted = self.script.lock().expect("poisoned").pop_front();
        scripted.unwrap_or_else(|| {
            Ok(match self.method {
                PaymentMethod::Mpesa => ProviderCorrelation::Mpesa {
                    merchant_request_id: format!("mr_{}", request.payment_id),
                    checkout_request_id: format!("ws_CO_{}", request.payment_id),
                },
                PaymentMethod::Airtel => {
                    ProviderCorrelation::Generic { transaction_ref: AirtelGateway::transaction_id(request.payment_id) }
                },
            })
        })
    }

    fn describe_callback(&self, raw: &Value) -> Result<CallbackResult, GatewayError> {
        self.parser.describe_callback(raw)
    }

    fn acknowledge(&self, ack: &CallbackAck) -> Value {
        self.parser.acknowledge(ack)
    }
}

/// An M-Pesa STK callback payload. Successful callbacks carry `receipt` as the `MpesaReceiptNumber`.
pub fn mpesa_callback(checkout_request_id: &str, result_code: i64, receipt: Option<&str>) -> Value {
    let desc = match result_code {
        0 => "The service request is processed successfully.",
        _ => "Request cancelled by user",
    };
    let mut callback = json!({
        "MerchantRequestID": "mr_test",
        "CheckoutRequestID": checkout_request_id,
        "ResultCode": result_code,
        "ResultDesc": desc,
    });
    if let Some(receipt) = receipt {
        callback["CallbackMetadata"] = json!({"Item": [
            {"Name": "Amount", "Value": 1},
            {"Name": "MpesaReceiptNumber", "Value": receipt},
        ]});
    }
    json!({"Body": {"stkCallback": callback}})
}

pub fn airtel_callback(transaction_id: &str, success: bool, airtel_money_id: Option<&str>) -> Value {
    json!({"transaction": {
        "id": transaction_id,
        "message": if success { "Paid" } else { "Failed" },
        "status_code": if success { "TS" } else { "TF" },
        "airtel_money_id": airtel_money_id,
    }})
}
