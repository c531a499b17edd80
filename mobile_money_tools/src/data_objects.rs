use serde::{Deserialize, Serialize};
use serde_json::Value;

//--------------------------------------   M-Pesa (Daraja)   ---------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushRequest {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: String,
    pub amount: i64,
    pub party_a: String,
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID", default)]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode")]
    pub response_code: String,
    #[serde(rename = "ResponseDescription", default)]
    pub response_description: String,
    #[serde(rename = "CustomerMessage", default)]
    pub customer_message: String,
}

impl StkPushResponse {
    pub fn is_accepted(&self) -> bool {
        self.response_code.trim() == "0"
    }
}

/// The envelope M-Pesa posts to the STK push callback URL.
#[derive(Debug, Clone, Deserialize)]
pub struct MpesaCallback {
    #[serde(rename = "Body")]
    pub body: MpesaCallbackBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MpesaCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: String,
    #[serde(rename = "CallbackMetadata")]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<CallbackItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: Option<Value>,
}

impl StkCallback {
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }

    pub fn metadata_value(&self, name: &str) -> Option<&Value> {
        self.callback_metadata.as_ref()?.items.iter().find(|i| i.name == name)?.value.as_ref()
    }

    pub fn receipt_number(&self) -> Option<String> {
        match self.metadata_value("MpesaReceiptNumber")? {
            Value::String(s) => Some(s.clone()),
            v => Some(v.to_string()),
        }
    }
}

/// The body M-Pesa expects in reply to a callback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MpesaAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

//--------------------------------------     Airtel Money    ---------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AirtelTokenRequest {
    pub client_id: String,
    pub client_secret: String,
    pub grant_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AirtelPaymentRequest {
    pub reference: String,
    pub subscriber: AirtelSubscriber,
    pub transaction: AirtelTransactionRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct AirtelSubscriber {
    pub country: String,
    pub currency: String,
    pub msisdn: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AirtelTransactionRequest {
    pub amount: f64,
    pub country: String,
    pub currency: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AirtelStatus {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirtelPaymentResponse {
    pub data: Option<AirtelPaymentData>,
    pub status: AirtelStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirtelPaymentData {
    pub transaction: Option<AirtelTransactionData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirtelTransactionData {
    pub id: Option<String>,
    pub status: Option<String>,
}

impl AirtelPaymentResponse {
    pub fn transaction_id(&self) -> Option<&str> {
        self.data.as_ref()?.transaction.as_ref()?.id.as_deref()
    }
}

/// The notification Airtel posts once the subscriber has approved or declined the charge.
#[derive(Debug, Clone, Deserialize)]
pub struct AirtelCallback {
    pub transaction: AirtelCallbackTransaction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirtelCallbackTransaction {
    pub id: String,
    #[serde(default)]
    pub message: String,
    /// `TS` for success, `TF` for failure
    pub status_code: String,
    pub airtel_money_id: Option<String>,
}

impl AirtelCallbackTransaction {
    pub fn is_success(&self) -> bool {
        self.status_code.eq_ignore_ascii_case("TS")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AirtelAck {
    pub status: AirtelStatus,
}
