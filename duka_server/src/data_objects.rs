use std::fmt::Display;

use duka_engine::{
    db_types::{AuditAction, Money, NewVariant, OrderLine, OrderStatusType, PaymentMethod, PaymentStatus},
    payment_objects::{CheckoutResult, PaymentQueryFilter},
    traits::{AuditQueryFilter, ShopError},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

fn invalid<E: Display>(e: E) -> ShopError {
    ShopError::ValidationError(e.to_string())
}

fn parse_method(method: &str) -> Result<PaymentMethod, ShopError> {
    method.parse::<PaymentMethod>().map_err(invalid)
}

//--------------------------------------        Orders       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSearchParams {
    /// A comma-separated list of statuses
    pub status: Option<String>,
}

impl OrderSearchParams {
    pub fn statuses(&self) -> Result<Option<Vec<OrderStatusType>>, ShopError> {
        let statuses = match &self.status {
            Some(s) if !s.trim().is_empty() => s,
            _ => return Ok(None),
        };
        statuses
            .split(',')
            .map(|s| s.trim().parse::<OrderStatusType>().map_err(invalid))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

//--------------------------------------       Payments      ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayOrderRequest {
    pub payment_method: String,
    pub phone_number: String,
}

impl PayOrderRequest {
    pub fn method(&self) -> Result<PaymentMethod, ShopError> {
        parse_method(&self.payment_method)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentRequest {
    pub payment_method: String,
    pub phone_number: String,
    pub cart_items: Vec<OrderLine>,
}

impl InitiatePaymentRequest {
    pub fn method(&self) -> Result<PaymentMethod, ShopError> {
        parse_method(&self.payment_method)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub message: String,
    pub order_id: i64,
    pub payment_id: i64,
}

impl From<&CheckoutResult> for CheckoutResponse {
    fn from(result: &CheckoutResult) -> Self {
        let success = result.is_success();
        let message = if success {
            "Payment initiated. Complete the payment on your phone.".to_string()
        } else {
            let reason = result.payment.result_desc.as_deref().unwrap_or("unknown error");
            format!("Could not initiate the payment. {reason}. Order #{} was kept, so you can retry.", result.order_id)
        };
        Self { success, message, order_id: result.order_id, payment_id: result.payment.id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub status: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentSearchParams {
    pub status: Option<String>,
    pub order_id: Option<i64>,
    pub method: Option<String>,
}

impl TryFrom<PaymentSearchParams> for PaymentQueryFilter {
    type Error = ShopError;

    fn try_from(params: PaymentSearchParams) -> Result<Self, Self::Error> {
        let mut filter = PaymentQueryFilter::default();
        if let Some(status) = params.status.filter(|s| !s.is_empty()) {
            filter = filter.with_status(status.parse::<PaymentStatus>().map_err(invalid)?);
        }
        if let Some(order_id) = params.order_id {
            filter = filter.with_order_id(order_id);
        }
        if let Some(method) = params.method.filter(|s| !s.is_empty()) {
            filter = filter.with_method(parse_method(&method)?);
        }
        Ok(filter)
    }
}

//--------------------------------------        Audit        ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditSearchParams {
    pub order_id: Option<i64>,
    pub user_id: Option<i64>,
    pub action: Option<String>,
    pub limit: Option<i64>,
}

impl TryFrom<AuditSearchParams> for AuditQueryFilter {
    type Error = ShopError;

    fn try_from(params: AuditSearchParams) -> Result<Self, Self::Error> {
        let mut filter = AuditQueryFilter::default();
        if let Some(order_id) = params.order_id {
            filter = filter.with_order_id(order_id);
        }
        if let Some(user_id) = params.user_id {
            filter = filter.with_user_id(user_id);
        }
        if let Some(action) = params.action.filter(|s| !s.is_empty()) {
            filter = filter.with_action(action.parse::<AuditAction>().map_err(invalid)?);
        }
        if let Some(limit) = params.limit {
            if limit < 1 {
                return Err(invalid("limit must be positive"));
            }
            filter = filter.with_limit(limit);
        }
        Ok(filter)
    }
}

//--------------------------------------       Catalog       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVariantRequest {
    #[serde(default)]
    pub size: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub stock: i64,
}

impl NewVariantRequest {
    pub fn for_product(self, product_id: i64) -> NewVariant {
        NewVariant { product_id, size: self.size, price: self.price, stock: self.stock }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestockRequest {
    pub variant_id: i64,
    pub amount: i64,
}
