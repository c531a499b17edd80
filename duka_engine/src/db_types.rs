use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use duka_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Staff,
    Admin,
}

impl Role {
    /// Staff and admins may manage orders, stock and payments on behalf of customers.
    pub fn is_elevated(&self) -> bool {
        !matches!(self, Role::Customer)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Staff => write!(f, "staff"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------        User         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has_elevated_role(&self) -> bool {
        self.role.is_elevated()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl NewUser {
    pub fn new<S: Into<String>>(username: S, role: Role) -> Self {
        let username = username.into();
        let email = format!("{username}@example.com");
        Self { username, email, role }
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.email = email.into();
        self
    }
}

//--------------------------------------      Product        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), ..Default::default() }
    }
}

//--------------------------------------   ProductVariant    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub size: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVariant {
    pub product_id: i64,
    pub size: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub stock: i64,
}

//--------------------------------------  OrderStatusType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// Newly created. No payment has settled yet.
    Pending,
    /// A payment for the order has settled.
    Paid,
    Processing,
    Shipped,
    /// Terminal. Stock has been deducted.
    Completed,
    /// Terminal.
    Cancelled,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
/// An order row. `total_price` is not stored. It is summed from the order's items whenever the order is read.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatusType,
    pub total_price: Money,
    pub last_modified_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      OrderItem      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub variant_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
}

impl OrderItem {
    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// A single cart line: `quantity` units of a product variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub variant_id: i64,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(variant_id: i64, quantity: i64) -> Self {
        Self { variant_id, quantity }
    }
}

//--------------------------------------    PaymentMethod    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Mpesa,
    Airtel,
}

impl PaymentMethod {
    /// The callback reference for providers that let the merchant choose it. It is stored with the payment itself,
    /// so a callback that beats the initiation response can still be matched. M-Pesa assigns its own ids.
    pub fn merchant_reference(&self, payment_id: i64) -> Option<String> {
        match self {
            Self::Mpesa => None,
            Self::Airtel => Some(format!("TXN-{payment_id}")),
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mpesa => write!(f, "mpesa"),
            Self::Airtel => write!(f, "airtel"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mpesa" | "m-pesa" => Ok(Self::Mpesa),
            "airtel" => Ok(Self::Airtel),
            s => Err(ConversionError(format!("Unsupported payment method: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//-------------------------------------- ProviderCorrelation ---------------------------------------------------------
/// The identifiers a provider hands back when a charge is initiated, and later quotes in its callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderCorrelation {
    Mpesa { merchant_request_id: String, checkout_request_id: String },
    Generic { transaction_ref: String },
}

impl ProviderCorrelation {
    /// The identifier callbacks are matched on.
    pub fn callback_id(&self) -> &str {
        match self {
            Self::Mpesa { checkout_request_id, .. } => checkout_request_id,
            Self::Generic { transaction_ref } => transaction_ref,
        }
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,
    pub payment_method: PaymentMethod,
    pub phone_number: String,
    pub amount: Money,
    pub status: PaymentStatus,
    pub merchant_request_id: Option<String>,
    pub checkout_request_id: Option<String>,
    pub provider_reference: Option<String>,
    /// The provider's id for the settled transaction, e.g. the M-Pesa receipt number
    pub transaction_id: Option<String>,
    pub result_desc: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn correlation(&self) -> Option<ProviderCorrelation> {
        match (&self.merchant_request_id, &self.checkout_request_id, &self.provider_reference) {
            (Some(m), Some(c), _) => Some(ProviderCorrelation::Mpesa {
                merchant_request_id: m.clone(),
                checkout_request_id: c.clone(),
            }),
            (_, _, Some(r)) => Some(ProviderCorrelation::Generic { transaction_ref: r.clone() }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: i64,
    pub user_id: i64,
    pub payment_method: PaymentMethod,
    pub phone_number: String,
}

//--------------------------------------     AuditAction     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    OrderCreate,
    OrderStatusUpdate,
    OrderCancel,
    ProductRestock,
    PaymentUpdate,
    Other,
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OrderCreate => "order_create",
            Self::OrderStatusUpdate => "order_status_update",
            Self::OrderCancel => "order_cancel",
            Self::ProductRestock => "product_restock",
            Self::PaymentUpdate => "payment_update",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

impl FromStr for AuditAction {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order_create" => Ok(Self::OrderCreate),
            "order_status_update" => Ok(Self::OrderStatusUpdate),
            "order_cancel" => Ok(Self::OrderCancel),
            "product_restock" => Ok(Self::ProductRestock),
            "payment_update" => Ok(Self::PaymentUpdate),
            "other" => Ok(Self::Other),
            s => Err(ConversionError(format!("Invalid audit action: {s}"))),
        }
    }
}

//--------------------------------------     AuditEntry      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub order_id: Option<i64>,
    pub action_type: AuditAction,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub user_id: Option<i64>,
    pub order_id: Option<i64>,
    pub action_type: AuditAction,
    pub description: String,
}
