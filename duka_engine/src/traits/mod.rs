//! #  Storage and provider contracts.
//!
//! This module defines the interfaces the Duka engine needs from its collaborators. Storage backends implement the
//! management traits; each mobile-money provider implements [`PaymentGateway`].
//!
//! ## Traits
//! * [`UserManagement`] maintains the local mirror of accounts from the external identity system.
//! * [`CatalogManagement`] manages products, variants and the stock counter on each variant.
//! * [`OrderManagement`] creates orders and drives the order state machine. Every mutating call is a single atomic
//!   transaction that also appends the matching audit entries.
//! * [`PaymentManagement`] owns the payment lifecycle: creation, recording provider correlation ids and settling
//!   payments together with their order.
//! * [`AuditManagement`] reads the append-only audit trail.
//! * [`PaymentGateway`] is the provider-facing capability used to initiate charges and interpret callbacks.
mod audit_management;
mod catalog_management;
mod data_objects;
mod order_management;
mod payment_gateway;
mod payment_management;
mod shop_error;
mod user_management;

pub use audit_management::AuditManagement;
pub use catalog_management::CatalogManagement;
pub use data_objects::{AuditQueryFilter, SettlePaymentResult, StatusChangeResult};
pub use order_management::OrderManagement;
pub use payment_gateway::{CallbackAck, CallbackResult, GatewayError, InitiateRequest, PaymentGateway};
pub use payment_management::PaymentManagement;
pub use shop_error::ShopError;
pub use user_management::UserManagement;
