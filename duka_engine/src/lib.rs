//! Duka Engine
//!
//! The Duka engine is the core of the Duka shop backend: orders, stock, payments and the audit trail. It knows
//! nothing about HTTP.
//!
//! The library is divided into these sections:
//! 1. Storage contracts ([`mod@traits`]) and the SQLite backend that implements them ([`SqliteDatabase`]). You
//!    should not need to talk to the database directly. The exception is the data types used in the database, which
//!    are defined in [`mod@db_types`] and are public.
//! 2. The public API ([`OrderFlowApi`], [`PaymentFlowApi`], [`CatalogApi`], [`AuditApi`] and [`UserApi`]). Each API
//!    is generic over the storage traits it needs.
//! 3. Mobile-money gateway adapters ([`mod@gateways`]) for M-Pesa and Airtel Money.
//!
//! The engine also emits events when orders are created or change status, stock is restocked, or payments are
//! settled. A simple actor framework ([`mod@events`]) lets you hook into these and perform custom actions. Every
//! event is also recorded in the audit trail, in the same transaction as the change it describes.
mod duka_api;
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod db_types;
pub mod events;
pub mod gateways;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use duka_api::{
    audit_api::{self, AuditApi},
    catalog_api::{self, CatalogApi, ProductListing},
    order_flow_api::{self, OrderFlowApi},
    order_objects,
    payment_flow_api::{self, PaymentFlowApi},
    payment_objects,
    user_api::{self, UserApi},
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db as sqlite_db, SqliteDatabase};
pub use traits::{
    AuditManagement,
    CatalogManagement,
    OrderManagement,
    PaymentGateway,
    PaymentManagement,
    ShopError,
    UserManagement,
};
