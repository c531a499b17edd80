//! # Duka engine public API
//!
//! The APIs in this module are what the HTTP layer (or any other client) talks to. Each one is generic over the
//! backend traits it needs, so any store that implements them can sit underneath.
//!
//! * [`order_flow_api`] creates orders and drives the order state machine.
//! * [`payment_flow_api`] takes payments through the mobile-money gateways and reconciles their results.
//! * [`catalog_api`] manages products, variants and stock levels.
//! * [`audit_api`] reads the audit trail.
//! * [`user_api`] manages the local user mirror.
//!
//! ```rust,ignore
//! use duka_engine::{OrderFlowApi, SqliteDatabase, events::EventProducers};
//! let db = SqliteDatabase::new_with_url("sqlite://data/duka.db", 5).await?;
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let order = api.create_order(&user, &[OrderLine::new(1, 2)]).await?;
//! ```
pub mod audit_api;
pub mod catalog_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_flow_api;
pub mod payment_objects;
pub mod user_api;
