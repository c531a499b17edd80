//! Thin REST clients for the mobile-money providers Duka takes payments through.
//!
//! The clients deal only with the wire protocol: authentication, request signing, and the JSON shapes of
//! requests, responses and callbacks. Mapping provider results onto payments lives in `duka_engine`.
mod airtel;
mod config;
mod error;
mod mpesa;
mod token;

pub mod data_objects;
pub mod helpers;

pub use airtel::AirtelApi;
pub use config::{AirtelConfig, MpesaConfig};
pub use error::MobileMoneyApiError;
pub use mpesa::MpesaApi;
