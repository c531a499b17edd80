//! # Duka server
//! This crate hosts the HTTP surface of the Duka shop backend. It is responsible for:
//! * Authenticating customers and staff with bearer tokens issued by the external identity service.
//! * Exposing the order, payment, catalog and audit operations of [`duka_engine`] under `/api`.
//! * Receiving payment callbacks from M-Pesa and Airtel Money under `/callbacks` and acknowledging them in each
//!   provider's own format.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! See [routes](routes/index.html) for the full list. `/health` returns a 200 OK response and needs no token.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
