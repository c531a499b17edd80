//! Helpers for tests. Only compiled with the `test_utils` feature.
pub mod fake_gateway;
pub mod prepare_env;
