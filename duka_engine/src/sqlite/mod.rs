//! SQLite backend for the Duka engine.
//!
//! [`SqliteDatabase`] implements every management trait on top of the low-level query functions in [`db`].
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
