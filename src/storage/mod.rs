//! Storage Layer
//!
//! Handles data persistence: SQLite database and JSON config.

pub mod config;
pub mod database;

pub use config::*;
pub use database::*;
