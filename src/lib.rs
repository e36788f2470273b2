//! Verdict Engine
//!
//! Investigates reported content-policy cases and produces verdicts.
//! It includes:
//! - HTTP status API handlers
//! - Investigation services (fixed pipeline, agent, queue worker)
//! - Storage layer (SQLite, JSON config)
//! - Data models and utilities

pub mod commands;
pub mod models;
pub mod server;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use models::response::*;
pub use models::settings::EngineConfig;
pub use services::engine::{EngineError, InvestigationEngine, InvestigationOutcome};
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
