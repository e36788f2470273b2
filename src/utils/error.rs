//! Error Handling
//!
//! `AppError` covers everything below the engine boundary: storage,
//! configuration, capability setup and cost accounting. The engine turns it
//! into caller-facing `EngineError`s.

use thiserror::Error;
use verdict_engine_capabilities::CapabilityError;
use verdict_engine_core::CoreError;

use crate::services::cost::CostError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row or config file did not decode.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Capability setup failed: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Cost ledger error: {0}")]
    Cost(#[from] CostError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this is a not-found error, whichever layer raised it.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_) | AppError::Core(CoreError::NotFound(_))
        )
    }

    /// Storage and I/O failures that may clear up on a later delivery.
    /// Decoding errors and logic errors will not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Sqlite(_) | AppError::Pool(_) | AppError::Io(_)
        )
    }
}
