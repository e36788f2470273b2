//! Path Utilities
//!
//! Resolves the engine's data directory (~/.verdict-engine/) and the files
//! inside it.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Verdict Engine directory (~/.verdict-engine/)
pub fn verdict_engine_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".verdict-engine"))
}

/// Get the config file path (~/.verdict-engine/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(verdict_engine_dir()?.join("config.json"))
}

/// Get the database file path (~/.verdict-engine/verdicts.db)
pub fn database_path() -> AppResult<PathBuf> {
    Ok(verdict_engine_dir()?.join("verdicts.db"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the Verdict Engine directory, creating if it doesn't exist
pub fn ensure_verdict_engine_dir() -> AppResult<PathBuf> {
    let path = verdict_engine_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
