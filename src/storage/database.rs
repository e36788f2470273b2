//! SQLite Database
//!
//! Embedded database for persistent storage using rusqlite with r2d2 connection pooling.

use std::path::{Path, PathBuf};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::database_path;

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database service for managing SQLite operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a database from an existing connection pool.
    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create an in-memory database for testing.
    ///
    /// The pool holds a single connection so every caller sees the same
    /// in-memory database.
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Open the database at `path`, or at ~/.verdict-engine/verdicts.db.
    pub fn new(path: Option<&Path>) -> AppResult<Self> {
        let db_path: PathBuf = match path {
            Some(p) => p.to_path_buf(),
            None => database_path()?,
        };

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(&db_path).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
        });
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;

        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> AppResult<()> {
        let conn = self.get_connection()?;

        // Submitted cases
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cases (
                id TEXT PRIMARY KEY,
                policy_category TEXT NOT NULL,
                target_url TEXT NOT NULL,
                complaint_text TEXT NOT NULL,
                context TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        // Latest state of each investigation
        conn.execute(
            "CREATE TABLE IF NOT EXISTS investigation_sessions (
                case_id TEXT PRIMARY KEY,
                strategy TEXT NOT NULL,
                iteration INTEGER NOT NULL DEFAULT 0,
                evidence TEXT NOT NULL,
                tools_used TEXT NOT NULL,
                reasoning TEXT NOT NULL,
                status TEXT NOT NULL,
                cumulative_cost_micros INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Per-iteration snapshots for audit
        conn.execute(
            "CREATE TABLE IF NOT EXISTS session_checkpoints (
                case_id TEXT NOT NULL,
                iteration INTEGER NOT NULL,
                snapshot TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (case_id, iteration)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS verdicts (
                case_id TEXT PRIMARY KEY,
                decision TEXT NOT NULL,
                confidence REAL NOT NULL,
                strategy TEXT NOT NULL,
                status TEXT NOT NULL,
                payload TEXT NOT NULL,
                concluded_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_verdicts_concluded_at ON verdicts(concluded_at DESC)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_status ON investigation_sessions(status)",
            [],
        )?;

        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))
    }

    /// Get the connection pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Check if the database is healthy
    pub fn is_healthy(&self) -> bool {
        if let Ok(conn) = self.pool.get() {
            conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
        } else {
            false
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("pool_size", &self.pool.state().connections)
            .finish()
    }
}
