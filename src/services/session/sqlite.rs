//! SQLite Session Store
//!
//! Persistent store over the shared r2d2 pool. Every query runs on the
//! blocking thread pool so async callers never hold a connection across an
//! await point.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use verdict_engine_core::{
    AgentSession, Case, Evidence, PolicyCategory, SessionStatus, Strategy, ToolKind, Verdict,
    VerdictSummary,
};

use super::{check_resubmission, CaseStore, SessionStore};
use crate::storage::{Database, DbPool};
use crate::utils::error::{AppError, AppResult};

pub struct SqliteSessionStore {
    pool: DbPool,
}

impl SqliteSessionStore {
    /// Schema is owned by `Database`, so the tables already exist.
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    async fn with_conn<T, F>(&self, op: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))?;
            op(&conn)
        })
        .await
        .map_err(|e| AppError::database(format!("Task join error: {}", e)))?
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::database(format!("Invalid timestamp '{}': {}", raw, e)))
}

/// Raw `investigation_sessions` row.
struct SessionRow {
    case_id: String,
    strategy: String,
    iteration: u32,
    evidence: String,
    tools_used: String,
    reasoning: String,
    status: String,
    cumulative_cost_micros: i64,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            case_id: row.get(0)?,
            strategy: row.get(1)?,
            iteration: row.get(2)?,
            evidence: row.get(3)?,
            tools_used: row.get(4)?,
            reasoning: row.get(5)?,
            status: row.get(6)?,
            cumulative_cost_micros: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_session(self) -> AppResult<AgentSession> {
        let evidence: Vec<Evidence> = serde_json::from_str(&self.evidence)?;
        let tools_used: Vec<ToolKind> = serde_json::from_str(&self.tools_used)?;
        let reasoning: Vec<String> = serde_json::from_str(&self.reasoning)?;
        Ok(AgentSession {
            case_id: self.case_id,
            strategy: self.strategy.parse::<Strategy>()?,
            iteration: self.iteration,
            evidence,
            tools_used,
            reasoning,
            status: self.status.parse::<SessionStatus>()?,
            cumulative_cost_micros: u64::try_from(self.cumulative_cost_micros).unwrap_or(0),
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

const SESSION_COLUMNS: &str = "case_id, strategy, iteration, evidence, tools_used, reasoning, \
     status, cumulative_cost_micros, created_at, updated_at";

/// Upsert the session row and its (case id, iteration) audit row.
fn write_session(conn: &Connection, session: &AgentSession) -> AppResult<()> {
    let evidence = serde_json::to_string(&session.evidence)?;
    let tools_used = serde_json::to_string(&session.tools_used)?;
    let reasoning = serde_json::to_string(&session.reasoning)?;
    let snapshot = serde_json::to_string(session)?;
    let cost = i64::try_from(session.cumulative_cost_micros).unwrap_or(i64::MAX);

    conn.execute(
        "INSERT OR REPLACE INTO investigation_sessions
         (case_id, strategy, iteration, evidence, tools_used, reasoning, status,
          cumulative_cost_micros, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            session.case_id,
            session.strategy.as_str(),
            session.iteration,
            evidence,
            tools_used,
            reasoning,
            session.status.as_str(),
            cost,
            timestamp(&session.created_at),
            timestamp(&session.updated_at),
        ],
    )
    .map_err(|e| AppError::database(format!("Failed to save session: {}", e)))?;

    conn.execute(
        "INSERT OR REPLACE INTO session_checkpoints (case_id, iteration, snapshot)
         VALUES (?1, ?2, ?3)",
        params![session.case_id, session.iteration, snapshot],
    )
    .map_err(|e| AppError::database(format!("Failed to save checkpoint: {}", e)))?;
    Ok(())
}

fn write_verdict(conn: &Connection, verdict: &Verdict) -> AppResult<()> {
    let payload = serde_json::to_string(verdict)?;
    conn.execute(
        "INSERT OR REPLACE INTO verdicts
         (case_id, decision, confidence, strategy, status, payload, concluded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            verdict.case_id,
            verdict.decision.as_str(),
            verdict.confidence,
            verdict.strategy.as_str(),
            verdict.status.as_str(),
            payload,
            timestamp(&verdict.concluded_at),
        ],
    )
    .map_err(|e| AppError::database(format!("Failed to save verdict: {}", e)))?;
    Ok(())
}

fn read_case(conn: &Connection, case_id: &str) -> AppResult<Option<Case>> {
    let row = conn
        .query_row(
            "SELECT id, policy_category, target_url, complaint_text, context, created_at
             FROM cases WHERE id = ?1",
            params![case_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    let Some((id, category, target_url, complaint_text, context, created_at)) = row else {
        return Ok(None);
    };
    Ok(Some(Case {
        id,
        policy_category: category.parse::<PolicyCategory>()?,
        target_url,
        complaint_text,
        context,
        created_at: parse_timestamp(&created_at)?,
    }))
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn checkpoint(&self, session: &AgentSession) -> AppResult<()> {
        let session = session.clone();
        self.with_conn(move |conn| write_session(conn, &session)).await
    }

    async fn find(&self, case_id: &str) -> AppResult<Option<AgentSession>> {
        let case_id = case_id.to_string();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM investigation_sessions WHERE case_id = ?1",
                SESSION_COLUMNS
            );
            let row = conn
                .query_row(&sql, params![case_id], SessionRow::from_row)
                .optional()
                .map_err(|e| AppError::database(format!("Failed to load session: {}", e)))?;
            row.map(SessionRow::into_session).transpose()
        })
        .await
    }

    async fn history(&self, case_id: &str) -> AppResult<Vec<AgentSession>> {
        let case_id = case_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT snapshot FROM session_checkpoints WHERE case_id = ?1 ORDER BY iteration ASC",
            )?;
            let snapshots = stmt
                .query_map(params![case_id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            snapshots
                .iter()
                .map(|raw| serde_json::from_str(raw).map_err(AppError::from))
                .collect()
        })
        .await
    }

    async fn record_verdict(&self, session: &AgentSession, verdict: &Verdict) -> AppResult<()> {
        let session = session.clone();
        let verdict = verdict.clone();
        self.with_conn(move |conn| {
            let tx = conn.unchecked_transaction()?;
            write_verdict(&tx, &verdict)?;
            write_session(&tx, &session)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn load_verdict(&self, case_id: &str) -> AppResult<Option<Verdict>> {
        let case_id = case_id.to_string();
        self.with_conn(move |conn| {
            let payload: Option<String> = conn
                .query_row(
                    "SELECT payload FROM verdicts WHERE case_id = ?1",
                    params![case_id],
                    |row| row.get(0),
                )
                .optional()?;
            payload
                .map(|raw| serde_json::from_str(&raw).map_err(AppError::from))
                .transpose()
        })
        .await
    }

    async fn recent_verdicts(&self, limit: usize) -> AppResult<Vec<VerdictSummary>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT payload FROM verdicts ORDER BY concluded_at DESC LIMIT ?1",
            )?;
            let payloads = stmt
                .query_map(params![limit], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            payloads
                .iter()
                .map(|raw| {
                    serde_json::from_str::<Verdict>(raw)
                        .map(|v| v.summary())
                        .map_err(AppError::from)
                })
                .collect()
        })
        .await
    }
}

#[async_trait]
impl CaseStore for SqliteSessionStore {
    async fn put_case(&self, case: &Case) -> AppResult<()> {
        case.validate()?;
        let case = case.clone();
        self.with_conn(move |conn| {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO cases
                     (id, policy_category, target_url, complaint_text, context, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        case.id,
                        case.policy_category.as_str(),
                        case.target_url,
                        case.complaint_text,
                        case.context,
                        timestamp(&case.created_at),
                    ],
                )
                .map_err(|e| AppError::database(format!("Failed to save case: {}", e)))?;
            if inserted > 0 {
                return Ok(());
            }
            match read_case(conn, &case.id)? {
                Some(existing) => check_resubmission(&existing, &case),
                None => Err(AppError::database(format!("case {} vanished on insert", case.id))),
            }
        })
        .await
    }

    async fn get_case(&self, case_id: &str) -> AppResult<Option<Case>> {
        let case_id = case_id.to_string();
        self.with_conn(move |conn| read_case(conn, &case_id)).await
    }
}
