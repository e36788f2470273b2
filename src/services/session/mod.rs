//! Session Persistence
//!
//! Durable record of every investigation. A session is checkpointed after
//! each iteration (or tier) so an interrupted investigation can resume, and
//! every checkpoint is kept for audit. Verdicts and submitted cases live
//! beside the sessions.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use tracing::error;
use verdict_engine_core::{AgentSession, Case, SessionStatus, Strategy, Verdict, VerdictSummary};

use crate::utils::error::{AppError, AppResult};

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Storage for investigation sessions and their verdicts.
///
/// Implementations must make `checkpoint` an idempotent upsert keyed by
/// case id + iteration, and `load(checkpoint(s))` must return `s`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a fresh Running session, replacing nothing.
    async fn create(&self, case_id: &str, strategy: Strategy) -> AppResult<AgentSession> {
        if self.find(case_id).await?.is_some() {
            return Err(AppError::validation(format!(
                "session for case {} already exists",
                case_id
            )));
        }
        let session = AgentSession::new(case_id, strategy);
        self.checkpoint(&session).await?;
        Ok(session)
    }

    /// Upsert the session row and its (case id, iteration) audit row.
    async fn checkpoint(&self, session: &AgentSession) -> AppResult<()>;

    /// Latest state of a case's session, if one exists.
    async fn find(&self, case_id: &str) -> AppResult<Option<AgentSession>>;

    /// Latest state of a case's session.
    async fn load(&self, case_id: &str) -> AppResult<AgentSession> {
        self.find(case_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("session for case {}", case_id)))
    }

    /// Every checkpoint of a case, oldest first.
    async fn history(&self, case_id: &str) -> AppResult<Vec<AgentSession>>;

    /// Persist a finished session together with its verdict. Either both
    /// are stored or neither is.
    async fn record_verdict(&self, session: &AgentSession, verdict: &Verdict) -> AppResult<()>;

    async fn load_verdict(&self, case_id: &str) -> AppResult<Option<Verdict>>;

    /// Most recent verdicts first.
    async fn recent_verdicts(&self, limit: usize) -> AppResult<Vec<VerdictSummary>>;
}

/// Storage for submitted cases.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Store a validated case. Resubmitting the same content is a no-op;
    /// different content under a known id is rejected.
    async fn put_case(&self, case: &Case) -> AppResult<()>;

    async fn get_case(&self, case_id: &str) -> AppResult<Option<Case>>;
}

/// Cases are immutable once stored.
pub(crate) fn check_resubmission(existing: &Case, case: &Case) -> AppResult<()> {
    if existing.same_submission(case) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "case {} was already submitted with different content",
            case.id
        )))
    }
}

/// Best-effort write of a `Failed` session after a fatal error. The
/// original error is handed back for the caller to surface.
///
/// Callers only apply a terminal status in memory after the store accepted
/// it, so a terminal `session` is already durable and is left alone.
pub async fn persist_failure(
    store: &dyn SessionStore,
    session: &mut AgentSession,
    err: AppError,
) -> AppError {
    if session.is_terminal() {
        return err;
    }
    let _ = session.note(format!("investigation failed: {}", err));
    if session.finish(SessionStatus::Failed).is_ok() {
        if let Err(e) = store.checkpoint(session).await {
            error!(case_id = %session.case_id, error = %e, "could not persist failed status");
        }
    }
    err
}
