//! In-Memory Session Store
//!
//! Volatile store for tests and local development.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use verdict_engine_core::{AgentSession, Case, Verdict, VerdictSummary};

use super::{check_resubmission, CaseStore, SessionStore};
use crate::utils::error::AppResult;

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, AgentSession>>,
    checkpoints: RwLock<HashMap<String, BTreeMap<u32, AgentSession>>>,
    verdicts: RwLock<HashMap<String, Verdict>>,
    cases: RwLock<HashMap<String, Case>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn checkpoint(&self, session: &AgentSession) -> AppResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.case_id.clone(), session.clone());
        self.checkpoints
            .write()
            .await
            .entry(session.case_id.clone())
            .or_default()
            .insert(session.iteration, session.clone());
        Ok(())
    }

    async fn find(&self, case_id: &str) -> AppResult<Option<AgentSession>> {
        Ok(self.sessions.read().await.get(case_id).cloned())
    }

    async fn history(&self, case_id: &str) -> AppResult<Vec<AgentSession>> {
        Ok(self
            .checkpoints
            .read()
            .await
            .get(case_id)
            .map(|by_iteration| by_iteration.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn record_verdict(&self, session: &AgentSession, verdict: &Verdict) -> AppResult<()> {
        let mut sessions = self.sessions.write().await;
        let mut checkpoints = self.checkpoints.write().await;
        let mut verdicts = self.verdicts.write().await;
        sessions.insert(session.case_id.clone(), session.clone());
        checkpoints
            .entry(session.case_id.clone())
            .or_default()
            .insert(session.iteration, session.clone());
        verdicts.insert(verdict.case_id.clone(), verdict.clone());
        Ok(())
    }

    async fn load_verdict(&self, case_id: &str) -> AppResult<Option<Verdict>> {
        Ok(self.verdicts.read().await.get(case_id).cloned())
    }

    async fn recent_verdicts(&self, limit: usize) -> AppResult<Vec<VerdictSummary>> {
        let verdicts = self.verdicts.read().await;
        let mut summaries: Vec<VerdictSummary> = verdicts.values().map(Verdict::summary).collect();
        summaries.sort_by(|a, b| b.concluded_at.cmp(&a.concluded_at));
        summaries.truncate(limit);
        Ok(summaries)
    }
}

#[async_trait]
impl CaseStore for MemorySessionStore {
    async fn put_case(&self, case: &Case) -> AppResult<()> {
        case.validate()?;
        let mut cases = self.cases.write().await;
        if let Some(existing) = cases.get(&case.id) {
            return check_resubmission(existing, case);
        }
        cases.insert(case.id.clone(), case.clone());
        Ok(())
    }

    async fn get_case(&self, case_id: &str) -> AppResult<Option<Case>> {
        Ok(self.cases.read().await.get(case_id).cloned())
    }
}
