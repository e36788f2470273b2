//! Investigation Session
//!
//! `AgentSession` is the durable, resumable state of one investigation. The
//! fixed pipeline and the agent both record into it; the session store
//! persists it after every iteration.
//!
//! Lifecycle: `Running` is the only non-terminal status. `finish` performs the
//! single terminal transition; every mutator refuses to touch a finished
//! session.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::evidence::{Evidence, EvidenceKind};
use crate::tool_trait::{ToolError, ToolKind};

// ============================================================================
// Strategy
// ============================================================================

/// Which investigation strategy owns a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    FixedPipeline,
    Agent,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::FixedPipeline => "fixed_pipeline",
            Strategy::Agent => "agent",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "fixed_pipeline" => Ok(Strategy::FixedPipeline),
            "agent" => Ok(Strategy::Agent),
            other => Err(CoreError::parse(format!("Unknown strategy: {}", other))),
        }
    }
}

// ============================================================================
// SessionStatus
// ============================================================================

/// Session status. Everything except `Running` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Concluded,
    Inconclusive,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Concluded => "concluded",
            SessionStatus::Inconclusive => "inconclusive",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Running)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "running" => Ok(SessionStatus::Running),
            "concluded" => Ok(SessionStatus::Concluded),
            "inconclusive" => Ok(SessionStatus::Inconclusive),
            "failed" => Ok(SessionStatus::Failed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            other => Err(CoreError::parse(format!("Unknown session status: {}", other))),
        }
    }
}

// ============================================================================
// AgentSession
// ============================================================================

/// Per-case investigation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSession {
    pub case_id: String,
    pub strategy: Strategy,
    /// Iterations completed (tier number for the fixed pipeline).
    pub iteration: u32,
    pub evidence: Vec<Evidence>,
    /// One entry per attempted invocation, failures included.
    pub tools_used: Vec<ToolKind>,
    pub reasoning: Vec<String>,
    pub status: SessionStatus,
    pub cumulative_cost_micros: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentSession {
    pub fn new(case_id: impl Into<String>, strategy: Strategy) -> Self {
        let now = Utc::now();
        Self {
            case_id: case_id.into(),
            strategy,
            iteration: 0,
            evidence: Vec::new(),
            tools_used: Vec::new(),
            reasoning: Vec::new(),
            status: SessionStatus::Running,
            cumulative_cost_micros: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn ensure_running(&self, action: &str) -> CoreResult<()> {
        if self.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: action.to_string(),
            });
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Start the next iteration and return its number.
    pub fn advance(&mut self) -> CoreResult<u32> {
        self.ensure_running("advance")?;
        self.iteration += 1;
        self.touch();
        Ok(self.iteration)
    }

    /// Jump forward to `iteration`, used when the pipeline enters at a later tier.
    pub fn advance_to(&mut self, iteration: u32) -> CoreResult<u32> {
        self.ensure_running("advance")?;
        if iteration <= self.iteration {
            return Err(CoreError::validation(format!(
                "iteration {} is not after {}",
                iteration, self.iteration
            )));
        }
        self.iteration = iteration;
        self.touch();
        Ok(self.iteration)
    }

    /// Record a successful invocation: the tool attempt, its evidence and cost.
    pub fn record_evidence(&mut self, evidence: Evidence) -> CoreResult<()> {
        self.ensure_running("record_evidence")?;
        self.tools_used.push(evidence.tool);
        self.cumulative_cost_micros = self
            .cumulative_cost_micros
            .saturating_add(evidence.cost_micros);
        self.evidence.push(evidence);
        self.touch();
        Ok(())
    }

    /// Add spend that produced no evidence, such as a reasoning call.
    pub fn record_spend(&mut self, micros: u64) -> CoreResult<()> {
        self.ensure_running("record_spend")?;
        self.cumulative_cost_micros = self.cumulative_cost_micros.saturating_add(micros);
        self.touch();
        Ok(())
    }

    /// Record a failed invocation and its reasoning line.
    pub fn record_failure(&mut self, tool: ToolKind, error: &ToolError) -> CoreResult<()> {
        self.ensure_running("record_failure")?;
        self.tools_used.push(tool);
        self.reasoning.push(format!("{} failed: {}", tool.name(), error));
        self.touch();
        Ok(())
    }

    /// Append a reasoning line.
    pub fn note(&mut self, line: impl Into<String>) -> CoreResult<()> {
        self.ensure_running("note")?;
        self.reasoning.push(line.into());
        self.touch();
        Ok(())
    }

    /// Perform the single terminal transition.
    pub fn finish(&mut self, status: SessionStatus) -> CoreResult<()> {
        if !status.is_terminal() || self.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.status = status;
        self.touch();
        Ok(())
    }

    /// Invocations of a tool, failures included.
    pub fn attempt_count(&self, tool: ToolKind) -> usize {
        self.tools_used.iter().filter(|t| **t == tool).count()
    }

    /// Successful invocations of a tool.
    pub fn success_count(&self, tool: ToolKind) -> usize {
        self.evidence.iter().filter(|e| e.tool == tool).count()
    }

    /// Failed invocations of a tool.
    pub fn failure_count(&self, tool: ToolKind) -> usize {
        self.attempt_count(tool)
            .saturating_sub(self.success_count(tool))
    }

    /// Highest confidence recorded for an evidence kind.
    pub fn best_confidence(&self, kind: EvidenceKind) -> Option<f64> {
        self.evidence
            .iter()
            .filter(|e| e.kind() == kind)
            .map(|e| e.confidence)
            .fold(None, |best, c| match best {
                Some(b) if b >= c => Some(b),
                _ => Some(c),
            })
    }

    /// Evidence kinds present in the session.
    pub fn represented_kinds(&self) -> BTreeSet<EvidenceKind> {
        self.evidence.iter().map(|e| e.kind()).collect()
    }
}
