//! Verdict Model
//!
//! The final, immutable decision artifact. A verdict is derived once from a
//! terminal session through `VerdictBuilder`, stored, and never recomputed.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::confidence::Assessment;
use crate::error::{CoreError, CoreResult};
use crate::session::{AgentSession, SessionStatus, Strategy};
use crate::thresholds::{micros_to_usd, MAJOR_SEVERITY, MINOR_SEVERITY};

/// Violation severity decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    None,
    Minor,
    Major,
}

impl Decision {
    pub fn from_severity(severity: f64) -> Self {
        if severity >= MAJOR_SEVERITY {
            Decision::Major
        } else if severity >= MINOR_SEVERITY {
            Decision::Minor
        } else {
            Decision::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::None => "none",
            Decision::Minor => "minor",
            Decision::Major => "major",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the review workflow should do with the case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    RemoveListing,
    WarnSeller,
    Dismiss,
    EscalateToHumanReview,
}

impl RecommendedAction {
    /// Flagged verdicts always go to a human, whatever the decision.
    pub fn for_outcome(decision: Decision, needs_human_review: bool) -> Self {
        if needs_human_review {
            return RecommendedAction::EscalateToHumanReview;
        }
        match decision {
            Decision::Major => RecommendedAction::RemoveListing,
            Decision::Minor => RecommendedAction::WarnSeller,
            Decision::None => RecommendedAction::Dismiss,
        }
    }
}

/// Final verdict for a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub case_id: String,
    pub decision: Decision,
    pub confidence: f64,
    pub reasoning: String,
    pub recommended_action: RecommendedAction,
    pub evidence_summary: Vec<String>,
    pub cost_usd: f64,
    pub duration_seconds: f64,
    pub low_confidence: bool,
    pub needs_human_review: bool,
    pub strategy: Strategy,
    pub status: SessionStatus,
    pub concluded_at: DateTime<Utc>,
}

impl Verdict {
    pub fn summary(&self) -> VerdictSummary {
        VerdictSummary {
            case_id: self.case_id.clone(),
            decision: self.decision,
            confidence: self.confidence,
            recommended_action: self.recommended_action,
            cost_usd: self.cost_usd,
            low_confidence: self.low_confidence,
            needs_human_review: self.needs_human_review,
            status: self.status,
            concluded_at: self.concluded_at,
        }
    }
}

/// Dashboard listing row: verdict fields without reasoning or evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictSummary {
    pub case_id: String,
    pub decision: Decision,
    pub confidence: f64,
    pub recommended_action: RecommendedAction,
    pub cost_usd: f64,
    pub low_confidence: bool,
    pub needs_human_review: bool,
    pub status: SessionStatus,
    pub concluded_at: DateTime<Utc>,
}

/// Builds a verdict from a terminal session.
///
/// # Example
/// ```ignore
/// let verdict = VerdictBuilder::new(&session, assessment)
///     .low_confidence(true)
///     .duration(started.elapsed())
///     .build()?;
/// ```
#[derive(Debug)]
pub struct VerdictBuilder<'a> {
    session: &'a AgentSession,
    assessment: Assessment,
    low_confidence: bool,
    needs_human_review: bool,
    duration: Option<Duration>,
}

impl<'a> VerdictBuilder<'a> {
    pub fn new(session: &'a AgentSession, assessment: Assessment) -> Self {
        Self {
            session,
            assessment,
            low_confidence: false,
            needs_human_review: false,
            duration: None,
        }
    }

    /// Mark the verdict as low confidence. Implies human review.
    pub fn low_confidence(mut self, flag: bool) -> Self {
        self.low_confidence = flag;
        self
    }

    pub fn needs_human_review(mut self, flag: bool) -> Self {
        self.needs_human_review = flag;
        self
    }

    /// Wall-clock duration. Defaults to the session's age.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Build the verdict. Only concluded or inconclusive sessions qualify.
    pub fn build(self) -> CoreResult<Verdict> {
        let session = self.session;
        if !matches!(
            session.status,
            SessionStatus::Concluded | SessionStatus::Inconclusive
        ) {
            return Err(CoreError::validation(format!(
                "cannot derive a verdict from a {} session",
                session.status
            )));
        }

        let needs_human_review = self.needs_human_review
            || self.low_confidence
            || session.status == SessionStatus::Inconclusive;
        let now = Utc::now();
        let duration_seconds = match self.duration {
            Some(d) => d.as_secs_f64(),
            None => (now - session.created_at)
                .to_std()
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0),
        };

        Ok(Verdict {
            case_id: session.case_id.clone(),
            decision: self.assessment.decision,
            confidence: self.assessment.confidence,
            reasoning: session.reasoning.join("\n"),
            recommended_action: RecommendedAction::for_outcome(
                self.assessment.decision,
                needs_human_review,
            ),
            evidence_summary: session
                .evidence
                .iter()
                .map(|e| format!("[{}] {} (confidence {:.2})", e.tool, e.summary, e.confidence))
                .collect(),
            cost_usd: micros_to_usd(session.cumulative_cost_micros),
            duration_seconds,
            low_confidence: self.low_confidence,
            needs_human_review,
            strategy: session.strategy,
            status: session.status,
            concluded_at: now,
        })
    }
}
