//! Fixed Tier Pipeline
//!
//! Three-tier escalation for bounded categories. Every tier runs the visual
//! similarity classifier at increasing depth:
//!
//! | Tier | Depth      | Notes                                   |
//! |------|------------|-----------------------------------------|
//! | 1    | `screen`   | cheap perceptual screen                 |
//! | 2    | `targeted` | region-level comparison                 |
//! | 3    | `deep`     | full comparison merged with code patterns |
//!
//! A tier at or above the escalation threshold stops the pipeline. Tier 3 is
//! terminal. Reported confidence is the maximum over the tiers run.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use verdict_engine_core::confidence::pipeline_assessment;
use verdict_engine_core::thresholds::{micros_to_usd, PIPELINE_TIERS};
use verdict_engine_core::{
    AgentSession, AnalysisDepth, Case, InvestigationTool, PipelineLimits, SessionStatus, Strategy,
    ToolContext, ToolKind, ToolRegistry, VerdictBuilder,
};
use verdict_engine_tools::invoke_with_retry;

use super::cost::{CostAccountant, CostError};
use super::engine::InvestigationOutcome;
use super::session::{persist_failure, SessionStore};
use crate::utils::error::{AppError, AppResult};

/// Retries per tier after the first failure.
const TIER_RETRIES: u32 = 1;

/// The classifier bound to each tier.
pub const PIPELINE_TOOL: ToolKind = ToolKind::VisualSimilarityCompare;

/// Analysis depth for a tier number (1-based).
pub fn tier_depth(tier: u8) -> AnalysisDepth {
    match tier {
        1 => AnalysisDepth::Screen,
        2 => AnalysisDepth::Targeted,
        _ => AnalysisDepth::Deep,
    }
}

/// Why the pipeline stopped running tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Threshold,
    Exhausted,
    Budget,
}

pub struct FixedPipeline {
    registry: Arc<ToolRegistry>,
    store: Arc<dyn SessionStore>,
    costs: Arc<CostAccountant>,
    limits: PipelineLimits,
}

impl FixedPipeline {
    pub fn new(
        registry: Arc<ToolRegistry>,
        store: Arc<dyn SessionStore>,
        costs: Arc<CostAccountant>,
        limits: PipelineLimits,
    ) -> Self {
        Self {
            registry,
            store,
            costs,
            limits,
        }
    }

    /// Investigate a case, resuming a Running session if one exists.
    ///
    /// `start_tier` forces entry at a later tier (manual re-escalation).
    pub async fn run(
        &self,
        case: &Case,
        start_tier: Option<u8>,
        cancel: &CancellationToken,
    ) -> AppResult<InvestigationOutcome> {
        let tool = self.registry.require(PIPELINE_TOOL)?;

        let mut session = match self.store.find(&case.id).await? {
            Some(existing) if existing.status == SessionStatus::Cancelled => {
                return Ok(InvestigationOutcome::Cancelled);
            }
            Some(existing) if existing.is_terminal() => {
                return Err(AppError::validation(format!(
                    "case {} already finished as {}",
                    case.id, existing.status
                )));
            }
            Some(existing) if existing.strategy != Strategy::FixedPipeline => {
                return Err(AppError::validation(format!(
                    "case {} has a running {} session",
                    case.id, existing.strategy
                )));
            }
            Some(existing) => {
                info!(case_id = %case.id, tier = existing.iteration, "resuming pipeline");
                existing
            }
            None => self.store.create(&case.id, Strategy::FixedPipeline).await?,
        };

        self.costs.restore(
            &case.id,
            self.limits.budget_micros,
            session.cumulative_cost_micros,
        )?;

        let result = self
            .drive(case, tool.as_ref(), &mut session, start_tier, cancel)
            .await;
        if let Some(usage) = self.costs.close(&case.id) {
            debug!(
                case_id = %case.id,
                calls = usage.calls,
                latency_ms = usage.total_latency_ms,
                spent_usd = usage.spent_usd(),
                "pipeline ledger closed"
            );
        }

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => Err(persist_failure(self.store.as_ref(), &mut session, err).await),
        }
    }

    async fn drive(
        &self,
        case: &Case,
        tool: &dyn InvestigationTool,
        session: &mut AgentSession,
        start_tier: Option<u8>,
        cancel: &CancellationToken,
    ) -> AppResult<InvestigationOutcome> {
        let resume_tier = u8::try_from(session.iteration.saturating_add(1)).unwrap_or(u8::MAX);
        let mut tier = start_tier.unwrap_or(1).max(resume_tier).max(1);
        let mut stop = Stop::Exhausted;

        // Saved tiers may already have reached the threshold.
        if session.iteration > 0
            && pipeline_assessment(&session.evidence).confidence
                >= self.limits.escalation_threshold
        {
            info!(case_id = %case.id, tier = session.iteration, "threshold met before resume");
            stop = Stop::Threshold;
        }

        while stop == Stop::Exhausted && tier <= PIPELINE_TIERS {
            if cancel.is_cancelled() {
                return self.cancel(session, tier).await;
            }

            let depth = tier_depth(tier);
            let estimate = tool.estimated_cost(depth);
            if !self.costs.can_afford(&case.id, estimate) {
                warn!(case_id = %case.id, tier, estimate, "budget exhausted before tier");
                session.note(format!(
                    "budget exhausted before tier {}: needs ${:.4}, ${:.4} remaining",
                    tier,
                    micros_to_usd(estimate),
                    micros_to_usd(self.costs.remaining(&case.id))
                ))?;
                stop = Stop::Budget;
                break;
            }

            session.advance_to(u32::from(tier))?;
            let confidence = self.run_tier(case, tool, session, tier, depth).await?;
            self.store.checkpoint(session).await?;

            if confidence >= self.limits.escalation_threshold {
                stop = Stop::Threshold;
                break;
            }
            if tier < PIPELINE_TIERS {
                debug!(case_id = %case.id, tier, confidence, "escalating");
            }
            tier += 1;
        }

        let assessment = pipeline_assessment(&session.evidence);
        let low_confidence = stop != Stop::Threshold;

        // Applied to `session` only once the store holds it.
        let mut finished = session.clone();
        if stop == Stop::Exhausted {
            finished.note(format!(
                "tier {} below {:.2}; flagged for human review",
                finished.iteration, self.limits.escalation_threshold
            ))?;
        }
        finished.finish(SessionStatus::Concluded)?;

        let verdict = VerdictBuilder::new(&finished, assessment)
            .low_confidence(low_confidence)
            .build()?;
        self.store.record_verdict(&finished, &verdict).await?;
        *session = finished;

        info!(
            case_id = %case.id,
            tiers = session.iteration,
            confidence = verdict.confidence,
            decision = %verdict.decision.as_str(),
            cost_usd = verdict.cost_usd,
            "pipeline concluded"
        );
        Ok(InvestigationOutcome::Verdict(verdict))
    }

    /// Run one tier with a single retry. Returns the tier confidence.
    async fn run_tier(
        &self,
        case: &Case,
        tool: &dyn InvestigationTool,
        session: &mut AgentSession,
        tier: u8,
        depth: AnalysisDepth,
    ) -> AppResult<f64> {
        let ctx = ToolContext::new(case, &session.evidence).with_depth(depth);
        let invocation = invoke_with_retry(tool, ctx, TIER_RETRIES).await;
        self.costs.record_call(&case.id, invocation.latency)?;

        for failure in &invocation.failures {
            session.record_failure(invocation.tool, failure)?;
        }

        match invocation.result {
            Ok(evidence) => match self.costs.charge(&case.id, evidence.cost_micros) {
                Ok(_) => {
                    let confidence = evidence.confidence;
                    session.note(format!(
                        "tier {} ({}): {}; confidence {:.2}",
                        tier, depth, evidence.summary, confidence
                    ))?;
                    session.record_evidence(evidence)?;
                    info!(case_id = %case.id, tier, confidence, "tier complete");
                    Ok(confidence)
                }
                Err(CostError::BudgetExceeded { remaining, .. }) => {
                    session.note(format!(
                        "tier {} result discarded: cost ${:.4} exceeds ${:.4} remaining",
                        tier,
                        micros_to_usd(evidence.cost_micros),
                        micros_to_usd(remaining)
                    ))?;
                    Ok(0.0)
                }
                Err(e) => Err(e.into()),
            },
            Err(_) => {
                session.note(format!(
                    "tier {} failed after {} attempts; confidence 0",
                    tier, invocation.attempts
                ))?;
                Ok(0.0)
            }
        }
    }

    async fn cancel(
        &self,
        session: &mut AgentSession,
        tier: u8,
    ) -> AppResult<InvestigationOutcome> {
        info!(case_id = %session.case_id, tier, "pipeline cancelled");
        let mut cancelled = session.clone();
        cancelled.note(format!("cancelled before tier {}", tier))?;
        cancelled.finish(SessionStatus::Cancelled)?;
        self.store.checkpoint(&cancelled).await?;
        *session = cancelled;
        Ok(InvestigationOutcome::Cancelled)
    }
}
