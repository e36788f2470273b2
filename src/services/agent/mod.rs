//! Investigation Agent
//!
//! Iterative tool-selection loop for open-ended categories. Each iteration
//! selects one tool, invokes it under its own timeout, folds the result into
//! the session and checkpoints. The loop stops when aggregated confidence
//! reaches the stop threshold, when `conclude` is selected, when the next
//! tool does not fit the remaining budget, or at the iteration bound.

pub mod selection;

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use verdict_engine_core::confidence::agent_assessment;
use verdict_engine_core::thresholds::micros_to_usd;
use verdict_engine_core::{
    AgentLimits, AgentSession, Case, SessionStatus, Strategy, ToolContext, ToolKind, ToolRegistry,
    VerdictBuilder,
};
use verdict_engine_tools::invoke_with_timeout;

use super::cost::{CostAccountant, CostError};
use super::engine::InvestigationOutcome;
use super::session::{persist_failure, SessionStore};
use crate::utils::error::{AppError, AppResult};

pub use selection::{HeuristicSelector, ReasoningSelector, Selection, ToolSelector};

pub struct InvestigationAgent {
    registry: Arc<ToolRegistry>,
    store: Arc<dyn SessionStore>,
    costs: Arc<CostAccountant>,
    selector: Arc<dyn ToolSelector>,
    limits: AgentLimits,
}

impl InvestigationAgent {
    pub fn new(
        registry: Arc<ToolRegistry>,
        store: Arc<dyn SessionStore>,
        costs: Arc<CostAccountant>,
        selector: Arc<dyn ToolSelector>,
        limits: AgentLimits,
    ) -> Self {
        Self {
            registry,
            store,
            costs,
            selector,
            limits,
        }
    }

    pub fn limits(&self) -> &AgentLimits {
        &self.limits
    }

    /// Investigate a case, resuming a Running session if one exists.
    pub async fn run(
        &self,
        case: &Case,
        cancel: &CancellationToken,
    ) -> AppResult<InvestigationOutcome> {
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
            Some(existing) if existing.strategy != Strategy::Agent => {
                return Err(AppError::validation(format!(
                    "case {} has a running {} session",
                    case.id, existing.strategy
                )));
            }
            Some(existing) => {
                info!(case_id = %case.id, iteration = existing.iteration, "resuming agent");
                existing
            }
            None => self.store.create(&case.id, Strategy::Agent).await?,
        };

        self.costs.restore(
            &case.id,
            self.limits.budget_micros,
            session.cumulative_cost_micros,
        )?;

        let result = self.drive(case, &mut session, cancel).await;
        if let Some(usage) = self.costs.close(&case.id) {
            debug!(
                case_id = %case.id,
                calls = usage.calls,
                latency_ms = usage.total_latency_ms,
                spent_usd = usage.spent_usd(),
                "agent ledger closed"
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
        session: &mut AgentSession,
        cancel: &CancellationToken,
    ) -> AppResult<InvestigationOutcome> {
        // Saved evidence may already clear the threshold.
        if session.iteration > 0 {
            let assessment = agent_assessment(case.policy_category, &session.evidence);
            if assessment.confidence >= self.limits.stop_threshold {
                info!(
                    case_id = %case.id,
                    iteration = session.iteration,
                    "threshold met before resume"
                );
                session.note(format!(
                    "confidence {:.2} reached {:.2}",
                    assessment.confidence, self.limits.stop_threshold
                ))?;
                return self.finalize(case, session, SessionStatus::Concluded).await;
            }
        }

        loop {
            if cancel.is_cancelled() {
                info!(case_id = %case.id, iteration = session.iteration, "agent cancelled");
                let mut cancelled = session.clone();
                cancelled.note(format!("cancelled after iteration {}", cancelled.iteration))?;
                cancelled.finish(SessionStatus::Cancelled)?;
                self.store.checkpoint(&cancelled).await?;
                *session = cancelled;
                return Ok(InvestigationOutcome::Cancelled);
            }

            if session.iteration >= self.limits.max_iterations {
                session.note(format!(
                    "stopped at the {} iteration limit without reaching {:.2} confidence",
                    self.limits.max_iterations, self.limits.stop_threshold
                ))?;
                return self.finalize(case, session, SessionStatus::Inconclusive).await;
            }

            let selector_cost = self.selector.call_cost();
            if !self.costs.can_afford(&case.id, selector_cost) {
                warn!(case_id = %case.id, selector_cost, "budget stop before selection");
                session.note(format!(
                    "budget stop before tool selection: needs ${:.4}, ${:.4} remaining",
                    micros_to_usd(selector_cost),
                    micros_to_usd(self.costs.remaining(&case.id))
                ))?;
                return self.finalize(case, session, SessionStatus::Concluded).await;
            }

            let iteration = session.advance()?;
            let selection = self.selector.select(case, session, &self.registry).await;
            if selection.cost_micros > 0 {
                match self.costs.charge(&case.id, selection.cost_micros) {
                    Ok(_) => session.record_spend(selection.cost_micros)?,
                    Err(CostError::BudgetExceeded { remaining, .. }) => {
                        session.note(format!(
                            "iteration {}: selection cost ${:.4} exceeds ${:.4} remaining",
                            iteration,
                            micros_to_usd(selection.cost_micros),
                            micros_to_usd(remaining)
                        ))?;
                        return self.finalize(case, session, SessionStatus::Concluded).await;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            debug!(
                case_id = %case.id,
                iteration,
                tool = %selection.tool,
                depth = %selection.depth,
                rationale = %selection.rationale,
                "selected tool"
            );

            if selection.is_conclude() {
                self.conclude(case, session, iteration, &selection).await?;
                return self.finalize(case, session, SessionStatus::Concluded).await;
            }

            let Some(tool) = self.registry.get(selection.tool) else {
                session.note(format!(
                    "iteration {}: {} is not registered",
                    iteration, selection.tool
                ))?;
                self.store.checkpoint(session).await?;
                continue;
            };

            let estimate = tool.estimated_cost(selection.depth);
            if !self.costs.can_afford(&case.id, estimate) {
                warn!(
                    case_id = %case.id,
                    iteration,
                    tool = %selection.tool,
                    estimate,
                    "budget stop"
                );
                session.note(format!(
                    "iteration {}: budget stop before {} ({}): needs ${:.4}, ${:.4} remaining",
                    iteration,
                    selection.tool,
                    selection.depth,
                    micros_to_usd(estimate),
                    micros_to_usd(self.costs.remaining(&case.id))
                ))?;
                return self.finalize(case, session, SessionStatus::Concluded).await;
            }

            let started = Instant::now();
            let ctx = ToolContext::new(case, &session.evidence).with_depth(selection.depth);
            let result = invoke_with_timeout(tool.as_ref(), ctx).await;
            self.costs.record_call(&case.id, started.elapsed())?;

            match result {
                Ok(evidence) => match self.costs.charge(&case.id, evidence.cost_micros) {
                    Ok(_) => {
                        session.note(format!(
                            "iteration {}: {} ({}) because {}: {}",
                            iteration,
                            selection.tool,
                            selection.depth,
                            selection.rationale,
                            evidence.summary
                        ))?;
                        session.record_evidence(evidence)?;
                    }
                    Err(CostError::BudgetExceeded { remaining, .. }) => {
                        session.note(format!(
                            "iteration {}: {} result discarded, cost ${:.4} exceeds ${:.4} remaining",
                            iteration,
                            selection.tool,
                            micros_to_usd(evidence.cost_micros),
                            micros_to_usd(remaining)
                        ))?;
                        return self.finalize(case, session, SessionStatus::Concluded).await;
                    }
                    Err(e) => return Err(e.into()),
                },
                Err(e) => {
                    warn!(
                        case_id = %case.id,
                        iteration,
                        tool = %selection.tool,
                        error = %e,
                        "tool failed"
                    );
                    session.record_failure(selection.tool, &e)?;
                }
            }

            let assessment = agent_assessment(case.policy_category, &session.evidence);
            self.store.checkpoint(session).await?;
            debug!(
                case_id = %case.id,
                iteration,
                confidence = assessment.confidence,
                "iteration complete"
            );

            if assessment.confidence >= self.limits.stop_threshold {
                session.note(format!(
                    "confidence {:.2} reached {:.2}",
                    assessment.confidence, self.limits.stop_threshold
                ))?;
                return self.finalize(case, session, SessionStatus::Concluded).await;
            }
        }
    }

    /// Record the conclusion item when a conclude tool is registered.
    async fn conclude(
        &self,
        case: &Case,
        session: &mut AgentSession,
        iteration: u32,
        selection: &Selection,
    ) -> AppResult<()> {
        session.note(format!(
            "iteration {}: conclude because {}",
            iteration, selection.rationale
        ))?;
        if let Some(tool) = self.registry.get(ToolKind::Conclude) {
            let ctx = ToolContext::new(case, &session.evidence);
            match invoke_with_timeout(tool.as_ref(), ctx).await {
                Ok(evidence) => session.record_evidence(evidence)?,
                Err(e) => session.record_failure(ToolKind::Conclude, &e)?,
            }
        }
        self.store.checkpoint(session).await
    }

    async fn finalize(
        &self,
        case: &Case,
        session: &mut AgentSession,
        status: SessionStatus,
    ) -> AppResult<InvestigationOutcome> {
        let assessment = agent_assessment(case.policy_category, &session.evidence);

        // Applied to `session` only once the store holds it.
        let mut finished = session.clone();
        finished.finish(status)?;

        let verdict = VerdictBuilder::new(&finished, assessment)
            .low_confidence(assessment.confidence < self.limits.stop_threshold)
            .build()?;
        self.store.record_verdict(&finished, &verdict).await?;
        *session = finished;

        info!(
            case_id = %case.id,
            iterations = session.iteration,
            status = %session.status,
            confidence = verdict.confidence,
            decision = %verdict.decision.as_str(),
            cost_usd = verdict.cost_usd,
            "agent finished"
        );
        Ok(InvestigationOutcome::Verdict(verdict))
    }
}
