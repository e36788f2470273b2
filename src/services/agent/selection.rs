//! Tool Selection
//!
//! Chooses the agent's next tool. `HeuristicSelector` is deterministic:
//!
//! 1. Fill gaps first: tools whose evidence kind is not yet represented,
//!    fewest failures first, then registry order.
//! 2. Otherwise re-run the tool with the largest expected gain
//!    (`weight × (1 − best confidence)`) at deep depth.
//! 3. Conclude when no gain exceeds the minimum.
//!
//! Tools that failed `MAX_TOOL_FAILURES` times are never selected again.
//! `ReasoningSelector` asks the reasoning capability instead and falls back
//! to the heuristic whenever the answer is missing or unusable. Each call it
//! makes is priced into the selection and charged to the case.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use verdict_engine_capabilities::{Capability, CapabilityTransport};
use verdict_engine_core::confidence::expected_gain;
use verdict_engine_core::thresholds::{
    DEFAULT_REASONING_CALL_COST_MICROS, MAX_TOOL_FAILURES, MAX_TOOL_RUNS, MIN_CONFIDENCE_GAIN,
};
use verdict_engine_core::{AgentSession, AnalysisDepth, Case, ToolKind, ToolRegistry};

/// The selector's choice and why it was made.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub tool: ToolKind,
    pub depth: AnalysisDepth,
    pub rationale: String,
    /// Spent while choosing, in microdollars.
    pub cost_micros: u64,
}

impl Selection {
    pub fn new(tool: ToolKind, depth: AnalysisDepth, rationale: impl Into<String>) -> Self {
        Self {
            tool,
            depth,
            rationale: rationale.into(),
            cost_micros: 0,
        }
    }

    pub fn conclude(rationale: impl Into<String>) -> Self {
        Self::new(ToolKind::Conclude, AnalysisDepth::Standard, rationale)
    }

    pub fn is_conclude(&self) -> bool {
        self.tool == ToolKind::Conclude
    }
}

#[async_trait]
pub trait ToolSelector: Send + Sync {
    /// Most a single `select` can spend. The agent stops when the case
    /// cannot cover it.
    fn call_cost(&self) -> u64 {
        0
    }

    async fn select(
        &self,
        case: &Case,
        session: &AgentSession,
        registry: &ToolRegistry,
    ) -> Selection;
}

/// Registered, non-conclude tools for the case that have not failed out.
fn usable_tools(case: &Case, session: &AgentSession, registry: &ToolRegistry) -> Vec<ToolKind> {
    registry
        .tools_for(case.policy_category)
        .iter()
        .map(|t| t.kind())
        .filter(|k| *k != ToolKind::Conclude)
        .filter(|k| session.failure_count(*k) < MAX_TOOL_FAILURES)
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct HeuristicSelector {
    min_gain: f64,
}

impl Default for HeuristicSelector {
    fn default() -> Self {
        Self::new(MIN_CONFIDENCE_GAIN)
    }
}

impl HeuristicSelector {
    pub fn new(min_gain: f64) -> Self {
        Self { min_gain }
    }

    pub fn choose(
        &self,
        case: &Case,
        session: &AgentSession,
        registry: &ToolRegistry,
    ) -> Selection {
        let usable = usable_tools(case, session, registry);
        let represented = session.represented_kinds();

        // Stable sort keeps registry order among equal failure counts.
        let mut gaps: Vec<ToolKind> = usable
            .iter()
            .copied()
            .filter(|k| !represented.contains(&k.evidence_kind()))
            .collect();
        gaps.sort_by_key(|k| session.failure_count(*k));

        if let Some(tool) = gaps.first().copied() {
            let failures = session.failure_count(tool);
            let mut rationale = format!("no {} evidence yet", tool.evidence_kind());
            if failures > 0 {
                rationale.push_str(&format!(", retrying after {} failure(s)", failures));
            }
            return Selection::new(tool, AnalysisDepth::Standard, rationale);
        }

        let category = case.policy_category;
        let best = usable
            .iter()
            .copied()
            .filter(|k| session.success_count(*k) < MAX_TOOL_RUNS)
            .map(|k| {
                let kind = k.evidence_kind();
                (k, expected_gain(category, kind, session.best_confidence(kind)))
            })
            .fold(None::<(ToolKind, f64)>, |best, (k, gain)| match best {
                Some((_, g)) if g >= gain => best,
                _ => Some((k, gain)),
            });

        match best {
            Some((tool, gain)) if gain > self.min_gain => Selection::new(
                tool,
                AnalysisDepth::Deep,
                format!("deep re-run, expected gain {:.2}", gain),
            ),
            Some((_, gain)) => Selection::conclude(format!(
                "best expected gain {:.2} does not exceed {:.2}",
                gain, self.min_gain
            )),
            None => Selection::conclude("no usable tools remain"),
        }
    }
}

#[async_trait]
impl ToolSelector for HeuristicSelector {
    async fn select(
        &self,
        case: &Case,
        session: &AgentSession,
        registry: &ToolRegistry,
    ) -> Selection {
        self.choose(case, session, registry)
    }
}

#[derive(Debug, Deserialize)]
struct ReasoningAnswer {
    tool: String,
    #[serde(default)]
    depth: Option<AnalysisDepth>,
    #[serde(default)]
    rationale: Option<String>,
}

/// Delegates the choice to the reasoning capability.
pub struct ReasoningSelector {
    transport: Arc<dyn CapabilityTransport>,
    fallback: HeuristicSelector,
    call_cost_micros: u64,
}

impl ReasoningSelector {
    pub fn new(transport: Arc<dyn CapabilityTransport>, fallback: HeuristicSelector) -> Self {
        Self {
            transport,
            fallback,
            call_cost_micros: DEFAULT_REASONING_CALL_COST_MICROS,
        }
    }

    pub fn with_call_cost(mut self, micros: u64) -> Self {
        self.call_cost_micros = micros;
        self
    }

    fn request_body(
        &self,
        case: &Case,
        session: &AgentSession,
        registry: &ToolRegistry,
        suggestion: &Selection,
    ) -> serde_json::Value {
        let evidence: Vec<_> = session
            .evidence
            .iter()
            .map(|e| {
                json!({
                    "tool": e.tool,
                    "confidence": e.confidence,
                    "severity": e.severity,
                    "summary": e.summary,
                })
            })
            .collect();
        json!({
            "category": case.policy_category,
            "complaint": case.complaint_text,
            "context": case.context,
            "catalog": registry.catalog(case.policy_category),
            "usable": usable_tools(case, session, registry),
            "evidence": evidence,
            "reasoning": session.reasoning,
            "suggestion": {
                "tool": suggestion.tool,
                "depth": suggestion.depth,
                "rationale": suggestion.rationale,
            },
        })
    }

    /// Accept only tools the heuristic could also have picked.
    fn validate(
        &self,
        answer: ReasoningAnswer,
        case: &Case,
        session: &AgentSession,
        registry: &ToolRegistry,
    ) -> Result<Selection, String> {
        let tool: ToolKind = answer.tool.parse().map_err(|e| format!("{}", e))?;
        let rationale = answer
            .rationale
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "chosen by reasoning".to_string());

        if tool == ToolKind::Conclude {
            return Ok(Selection::conclude(rationale));
        }
        if !usable_tools(case, session, registry).contains(&tool) {
            return Err(format!("{} is not usable for this case", tool));
        }
        if session.success_count(tool) >= MAX_TOOL_RUNS {
            return Err(format!("{} already ran {} times", tool, MAX_TOOL_RUNS));
        }

        let default_depth = if session.represented_kinds().contains(&tool.evidence_kind()) {
            AnalysisDepth::Deep
        } else {
            AnalysisDepth::Standard
        };
        Ok(Selection::new(
            tool,
            answer.depth.unwrap_or(default_depth),
            rationale,
        ))
    }
}

#[async_trait]
impl ToolSelector for ReasoningSelector {
    fn call_cost(&self) -> u64 {
        self.call_cost_micros
    }

    async fn select(
        &self,
        case: &Case,
        session: &AgentSession,
        registry: &ToolRegistry,
    ) -> Selection {
        let suggestion = self.fallback.choose(case, session, registry);
        if !self.transport.is_configured(Capability::Reasoning) {
            return suggestion;
        }

        let body = self.request_body(case, session, registry, &suggestion);
        let outcome = match self.transport.call(Capability::Reasoning, body).await {
            Ok(value) => serde_json::from_value::<ReasoningAnswer>(value)
                .map_err(|e| format!("unreadable answer: {}", e))
                .and_then(|answer| self.validate(answer, case, session, registry)),
            Err(e) => Err(e.to_string()),
        };

        let selection = match outcome {
            Ok(selection) => {
                debug!(case_id = %case.id, tool = %selection.tool, "reasoning selected tool");
                selection
            }
            Err(reason) => {
                warn!(
                    case_id = %case.id,
                    reason = %reason,
                    "reasoning selection rejected, using heuristic"
                );
                Selection {
                    rationale: format!(
                        "{} (reasoning unavailable: {})",
                        suggestion.rationale, reason
                    ),
                    ..suggestion
                }
            }
        };
        // The call was made either way.
        Selection {
            cost_micros: self.call_cost_micros,
            ..selection
        }
    }
}
