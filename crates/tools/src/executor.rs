//! Tool Invocation
//!
//! Bounded invocation helpers shared by the fixed pipeline and the agent. A
//! tool call never outlives its own timeout; an elapsed timeout becomes a
//! `ToolError::Timeout` like any other failure.

use std::time::{Duration, Instant};

use tracing::{debug, warn};
use verdict_engine_core::{Evidence, InvestigationTool, ToolContext, ToolError, ToolKind};

/// Outcome of invoking one tool, possibly with retries.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: ToolKind,
    pub result: Result<Evidence, ToolError>,
    /// Every failure seen, in order, including the last one.
    pub failures: Vec<ToolError>,
    pub attempts: u32,
    pub latency: Duration,
}

impl ToolInvocation {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn evidence(&self) -> Option<&Evidence> {
        self.result.as_ref().ok()
    }
}

/// Invoke a tool once under its own timeout.
pub async fn invoke_with_timeout(
    tool: &dyn InvestigationTool,
    ctx: ToolContext<'_>,
) -> Result<Evidence, ToolError> {
    let limit = tool.timeout();
    match tokio::time::timeout(limit, tool.invoke(ctx)).await {
        Ok(result) => result,
        Err(_) => Err(ToolError::timeout(tool.kind(), limit)),
    }
}

/// Invoke a tool, retrying up to `retries` more times on failure.
pub async fn invoke_with_retry(
    tool: &dyn InvestigationTool,
    ctx: ToolContext<'_>,
    retries: u32,
) -> ToolInvocation {
    let started = Instant::now();
    let mut failures = Vec::new();
    let mut attempts = 0;

    loop {
        attempts += 1;
        match invoke_with_timeout(tool, ctx).await {
            Ok(evidence) => {
                debug!(
                    case_id = %ctx.case.id,
                    tool = %tool.kind(),
                    attempts,
                    confidence = evidence.confidence,
                    "tool succeeded"
                );
                return ToolInvocation {
                    tool: tool.kind(),
                    result: Ok(evidence),
                    failures,
                    attempts,
                    latency: started.elapsed(),
                };
            }
            Err(e) => {
                warn!(
                    case_id = %ctx.case.id,
                    tool = %tool.kind(),
                    attempt = attempts,
                    error = %e,
                    "tool failed"
                );
                failures.push(e.clone());
                if attempts > retries {
                    return ToolInvocation {
                        tool: tool.kind(),
                        result: Err(e),
                        failures,
                        attempts,
                        latency: started.elapsed(),
                    };
                }
            }
        }
    }
}
