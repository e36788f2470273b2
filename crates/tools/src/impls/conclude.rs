//! Conclude Tool
//!
//! Pseudo-tool the agent selects to stop. It calls nothing and records a
//! conclusion item summarizing what was gathered. Its evidence carries no
//! weight in aggregation.

use std::time::Duration;

use async_trait::async_trait;
use verdict_engine_core::{
    AnalysisDepth, Evidence, EvidencePayload, ToolContext, ToolDescriptor, ToolExecutable,
    ToolKind, ToolResult,
};

#[derive(Debug, Default)]
pub struct ConcludeTool;

impl ConcludeTool {
    pub fn new() -> Self {
        Self
    }
}

impl ToolDescriptor for ConcludeTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Conclude
    }

    fn estimated_cost(&self, _depth: AnalysisDepth) -> u64 {
        0
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    fn description(&self) -> &str {
        "Stop investigating and issue a verdict from the evidence gathered"
    }
}

#[async_trait]
impl ToolExecutable for ConcludeTool {
    async fn invoke(&self, ctx: ToolContext<'_>) -> ToolResult {
        let gathered: Vec<String> = ctx
            .prior_evidence
            .iter()
            .filter(|e| e.tool != ToolKind::Conclude)
            .map(|e| format!("{} ({:.2})", e.tool, e.confidence))
            .collect();
        let rationale = if gathered.is_empty() {
            "concluded without evidence".to_string()
        } else {
            format!("concluded on {}", gathered.join(", "))
        };

        Ok(Evidence::new(
            self.kind(),
            EvidencePayload::Conclusion {
                rationale: rationale.clone(),
            },
            0.0,
            0.0,
            rationale,
        )
        .with_depth(ctx.depth))
    }
}
