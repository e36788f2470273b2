//! Investigation Tool Trait
//!
//! Defines the tool abstraction with split definition/execution traits:
//!
//! - `ToolKind` - Closed set of tools the engine knows about
//! - `ToolDescriptor` - Identity, evidence tag, cost and timeout
//! - `ToolExecutable` - Invocation capability
//! - `InvestigationTool` - Combined trait (auto-implemented via blanket impl)
//! - `ToolRegistry` - O(1) lookup by kind, category-scoped listing
//!
//! Tools are looked up by `ToolKind` rather than by free-form name, so the
//! per-category tool sets are checked for exhaustiveness at compile time.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::case::{Case, PolicyCategory};
use crate::error::{CoreError, CoreResult};
use crate::evidence::{AnalysisDepth, Evidence, EvidenceKind};

// ============================================================================
// ToolKind
// ============================================================================

/// The fixed tool set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    SnapshotCapture,
    SourceFetch,
    CodePatternExtract,
    TextPolicyAnalyze,
    VisualSimilarityCompare,
    Conclude,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::SnapshotCapture,
        ToolKind::SourceFetch,
        ToolKind::CodePatternExtract,
        ToolKind::TextPolicyAnalyze,
        ToolKind::VisualSimilarityCompare,
        ToolKind::Conclude,
    ];

    /// Wire name of the tool (e.g. `"snapshot-capture"`).
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::SnapshotCapture => "snapshot-capture",
            ToolKind::SourceFetch => "source-fetch",
            ToolKind::CodePatternExtract => "code-pattern-extract",
            ToolKind::TextPolicyAnalyze => "text-policy-analyze",
            ToolKind::VisualSimilarityCompare => "visual-similarity-compare",
            ToolKind::Conclude => "conclude",
        }
    }

    /// The evidence type this tool produces.
    pub fn evidence_kind(&self) -> EvidenceKind {
        match self {
            ToolKind::SnapshotCapture => EvidenceKind::Snapshot,
            ToolKind::SourceFetch => EvidenceKind::Source,
            ToolKind::CodePatternExtract => EvidenceKind::CodePatterns,
            ToolKind::TextPolicyAnalyze => EvidenceKind::TextFindings,
            ToolKind::VisualSimilarityCompare => EvidenceKind::VisualSimilarity,
            ToolKind::Conclude => EvidenceKind::Conclusion,
        }
    }

    /// Tools available to a policy category, in preference order.
    ///
    /// `Conclude` is always last and always present.
    pub fn for_category(category: PolicyCategory) -> &'static [ToolKind] {
        match category {
            PolicyCategory::Plagiarism => &[
                ToolKind::VisualSimilarityCompare,
                ToolKind::CodePatternExtract,
                ToolKind::SourceFetch,
                ToolKind::SnapshotCapture,
                ToolKind::Conclude,
            ],
            PolicyCategory::Harassment | PolicyCategory::HateSpeech => &[
                ToolKind::TextPolicyAnalyze,
                ToolKind::SnapshotCapture,
                ToolKind::Conclude,
            ],
            PolicyCategory::Dmca => &[
                ToolKind::SourceFetch,
                ToolKind::VisualSimilarityCompare,
                ToolKind::CodePatternExtract,
                ToolKind::TextPolicyAnalyze,
                ToolKind::SnapshotCapture,
                ToolKind::Conclude,
            ],
            PolicyCategory::Nsfw => &[
                ToolKind::SnapshotCapture,
                ToolKind::VisualSimilarityCompare,
                ToolKind::TextPolicyAnalyze,
                ToolKind::Conclude,
            ],
            PolicyCategory::Spam => &[
                ToolKind::TextPolicyAnalyze,
                ToolKind::SourceFetch,
                ToolKind::SnapshotCapture,
                ToolKind::Conclude,
            ],
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let trimmed = s.trim();
        ToolKind::ALL
            .into_iter()
            .find(|k| k.name() == trimmed)
            .ok_or_else(|| CoreError::not_found(format!("Tool not found: {}", trimmed)))
    }
}

// ============================================================================
// ToolError
// ============================================================================

/// Recoverable failure of a single tool invocation.
///
/// Never aborts a case: the loop records it in the reasoning trail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("{tool} timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Service error (HTTP {status}): {message}")]
    Service { status: u16, message: String },

    #[error("Tool unavailable: {0}")]
    Unavailable(String),
}

impl ToolError {
    pub fn timeout(tool: ToolKind, after: Duration) -> Self {
        Self::Timeout {
            tool: tool.name().to_string(),
            timeout_ms: after.as_millis() as u64,
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}

pub type ToolResult = Result<Evidence, ToolError>;

// ============================================================================
// ToolContext
// ============================================================================

/// Read-only input handed to a tool.
///
/// Borrows the case and the evidence gathered so far; tools cannot mutate
/// either and may only return new evidence.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    pub case: &'a Case,
    pub prior_evidence: &'a [Evidence],
    pub depth: AnalysisDepth,
}

impl<'a> ToolContext<'a> {
    pub fn new(case: &'a Case, prior_evidence: &'a [Evidence]) -> Self {
        Self {
            case,
            prior_evidence,
            depth: AnalysisDepth::default(),
        }
    }

    pub fn with_depth(mut self, depth: AnalysisDepth) -> Self {
        self.depth = depth;
        self
    }

    /// Most recent prior evidence of a kind.
    pub fn latest(&self, kind: EvidenceKind) -> Option<&'a Evidence> {
        self.prior_evidence.iter().rev().find(|e| e.kind() == kind)
    }
}

// ============================================================================
// Trait Definitions
// ============================================================================

/// Tool identity and cost metadata, available without invoking anything.
pub trait ToolDescriptor: Send + Sync {
    fn kind(&self) -> ToolKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn evidence_kind(&self) -> EvidenceKind {
        self.kind().evidence_kind()
    }

    /// Cost of one invocation at the given depth, in microdollars.
    fn estimated_cost(&self, depth: AnalysisDepth) -> u64;

    /// Upper bound on a single invocation.
    fn timeout(&self) -> Duration {
        Duration::from_secs(15)
    }

    fn description(&self) -> &str {
        ""
    }
}

/// Tool invocation capability.
#[async_trait]
pub trait ToolExecutable: Send + Sync {
    async fn invoke(&self, ctx: ToolContext<'_>) -> ToolResult;
}

/// Combined trait for tools that provide both descriptor and execution.
pub trait InvestigationTool: ToolDescriptor + ToolExecutable {}

impl<T: ToolDescriptor + ToolExecutable> InvestigationTool for T {}

// ============================================================================
// ToolRegistry
// ============================================================================

/// Registry of tool implementations keyed by `ToolKind`.
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Arc<dyn InvestigationTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool of the same kind.
    pub fn register(&mut self, tool: Arc<dyn InvestigationTool>) {
        self.tools.insert(tool.kind(), tool);
    }

    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn InvestigationTool>> {
        self.tools.get(&kind).cloned()
    }

    /// Look up a tool or fail with `NotFound`.
    pub fn require(&self, kind: ToolKind) -> CoreResult<Arc<dyn InvestigationTool>> {
        self.get(kind)
            .ok_or_else(|| CoreError::not_found(format!("Tool not registered: {}", kind)))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tools for a category, in the category's preference order.
    pub fn tools_for(&self, category: PolicyCategory) -> Vec<Arc<dyn InvestigationTool>> {
        ToolKind::for_category(category)
            .iter()
            .filter_map(|kind| self.tools.get(kind).cloned())
            .collect()
    }

    /// Kinds a category expects but nobody registered.
    pub fn missing_for(&self, category: PolicyCategory) -> Vec<ToolKind> {
        ToolKind::for_category(category)
            .iter()
            .copied()
            .filter(|kind| !self.tools.contains_key(kind))
            .collect()
    }

    /// Tool catalog for a category as JSON, for reasoning prompts.
    pub fn catalog(&self, category: PolicyCategory) -> Vec<Value> {
        self.tools_for(category)
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "evidence_kind": tool.evidence_kind(),
                    "estimated_cost_micros": tool.estimated_cost(AnalysisDepth::Standard),
                    "timeout_ms": tool.timeout().as_millis() as u64,
                })
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
