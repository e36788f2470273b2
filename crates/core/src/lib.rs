//! Verdict Engine Core
//!
//! Domain types and the tool contract for the Verdict Engine workspace. This
//! crate has zero dependencies on application-level code (HTTP clients,
//! database, runtime).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `case` - Reported cases and policy categories
//! - `evidence` - Evidence items and analysis depth
//! - `tool_trait` - Tool abstraction (`ToolDescriptor`, `ToolExecutable`, `InvestigationTool`)
//! - `session` - Investigation session state machine
//! - `verdict` - Verdict model and builder
//! - `confidence` - Evidence aggregation rules
//! - `thresholds` - Named decision thresholds
//! - `builders` - Validated limit builders
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/async-trait/thiserror/chrono** - keeps build times minimal
//! 2. **Trait-based abstractions** - enables mocking, testing, and alternative tool backends
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;
pub mod case;
pub mod evidence;
pub mod tool_trait;
pub mod session;
pub mod verdict;
pub mod confidence;
pub mod thresholds;
pub mod builders;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Domain Model ───────────────────────────────────────────────────────
pub use case::{Case, PolicyCategory};
pub use evidence::{AnalysisDepth, Evidence, EvidenceKind, EvidencePayload, PatternMatch};
pub use session::{AgentSession, SessionStatus, Strategy};
pub use verdict::{Decision, RecommendedAction, Verdict, VerdictBuilder, VerdictSummary};

// ── Tool Contract ──────────────────────────────────────────────────────
pub use tool_trait::{
    InvestigationTool, ToolContext, ToolDescriptor, ToolError, ToolExecutable, ToolKind,
    ToolRegistry, ToolResult,
};

// ── Aggregation & Limits ───────────────────────────────────────────────
pub use builders::{AgentConfigBuilder, AgentLimits, PipelineConfigBuilder, PipelineLimits};
pub use confidence::Assessment;
