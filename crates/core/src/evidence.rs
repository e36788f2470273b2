//! Evidence Model
//!
//! One `Evidence` item is produced per successful tool invocation. Items are
//! append-only within a session: they are never mutated or removed once
//! recorded.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool_trait::ToolKind;

// ============================================================================
// EvidenceKind
// ============================================================================

/// Evidence type tag used by the agent's selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Snapshot,
    Source,
    CodePatterns,
    TextFindings,
    VisualSimilarity,
    Conclusion,
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EvidenceKind::Snapshot => "snapshot",
            EvidenceKind::Source => "source",
            EvidenceKind::CodePatterns => "code_patterns",
            EvidenceKind::TextFindings => "text_findings",
            EvidenceKind::VisualSimilarity => "visual_similarity",
            EvidenceKind::Conclusion => "conclusion",
        };
        f.write_str(s)
    }
}

// ============================================================================
// AnalysisDepth
// ============================================================================

/// How much effort a tool spends on one invocation.
///
/// Price and accuracy both grow with depth. The fixed pipeline binds one
/// depth to each tier; the agent uses `Standard` and re-runs at `Deep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisDepth {
    Screen,
    Targeted,
    Standard,
    Deep,
}

impl Default for AnalysisDepth {
    fn default() -> Self {
        AnalysisDepth::Standard
    }
}

impl fmt::Display for AnalysisDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisDepth::Screen => "screen",
            AnalysisDepth::Targeted => "targeted",
            AnalysisDepth::Standard => "standard",
            AnalysisDepth::Deep => "deep",
        };
        f.write_str(s)
    }
}

// ============================================================================
// EvidencePayload
// ============================================================================

/// A code pattern that matched known reference material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: String,
    pub similarity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Structured payload of one evidence item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvidencePayload {
    Snapshot {
        screenshot_ref: String,
        http_status: u16,
        #[serde(default)]
        text_excerpt: String,
    },
    Source {
        content_type: String,
        bytes: u64,
        #[serde(default)]
        excerpt: String,
    },
    CodePatterns {
        patterns: Vec<String>,
        matches: Vec<PatternMatch>,
    },
    TextFindings {
        violation_score: f64,
        findings: Vec<String>,
        #[serde(default)]
        labels: Vec<String>,
    },
    VisualSimilarity {
        similarity: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
        #[serde(default)]
        matched_regions: u32,
        /// Present when the comparison also ran code-pattern analysis.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code_similarity: Option<f64>,
    },
    Conclusion {
        rationale: String,
    },
}

impl EvidencePayload {
    /// The evidence type tag for this payload.
    pub fn kind(&self) -> EvidenceKind {
        match self {
            EvidencePayload::Snapshot { .. } => EvidenceKind::Snapshot,
            EvidencePayload::Source { .. } => EvidenceKind::Source,
            EvidencePayload::CodePatterns { .. } => EvidenceKind::CodePatterns,
            EvidencePayload::TextFindings { .. } => EvidenceKind::TextFindings,
            EvidencePayload::VisualSimilarity { .. } => EvidenceKind::VisualSimilarity,
            EvidencePayload::Conclusion { .. } => EvidenceKind::Conclusion,
        }
    }
}

// ============================================================================
// Evidence
// ============================================================================

/// A structured, immutable record of one piece of gathered information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub tool: ToolKind,
    pub payload: EvidencePayload,
    /// How certain the tool is about its own finding (0.0-1.0).
    pub confidence: f64,
    /// Strength of the violation signal (0.0 = none, 1.0 = flagrant).
    pub severity: f64,
    /// One-line human-readable summary for the verdict's evidence list.
    pub summary: String,
    pub depth: AnalysisDepth,
    pub cost_micros: u64,
    pub collected_at: DateTime<Utc>,
}

impl Evidence {
    /// Create an evidence item. Confidence and severity are clamped to 0..=1
    /// and NaN becomes 0.
    pub fn new(
        tool: ToolKind,
        payload: EvidencePayload,
        confidence: f64,
        severity: f64,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            tool,
            payload,
            confidence: clamp_unit(confidence),
            severity: clamp_unit(severity),
            summary: summary.into(),
            depth: AnalysisDepth::default(),
            cost_micros: 0,
            collected_at: Utc::now(),
        }
    }

    pub fn with_depth(mut self, depth: AnalysisDepth) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_cost(mut self, cost_micros: u64) -> Self {
        self.cost_micros = cost_micros;
        self
    }

    pub fn kind(&self) -> EvidenceKind {
        self.payload.kind()
    }
}

/// Clamp a score into the unit interval.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Confidence implied by a raw score's distance from the 0.5 decision boundary.
///
/// A similarity of 0.95 or 0.05 is a clear call (0.9); 0.5 carries no
/// information (0.0).
pub fn boundary_confidence(score: f64) -> f64 {
    clamp_unit((2.0 * clamp_unit(score) - 1.0).abs())
}
