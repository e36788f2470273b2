//! Tool Pricing & Timeouts
//!
//! Per-tool base cost and timeout, loaded from the engine config. Depth scales
//! the base cost: a screen pass is a quarter of the base price, a deep pass
//! four times it.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use verdict_engine_core::{AnalysisDepth, CoreError, CoreResult, ToolKind};

/// Allowed tool timeout range, in seconds.
pub const MIN_TOOL_TIMEOUT_SECS: u64 = 5;
pub const MAX_TOOL_TIMEOUT_SECS: u64 = 30;

/// Cost and timeout for one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Base cost of a `Standard` invocation, in microdollars.
    pub cost_micros: u64,
    pub timeout_secs: u64,
}

impl ToolSettings {
    pub fn new(cost_micros: u64, timeout_secs: u64) -> Self {
        Self {
            cost_micros,
            timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Cost at a given depth.
    pub fn cost_at(&self, depth: AnalysisDepth) -> u64 {
        let percent: u64 = match depth {
            AnalysisDepth::Screen => 25,
            AnalysisDepth::Targeted | AnalysisDepth::Standard => 100,
            AnalysisDepth::Deep => 400,
        };
        self.cost_micros.saturating_mul(percent) / 100
    }

    /// Built-in defaults per tool.
    pub fn default_for(kind: ToolKind) -> Self {
        match kind {
            ToolKind::SnapshotCapture => Self::new(2_000, 20),
            ToolKind::SourceFetch => Self::new(1_000, 10),
            ToolKind::CodePatternExtract => Self::new(10_000, 30),
            ToolKind::TextPolicyAnalyze => Self::new(8_000, 15),
            ToolKind::VisualSimilarityCompare => Self::new(20_000, 30),
            ToolKind::Conclude => Self::new(0, 5),
        }
    }
}

/// Settings for every tool, keyed by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolCatalogSettings {
    tools: BTreeMap<ToolKind, ToolSettings>,
}

impl Default for ToolCatalogSettings {
    fn default() -> Self {
        Self {
            tools: ToolKind::ALL
                .into_iter()
                .map(|kind| (kind, ToolSettings::default_for(kind)))
                .collect(),
        }
    }
}

impl ToolCatalogSettings {
    /// Settings for a tool, falling back to the built-in default.
    pub fn get(&self, kind: ToolKind) -> ToolSettings {
        self.tools
            .get(&kind)
            .copied()
            .unwrap_or_else(|| ToolSettings::default_for(kind))
    }

    pub fn set(&mut self, kind: ToolKind, settings: ToolSettings) {
        self.tools.insert(kind, settings);
    }

    pub fn validate(&self) -> CoreResult<()> {
        for (kind, settings) in &self.tools {
            if !(MIN_TOOL_TIMEOUT_SECS..=MAX_TOOL_TIMEOUT_SECS).contains(&settings.timeout_secs) {
                return Err(CoreError::validation(format!(
                    "{} timeout must be between {} and {} seconds. Got: {}",
                    kind, MIN_TOOL_TIMEOUT_SECS, MAX_TOOL_TIMEOUT_SECS, settings.timeout_secs
                )));
            }
        }
        Ok(())
    }
}
