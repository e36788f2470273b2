//! Builder Pattern for Investigation Limits
//!
//! Each builder follows the standard Rust builder pattern:
//! 1. Create with `::new()` or `::default()`
//! 2. Chain `.field(value)` calls
//! 3. Call `.build()` which validates and returns `CoreResult<Config>`
//!
//! Validation happens at build time, catching configuration errors
//! before they cause runtime failures.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::thresholds::{
    AGENT_STOP_THRESHOLD, DEFAULT_CASE_BUDGET_MICROS, DEFAULT_MAX_ITERATIONS,
    MIN_CONFIDENCE_GAIN, TIER_ESCALATION_THRESHOLD,
};

/// Upper bound accepted for `max_iterations`.
pub const MAX_ITERATIONS_CEILING: u32 = 100;

// ============================================================================
// AgentConfigBuilder
// ============================================================================

/// Validated agent loop limits (output of `AgentConfigBuilder`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentLimits {
    pub max_iterations: u32,
    pub budget_micros: u64,
    pub stop_threshold: f64,
    pub min_confidence_gain: f64,
}

impl Default for AgentLimits {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            budget_micros: DEFAULT_CASE_BUDGET_MICROS,
            stop_threshold: AGENT_STOP_THRESHOLD,
            min_confidence_gain: MIN_CONFIDENCE_GAIN,
        }
    }
}

/// Builder for agent limits with validation at build time.
///
/// # Example
/// ```ignore
/// let limits = AgentConfigBuilder::new()
///     .max_iterations(6)
///     .budget_micros(250_000)
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct AgentConfigBuilder {
    max_iterations: Option<u32>,
    budget_micros: Option<u64>,
    stop_threshold: Option<f64>,
    min_confidence_gain: Option<f64>,
}

impl AgentConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum iterations (must be > 0 and <= 100).
    pub fn max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Set the per-case budget in microdollars (must be > 0).
    pub fn budget_micros(mut self, micros: u64) -> Self {
        self.budget_micros = Some(micros);
        self
    }

    /// Set the stop threshold (must be in (0.0, 1.0]).
    pub fn stop_threshold(mut self, threshold: f64) -> Self {
        self.stop_threshold = Some(threshold);
        self
    }

    /// Set the minimum expected gain for a re-run (must be in [0.0, 1.0)).
    pub fn min_confidence_gain(mut self, gain: f64) -> Self {
        self.min_confidence_gain = Some(gain);
        self
    }

    /// Build and validate the limits.
    pub fn build(self) -> CoreResult<AgentLimits> {
        let defaults = AgentLimits::default();
        let max_iterations = self.max_iterations.unwrap_or(defaults.max_iterations);
        let budget_micros = self.budget_micros.unwrap_or(defaults.budget_micros);
        let stop_threshold = self.stop_threshold.unwrap_or(defaults.stop_threshold);
        let min_confidence_gain = self
            .min_confidence_gain
            .unwrap_or(defaults.min_confidence_gain);

        if max_iterations == 0 {
            return Err(CoreError::validation("max_iterations must be > 0"));
        }
        if max_iterations > MAX_ITERATIONS_CEILING {
            return Err(CoreError::validation(format!(
                "max_iterations must be <= {}",
                MAX_ITERATIONS_CEILING
            )));
        }
        if budget_micros == 0 {
            return Err(CoreError::validation("budget_micros must be > 0"));
        }
        if !(stop_threshold > 0.0 && stop_threshold <= 1.0) {
            return Err(CoreError::validation(
                "stop_threshold must be in (0.0, 1.0]",
            ));
        }
        if !(0.0..1.0).contains(&min_confidence_gain) {
            return Err(CoreError::validation(
                "min_confidence_gain must be in [0.0, 1.0)",
            ));
        }

        Ok(AgentLimits {
            max_iterations,
            budget_micros,
            stop_threshold,
            min_confidence_gain,
        })
    }
}

// ============================================================================
// PipelineConfigBuilder
// ============================================================================

/// Validated fixed pipeline limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineLimits {
    pub escalation_threshold: f64,
    pub budget_micros: u64,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            escalation_threshold: TIER_ESCALATION_THRESHOLD,
            budget_micros: DEFAULT_CASE_BUDGET_MICROS,
        }
    }
}

/// Builder for pipeline limits with validation at build time.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    escalation_threshold: Option<f64>,
    budget_micros: Option<u64>,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn escalation_threshold(mut self, threshold: f64) -> Self {
        self.escalation_threshold = Some(threshold);
        self
    }

    pub fn budget_micros(mut self, micros: u64) -> Self {
        self.budget_micros = Some(micros);
        self
    }

    pub fn build(self) -> CoreResult<PipelineLimits> {
        let defaults = PipelineLimits::default();
        let escalation_threshold = self
            .escalation_threshold
            .unwrap_or(defaults.escalation_threshold);
        let budget_micros = self.budget_micros.unwrap_or(defaults.budget_micros);

        if !(escalation_threshold > 0.0 && escalation_threshold <= 1.0) {
            return Err(CoreError::validation(
                "escalation_threshold must be in (0.0, 1.0]",
            ));
        }
        if budget_micros == 0 {
            return Err(CoreError::validation("budget_micros must be > 0"));
        }

        Ok(PipelineLimits {
            escalation_threshold,
            budget_micros,
        })
    }
}
