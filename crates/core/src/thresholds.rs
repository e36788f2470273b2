//! Decision Thresholds
//!
//! Every tunable number that shapes a stop/continue or severity decision
//! lives here.
//!
//! - `TIER_ESCALATION_THRESHOLD` (0.75): a pipeline tier at or above this
//!   confidence ends the pipeline. Plagiarism classifiers are well calibrated,
//!   so the bar is higher than the agent's.
//! - `AGENT_STOP_THRESHOLD` (0.7): aggregated agent confidence at or above this
//!   ends the loop. Reaching it exactly is enough; unexplored tools are not
//!   required.
//! - `DEFAULT_MAX_ITERATIONS` (10): agent loop bound.
//! - `MAX_TOOL_FAILURES` (2): a tool that failed this many times in one
//!   session is no longer selected.
//! - `MAX_TOOL_RUNS` (2): successful runs per tool; the second is a `Deep`
//!   re-run.
//! - `MIN_CONFIDENCE_GAIN` (0.05): below this expected gain the agent
//!   concludes instead of re-running a tool.
//! - `MAJOR_SEVERITY` / `MINOR_SEVERITY` (0.7 / 0.4): severity cut points for
//!   the `major` / `minor` decisions.
//! - `DEFAULT_CASE_BUDGET_MICROS` ($0.50): per-case spend ceiling.

/// Pipeline tier confidence that stops escalation (tiers 1 and 2).
pub const TIER_ESCALATION_THRESHOLD: f64 = 0.75;

/// Aggregated confidence that stops the agent loop.
pub const AGENT_STOP_THRESHOLD: f64 = 0.7;

/// Default agent iteration bound.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Failures after which a tool is excluded for the rest of the session.
pub const MAX_TOOL_FAILURES: usize = 2;

/// Successful runs allowed per tool.
pub const MAX_TOOL_RUNS: usize = 2;

/// Minimum expected confidence gain worth paying for.
pub const MIN_CONFIDENCE_GAIN: f64 = 0.05;

/// Severity at or above which the decision is `major`.
pub const MAJOR_SEVERITY: f64 = 0.7;

/// Severity at or above which the decision is `minor`.
pub const MINOR_SEVERITY: f64 = 0.4;

/// Number of fixed pipeline tiers.
pub const PIPELINE_TIERS: u8 = 3;

/// Default per-case budget in microdollars.
pub const DEFAULT_CASE_BUDGET_MICROS: u64 = 500_000;

/// Default charge for one reasoning-capability call, in microdollars.
pub const DEFAULT_REASONING_CALL_COST_MICROS: u64 = 3_000;

/// Microdollars per US dollar.
pub const MICROS_PER_USD: u64 = 1_000_000;

/// Convert microdollars to dollars for display.
pub fn micros_to_usd(micros: u64) -> f64 {
    micros as f64 / MICROS_PER_USD as f64
}

/// Convert dollars to microdollars, rounding to the nearest micro.
pub fn usd_to_micros(usd: f64) -> u64 {
    if usd.is_nan() || usd <= 0.0 {
        return 0;
    }
    (usd * MICROS_PER_USD as f64).round() as u64
}
