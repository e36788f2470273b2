//! Cost Accountant
//!
//! Tracks spend, latency and call counts per case against a budget.
//! Amounts are microdollars (1 USD = 1,000,000 microdollars).

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use verdict_engine_core::thresholds::micros_to_usd;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CostError {
    /// The charge was rejected and nothing was recorded.
    #[error("Budget exceeded for case {case_id}: requested {requested} micros, {remaining} remaining")]
    BudgetExceeded {
        case_id: String,
        requested: u64,
        remaining: u64,
    },

    #[error("No open ledger for case {0}")]
    UnknownCase(String),

    #[error("Cost ledger lock poisoned")]
    Poisoned,
}

/// Running totals for one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseUsage {
    pub budget_micros: u64,
    pub spent_micros: u64,
    pub calls: u32,
    pub total_latency_ms: u64,
}

impl CaseUsage {
    pub fn remaining_micros(&self) -> u64 {
        self.budget_micros.saturating_sub(self.spent_micros)
    }

    pub fn spent_usd(&self) -> f64 {
        micros_to_usd(self.spent_micros)
    }
}

#[derive(Debug, Default)]
pub struct CostAccountant {
    ledgers: RwLock<HashMap<String, CaseUsage>>,
}

impl CostAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a ledger for a case that already spent `spent_micros`.
    pub fn restore(
        &self,
        case_id: &str,
        budget_micros: u64,
        spent_micros: u64,
    ) -> Result<(), CostError> {
        let mut ledgers = self.ledgers.write().map_err(|_| CostError::Poisoned)?;
        ledgers.insert(
            case_id.to_string(),
            CaseUsage {
                budget_micros,
                spent_micros,
                calls: 0,
                total_latency_ms: 0,
            },
        );
        Ok(())
    }

    /// Charge a case. Returns the remaining budget.
    pub fn charge(&self, case_id: &str, amount: u64) -> Result<u64, CostError> {
        let mut ledgers = self.ledgers.write().map_err(|_| CostError::Poisoned)?;
        let usage = ledgers
            .get_mut(case_id)
            .ok_or_else(|| CostError::UnknownCase(case_id.to_string()))?;

        let remaining = usage.remaining_micros();
        if amount > remaining {
            return Err(CostError::BudgetExceeded {
                case_id: case_id.to_string(),
                requested: amount,
                remaining,
            });
        }
        usage.spent_micros += amount;
        Ok(usage.remaining_micros())
    }

    /// Count one external call, successful or not.
    pub fn record_call(&self, case_id: &str, latency: Duration) -> Result<(), CostError> {
        let mut ledgers = self.ledgers.write().map_err(|_| CostError::Poisoned)?;
        let usage = ledgers
            .get_mut(case_id)
            .ok_or_else(|| CostError::UnknownCase(case_id.to_string()))?;
        usage.calls = usage.calls.saturating_add(1);
        usage.total_latency_ms = usage
            .total_latency_ms
            .saturating_add(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX));
        Ok(())
    }

    /// Remaining budget; zero for an unknown case.
    pub fn remaining(&self, case_id: &str) -> u64 {
        self.usage(case_id)
            .map(|u| u.remaining_micros())
            .unwrap_or(0)
    }

    pub fn can_afford(&self, case_id: &str, amount: u64) -> bool {
        amount <= self.remaining(case_id)
    }

    fn usage(&self, case_id: &str) -> Option<CaseUsage> {
        self.ledgers.read().ok()?.get(case_id).copied()
    }

    /// Drop a case's ledger, returning its final totals.
    pub fn close(&self, case_id: &str) -> Option<CaseUsage> {
        self.ledgers.write().ok()?.remove(case_id)
    }
}
