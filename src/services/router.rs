//! Tier Router
//!
//! Dispatches a case to an investigation strategy by policy category.
//! Bounded categories (plagiarism) run the fixed tier pipeline; open-ended
//! ones run the agent loop.

use std::collections::BTreeSet;

use verdict_engine_core::{Case, CoreError, CoreResult, PolicyCategory, Strategy};

/// Investigation path for a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    FixedPipeline,
    Agent,
}

impl Route {
    pub fn strategy(&self) -> Strategy {
        match self {
            Route::FixedPipeline => Strategy::FixedPipeline,
            Route::Agent => Strategy::Agent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TierRouter {
    enabled: BTreeSet<PolicyCategory>,
}

impl Default for TierRouter {
    fn default() -> Self {
        Self::new(PolicyCategory::ALL.iter().copied())
    }
}

impl TierRouter {
    pub fn new(enabled: impl IntoIterator<Item = PolicyCategory>) -> Self {
        Self {
            enabled: enabled.into_iter().collect(),
        }
    }

    pub fn is_enabled(&self, category: PolicyCategory) -> bool {
        self.enabled.contains(&category)
    }

    /// Pure dispatch; a disabled category is treated as unrecognized.
    pub fn route(&self, case: &Case) -> CoreResult<Route> {
        let category = case.policy_category;
        if !self.is_enabled(category) {
            return Err(CoreError::unsupported_category(category.as_str()));
        }
        Ok(if category.is_bounded() {
            Route::FixedPipeline
        } else {
            Route::Agent
        })
    }
}
