//! Queue Envelope
//!
//! Asynchronous trigger for one investigation.

use serde::{Deserialize, Serialize};
use verdict_engine_core::thresholds::PIPELINE_TIERS;
use verdict_engine_core::{Case, CoreResult, PolicyCategory};

/// `{caseId, tier?}`. A `tier` forces fixed-pipeline entry at that tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestigationRequest {
    pub case_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<u8>,
}

impl InvestigationRequest {
    pub fn new(case_id: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            tier: None,
        }
    }

    pub fn at_tier(case_id: impl Into<String>, tier: u8) -> Self {
        Self {
            case_id: case_id.into(),
            tier: Some(tier),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.case_id.trim().is_empty() {
            return Err("caseId cannot be empty".to_string());
        }
        if let Some(tier) = self.tier {
            if tier == 0 || tier > PIPELINE_TIERS {
                return Err(format!(
                    "tier must be between 1 and {}. Got: {}",
                    PIPELINE_TIERS, tier
                ));
            }
        }
        Ok(())
    }
}

/// Body of `POST /v1/cases/{id}/investigate`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvestigateBody {
    #[serde(default)]
    pub tier: Option<u8>,
}

/// Body of `POST /v1/cases`. A missing id gets a fresh UUID.
///
/// The category stays a string until `into_case` so an unknown one is
/// reported as unsupported rather than as a malformed body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSubmission {
    #[serde(default)]
    pub id: Option<String>,
    pub policy_category: String,
    pub target_url: String,
    pub complaint_text: String,
    #[serde(default)]
    pub context: Option<String>,
}

impl CaseSubmission {
    pub fn into_case(self) -> CoreResult<Case> {
        let category: PolicyCategory = self.policy_category.parse()?;
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let case = Case::new(id, category, self.target_url, self.complaint_text);
        Ok(match self.context {
            Some(context) => case.with_context(context),
            None => case,
        })
    }
}
