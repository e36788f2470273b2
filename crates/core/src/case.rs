//! Case Model
//!
//! A case is a reported potential policy violation. Cases are created by the
//! ingestion collaborator and are read-only to the engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

// ============================================================================
// PolicyCategory
// ============================================================================

/// Policy category a case was reported under.
///
/// Serialized in kebab-case (`"hate-speech"`). `FromStr` rejects unknown
/// strings with `CoreError::UnsupportedCategory`; submissions parse through
/// it so the caller sees that error before any cost is incurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyCategory {
    Plagiarism,
    Harassment,
    HateSpeech,
    Dmca,
    Nsfw,
    Spam,
}

impl PolicyCategory {
    /// Every category, in declaration order.
    pub const ALL: [PolicyCategory; 6] = [
        PolicyCategory::Plagiarism,
        PolicyCategory::Harassment,
        PolicyCategory::HateSpeech,
        PolicyCategory::Dmca,
        PolicyCategory::Nsfw,
        PolicyCategory::Spam,
    ];

    /// Wire name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyCategory::Plagiarism => "plagiarism",
            PolicyCategory::Harassment => "harassment",
            PolicyCategory::HateSpeech => "hate-speech",
            PolicyCategory::Dmca => "dmca",
            PolicyCategory::Nsfw => "nsfw",
            PolicyCategory::Spam => "spam",
        }
    }

    /// Whether the category is narrow enough for the fixed escalation pipeline.
    pub fn is_bounded(&self) -> bool {
        matches!(self, PolicyCategory::Plagiarism)
    }
}

impl fmt::Display for PolicyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        PolicyCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| CoreError::unsupported_category(s.trim()))
    }
}

// ============================================================================
// Case
// ============================================================================

/// A reported case awaiting a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: String,
    pub policy_category: PolicyCategory,
    pub target_url: String,
    pub complaint_text: String,
    /// Prior reports or moderator notes supplied by the ingestion side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Case {
    /// Create a case stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        policy_category: PolicyCategory,
        target_url: impl Into<String>,
        complaint_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            policy_category,
            target_url: target_url.into(),
            complaint_text: complaint_text.into(),
            context: None,
            created_at: Utc::now(),
        }
    }

    /// Attach historical context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Same submitted content, ignoring when it was stamped.
    pub fn same_submission(&self, other: &Case) -> bool {
        self.id == other.id
            && self.policy_category == other.policy_category
            && self.target_url == other.target_url
            && self.complaint_text == other.complaint_text
            && self.context == other.context
    }

    /// Check the fields the engine relies on.
    pub fn validate(&self) -> CoreResult<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::validation("case id cannot be empty"));
        }
        let url = self.target_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CoreError::validation(format!(
                "target_url must be an http(s) URL. Got: '{}'",
                self.target_url
            )));
        }
        Ok(())
    }
}
