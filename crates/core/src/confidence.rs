//! Confidence Aggregation
//!
//! Deterministic rules that turn accumulated evidence into one confidence and
//! one severity.
//!
//! Agent rule: for each evidence kind take the best confidence seen, scale it
//! by the category's relevance weight for that kind, and combine kinds with a
//! noisy-OR, `1 - Π(1 - w·c)`. Adding evidence can only raise the result.
//! Severity is the mean of item severities weighted by `w·c`.
//!
//! Pipeline rule: the maximum confidence over the tiers run. Decision and
//! severity come from the item holding that maximum (latest on ties).

use std::collections::BTreeMap;

use crate::case::PolicyCategory;
use crate::evidence::{clamp_unit, Evidence, EvidenceKind};
use crate::verdict::Decision;

/// Aggregated view of a session's evidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub confidence: f64,
    pub severity: f64,
    pub decision: Decision,
}

impl Assessment {
    pub fn empty() -> Self {
        Self {
            confidence: 0.0,
            severity: 0.0,
            decision: Decision::None,
        }
    }

    fn from_scores(confidence: f64, severity: f64) -> Self {
        let severity = clamp_unit(severity);
        Self {
            confidence: clamp_unit(confidence),
            severity,
            decision: Decision::from_severity(severity),
        }
    }
}

/// How much an evidence kind says about a category (0.0-1.0).
pub fn relevance(category: PolicyCategory, kind: EvidenceKind) -> f64 {
    use EvidenceKind::*;

    if kind == Conclusion {
        return 0.0;
    }
    match category {
        PolicyCategory::Plagiarism => match kind {
            VisualSimilarity => 1.0,
            CodePatterns => 0.9,
            Source => 0.5,
            Snapshot | TextFindings => 0.3,
            Conclusion => 0.0,
        },
        PolicyCategory::Harassment | PolicyCategory::HateSpeech => match kind {
            TextFindings => 1.0,
            Snapshot => 0.6,
            Source => 0.3,
            VisualSimilarity => 0.2,
            CodePatterns | Conclusion => 0.0,
        },
        PolicyCategory::Spam => match kind {
            TextFindings | Source => 0.8,
            Snapshot => 0.6,
            VisualSimilarity | CodePatterns => 0.2,
            Conclusion => 0.0,
        },
        PolicyCategory::Dmca => match kind {
            VisualSimilarity | CodePatterns => 0.9,
            Source => 0.7,
            TextFindings => 0.5,
            Snapshot => 0.4,
            Conclusion => 0.0,
        },
        PolicyCategory::Nsfw => match kind {
            VisualSimilarity => 1.0,
            Snapshot => 0.9,
            TextFindings => 0.5,
            Source => 0.3,
            CodePatterns | Conclusion => 0.0,
        },
    }
}

/// Best confidence per evidence kind.
fn best_by_kind(evidence: &[Evidence]) -> BTreeMap<EvidenceKind, f64> {
    let mut best = BTreeMap::new();
    for item in evidence {
        let entry = best.entry(item.kind()).or_insert(0.0_f64);
        if item.confidence > *entry {
            *entry = item.confidence;
        }
    }
    best
}

/// Agent aggregation (weighted noisy-OR).
pub fn agent_assessment(category: PolicyCategory, evidence: &[Evidence]) -> Assessment {
    if evidence.is_empty() {
        return Assessment::empty();
    }

    let miss: f64 = best_by_kind(evidence)
        .into_iter()
        .map(|(kind, c)| 1.0 - relevance(category, kind) * c)
        .product();

    let (weighted, total) = evidence.iter().fold((0.0, 0.0), |(sum, total), item| {
        let w = relevance(category, item.kind()) * item.confidence;
        (sum + w * item.severity, total + w)
    });
    let severity = if total > 0.0 { weighted / total } else { 0.0 };

    Assessment::from_scores(1.0 - miss, severity)
}

/// Pipeline aggregation (maximum tier confidence, latest on ties).
pub fn pipeline_assessment(evidence: &[Evidence]) -> Assessment {
    let strongest = evidence
        .iter()
        .filter(|e| e.kind() != EvidenceKind::Conclusion)
        .fold(None::<&Evidence>, |best, item| match best {
            Some(b) if b.confidence > item.confidence => Some(b),
            _ => Some(item),
        });

    match strongest {
        Some(item) => Assessment::from_scores(item.confidence, item.severity),
        None => Assessment::empty(),
    }
}

/// Expected confidence gain from one more run of a kind.
pub fn expected_gain(category: PolicyCategory, kind: EvidenceKind, best: Option<f64>) -> f64 {
    relevance(category, kind) * (1.0 - best.unwrap_or(0.0))
}
