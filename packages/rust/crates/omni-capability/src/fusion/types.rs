//! Shared types for fusion.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::registry::CapabilityEntry;

/// A capability with its fused score and explanation.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    /// The scored entry (shared with the registry snapshot)
    pub entry: Arc<CapabilityEntry>,
    /// Signal name to score, only for signals that fired
    pub component_scores: BTreeMap<String, f64>,
    /// Fused score; linear and RRF scores are not comparable
    pub final_score: f64,
    /// One line per contributing signal
    pub rationale: Vec<String>,
    /// Query equals the entry name; ranks ahead of every other candidate
    pub exact_match: bool,
}

impl ScoredCandidate {
    /// Candidate id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.entry.id
    }
}

/// Sort exact-name matches first, then by `final_score` descending, then id
/// ascending.
pub fn sort_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.exact_match
            .cmp(&a.exact_match)
            .then_with(|| b.final_score.total_cmp(&a.final_score))
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    });
}
