//! Result shaping: diversity cap per category, then truncation.

use std::collections::HashMap;

use crate::fusion::{ScoredCandidate, sort_candidates};

/// Default maximum results per category under the diversity constraint.
pub const DEFAULT_CATEGORY_CAP: usize = 5;

/// Greedily keep candidates while their category has fewer than `cap` admitted.
///
/// Input is sorted best first (score desc, id asc) before filtering; relative
/// order of admitted candidates is preserved. A `cap` of 0 is treated as 1.
#[must_use]
pub fn apply_diversity(mut candidates: Vec<ScoredCandidate>, cap: usize) -> Vec<ScoredCandidate> {
    let cap = cap.max(1);
    sort_candidates(&mut candidates);

    let mut per_category: HashMap<String, usize> = HashMap::new();
    candidates.retain(|candidate| {
        let count = per_category
            .entry(candidate.entry.category.clone())
            .or_default();
        if *count < cap {
            *count += 1;
            true
        } else {
            false
        }
    });
    candidates
}

/// Apply the optional diversity cap, then truncate to `limit`.
#[must_use]
pub fn shape(
    candidates: Vec<ScoredCandidate>,
    diversity_cap: Option<usize>,
    limit: usize,
) -> Vec<ScoredCandidate> {
    let mut shaped = match diversity_cap {
        Some(cap) => apply_diversity(candidates, cap),
        None => {
            let mut candidates = candidates;
            sort_candidates(&mut candidates);
            candidates
        }
    };
    shaped.truncate(limit);
    shaped
}
