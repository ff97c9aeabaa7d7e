//! Query terms found in the entry description.
//!
//! One Aho-Corasick automaton over the query terms scans each description
//! once (O(n+m)) instead of one `contains` per term.

use std::collections::HashSet;
use std::sync::Arc;

use aho_corasick::AhoCorasick;

use super::{QueryContext, StrategyHit};
use crate::registry::CapabilityEntry;

pub(super) fn score(ctx: &QueryContext, candidates: &[Arc<CapabilityEntry>]) -> Vec<StrategyHit> {
    if ctx.terms.is_empty() {
        return Vec::new();
    }
    let automaton = AhoCorasick::new(&ctx.terms).ok();
    #[allow(clippy::cast_precision_loss)]
    let term_count = ctx.terms.len() as f64;

    candidates
        .iter()
        .filter_map(|entry| {
            if entry.description.is_empty() {
                return None;
            }
            let description = entry.description.to_lowercase();
            let found = match &automaton {
                Some(ac) => ac
                    .find_overlapping_iter(&description)
                    .map(|m| m.pattern())
                    .collect::<HashSet<_>>()
                    .len(),
                None => ctx
                    .terms
                    .iter()
                    .filter(|t| description.contains(t.as_str()))
                    .count(),
            };
            if found == 0 {
                return None;
            }
            #[allow(clippy::cast_precision_loss)]
            let score = found as f64 / term_count;
            Some(StrategyHit::new(
                &entry.id,
                score,
                format!("description mentions {found} of {} query terms", ctx.terms.len()),
            ))
        })
        .collect()
}
