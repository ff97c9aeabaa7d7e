//! Query terms against entry keywords.

use std::sync::Arc;

use super::{QueryContext, StrategyHit};
use crate::registry::CapabilityEntry;

pub(super) fn score(ctx: &QueryContext, candidates: &[Arc<CapabilityEntry>]) -> Vec<StrategyHit> {
    if ctx.terms.is_empty() {
        return Vec::new();
    }
    #[allow(clippy::cast_precision_loss)]
    let term_count = ctx.terms.len() as f64;

    candidates
        .iter()
        .filter_map(|entry| {
            let matched: Vec<&str> = entry
                .keywords
                .iter()
                .filter(|kw| {
                    let kw = kw.trim().to_lowercase();
                    !kw.is_empty()
                        && ctx
                            .terms
                            .iter()
                            .any(|term| kw.contains(term.as_str()) || term.contains(kw.as_str()))
                })
                .map(String::as_str)
                .collect();
            if matched.is_empty() {
                return None;
            }
            #[allow(clippy::cast_precision_loss)]
            let score = (matched.len() as f64 / term_count).min(1.0);
            Some(StrategyHit::new(
                &entry.id,
                score,
                format!("keywords matched: {}", matched.join(", ")),
            ))
        })
        .collect()
}
