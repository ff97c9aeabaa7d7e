//! Fuzzy name match: substring containment, then shared words.

use std::collections::HashSet;
use std::sync::Arc;

use super::{QueryContext, StrategyHit};
use crate::registry::CapabilityEntry;

const MIN_FUZZY_SCORE: f64 = 0.2;

pub(super) fn score(ctx: &QueryContext, candidates: &[Arc<CapabilityEntry>]) -> Vec<StrategyHit> {
    let query = ctx.normalized.as_str();
    let query_words = words(query);

    candidates
        .iter()
        .filter_map(|entry| {
            let name = entry.name.trim().to_lowercase();
            if name.is_empty() {
                return None;
            }
            let score = name_similarity(query, &query_words, &name);
            (score >= MIN_FUZZY_SCORE).then(|| {
                StrategyHit::new(
                    &entry.id,
                    score,
                    format!("fuzzy name match '{}' ({score:.2})", entry.name),
                )
            })
        })
        .collect()
}

fn name_similarity(query: &str, query_words: &HashSet<&str>, name: &str) -> f64 {
    let query_len = query.chars().count();
    let name_len = name.chars().count();

    if name.contains(query) {
        return ratio(query_len, name_len);
    }
    if query.contains(name) {
        return ratio(name_len, query_len);
    }

    let name_words = words(name);
    let denominator = query_words.len().max(name_words.len());
    if denominator == 0 {
        return 0.0;
    }
    let shared = query_words.intersection(&name_words).count();
    ratio(shared, denominator)
}

fn words(text: &str) -> HashSet<&str> {
    text.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
