//! Reciprocal Rank Fusion of BM25 rank with embedding rank.
//!
//! Tool-node hits score `TOOL_ALPHA * rrf_term`. Domain-node hits score
//! `DOMAIN_ALPHA * rrf_term` and propagate to every entry of that category,
//! including entries with no tool-level hit. The fused set is the union of
//! all signals.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::kernels::{RRF_K, rrf_term};
use super::types::{ScoredCandidate, sort_candidates};
use crate::embedding::EmbeddingHit;
use crate::keyword::KeywordHit;
use crate::registry::{CapabilityEntry, CapabilityRegistry};

/// Weight for direct tool-node embedding matches.
pub const TOOL_ALPHA: f64 = 1.0;
/// Weight for category (domain) node embedding matches.
pub const DOMAIN_ALPHA: f64 = 0.6;

/// Component key for the BM25 rank signal.
pub const BM25_SIGNAL: &str = "bm25";
/// Component key for the tool-node embedding signal.
pub const TOOL_EMBEDDING_SIGNAL: &str = "tool_embedding";
/// Component key for the domain-node embedding signal.
pub const DOMAIN_EMBEDDING_SIGNAL: &str = "domain_embedding";

#[derive(Default)]
struct Accumulator {
    component_scores: BTreeMap<String, f64>,
    rationale: Vec<String>,
}

impl Accumulator {
    fn add(&mut self, signal: &str, score: f64, reason: String) -> bool {
        if self.component_scores.contains_key(signal) {
            return false;
        }
        self.component_scores.insert(signal.to_string(), score);
        self.rationale.push(reason);
        true
    }
}

/// Fuse BM25 hits with tool and domain embedding hits.
///
/// Each input list is assumed ranked best first. A signal contributes at
/// most once per entry (its best rank). Empty embedding lists reduce this to
/// pure BM25 ranking.
#[must_use]
pub fn fuse_progressive(
    registry: &CapabilityRegistry,
    keyword_hits: &[KeywordHit],
    tool_hits: &[EmbeddingHit],
    domain_hits: &[EmbeddingHit],
) -> Vec<ScoredCandidate> {
    let mut fusion_map: HashMap<String, (Arc<CapabilityEntry>, Accumulator)> = HashMap::new();

    let mut contribute = |entry: &Arc<CapabilityEntry>, signal: &str, score: f64, reason: String| {
        fusion_map
            .entry(entry.id.clone())
            .or_insert_with(|| (Arc::clone(entry), Accumulator::default()))
            .1
            .add(signal, score, reason)
    };

    for (position, hit) in keyword_hits.iter().enumerate() {
        if let Some(entry) = registry.get(&hit.id) {
            let score = rrf_term(RRF_K, position);
            contribute(
                entry,
                BM25_SIGNAL,
                score,
                format!("bm25 rank {} (score {:.3})", position + 1, hit.score),
            );
        }
    }

    for (position, hit) in tool_hits.iter().enumerate() {
        if let Some(entry) = registry.resolve(&hit.name) {
            let score = TOOL_ALPHA * rrf_term(RRF_K, position);
            contribute(
                entry,
                TOOL_EMBEDDING_SIGNAL,
                score,
                format!(
                    "tool embedding rank {} (similarity {:.3})",
                    position + 1,
                    hit.similarity
                ),
            );
        }
    }

    if !domain_hits.is_empty() {
        let mut by_category: HashMap<&str, Vec<&Arc<CapabilityEntry>>> = HashMap::new();
        for entry in registry.iter() {
            by_category
                .entry(entry.category.as_str())
                .or_default()
                .push(entry);
        }

        for (position, hit) in domain_hits.iter().enumerate() {
            let Some(category) = hit.category() else {
                continue;
            };
            let Some(members) = by_category.get(category) else {
                continue;
            };
            let score = DOMAIN_ALPHA * rrf_term(RRF_K, position);
            for &entry in members {
                contribute(
                    entry,
                    DOMAIN_EMBEDDING_SIGNAL,
                    score,
                    format!(
                        "domain '{category}' embedding rank {} (similarity {:.3})",
                        position + 1,
                        hit.similarity
                    ),
                );
            }
        }
    }

    let mut fused: Vec<ScoredCandidate> = fusion_map
        .into_values()
        .map(|(entry, acc)| ScoredCandidate {
            final_score: acc.component_scores.values().sum(),
            entry,
            component_scores: acc.component_scores,
            rationale: acc.rationale,
            exact_match: false,
        })
        .filter(|c| c.final_score > 0.0)
        .collect();

    sort_candidates(&mut fused);
    fused
}
