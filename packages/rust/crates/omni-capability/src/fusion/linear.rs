//! Fixed-weight linear fusion of the six strategy outputs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::types::{ScoredCandidate, sort_candidates};
use crate::registry::CapabilityEntry;
use crate::strategy::{StrategyKind, StrategyOutput};

struct Slots {
    scores: [f64; 6],
    reasons: [Option<String>; 6],
}

/// Merge strategy outputs into candidates keyed by entry id.
///
/// A candidate is created the first time any strategy mentions its id with
/// all six slots at 0; each strategy writes only its own slot.
/// `final_score = Σ score[s] * weight[s]`. Ids not present in `candidates`
/// are ignored. Output is sorted best first, with exact-name hits ahead of
/// everything else.
#[must_use]
pub fn aggregate(
    outputs: &[StrategyOutput],
    candidates: &[Arc<CapabilityEntry>],
) -> Vec<ScoredCandidate> {
    let lookup: HashMap<&str, &Arc<CapabilityEntry>> =
        candidates.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut slots: HashMap<&str, Slots> = HashMap::new();
    for output in outputs {
        let slot = slot_index(output.kind);
        for hit in &output.hits {
            let Some(entry) = lookup.get(hit.id.as_str()) else {
                continue;
            };
            let entry_slots = slots.entry(entry.id.as_str()).or_insert_with(|| Slots {
                scores: [0.0; 6],
                reasons: Default::default(),
            });
            entry_slots.scores[slot] = hit.score;
            entry_slots.reasons[slot] = Some(hit.reason.clone());
        }
    }

    let mut fused: Vec<ScoredCandidate> = slots
        .into_iter()
        .filter_map(|(id, Slots { scores, reasons })| {
            let entry = Arc::clone(lookup.get(id)?);
            let mut component_scores = BTreeMap::new();
            let mut rationale = Vec::new();
            let mut final_score = 0.0;
            let exact_match = scores[slot_index(StrategyKind::ExactName)] > 0.0;

            for (kind, (score, reason)) in StrategyKind::ALL.into_iter().zip(scores.iter().zip(reasons)) {
                final_score += score * kind.weight();
                if *score > 0.0 {
                    component_scores.insert(kind.name().to_string(), *score);
                    if let Some(reason) = reason {
                        rationale.push(format!("{kind}: {reason}"));
                    }
                }
            }

            Some(ScoredCandidate {
                entry,
                component_scores,
                final_score,
                rationale,
                exact_match,
            })
        })
        .collect();

    sort_candidates(&mut fused);
    fused
}

fn slot_index(kind: StrategyKind) -> usize {
    StrategyKind::ALL
        .iter()
        .position(|k| *k == kind)
        .unwrap_or_default()
}
