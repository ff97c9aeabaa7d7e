//! Exact name match.

use std::sync::Arc;

use super::{QueryContext, StrategyHit};
use crate::registry::CapabilityEntry;

pub(super) fn score(ctx: &QueryContext, candidates: &[Arc<CapabilityEntry>]) -> Vec<StrategyHit> {
    candidates
        .iter()
        .filter(|entry| entry.name.trim().to_lowercase() == ctx.normalized)
        .map(|entry| StrategyHit::new(&entry.id, 1.0, format!("exact name match '{}'", entry.name)))
        .collect()
}
