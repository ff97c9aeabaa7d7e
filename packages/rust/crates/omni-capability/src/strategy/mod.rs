//! Multi-strategy fan-out scorer for hybrid tool search.
//!
//! Six independent strategies score a candidate set against the query. Each
//! is a pure function of `(QueryContext, candidates)`; they run as separate
//! blocking tasks and are joined before aggregation.
//!
//! | Strategy | Weight |
//! |----------|--------|
//! | exact name | 0.30 |
//! | fuzzy name | 0.20 |
//! | keyword overlap | 0.15 |
//! | category heuristic | 0.15 |
//! | description overlap | 0.10 |
//! | popularity / recency | 0.10 |

mod category;
mod description;
mod exact;
mod fuzzy;
mod keyword_overlap;
mod popularity;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::registry::CapabilityEntry;

pub use category::{GENERIC_CATEGORY, implied_categories};

/// Maximum hits each strategy keeps.
pub const STRATEGY_TOP_K: usize = 20;

/// Identifies one of the six scoring strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Query equals the entry name.
    ExactName,
    /// Substring or shared-word similarity with the name.
    FuzzyName,
    /// Query terms against entry keywords.
    KeywordOverlap,
    /// Domain vocabulary implies the entry category.
    CategoryHeuristic,
    /// Query terms found in the description.
    DescriptionOverlap,
    /// Usage count and recency.
    Popularity,
}

impl StrategyKind {
    /// Every strategy, in fusion order.
    pub const ALL: [Self; 6] = [
        Self::ExactName,
        Self::FuzzyName,
        Self::KeywordOverlap,
        Self::CategoryHeuristic,
        Self::DescriptionOverlap,
        Self::Popularity,
    ];

    /// Stable name used as the component-score key.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ExactName => "exact_name",
            Self::FuzzyName => "fuzzy_name",
            Self::KeywordOverlap => "keyword_overlap",
            Self::CategoryHeuristic => "category_heuristic",
            Self::DescriptionOverlap => "description_overlap",
            Self::Popularity => "popularity",
        }
    }

    /// Linear-fusion weight. The six weights sum to 1.0.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::ExactName => 0.30,
            Self::FuzzyName => 0.20,
            Self::KeywordOverlap | Self::CategoryHeuristic => 0.15,
            Self::DescriptionOverlap | Self::Popularity => 0.10,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One strategy's verdict on one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyHit {
    /// Capability id
    pub id: String,
    /// Score in `[0, 1]`
    pub score: f64,
    /// Human-readable explanation
    pub reason: String,
}

impl StrategyHit {
    pub(crate) fn new(id: &str, score: f64, reason: String) -> Self {
        Self {
            id: id.to_string(),
            score,
            reason,
        }
    }
}

/// All hits produced by one strategy.
#[derive(Debug, Clone)]
pub struct StrategyOutput {
    /// Producing strategy
    pub kind: StrategyKind,
    /// Hits, best first, at most `top_k`
    pub hits: Vec<StrategyHit>,
}

/// Normalized query shared read-only by every strategy.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Original query text.
    pub raw: String,
    /// Trimmed, lower-cased query.
    pub normalized: String,
    /// Distinct whitespace-separated terms longer than two characters.
    pub terms: Vec<String>,
    /// Reference time for recency scoring.
    pub now: DateTime<Utc>,
}

impl QueryContext {
    /// Normalize `query` once for all strategies.
    pub fn new(query: &str, now: DateTime<Utc>) -> Self {
        let normalized = query.trim().to_lowercase();
        let mut seen = HashSet::new();
        let terms = normalized
            .split_whitespace()
            .filter(|t| t.chars().count() > 2)
            .filter(|t| seen.insert(*t))
            .map(str::to_string)
            .collect();
        Self {
            raw: query.to_string(),
            normalized,
            terms,
            now,
        }
    }
}

/// Run a single strategy, then clamp, sort and cap its output.
#[must_use]
pub fn run_strategy(
    kind: StrategyKind,
    ctx: &QueryContext,
    candidates: &[Arc<CapabilityEntry>],
    top_k: usize,
) -> Vec<StrategyHit> {
    if ctx.normalized.is_empty() || candidates.is_empty() {
        return Vec::new();
    }

    let raw = match kind {
        StrategyKind::ExactName => exact::score(ctx, candidates),
        StrategyKind::FuzzyName => fuzzy::score(ctx, candidates),
        StrategyKind::KeywordOverlap => keyword_overlap::score(ctx, candidates),
        StrategyKind::CategoryHeuristic => category::score(ctx, candidates),
        StrategyKind::DescriptionOverlap => description::score(ctx, candidates),
        StrategyKind::Popularity => popularity::score(ctx, candidates),
    };
    finalize(raw, top_k)
}

fn finalize(mut hits: Vec<StrategyHit>, top_k: usize) -> Vec<StrategyHit> {
    hits.retain(|h| h.score > 0.0 && h.score.is_finite());
    for hit in &mut hits {
        hit.score = hit.score.clamp(0.0, 1.0);
    }
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    hits.truncate(top_k);
    hits
}

/// A deferred strategy run, executed on the blocking pool.
pub(crate) type StrategyJob = Box<dyn FnOnce() -> Vec<StrategyHit> + Send + 'static>;

/// Run all six strategies concurrently and wait for every one of them.
///
/// A strategy whose task fails (panics) is reported with no hits; the other
/// strategies still contribute. Output order follows [`StrategyKind::ALL`].
pub async fn fan_out(
    ctx: Arc<QueryContext>,
    candidates: Arc<[Arc<CapabilityEntry>]>,
    top_k: usize,
) -> Vec<StrategyOutput> {
    let jobs = StrategyKind::ALL
        .into_iter()
        .map(|kind| {
            let ctx = Arc::clone(&ctx);
            let candidates = Arc::clone(&candidates);
            let job: StrategyJob = Box::new(move || run_strategy(kind, &ctx, &candidates, top_k));
            (kind, job)
        })
        .collect();
    fan_out_with(jobs).await
}

/// Spawn each job as its own blocking task and join them in input order.
pub(crate) async fn fan_out_with(jobs: Vec<(StrategyKind, StrategyJob)>) -> Vec<StrategyOutput> {
    let (kinds, tasks): (Vec<StrategyKind>, Vec<_>) = jobs
        .into_iter()
        .map(|(kind, job)| (kind, tokio::task::spawn_blocking(job)))
        .unzip();

    let joined = futures::future::join_all(tasks).await;

    kinds
        .into_iter()
        .zip(joined)
        .map(|(kind, result)| {
            let hits = result.unwrap_or_else(|error| {
                tracing::warn!(
                    event = "capability.strategy.failed",
                    strategy = kind.name(),
                    error = %error,
                    "strategy task failed; treating as zero candidates"
                );
                Vec::new()
            });
            tracing::debug!(
                event = "capability.strategy.completed",
                strategy = kind.name(),
                hits = hits.len(),
                "strategy completed"
            );
            StrategyOutput { kind, hits }
        })
        .collect()
}
