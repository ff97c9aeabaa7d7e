//! Usage popularity and recency.

use std::sync::Arc;

use chrono::Duration;

use super::{QueryContext, StrategyHit};
use crate::registry::CapabilityEntry;

const MIN_POPULARITY_SCORE: f64 = 0.1;
const USAGE_STEP: f64 = 0.01;
const USAGE_CAP: f64 = 0.5;
const RECENCY_CAP: f64 = 0.5;
const RECENCY_WINDOW_DAYS: i64 = 30;

pub(super) fn score(ctx: &QueryContext, candidates: &[Arc<CapabilityEntry>]) -> Vec<StrategyHit> {
    candidates
        .iter()
        .filter_map(|entry| {
            let score = popularity_score(entry, ctx);
            (score >= MIN_POPULARITY_SCORE).then(|| {
                let last_used = entry.last_used_at.map_or_else(
                    || "never".to_string(),
                    |at| format!("{}d ago", (ctx.now - at).num_days().max(0)),
                );
                StrategyHit::new(
                    &entry.id,
                    score,
                    format!("used {} times, last used {last_used}", entry.usage_count),
                )
            })
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
pub(super) fn popularity_score(entry: &CapabilityEntry, ctx: &QueryContext) -> f64 {
    let usage = (entry.usage_count as f64 * USAGE_STEP).min(USAGE_CAP);
    let recency = entry.last_used_at.map_or(0.0, |at| {
        let age = (ctx.now - at).max(Duration::zero());
        let window = Duration::days(RECENCY_WINDOW_DAYS);
        let fraction = age.num_milliseconds() as f64 / window.num_milliseconds() as f64;
        (RECENCY_CAP * (1.0 - fraction)).max(0.0)
    });
    usage + recency
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn ctx() -> QueryContext {
        QueryContext::new("anything", Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_usage_is_capped() {
        let entry = CapabilityEntry::new("1", "a", "b").with_usage(1_000, None);
        assert!((popularity_score(&entry, &ctx()) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_recency_decays_linearly() {
        let now = ctx().now;
        let entry =
            CapabilityEntry::new("1", "a", "b").with_usage(0, Some(now - Duration::days(15)));
        assert!((popularity_score(&entry, &ctx()) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_stale_and_unused_scores_zero() {
        let now = ctx().now;
        let entry =
            CapabilityEntry::new("1", "a", "b").with_usage(0, Some(now - Duration::days(90)));
        assert!(popularity_score(&entry, &ctx()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_future_timestamp_counts_as_now() {
        let now = ctx().now;
        let entry =
            CapabilityEntry::new("1", "a", "b").with_usage(0, Some(now + Duration::days(2)));
        assert!((popularity_score(&entry, &ctx()) - 0.5).abs() < 1e-12);
    }
}
