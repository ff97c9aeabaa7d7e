//! Category heuristic: domain vocabulary implies categories.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, LazyLock};

use super::{QueryContext, StrategyHit};
use crate::registry::CapabilityEntry;

/// Fallback category for capabilities without a specific domain.
pub const GENERIC_CATEGORY: &str = "general";

const IMPLIED_SCORE: f64 = 1.0;
const GENERIC_FALLBACK_SCORE: f64 = 0.3;

/// Domain vocabulary per category label.
const CATEGORY_VOCABULARY: &[(&str, &[&str])] = &[
    (
        "filesystem",
        &["file", "files", "read", "write", "path", "directory", "folder"],
    ),
    ("search", &["search", "find", "lookup", "query", "discover"]),
    (
        "vcs",
        &["git", "commit", "branch", "merge", "diff", "repository", "repo"],
    ),
    (
        "web",
        &["web", "http", "url", "fetch", "browse", "website", "scrape", "download"],
    ),
    (
        "data",
        &["csv", "json", "parse", "table", "spreadsheet", "dataframe"],
    ),
    (
        "media",
        &["image", "audio", "video", "transcribe", "screenshot", "ocr"],
    ),
    (
        "communication",
        &["email", "slack", "message", "notify", "send", "webhook"],
    ),
    ("research", &["research", "paper", "arxiv", "summarize", "cite"]),
    (
        "code",
        &["code", "compile", "build", "test", "lint", "refactor", "debug"],
    ),
    ("database", &["database", "sql", "record", "row", "schema"]),
    (
        "finance",
        &["stock", "price", "market", "crypto", "equity", "economy"],
    ),
];

static VOCABULARY_INDEX: LazyLock<HashMap<&'static str, Vec<&'static str>>> =
    LazyLock::new(|| {
        let mut index: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
        for (category, words) in CATEGORY_VOCABULARY {
            for word in *words {
                index.entry(*word).or_default().push(*category);
            }
        }
        index
    });

/// Categories implied by the words of `query` (lower-cased, sorted).
#[must_use]
pub fn implied_categories(query: &str) -> BTreeSet<&'static str> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .filter_map(|w| VOCABULARY_INDEX.get(w))
        .flatten()
        .copied()
        .collect()
}

pub(super) fn score(ctx: &QueryContext, candidates: &[Arc<CapabilityEntry>]) -> Vec<StrategyHit> {
    let implied = implied_categories(&ctx.normalized);

    candidates
        .iter()
        .filter_map(|entry| {
            let category = entry.category.trim().to_lowercase();
            if implied.contains(category.as_str()) {
                Some(StrategyHit::new(
                    &entry.id,
                    IMPLIED_SCORE,
                    format!("query implies category '{}'", entry.category),
                ))
            } else if implied.is_empty() && category == GENERIC_CATEGORY {
                Some(StrategyHit::new(
                    &entry.id,
                    GENERIC_FALLBACK_SCORE,
                    "generic category fallback".to_string(),
                ))
            } else {
                None
            }
        })
        .collect()
}
