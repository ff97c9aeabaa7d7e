//! End-to-end tests for `CapabilitySearchEngine` on both retrieval paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use insta::assert_json_snapshot;
use omni_capability::{
    CapabilityEntry, CapabilityError, CapabilityRegistry, CapabilitySearchEngine,
    HashEmbeddingProvider, JsonFileRegistrySource, ResolvedSearchSettings, SearchHit,
    SearchOptions, StaticRegistrySource,
};
use serde::Serialize;

fn scenario_registry() -> CapabilityRegistry {
    CapabilityRegistry::new(vec![
        CapabilityEntry::new("1", "search", "search").with_keywords(["find", "lookup"]),
        CapabilityEntry::new("2", "git_commit", "vcs")
            .with_description("Record staged changes")
            .with_keywords(["git", "commit"]),
    ])
    .unwrap()
}

fn pinned() -> SearchOptions {
    SearchOptions::default().as_of(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
}

fn ids(hits: &[SearchHit]) -> Vec<&str> {
    hits.iter().map(|h| h.id.as_str()).collect()
}

#[derive(Serialize)]
struct HitView {
    id: String,
    final_score: String,
    component_scores: Vec<String>,
    rationale: Vec<String>,
}

fn view(hits: &[SearchHit]) -> Vec<HitView> {
    hits.iter()
        .map(|h| HitView {
            id: h.id.clone(),
            final_score: format!("{:.4}", h.final_score),
            component_scores: h
                .component_scores
                .iter()
                .map(|(k, v)| format!("{k}={v:.4}"))
                .collect(),
            rationale: h.rationale.clone(),
        })
        .collect()
}

// ============================================================================
// Concrete scenario
// ============================================================================

#[tokio::test]
async fn test_scenario_hybrid_search() {
    let engine =
        CapabilitySearchEngine::with_registry(scenario_registry(), ResolvedSearchSettings::default());
    let hits = engine.search("search", &pinned()).await;

    assert_eq!(ids(&hits), vec!["1"]);
    assert!((hits[0].final_score - 0.65).abs() < 1e-9);
    assert!((hits[0].component_scores["exact_name"] - 1.0).abs() < f64::EPSILON);
    assert_json_snapshot!("scenario_hybrid_search", view(&hits));
}

#[tokio::test]
async fn test_scenario_progressive_discovery() {
    let engine =
        CapabilitySearchEngine::with_registry(scenario_registry(), ResolvedSearchSettings::default());
    let hits = engine.search("search", &pinned().full_registry()).await;

    assert_eq!(ids(&hits), vec!["1"]);
    assert_json_snapshot!("scenario_progressive_discovery", view(&hits));
}

// ============================================================================
// Ranking properties
// ============================================================================

#[tokio::test]
async fn test_exact_match_wins() {
    let registry = CapabilityRegistry::new(vec![
        CapabilityEntry::new("helper", "foo_helper", "general")
            .with_keywords(["foo"])
            .with_description("foo tools")
            .with_usage(100, Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())),
        CapabilityEntry::new("bar", "foobar", "misc"),
        CapabilityEntry::new("foo", "foo", "misc"),
    ])
    .unwrap();
    let engine = CapabilitySearchEngine::with_registry(registry, ResolvedSearchSettings::default());

    for query in ["foo", "  FOO ", "Foo"] {
        let hits = engine.search(query, &pinned()).await;
        assert_eq!(hits[0].id, "foo", "query {query:?}");
    }
}

#[tokio::test]
async fn test_exact_match_outranks_higher_linear_score() {
    // The rival fires every strategy except exact name and outscores it.
    let registry = CapabilityRegistry::new(vec![
        CapabilityEntry::new("foo", "foo", "misc"),
        CapabilityEntry::new("fx", "foo_x", "general")
            .with_keywords(["foo"])
            .with_description("foo")
            .with_usage(100, Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())),
    ])
    .unwrap();
    let engine = CapabilitySearchEngine::with_registry(registry, ResolvedSearchSettings::default());
    let hits = engine.search("foo", &pinned()).await;

    assert_eq!(ids(&hits), vec!["foo", "fx"]);
    assert!((hits[0].final_score - 0.5).abs() < 1e-9);
    assert!((hits[1].final_score - 0.515).abs() < 1e-9);
    assert!(!hits[1].component_scores.contains_key("exact_name"));
}

#[tokio::test]
async fn test_search_is_deterministic() {
    let engine =
        CapabilitySearchEngine::with_registry(scenario_registry(), ResolvedSearchSettings::default());
    let options = pinned();
    let first = engine.search("git commit search", &options).await;
    for _ in 0..5 {
        assert_eq!(engine.search("git commit search", &options).await, first);
    }
    let progressive = pinned().full_registry();
    let first = engine.search("git_commit search", &progressive).await;
    assert_eq!(engine.search("git_commit search", &progressive).await, first);
}

#[tokio::test]
async fn test_linear_scores_are_bounded() {
    let engine =
        CapabilitySearchEngine::with_registry(scenario_registry(), ResolvedSearchSettings::default());
    let hits = engine.search("search git commit lookup", &pinned()).await;
    assert!(!hits.is_empty());
    for hit in &hits {
        assert!((0.0..=1.0).contains(&hit.final_score));
        assert!(hit.component_scores.values().all(|s| (0.0..=1.0).contains(s)));
        assert_eq!(hit.component_scores.len(), hit.rationale.len());
    }
}

fn file_registry() -> CapabilityRegistry {
    CapabilityRegistry::new(vec![
        CapabilityEntry::new("fa", "file_a", "filesystem"),
        CapabilityEntry::new("fb", "file_b", "filesystem"),
        CapabilityEntry::new("fc", "file_c", "filesystem"),
        CapabilityEntry::new("fd", "file_d", "filesystem"),
        CapabilityEntry::new("sx", "file_store_x", "storage"),
        CapabilityEntry::new("sy", "file_store_y", "storage"),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_diversity_cap_limits_each_category() {
    let settings = ResolvedSearchSettings {
        category_cap: 2,
        ..ResolvedSearchSettings::default()
    };
    let engine = CapabilitySearchEngine::with_registry(file_registry(), settings);

    let hits = engine.search("file", &pinned()).await;
    let mut per_category: HashMap<&str, usize> = HashMap::new();
    for hit in &hits {
        *per_category.entry(hit.category.as_str()).or_default() += 1;
    }
    assert_eq!(hits.len(), 4);
    assert!(per_category.values().all(|count| *count <= 2));
    assert!(hits.windows(2).all(|w| w[0].final_score >= w[1].final_score));

    let unconstrained = engine
        .search("file", &pinned().with_diversity(false))
        .await;
    assert_eq!(unconstrained.len(), 6);
    // The capped list is an order-preserving subsequence of the full ranking.
    let mut full = unconstrained.iter().map(|h| h.id.as_str());
    assert!(ids(&hits).into_iter().all(|id| full.any(|f| f == id)));
}

#[tokio::test]
async fn test_progressive_diversity_only_on_request() {
    let settings = ResolvedSearchSettings {
        category_cap: 1,
        ..ResolvedSearchSettings::default()
    };
    let registry = CapabilityRegistry::new(vec![
        CapabilityEntry::new("1", "read", "filesystem"),
        CapabilityEntry::new("2", "read", "filesystem"),
        CapabilityEntry::new("3", "read", "web"),
    ])
    .unwrap();
    let engine = CapabilitySearchEngine::with_registry(registry, settings);

    let default = engine.search("read", &pinned().full_registry()).await;
    assert_eq!(default.len(), 3);
    let capped = engine
        .search("read", &pinned().full_registry().with_diversity(true))
        .await;
    assert_eq!(ids(&capped), vec!["1", "3"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_progressive_scan_on_large_registry() {
    let entries = (0..400)
        .map(|i| {
            let entry = CapabilityEntry::new(format!("t{i:03}"), format!("tool{i}"), "misc");
            if i % 8 == 0 {
                entry.with_tags(["archive"])
            } else {
                entry
            }
        })
        .collect();
    let engine = CapabilitySearchEngine::with_registry(
        CapabilityRegistry::new(entries).unwrap(),
        ResolvedSearchSettings::default(),
    );
    let expected: Vec<String> = engine
        .snapshot()
        .await
        .index()
        .search("archive", Some(10))
        .into_iter()
        .map(|hit| hit.id)
        .collect();

    let options = pinned().full_registry();
    let (first, second) = tokio::join!(
        engine.search("archive", &options),
        engine.search("archive", &options)
    );
    assert_eq!(ids(&first), expected.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_limit_and_candidate_subset() {
    let engine = CapabilitySearchEngine::with_registry(file_registry(), ResolvedSearchSettings::default());

    let limited = engine.search("file", &pinned().with_limit(2)).await;
    assert_eq!(limited.len(), 2);

    let subset = engine
        .search("file", &pinned().with_candidates(["sy", "fa", "unknown", "fa"]))
        .await;
    let mut got = ids(&subset);
    got.sort_unstable();
    assert_eq!(got, vec!["fa", "sy"]);

    assert!(engine.search("file", &pinned().with_limit(0)).await.is_empty());
}

// ============================================================================
// Degradation and edge cases
// ============================================================================

#[tokio::test]
async fn test_empty_registry_and_empty_query() {
    let engine = CapabilitySearchEngine::default();
    assert!(engine.search("search", &pinned()).await.is_empty());
    assert!(engine.search("search", &pinned().full_registry()).await.is_empty());

    let engine =
        CapabilitySearchEngine::with_registry(scenario_registry(), ResolvedSearchSettings::default());
    assert!(engine.search("   ", &pinned()).await.is_empty());
    assert!(engine.search("", &pinned().full_registry()).await.is_empty());
}

#[tokio::test]
async fn test_embedding_side_channel_finds_lexical_misses() {
    let engine = CapabilitySearchEngine::new(ResolvedSearchSettings::default())
        .with_embedding_provider(Arc::new(HashEmbeddingProvider::default()));
    engine.replace_registry(scenario_registry()).await.unwrap();

    let snapshot = engine.snapshot().await;
    // Two tool nodes plus two domain nodes.
    assert_eq!(snapshot.embeddings().map(|e| e.len()), Some(4));
    assert!(snapshot.index().search("commit changes", None).is_empty());

    let hits = engine
        .search("commit changes", &pinned().full_registry())
        .await;
    assert_eq!(ids(&hits), vec!["2"]);
    assert!(hits[0].component_scores.contains_key("tool_embedding"));
    assert!(!hits[0].component_scores.contains_key("bm25"));
}

#[tokio::test]
async fn test_degradation_keeps_bm25_set() {
    let lexical =
        CapabilitySearchEngine::with_registry(scenario_registry(), ResolvedSearchSettings::default());
    let hybrid = CapabilitySearchEngine::new(ResolvedSearchSettings::default())
        .with_embedding_provider(Arc::new(HashEmbeddingProvider::default()));
    hybrid.replace_registry(scenario_registry()).await.unwrap();

    let options = pinned().full_registry();
    let without: Vec<SearchHit> = lexical.search("search", &options).await;
    let with: Vec<SearchHit> = hybrid.search("search", &options).await;

    let with_by_id: BTreeMap<&str, &SearchHit> = with.iter().map(|h| (h.id.as_str(), h)).collect();
    for hit in &without {
        let other = with_by_id[hit.id.as_str()];
        assert_eq!(other.component_scores.get("bm25"), hit.component_scores.get("bm25"));
        assert!(other.final_score >= hit.final_score);
    }
    assert!(without.iter().all(|h| h.component_scores.len() == 1));
}

#[tokio::test]
async fn test_index_without_provider_degrades() {
    let engine =
        CapabilitySearchEngine::with_registry(scenario_registry(), ResolvedSearchSettings::default());
    let before = engine.search("search", &pinned().full_registry()).await;

    let provider = HashEmbeddingProvider::default();
    let index = omni_capability::EmbeddingIndex::build(&provider, &scenario_registry())
        .await
        .unwrap();
    engine.set_embedding_index(index).await;
    assert!(engine.snapshot().await.embeddings().is_some());

    let after = engine.search("search", &pinned().full_registry()).await;
    assert_eq!(before, after);
}

// ============================================================================
// Snapshot refresh
// ============================================================================

#[tokio::test]
async fn test_refresh_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capabilities.json");
    std::fs::write(
        &path,
        r#"{"capabilities": [
            {"_id": 7, "name": "read_file", "category": "filesystem", "tags": ["io", "io"],
             "usageCount": 3, "lastUsedAt": 1717200000000},
            {"name": "web_fetch", "category": "web", "description": "Fetch a URL"}
        ]}"#,
    )
    .unwrap();

    let engine = CapabilitySearchEngine::default();
    let count = engine
        .refresh(&JsonFileRegistrySource::new(&path))
        .await
        .unwrap();
    assert_eq!(count, 2);

    let snapshot = engine.snapshot().await;
    let registry = snapshot.registry();
    let read = registry.get("7").unwrap();
    assert_eq!(read.name, "read_file");
    assert_eq!(read.tags.len(), 1);
    assert_eq!(read.usage_count, 3);
    assert!(read.last_used_at.is_some());
    assert_eq!(registry.get("web_fetch").unwrap().description, "Fetch a URL");
    assert_eq!(registry.categories(), vec!["filesystem", "web"]);
    assert_eq!(snapshot.index().document_count(), 2);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_snapshot() {
    let engine = CapabilitySearchEngine::default();
    engine
        .refresh(&StaticRegistrySource::new(vec![CapabilityEntry::new(
            "1", "search", "search",
        )]))
        .await
        .unwrap();
    let before = engine.snapshot().await;

    let duplicate = StaticRegistrySource::new(vec![
        CapabilityEntry::new("x", "a", "general"),
        CapabilityEntry::new("x", "b", "general"),
    ]);
    let err = engine.refresh(&duplicate).await.unwrap_err();
    assert!(matches!(err, CapabilityError::DuplicateId(id) if id == "x"));

    let missing = JsonFileRegistrySource::new("/nonexistent/capabilities.json");
    let err = engine.refresh(&missing).await.unwrap_err();
    assert!(matches!(err, CapabilityError::Io(_)));

    let after = engine.snapshot().await;
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(ids(&engine.search("search", &pinned()).await), vec!["1"]);
}

#[tokio::test]
async fn test_search_hit_serializes_camel_case() {
    let engine =
        CapabilitySearchEngine::with_registry(scenario_registry(), ResolvedSearchSettings::default());
    let hits = engine.search("search", &pinned()).await;
    let value = serde_json::to_value(&hits[0]).unwrap();
    assert!(value.get("finalScore").is_some());
    assert!(value.get("componentScores").is_some());
    assert_eq!(value["id"], "1");
}
