//! Capability search engine: snapshot ownership and the two retrieval paths.
//!
//! - **Hybrid tool search** (linear path): six strategies over a candidate
//!   subset, fixed-weight linear fusion, diversity cap on by default.
//! - **Progressive discovery** (RRF path): BM25 over the whole registry fused
//!   with tool and domain embedding ranks; diversity only on request.
//!
//! The registry, its BM25 index and the optional embedding index form one
//! immutable [`RegistrySnapshot`]. Queries clone the current `Arc` and never
//! observe a rebuild in progress; rebuilds swap the whole snapshot.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::ResolvedSearchSettings;
use crate::embedding::{
    EmbeddingHit, EmbeddingIndex, EmbeddingProvider, NodeType, provider_from_settings,
};
use crate::error::CapabilityError;
use crate::fusion::{ScoredCandidate, aggregate, fuse_progressive};
use crate::keyword::Bm25Index;
use crate::registry::{CapabilityEntry, CapabilityRegistry, RegistrySource};
use crate::shaper::shape;
use crate::strategy::{QueryContext, fan_out};

/// Registry plus the indexes derived from it.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    registry: Arc<CapabilityRegistry>,
    index: Arc<Bm25Index>,
    embeddings: Option<Arc<EmbeddingIndex>>,
    built_at: DateTime<Utc>,
}

impl RegistrySnapshot {
    fn new(
        registry: Arc<CapabilityRegistry>,
        index: Bm25Index,
        embeddings: Option<Arc<EmbeddingIndex>>,
    ) -> Self {
        Self {
            registry,
            index: Arc::new(index),
            embeddings,
            built_at: Utc::now(),
        }
    }

    /// Registry entries.
    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// BM25 index built from [`Self::registry`].
    #[must_use]
    pub fn index(&self) -> &Bm25Index {
        &self.index
    }

    /// Embedding index, when one was built or supplied.
    #[must_use]
    pub fn embeddings(&self) -> Option<&EmbeddingIndex> {
        self.embeddings.as_deref()
    }

    /// When this snapshot was built.
    #[must_use]
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

/// Per-query options.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Maximum results; `None` uses the configured default.
    pub limit: Option<usize>,
    /// Per-category cap toggle. `None` means on for the linear path and off
    /// for the RRF path.
    pub diversity_constraint: Option<bool>,
    /// Select the RRF path over the whole registry.
    pub search_full_registry: bool,
    /// Candidate subset for the linear path (`None` = whole registry).
    pub candidate_ids: Option<Vec<String>>,
    /// Reference time for recency scoring (`None` = now).
    pub as_of: Option<DateTime<Utc>>,
}

impl SearchOptions {
    /// Set the result limit.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Force the diversity constraint on or off.
    #[must_use]
    pub fn with_diversity(mut self, enabled: bool) -> Self {
        self.diversity_constraint = Some(enabled);
        self
    }

    /// Use the RRF path over the whole registry.
    #[must_use]
    pub fn full_registry(mut self) -> Self {
        self.search_full_registry = true;
        self
    }

    /// Restrict the linear path to these ids.
    #[must_use]
    pub fn with_candidates<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Pin "now" for recency scoring.
    #[must_use]
    pub fn as_of(mut self, now: DateTime<Utc>) -> Self {
        self.as_of = Some(now);
        self
    }
}

/// One ranked result as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Capability id
    pub id: String,
    /// Capability name
    pub name: String,
    /// Capability category
    pub category: String,
    /// Fused score (scale depends on the path)
    pub final_score: f64,
    /// Signal name to score for every signal that fired
    pub component_scores: BTreeMap<String, f64>,
    /// One line per contributing signal
    pub rationale: Vec<String>,
}

impl From<ScoredCandidate> for SearchHit {
    fn from(candidate: ScoredCandidate) -> Self {
        Self {
            id: candidate.entry.id.clone(),
            name: candidate.entry.name.clone(),
            category: candidate.entry.category.clone(),
            final_score: candidate.final_score,
            component_scores: candidate.component_scores,
            rationale: candidate.rationale,
        }
    }
}

/// Hybrid capability search over a swappable registry snapshot.
pub struct CapabilitySearchEngine {
    snapshot: RwLock<Arc<RegistrySnapshot>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    settings: ResolvedSearchSettings,
}

impl Default for CapabilitySearchEngine {
    fn default() -> Self {
        Self::new(ResolvedSearchSettings::default())
    }
}

impl CapabilitySearchEngine {
    /// Engine with an empty registry and no embedding provider.
    #[must_use]
    pub fn new(settings: ResolvedSearchSettings) -> Self {
        Self::with_registry(CapabilityRegistry::empty(), settings)
    }

    /// Engine over `registry` with a BM25 index and no embeddings.
    ///
    /// Use [`Self::replace_registry`] after attaching a provider to also build
    /// the embedding index.
    #[must_use]
    pub fn with_registry(registry: CapabilityRegistry, settings: ResolvedSearchSettings) -> Self {
        let index = Bm25Index::build(registry.iter().map(|entry| &**entry));
        let snapshot = RegistrySnapshot::new(Arc::new(registry), index, None);
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            embedder: None,
            settings,
        }
    }

    /// Engine configured entirely from settings, including the provider.
    #[must_use]
    pub fn from_settings(settings: ResolvedSearchSettings) -> Self {
        let embedder = provider_from_settings(&settings);
        let mut engine = Self::new(settings);
        engine.embedder = embedder;
        engine
    }

    /// Attach an embedding provider used for index builds and query vectors.
    #[must_use]
    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(provider);
        self
    }

    /// Resolved settings.
    #[must_use]
    pub fn settings(&self) -> &ResolvedSearchSettings {
        &self.settings
    }

    /// Current snapshot.
    pub async fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Rebuild every index for `registry` and swap it in.
    ///
    /// The embedding index is rebuilt when a provider is attached; a provider
    /// failure leaves the new snapshot without embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::JoinError`] if the index build task fails;
    /// the previous snapshot stays in place.
    pub async fn replace_registry(&self, registry: CapabilityRegistry) -> Result<(), CapabilityError> {
        let started = Instant::now();
        let registry = Arc::new(registry);
        let index = {
            let registry = Arc::clone(&registry);
            tokio::task::spawn_blocking(move || Bm25Index::build(registry.iter().map(|entry| &**entry)))
                .await?
        };

        let embeddings = match &self.embedder {
            Some(provider) => {
                let built = EmbeddingIndex::build(provider.as_ref(), &registry).await;
                if built.is_none() {
                    tracing::debug!(
                        event = "capability.embedding.index.unavailable",
                        provider = provider.name(),
                        "embedding index not built; progressive discovery uses bm25 only"
                    );
                }
                built.map(Arc::new)
            }
            None => None,
        };

        let snapshot = RegistrySnapshot::new(registry, index, embeddings);
        tracing::info!(
            event = "capability.snapshot.rebuilt",
            entries = snapshot.registry.len(),
            vocabulary = snapshot.index.vocabulary_size(),
            embedding_nodes = snapshot.embeddings().map_or(0, EmbeddingIndex::len),
            elapsed_ms = started.elapsed().as_millis(),
            "capability snapshot rebuilt"
        );
        *self.snapshot.write().await = Arc::new(snapshot);
        Ok(())
    }

    /// Fetch a full registry from `source`, rebuild and swap.
    ///
    /// Returns the number of entries now served.
    ///
    /// # Errors
    ///
    /// Propagates source, validation and build errors; on error the previous
    /// snapshot keeps serving queries.
    pub async fn refresh(&self, source: &dyn RegistrySource) -> Result<usize, CapabilityError> {
        let result = async {
            let entries = source.fetch_all_capabilities().await?;
            let registry = CapabilityRegistry::new(entries)?;
            let count = registry.len();
            self.replace_registry(registry).await?;
            Ok::<usize, CapabilityError>(count)
        }
        .await;
        result.inspect_err(|error| {
            tracing::warn!(
                event = "capability.snapshot.refresh_failed",
                error = %error,
                "registry refresh failed; keeping previous snapshot"
            );
        })
    }

    /// Install a collaborator-built embedding index on the current snapshot.
    pub async fn set_embedding_index(&self, index: EmbeddingIndex) {
        let mut guard = self.snapshot.write().await;
        let next = RegistrySnapshot {
            embeddings: Some(Arc::new(index)),
            ..RegistrySnapshot::clone(&guard)
        };
        *guard = Arc::new(next);
    }

    /// Run a query on the path selected by `options.search_full_registry`.
    ///
    /// Never fails: an empty query or registry yields no hits, and a missing
    /// embedding channel degrades to lexical ranking.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchHit> {
        let started = Instant::now();
        let (mode, results) = if options.search_full_registry {
            ("progressive", self.progressive_discovery(query, options).await)
        } else {
            ("hybrid", self.hybrid_tool_search(query, options).await)
        };
        tracing::debug!(
            event = "capability.search.completed",
            mode,
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "capability search completed"
        );
        results.into_iter().map(SearchHit::from).collect()
    }

    /// Linear path: six-strategy fan-out over the candidate subset.
    pub async fn hybrid_tool_search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Vec<ScoredCandidate> {
        let limit = self.limit(options);
        let ctx = QueryContext::new(query, options.as_of.unwrap_or_else(Utc::now));
        if ctx.normalized.is_empty() || limit == 0 {
            return Vec::new();
        }

        let snapshot = self.snapshot().await;
        let candidates = select_candidates(snapshot.registry(), options.candidate_ids.as_deref());
        if candidates.is_empty() {
            return Vec::new();
        }

        let outputs = fan_out(
            Arc::new(ctx),
            Arc::clone(&candidates),
            self.settings.strategy_top_k,
        )
        .await;
        let fused = aggregate(&outputs, &candidates);
        let cap = options
            .diversity_constraint
            .unwrap_or(true)
            .then_some(self.settings.category_cap);
        shape(fused, cap, limit)
    }

    /// RRF path: BM25 rank fused with tool and domain embedding ranks.
    pub async fn progressive_discovery(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Vec<ScoredCandidate> {
        let limit = self.limit(options);
        let snapshot = self.snapshot().await;
        if query.trim().is_empty() || snapshot.registry().is_empty() || limit == 0 {
            return Vec::new();
        }

        let keyword_hits = {
            let snapshot = Arc::clone(&snapshot);
            let query = query.to_string();
            let top_k = self.settings.keyword_candidates;
            tokio::task::spawn_blocking(move || snapshot.index().search(&query, Some(top_k)))
                .await
                .unwrap_or_else(|error| {
                    tracing::warn!(
                        event = "capability.keyword.search_failed",
                        error = %error,
                        "bm25 scan failed; ranking with embeddings only"
                    );
                    Vec::new()
                })
        };
        let (tool_hits, domain_hits) = self.embedding_hits(query, &snapshot).await;
        let fused = fuse_progressive(snapshot.registry(), &keyword_hits, &tool_hits, &domain_hits);
        let cap = (options.diversity_constraint == Some(true)).then_some(self.settings.category_cap);
        shape(fused, cap, limit)
    }

    fn limit(&self, options: &SearchOptions) -> usize {
        options.limit.unwrap_or(self.settings.default_limit)
    }

    async fn embedding_hits(
        &self,
        query: &str,
        snapshot: &RegistrySnapshot,
    ) -> (Vec<EmbeddingHit>, Vec<EmbeddingHit>) {
        let Some(index) = snapshot.embeddings().filter(|index| !index.is_empty()) else {
            tracing::debug!(
                event = "capability.embedding.degraded",
                reason = "no_index",
                "embedding index unavailable; bm25 only"
            );
            return (Vec::new(), Vec::new());
        };
        let Some(provider) = self.embedder.as_ref() else {
            tracing::debug!(
                event = "capability.embedding.degraded",
                reason = "no_provider",
                "embedding provider unavailable; bm25 only"
            );
            return (Vec::new(), Vec::new());
        };
        let Some(vector) = provider.embed_query(query).await else {
            tracing::debug!(
                event = "capability.embedding.degraded",
                reason = "query_embedding_failed",
                provider = provider.name(),
                "query embedding failed; bm25 only"
            );
            return (Vec::new(), Vec::new());
        };

        let top_k = self.settings.embedding_top_k;
        let min_similarity = self.settings.embedding_min_similarity;
        (
            index.nearest(&vector, NodeType::Tool, top_k, min_similarity),
            index.nearest(&vector, NodeType::Domain, top_k, min_similarity),
        )
    }
}

fn select_candidates(
    registry: &CapabilityRegistry,
    ids: Option<&[String]>,
) -> Arc<[Arc<CapabilityEntry>]> {
    match ids {
        Some(ids) => {
            let mut seen = HashSet::new();
            ids.iter()
                .filter(|id| seen.insert(id.as_str()))
                .filter_map(|id| registry.get(id))
                .cloned()
                .collect()
        }
        None => registry.entries().iter().cloned().collect(),
    }
}
