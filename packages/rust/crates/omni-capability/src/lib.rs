//! omni-capability: hybrid capability retrieval.
//!
//! Given a free-text query and a registry of capability descriptors, returns
//! a ranked, de-duplicated, category-diversified list of matches with an
//! explainable per-signal score.
//!
//! - **Registry**: immutable snapshot of [`CapabilityEntry`] values, loaded
//!   through a [`RegistrySource`].
//! - **Keyword index**: field-weighted BM25 over name, tags and category.
//! - **Fan-out scorer**: six concurrent strategies fused linearly
//!   ([`CapabilitySearchEngine::hybrid_tool_search`]).
//! - **Progressive discovery**: BM25 rank fused with tool/domain embedding rank
//!   by RRF ([`CapabilitySearchEngine::progressive_discovery`]).
//! - **Shaper**: per-category cap and truncation.

pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod keyword;
pub mod registry;
pub mod shaper;
pub mod strategy;

pub use config::{
    EmbeddingBackend, ResolvedSearchSettings, SearchSettings, load_search_settings,
    load_search_settings_from_paths,
};
pub use embedding::{
    EmbeddingHit, EmbeddingIndex, EmbeddingIndexEntry, EmbeddingProvider, HashEmbeddingProvider,
    HttpEmbeddingProvider, NodeType,
};
pub use engine::{CapabilitySearchEngine, RegistrySnapshot, SearchHit, SearchOptions};
pub use error::CapabilityError;
pub use fusion::ScoredCandidate;
pub use keyword::{Bm25Index, KeywordHit};
pub use registry::{
    CapabilityEntry, CapabilityRegistry, JsonFileRegistrySource, RegistrySource,
    StaticRegistrySource, parse_capability_records,
};
pub use strategy::{StrategyKind, StrategyOutput};
