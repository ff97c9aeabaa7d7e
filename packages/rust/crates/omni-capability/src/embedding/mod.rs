//! Embedding side channel for progressive discovery.
//!
//! The embedding collaborator owns two things: a provider that turns text
//! into vectors ([`EmbeddingProvider`]) and a pre-built [`EmbeddingIndex`] of
//! tool and domain nodes. Both are optional; when either is missing the
//! engine ranks with BM25 alone.

mod hash;
mod http;
mod index;

use std::sync::Arc;

use async_trait::async_trait;

pub use hash::HashEmbeddingProvider;
pub use http::HttpEmbeddingProvider;
pub use index::{
    DOMAIN_NODE_PREFIX, EmbeddingHit, EmbeddingIndex, EmbeddingIndexEntry, NodeType,
    cosine_similarity, domain_node_name,
};

use crate::config::{EmbeddingBackend, ResolvedSearchSettings};

/// Text-to-vector provider.
///
/// Every failure mode (network, model, decoding) is reported as `None`;
/// callers degrade instead of erroring.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Embed a batch of texts, one vector per text, or `None` if unavailable.
    async fn embed_batch(&self, texts: &[String]) -> Option<Vec<Vec<f32>>>;

    /// Embed a single query, or `None` if unavailable.
    async fn embed_query(&self, text: &str) -> Option<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await
            .and_then(|vectors| vectors.into_iter().next())
    }
}

/// Build the provider selected by settings, if any.
#[must_use]
pub fn provider_from_settings(
    settings: &ResolvedSearchSettings,
) -> Option<Arc<dyn EmbeddingProvider>> {
    match settings.embedding_backend {
        EmbeddingBackend::None => None,
        EmbeddingBackend::Hash => Some(Arc::new(HashEmbeddingProvider::new(
            settings.embedding_dimension,
        ))),
        EmbeddingBackend::Http => {
            let Some(url) = settings.embedding_client_url.as_deref() else {
                tracing::warn!(
                    event = "capability.embedding.http.missing_url",
                    "http embedding backend selected without client_url; embeddings disabled"
                );
                return None;
            };
            Some(Arc::new(HttpEmbeddingProvider::new(
                url,
                settings.embedding_timeout_secs,
                settings.embedding_model.clone(),
            )))
        }
    }
}
