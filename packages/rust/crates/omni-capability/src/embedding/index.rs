//! Embedding index snapshot: tool and domain nodes with nearest-neighbor lookup.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::registry::{CapabilityEntry, CapabilityRegistry};

/// Name prefix marking a category (domain) node.
pub const DOMAIN_NODE_PREFIX: &str = "domain:";

/// Node name for a category label.
#[must_use]
pub fn domain_node_name(category: &str) -> String {
    format!("{DOMAIN_NODE_PREFIX}{category}")
}

/// Kind of embedded node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// A single capability (matched by id or name)
    Tool,
    /// A category label
    Domain,
}

/// One embedded node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingIndexEntry {
    /// Capability id/name, or `domain:<category>`
    pub name: String,
    /// Tool or domain node
    pub node_type: NodeType,
    /// Fixed-length embedding
    pub vector: Vec<f32>,
}

/// A nearest-neighbor match.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingHit {
    /// Node name
    pub name: String,
    /// Node kind
    pub node_type: NodeType,
    /// Cosine similarity to the query vector
    pub similarity: f32,
}

impl EmbeddingHit {
    /// Category label for domain nodes (prefix stripped when present).
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        match self.node_type {
            NodeType::Domain => Some(
                self.name
                    .strip_prefix(DOMAIN_NODE_PREFIX)
                    .unwrap_or(self.name.as_str()),
            ),
            NodeType::Tool => None,
        }
    }
}

/// Read-only snapshot of embedded nodes.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    entries: Vec<EmbeddingIndexEntry>,
}

impl EmbeddingIndex {
    /// Wrap a collaborator-supplied snapshot.
    #[must_use]
    pub fn new(entries: Vec<EmbeddingIndexEntry>) -> Self {
        Self { entries }
    }

    /// Embed every registry entry as a tool node and every category as a
    /// domain node.
    ///
    /// Returns `None` when the provider is unavailable or returns the wrong
    /// number of vectors.
    pub async fn build(
        provider: &dyn EmbeddingProvider,
        registry: &CapabilityRegistry,
    ) -> Option<Self> {
        let mut nodes: Vec<(String, NodeType, String)> = registry
            .iter()
            .map(|entry| (entry.id.clone(), NodeType::Tool, tool_text(entry)))
            .collect();
        let categories: BTreeSet<String> = registry
            .iter()
            .map(|e| e.category.clone())
            .filter(|c| !c.is_empty())
            .collect();
        nodes.extend(
            categories
                .into_iter()
                .map(|c| (domain_node_name(&c), NodeType::Domain, c)),
        );

        if nodes.is_empty() {
            return Some(Self::default());
        }

        let texts: Vec<String> = nodes.iter().map(|(_, _, text)| text.clone()).collect();
        let vectors = provider.embed_batch(&texts).await?;
        if vectors.len() != nodes.len() {
            tracing::warn!(
                event = "capability.embedding.index.size_mismatch",
                provider = provider.name(),
                expected = nodes.len(),
                actual = vectors.len(),
                "embedding provider returned wrong batch size; index not built"
            );
            return None;
        }

        let entries = nodes
            .into_iter()
            .zip(vectors)
            .map(|((name, node_type, _), vector)| EmbeddingIndexEntry {
                name,
                node_type,
                vector,
            })
            .collect();
        Some(Self { entries })
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the snapshot holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All nodes.
    #[must_use]
    pub fn entries(&self) -> &[EmbeddingIndexEntry] {
        &self.entries
    }

    /// Nodes of `node_type` most similar to `query`, best first.
    ///
    /// Only similarities strictly above `min_similarity` are kept; ties break
    /// on name.
    #[must_use]
    pub fn nearest(
        &self,
        query: &[f32],
        node_type: NodeType,
        top_k: usize,
        min_similarity: f32,
    ) -> Vec<EmbeddingHit> {
        let mut hits: Vec<EmbeddingHit> = self
            .entries
            .iter()
            .filter(|e| e.node_type == node_type)
            .filter_map(|e| {
                let similarity = cosine_similarity(query, &e.vector);
                (similarity > min_similarity).then(|| EmbeddingHit {
                    name: e.name.clone(),
                    node_type,
                    similarity,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.name.cmp(&b.name))
        });
        hits.truncate(top_k);
        hits
    }
}

fn tool_text(entry: &CapabilityEntry) -> String {
    let mut text = entry.name.replace(['_', '-', '.'], " ");
    if !entry.description.is_empty() {
        text.push_str(": ");
        text.push_str(&entry.description);
    }
    if !entry.keywords.is_empty() {
        text.push_str(" (");
        text.push_str(&entry.keywords.join(", "));
        text.push(')');
    }
    text
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a
/// zero-norm operand.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
