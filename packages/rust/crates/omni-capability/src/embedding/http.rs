//! Remote embeddings over HTTP.
//!
//! Request: `POST {base_url}/embed/batch` with `{"texts": [...], "model": ...}`.
//! Response: `{"vectors": [[f32; d]; n]}` with one vector per text.
//!
//! The first accepted batch pins the width `d`. Later batches of another
//! width are rejected, as are short batches, ragged or empty vectors and
//! non-finite components. Every rejection surfaces as `None`.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;

#[derive(Serialize)]
struct EmbedBatchRequest<'a> {
    texts: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
struct EmbedBatchResponse {
    #[serde(default)]
    vectors: Option<Vec<Vec<f32>>>,
}

/// Why a batch was not accepted.
#[derive(Debug, thiserror::Error)]
enum BatchRejected {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("server answered {0}")]
    Status(StatusCode),
    #[error("undecodable response body: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("response carries no `vectors` field")]
    MissingVectors,
    #[error("expected {expected} vectors, got {actual}")]
    Count { expected: usize, actual: usize },
    #[error("zero-length vector")]
    EmptyVector,
    #[error("vector width {actual}, expected {expected}")]
    Width { expected: usize, actual: usize },
    #[error("non-finite vector component")]
    NonFinite,
}

impl BatchRejected {
    fn reason(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::Decode(_) => "decode",
            Self::MissingVectors => "missing_vectors",
            Self::Count { .. } => "count",
            Self::EmptyVector => "empty_vector",
            Self::Width { .. } => "width",
            Self::NonFinite => "non_finite",
        }
    }
}

/// Embedding client for an `/embed/batch` service.
pub struct HttpEmbeddingProvider {
    client: Client,
    base_url: String,
    endpoint: String,
    model: Option<String>,
    dimension: OnceLock<usize>,
}

impl HttpEmbeddingProvider {
    /// Create a client with a per-request timeout.
    ///
    /// A blank `model` is treated as absent.
    #[must_use]
    pub fn new(base_url: &str, timeout_secs: u64, model: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            client,
            endpoint: format!("{base_url}/embed/batch"),
            base_url,
            model: model
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            dimension: OnceLock::new(),
        }
    }

    /// Endpoint base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Vector width pinned by the first accepted batch.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BatchRejected> {
        let request = EmbedBatchRequest {
            texts,
            model: self.model.as_deref(),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(BatchRejected::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(BatchRejected::Status(status));
        }
        let body: EmbedBatchResponse = response.json().await.map_err(BatchRejected::Decode)?;
        let vectors = body.vectors.ok_or(BatchRejected::MissingVectors)?;

        let width = check_batch(&vectors, texts.len(), self.dimension())?;
        let pinned = *self.dimension.get_or_init(|| width);
        if pinned != width {
            return Err(BatchRejected::Width {
                expected: pinned,
                actual: width,
            });
        }
        Ok(vectors)
    }
}

/// Validate a non-empty batch and return its common width.
fn check_batch(
    vectors: &[Vec<f32>],
    expected_count: usize,
    pinned: Option<usize>,
) -> Result<usize, BatchRejected> {
    if vectors.len() != expected_count {
        return Err(BatchRejected::Count {
            expected: expected_count,
            actual: vectors.len(),
        });
    }
    let width = pinned
        .or_else(|| vectors.first().map(Vec::len))
        .unwrap_or_default();
    if width == 0 {
        return Err(BatchRejected::EmptyVector);
    }
    for vector in vectors {
        if vector.len() != width {
            return Err(BatchRejected::Width {
                expected: width,
                actual: vector.len(),
            });
        }
        if !vector.iter().all(|x| x.is_finite()) {
            return Err(BatchRejected::NonFinite);
        }
    }
    Ok(width)
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn embed_batch(&self, texts: &[String]) -> Option<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Some(Vec::new());
        }
        let started = Instant::now();
        match self.request_batch(texts).await {
            Ok(vectors) => {
                tracing::debug!(
                    event = "capability.embedding.http.completed",
                    vectors = vectors.len(),
                    dimension = self.dimension(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "embedding batch accepted"
                );
                Some(vectors)
            }
            Err(rejected) => {
                tracing::debug!(
                    event = "capability.embedding.http.rejected",
                    endpoint = %self.endpoint,
                    reason = rejected.reason(),
                    error = %rejected,
                    elapsed_ms = started.elapsed().as_millis(),
                    "embedding batch rejected"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_batch_accepts_uniform_width() {
        let vectors = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        assert_eq!(check_batch(&vectors, 2, None).unwrap(), 3);
        assert_eq!(check_batch(&vectors, 2, Some(3)).unwrap(), 3);
    }

    #[test]
    fn test_check_batch_rejections() {
        let ragged = vec![vec![1.0, 0.0], vec![1.0]];
        assert!(matches!(
            check_batch(&ragged, 2, None),
            Err(BatchRejected::Width { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            check_batch(&[vec![1.0]], 2, None),
            Err(BatchRejected::Count { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            check_batch(&[Vec::new()], 1, None),
            Err(BatchRejected::EmptyVector)
        ));
        assert!(matches!(
            check_batch(&[vec![1.0, 2.0]], 1, Some(3)),
            Err(BatchRejected::Width { expected: 3, actual: 2 })
        ));
        assert!(matches!(
            check_batch(&[vec![f32::NAN]], 1, None),
            Err(BatchRejected::NonFinite)
        ));
    }

    #[test]
    fn test_blank_model_is_dropped() {
        let provider = HttpEmbeddingProvider::new("http://127.0.0.1:1/", 1, Some("  ".into()));
        assert_eq!(provider.base_url(), "http://127.0.0.1:1");
        assert!(provider.model.is_none());
        assert_eq!(provider.endpoint, "http://127.0.0.1:1/embed/batch");
    }
}
