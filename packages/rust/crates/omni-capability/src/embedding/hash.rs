//! Hash embeddings: FNV-1a feature hashing, no model dependency.

use async_trait::async_trait;

use super::EmbeddingProvider;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Deterministic bag-of-words embedder.
///
/// Each lower-cased alphanumeric word is hashed into one of `dimension`
/// buckets with a hash-derived sign; the result is L2-normalized.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimension: usize,
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self { dimension: 256 }
    }
}

impl HashEmbeddingProvider {
    /// Create an embedder with `dimension` buckets (at least 1).
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Vector length.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed `text` synchronously.
    #[must_use]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = fnv1a(word.as_bytes());
            let bucket = usize::try_from(hash % self.dimension as u64).unwrap_or_default();
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    fn name(&self) -> &str {
        "hash"
    }

    async fn embed_batch(&self, texts: &[String]) -> Option<Vec<Vec<f32>>> {
        Some(texts.iter().map(|t| self.embed(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn test_fnv1a_known_value() {
        assert_eq!(fnv1a(b""), FNV_OFFSET_BASIS);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_embed_is_deterministic_and_normalized() {
        let embedder = HashEmbeddingProvider::new(64);
        let a = embedder.embed("read a file from disk");
        let b = embedder.embed("read a file from disk");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_words_are_similar() {
        let embedder = HashEmbeddingProvider::default();
        let query = embedder.embed("git commit");
        let close = embedder.embed("commit staged changes to git");
        let far = embedder.embed("weather forecast tomorrow");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbeddingProvider::new(8);
        assert!(embedder.embed("   ").iter().all(|v| *v == 0.0));
    }
}
