//! Bm25Index - in-memory Okapi BM25 over weighted capability fields

use std::collections::HashMap;

use rayon::prelude::*;

use super::tokenize::tokenize;
use super::{BM25_B, BM25_K1, CATEGORY_FIELD_WEIGHT, NAME_FIELD_WEIGHT, TAGS_FIELD_WEIGHT};
use crate::registry::CapabilityEntry;

/// A document that matched at least one query token.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordHit {
    /// Capability id
    pub id: String,
    /// BM25 score (always > 0)
    pub score: f64,
}

#[derive(Debug, Clone)]
struct DocumentTerms {
    id: String,
    term_freq: HashMap<String, u32>,
    length: usize,
}

/// Per-snapshot BM25 statistics and token multisets.
///
/// Built once per registry snapshot; rebuild instead of mutating when the
/// registry changes.
#[derive(Debug, Clone, Default)]
pub struct Bm25Index {
    documents: Vec<DocumentTerms>,
    idf: HashMap<String, f64>,
    average_document_length: f64,
}

impl Bm25Index {
    /// Build the index over every entry.
    ///
    /// The statistics depend only on the set of entries, not their order.
    pub fn build<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a CapabilityEntry>,
    {
        let documents: Vec<DocumentTerms> = entries.into_iter().map(document_terms).collect();

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_length = 0usize;
        for doc in &documents {
            total_length += doc.length;
            for token in doc.term_freq.keys() {
                *doc_freq.entry(token.clone()).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let idf = doc_freq
            .into_iter()
            .map(|(token, df)| {
                let df = df as f64;
                (token, ((n - df + 0.5) / (df + 0.5) + 1.0).ln())
            })
            .collect();

        let average_document_length = if documents.is_empty() {
            0.0
        } else {
            total_length as f64 / n
        };

        Self {
            documents,
            idf,
            average_document_length,
        }
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Number of distinct tokens.
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    /// Mean weighted token count per document.
    #[must_use]
    pub fn average_document_length(&self) -> f64 {
        self.average_document_length
    }

    /// IDF for `token`, if it occurs in any document.
    #[must_use]
    pub fn idf(&self, token: &str) -> Option<f64> {
        self.idf.get(token).copied()
    }

    /// Weighted token count of a document.
    #[must_use]
    pub fn document_length(&self, id: &str) -> Option<usize> {
        self.documents.iter().find(|d| d.id == id).map(|d| d.length)
    }

    /// Score every document against `query`, best first.
    ///
    /// Documents sharing no token with the query are excluded. Ties break on
    /// id ascending. `limit` truncates the ranked list when given.
    #[must_use]
    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<KeywordHit> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() || self.documents.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<KeywordHit> = self
            .documents
            .par_iter()
            .filter_map(|doc| {
                let score = self.score_document(doc, &query_tokens);
                (score > 0.0).then(|| KeywordHit {
                    id: doc.id.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = limit {
            hits.truncate(limit);
        }
        hits
    }

    fn score_document(&self, doc: &DocumentTerms, query_tokens: &[String]) -> f64 {
        let length_ratio = if self.average_document_length > 0.0 {
            doc.length as f64 / self.average_document_length
        } else {
            1.0
        };
        let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * length_ratio);

        query_tokens
            .iter()
            .filter_map(|token| {
                let tf = f64::from(*doc.term_freq.get(token)?);
                let idf = self.idf.get(token)?;
                Some(idf * (tf * (BM25_K1 + 1.0)) / (tf + norm))
            })
            .sum()
    }
}

fn document_terms(entry: &CapabilityEntry) -> DocumentTerms {
    let mut term_freq: HashMap<String, u32> = HashMap::new();
    let mut length = 0usize;

    let mut add = |text: &str, weight: usize| {
        for token in tokenize(text) {
            let count = u32::try_from(weight).unwrap_or(u32::MAX);
            *term_freq.entry(token).or_insert(0) += count;
            length += weight;
        }
    };

    add(&entry.name, NAME_FIELD_WEIGHT);
    for tag in &entry.tags {
        add(tag, TAGS_FIELD_WEIGHT);
    }
    add(&entry.category, CATEGORY_FIELD_WEIGHT);

    DocumentTerms {
        id: entry.id.clone(),
        term_freq,
        length,
    }
}
