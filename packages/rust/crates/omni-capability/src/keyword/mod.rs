//! BM25 keyword index over the capability registry.
//!
//! Each entry becomes a field-weighted bag of words: `name` tokens count three
//! times, `tags` twice, `category` once. Statistics (IDF, average document
//! length) are computed over the whole registry so scores stay comparable
//! across queries against the same snapshot.

pub mod index;
pub mod tokenize;

pub use index::{Bm25Index, KeywordHit};
pub use tokenize::tokenize;

/// BM25 term-frequency saturation.
pub const BM25_K1: f64 = 1.2;

/// BM25 length normalization.
pub const BM25_B: f64 = 0.75;

/// Repetitions of each `name` token in a document.
pub const NAME_FIELD_WEIGHT: usize = 3;
/// Repetitions of each `tags` token in a document.
pub const TAGS_FIELD_WEIGHT: usize = 2;
/// Repetitions of each `category` token in a document.
pub const CATEGORY_FIELD_WEIGHT: usize = 1;
