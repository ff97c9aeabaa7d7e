//! Rank fusion for the two retrieval paths.
//!
//! Layout: `kernels` (RRF term), `types` (scored candidates), `linear`
//! (fixed-weight combination of the six strategy scores), `rrf` (BM25 rank +
//! embedding rank with tool/domain alphas).
//!
//! The two paths produce scores in different spaces and are never merged.

mod kernels;
mod linear;
mod rrf;
mod types;

pub use kernels::{RRF_K, RRF_SCALE, rrf_term};
pub use linear::aggregate;
pub use rrf::{
    BM25_SIGNAL, DOMAIN_ALPHA, DOMAIN_EMBEDDING_SIGNAL, TOOL_ALPHA, TOOL_EMBEDDING_SIGNAL,
    fuse_progressive,
};
pub use types::{ScoredCandidate, sort_candidates};
