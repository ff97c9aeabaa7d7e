//! RRF term kernel.

/// RRF smoothing constant.
pub const RRF_K: f64 = 20.0;

/// Readability multiplier for RRF terms; cancels out under sorting.
pub const RRF_SCALE: f64 = 1000.0;

/// RRF term for the item at 0-based `position`: `1000 / (k + position + 1)`.
///
/// `position + 1` is the 1-indexed rank.
#[inline]
#[must_use]
pub fn rrf_term(k: f64, position: usize) -> f64 {
    let rank = f64::from(u32::try_from(position).unwrap_or(u32::MAX)) + 1.0;
    RRF_SCALE / (k + rank)
}

#[cfg(test)]
mod tests {
    use super::{RRF_K, rrf_term};

    #[test]
    fn test_rrf_term() {
        assert!((rrf_term(RRF_K, 0) - 1000.0 / 21.0).abs() < 1e-9);
        assert!((rrf_term(RRF_K, 1) - 1000.0 / 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_rrf_term_decreasing() {
        assert!(rrf_term(RRF_K, 3) < rrf_term(RRF_K, 2));
    }
}
