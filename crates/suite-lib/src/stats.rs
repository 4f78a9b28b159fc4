//! Deterministic order statistics shared by the SLA evaluator and the
//! recommendation engine

/// Absorbs float noise in `quantile * n` so that exact products such as
/// `0.95 * 100` do not round up to the next rank
const RANK_EPSILON: f64 = 1e-9;

/// Zero-based rank index for `quantile` over `n` sorted values: `ceil(q * n) - 1`
pub fn rank_index(n: usize, quantile: f64) -> usize {
    if n == 0 {
        return 0;
    }
    let rank = (quantile.clamp(0.0, 1.0) * n as f64 - RANK_EPSILON).ceil();
    (rank.max(1.0) as usize - 1).min(n - 1)
}

/// Percentile of an ascending slice using the rank rule above
pub fn percentile_sorted(sorted: &[f64], quantile: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    Some(sorted[rank_index(sorted.len(), quantile)])
}

/// Percentile of arbitrary-order values; the input order never affects the result
pub fn percentile(values: &[f64], quantile: f64) -> Option<f64> {
    let sorted = sorted_copy(values);
    percentile_sorted(&sorted, quantile)
}

/// Ascending copy with a total order, NaN last
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
