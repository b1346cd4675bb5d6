//! Rank-based utility weights.

/// Utility of each rank (0 = best) for a population of `lam` individuals.
///
/// Raw weights are `max(0, ln(lam/2 + 1) - ln(i + 1))`, normalized to unit sum and
/// shifted by `-1/lam` so that the utilities sum to zero. Returns an empty vector
/// for `lam == 0`.
pub fn utility_weights(lam: usize) -> Vec<f64> {
    if lam == 0 {
        return Vec::new();
    }
    let lam_f = lam as f64;
    let top = (lam_f / 2.0 + 1.0).ln();
    let mut weights: Vec<f64> = (0..lam)
        .map(|i| (top - ((i + 1) as f64).ln()).max(0.0))
        .collect();
    let w_sum: f64 = weights.iter().sum();
    for w in &mut weights {
        *w = *w / w_sum - 1.0 / lam_f;
    }
    weights
}
