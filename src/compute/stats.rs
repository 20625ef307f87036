//! Small statistics helpers used by the fitness models.

/// Gini coefficient tolerant of negative values (Gini-RSV).
///
/// The mean absolute difference is normalized by the spread of positive and
/// negative mass instead of the plain mean, so lists mixing signs stay
/// bounded. A single value or an all-zero list has coefficient 0.
pub fn gini_rsv(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.is_empty() {
        return 0.0;
    }

    let numerator: f64 = values
        .iter()
        .map(|a| values.iter().map(|b| (a - b).abs()).sum::<f64>())
        .sum();

    let positive: f64 = values.iter().filter(|v| **v >= 0.0).sum();
    let negative: f64 = values.iter().filter(|v| **v < 0.0).map(|v| v.abs()).sum();

    let mu = (n - 1.0) * (positive + negative) / (n * n);
    if mu == 0.0 {
        return 0.0;
    }
    numerator / (2.0 * n * n * mu)
}

/// Geometric mean of non-negative values; 0 if any value is 0.
pub fn geometric_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if values.iter().any(|v| *v <= 0.0) {
        return 0.0;
    }
    let log_sum: f64 = values.iter().map(|v| v.ln()).sum();
    (log_sum / values.len() as f64).exp()
}
