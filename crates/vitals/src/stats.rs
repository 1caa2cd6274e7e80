//! Rolling statistics over a metric history.
//!
//! Mean and population standard deviation, with the deviation floored at
//! [`STD_DEV_FLOOR`] so a perfectly flat history never divides by zero.

/// Lower bound applied to the standard deviation before computing z.
pub const STD_DEV_FLOOR: f64 = 1.0;

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Population standard deviation (divides by n, not n-1). Not floored.
pub fn population_std_dev<'a>(values: impl IntoIterator<Item = &'a f64> + Clone) -> f64 {
    let mu = mean(values.clone());
    let (sq, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + (v - mu).powi(2), n + 1));
    if n == 0 {
        0.0
    } else {
        (sq / n as f64).sqrt()
    }
}

/// |value − μ| / max(σ, 1) over `history`.
pub fn z_score<'a>(value: f64, history: impl IntoIterator<Item = &'a f64> + Clone) -> f64 {
    let mu = mean(history.clone());
    let sigma = population_std_dev(history).max(STD_DEV_FLOOR);
    (value - mu).abs() / sigma
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_basic() {
        assert!((mean(&[1.0, 2.0, 3.0, 4.0]) - 2.5).abs() < 1e-12);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn population_std_dev_divides_by_n() {
        // values 2,4,4,4,5,5,7,9 -> population sigma = 2
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std_dev(&v) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn z_score_uses_floor_for_flat_history() {
        let flat = [70.0; 5];
        // sigma = 0 -> floored to 1
        assert!((z_score(73.0, &flat) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn z_score_low_variance_history() {
        let h = [70.0, 71.0, 69.0, 70.0, 72.0];
        // mu = 70.4, sigma = sqrt(1.04) ~ 1.0198
        let z = z_score(118.0, &h);
        assert!((z - (47.6 / 1.04f64.sqrt())).abs() < 1e-9);
    }
}
