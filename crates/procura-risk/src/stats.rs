//! Robust summary statistics over price samples.
//!
//! Callers pass finite values. Sorting uses `f64::total_cmp`, so results
//! do not depend on input order.

/// Sort a sample in place.
pub fn sort_samples(values: &mut [f64]) {
    values.sort_by(f64::total_cmp);
}

/// Median of an already sorted sample.
///
/// Even-sized samples average the two middle values.
pub fn median_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n % 2 == 0 {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    } else {
        Some(sorted[n / 2])
    }
}

/// Median of an unsorted sample.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sort_samples(&mut sorted);
    median_sorted(&sorted)
}

/// Median absolute deviation around `center` (unscaled).
pub fn median_absolute_deviation(values: &[f64], center: f64) -> Option<f64> {
    let deviations: Vec<f64> = values.iter().map(|x| (x - center).abs()).collect();
    median(&deviations)
}

/// Sample standard deviation (n - 1 denominator).
///
/// A single observation has zero spread.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    match n {
        0 => None,
        1 => Some(0.0),
        _ => {
            let mean = values.iter().sum::<f64>() / n as f64;
            let variance =
                values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
            Some(variance.sqrt())
        }
    }
}

/// Percentile with linear interpolation between closest ranks.
///
/// `q` is a fraction in `[0, 1]`.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sort_samples(&mut sorted);

    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Min-max scaling to `[0, 1]`; a degenerate range maps to 0.
pub fn min_max_scale(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range > 0.0 {
        ((value - min) / range).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[400.0, 100.0, 100.0]), Some(100.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_mad() {
        // |x - 100| = [0, 0, 300] -> median 0
        assert_eq!(
            median_absolute_deviation(&[100.0, 100.0, 400.0], 100.0),
            Some(0.0)
        );
        // |x - 3| = [2, 1, 0, 1, 2] -> median 1
        assert_eq!(
            median_absolute_deviation(&[1.0, 2.0, 3.0, 4.0, 5.0], 3.0),
            Some(1.0)
        );
    }

    #[test]
    fn test_sample_std() {
        assert_relative_eq!(
            sample_std(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(),
            2.5_f64.sqrt(),
            epsilon = 1e-12
        );
        assert_eq!(sample_std(&[7.0]), Some(0.0));
        assert_eq!(sample_std(&[]), None);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 1.0), Some(4.0));
        assert_relative_eq!(percentile(&values, 0.5).unwrap(), 2.5);
        assert_eq!(percentile(&values, 1.5), None);
    }

    #[test]
    fn test_min_max_scale_degenerate() {
        assert_eq!(min_max_scale(5.0, 5.0, 5.0), 0.0);
        assert_relative_eq!(min_max_scale(7.5, 5.0, 10.0), 0.5);
    }
}
