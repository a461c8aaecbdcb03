/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// `part` as a percentage of `total`, 0.0 when `total` is zero.
pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Same as [`pct`] for monetary amounts.
pub fn ratio_pct(part: f64, total: f64) -> f64 {
    if total <= 0.0 {
        0.0
    } else {
        part / total * 100.0
    }
}

/// Averages `field` over `records`. An empty slice averages to 0.0.
pub fn average<T>(records: &[T], field: impl Fn(&T) -> f64) -> f64 {
    let values: Vec<f64> = records.iter().map(field).collect();
    mean(&values)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scored {
        score: f64,
    }

    #[test]
    fn test_average_empty_is_zero() {
        let records: Vec<Scored> = vec![];
        assert_eq!(average(&records, |r| r.score), 0.0);
    }

    #[test]
    fn test_average_two_scores() {
        let records = vec![Scored { score: 80.0 }, Scored { score: 90.0 }];
        assert_eq!(average(&records, |r| r.score), 85.0);
    }

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10, 0), 0.0);
        assert_eq!(ratio_pct(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(pct(50, 100), 50.0);
        assert_eq!(pct(1, 4), 25.0);
        assert_eq!(ratio_pct(250.0, 1000.0), 25.0);
    }

    #[test]
    fn test_stddev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(stddev(&values, mean(&values)), 2.0);
        assert_eq!(stddev(&[], 0.0), 0.0);
    }
}
