//! Simple Moving Average with a minimum-observation requirement.
//!
//! Rolling mean over a trailing window of `period` rows. NaN entries do not
//! count as observations; the mean is defined only once the window holds at
//! least `min_periods` valid values. No value at index t depends on t+1 or later.

/// Rolling mean of `values`. Undefined positions are NaN.
pub fn rolling_mean(values: &[f64], period: usize, min_periods: usize) -> Vec<f64> {
    assert!(period >= 1, "SMA period must be >= 1");
    let min_periods = min_periods.clamp(1, period);

    let n = values.len();
    let mut result = vec![f64::NAN; n];
    let mut sum = 0.0;
    let mut count = 0usize;

    for i in 0..n {
        let entering = values[i];
        if !entering.is_nan() {
            sum += entering;
            count += 1;
        }
        if i >= period {
            let leaving = values[i - period];
            if !leaving.is_nan() {
                sum -= leaving;
                count -= 1;
            }
        }
        if count >= min_periods {
            result[i] = sum / count as f64;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn sma_5_basic() {
        let result = rolling_mean(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0], 5, 5);
        assert_eq!(result.len(), 7);
        for v in &result[..4] {
            assert!(v.is_nan());
        }
        assert_approx(result[4], 12.0);
        assert_approx(result[5], 13.0);
        assert_approx(result[6], 14.0);
    }

    #[test]
    fn min_periods_allows_partial_window() {
        let result = rolling_mean(&[10.0, 20.0, 30.0, 40.0], 4, 2);
        assert!(result[0].is_nan());
        assert_approx(result[1], 15.0);
        assert_approx(result[2], 20.0);
        assert_approx(result[3], 25.0);
    }

    #[test]
    fn nan_does_not_count_as_observation() {
        let result = rolling_mean(&[10.0, f64::NAN, 30.0, 50.0], 3, 2);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 20.0);
        assert_approx(result[3], 40.0);
    }

    #[test]
    fn no_lookahead() {
        let full: Vec<f64> = (0..300).map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0).collect();
        let a = rolling_mean(&full, 200, 100);
        let b = rolling_mean(&full[..150], 200, 100);
        for i in 0..150 {
            if a[i].is_nan() {
                assert!(b[i].is_nan());
            } else {
                assert_approx(a[i], b[i]);
            }
        }
    }
}
