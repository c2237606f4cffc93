//! Rolling sample standard deviation of close prices.
//!
//! Uses the sample estimator (divide by N - 1), the convention of rolling
//! window statistics in the price-analysis tooling the strategy was built
//! with. Lookback: period - 1; period must be at least 2.

use crate::components::indicator::Indicator;

#[derive(Debug, Clone)]
pub struct RollingStd {
    period: usize,
    name: String,
}

impl RollingStd {
    pub fn new(period: usize) -> Self {
        debug_assert!(period >= 2, "stddev period must be >= 2");
        Self {
            period: period.max(2),
            name: format!("stddev_{period}"),
        }
    }
}

impl Indicator for RollingStd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, closes: &[f64]) -> Vec<f64> {
        let n = closes.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &closes[i + 1 - self.period..=i];
            let mean = window.iter().sum::<f64>() / self.period as f64;
            let ss: f64 = window.iter().map(|c| (c - mean) * (c - mean)).sum();
            result[i] = (ss / (self.period - 1) as f64).sqrt();
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sample_stddev_of_three() {
        // (2, 4, 6): mean 4, squared deviations 8, / 2 = 4, sqrt = 2
        let result = RollingStd::new(3).compute(&[2.0, 4.0, 6.0, 6.0]);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 2.0, DEFAULT_EPSILON);
        // (4, 6, 6): mean 16/3
        let m = 16.0 / 3.0;
        let expected = (((4.0 - m) * (4.0 - m) + 2.0 * (6.0 - m) * (6.0 - m)) / 2.0f64).sqrt();
        assert_approx(result[3], expected, DEFAULT_EPSILON);
    }

    #[test]
    fn constant_price_has_zero_deviation() {
        let result = RollingStd::new(3).compute(&[1.1; 5]);
        for v in &result[2..] {
            assert_approx(*v, 0.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn stddev_lookback() {
        assert_eq!(RollingStd::new(20).lookback(), 19);
    }
}
