//! Running statistics over deviation values.

use serde::{Deserialize, Serialize};

/// Count, extrema, mean, population variance and RMS over added values.
/// Mergeable, so pooled statistics never need the raw values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueAccumulator {
    count: u64,
    sum: f64,
    sum_sq: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl ValueAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        debug_assert!(value.is_finite());
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn merge(&mut self, other: &ValueAccumulator) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        Some((self.sum_sq / self.count as f64 - mean * mean).max(0.0))
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    pub fn rms(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.sum_sq / self.count as f64).sqrt())
    }
}

/// Least-squares fit `y = gain * x + bias`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    n: u64,
    sx: f64,
    sy: f64,
    sxx: f64,
    sxy: f64,
}

impl LinearFit {
    pub fn add(&mut self, x: f64, y: f64) {
        self.n += 1;
        self.sx += x;
        self.sy += y;
        self.sxx += x * x;
        self.sxy += x * y;
    }

    pub fn merge(&mut self, other: &LinearFit) {
        self.n += other.n;
        self.sx += other.sx;
        self.sy += other.sy;
        self.sxx += other.sxx;
        self.sxy += other.sxy;
    }

    pub fn count(&self) -> u64 {
        self.n
    }

    /// `(gain, bias)`, or `None` with fewer than two distinct x values.
    pub fn gain_bias(&self) -> Option<(f64, f64)> {
        let n = self.n as f64;
        let denom = n * self.sxx - self.sx * self.sx;
        if self.n < 2 || denom.abs() < f64::EPSILON * n * self.sxx.max(1.0) {
            return None;
        }
        let gain = (n * self.sxy - self.sx * self.sy) / denom;
        let bias = (self.sy - gain * self.sx) / n;
        (gain.is_finite() && bias.is_finite()).then_some((gain, bias))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics() {
        let mut acc = ValueAccumulator::new();
        assert_eq!(acc.mean(), None);
        assert_eq!(acc.rms(), None);

        for v in [3.0, -4.0, 5.0, 0.0] {
            acc.add(v);
        }
        assert_eq!(acc.count(), 4);
        assert_eq!(acc.min(), Some(-4.0));
        assert_eq!(acc.max(), Some(5.0));
        assert!((acc.mean().unwrap() - 1.0).abs() < 1e-12);
        assert!((acc.rms().unwrap() - (50.0f64 / 4.0).sqrt()).abs() < 1e-12);
        assert!((acc.variance().unwrap() - (12.5 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let values = [1.5, 2.5, -7.0, 10.0, 0.25];
        let mut all = ValueAccumulator::new();
        values.iter().for_each(|v| all.add(*v));

        let mut left = ValueAccumulator::new();
        let mut right = ValueAccumulator::new();
        values[..2].iter().for_each(|v| left.add(*v));
        values[2..].iter().for_each(|v| right.add(*v));
        left.merge(&right);
        left.merge(&ValueAccumulator::new());

        assert_eq!(left.count(), all.count());
        assert_eq!(left.min(), all.min());
        assert_eq!(left.max(), all.max());
        assert!((left.rms().unwrap() - all.rms().unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit() {
        let mut fit = LinearFit::default();
        for x in [1000.0, 2000.0, 5000.0] {
            fit.add(x, 1.01 * x - 20.0);
        }
        let (gain, bias) = fit.gain_bias().unwrap();
        assert!((gain - 1.01).abs() < 1e-9);
        assert!((bias + 20.0).abs() < 1e-6);

        let mut single = LinearFit::default();
        single.add(1.0, 1.0);
        assert!(single.gain_bias().is_none());
    }
}
