//! Running burden statistics.
//!
//! [`BurdenStat`] is a Welford-form accumulator over scalar cost samples,
//! with exponential-decay variants for recency weighting, scaling for
//! cross-run normalization, and unbiased pooling of independent samples.

use serde::{Deserialize, Serialize};

use crate::economy::NormalBurden;

/// Online mean/variance accumulator in Welford form.
///
/// The count is an `f64` because decay makes it fractional: aged samples
/// count for less than one. `variance()` divides by `max(count − 1, 1)` so
/// a single sample reads as zero spread rather than a division by zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BurdenStat {
    count: f64,
    mean: f64,
    sum_sq: f64,
}

impl BurdenStat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an accumulator from summary form (count, mean, standard
    /// deviation), the shape persisted profiles store.
    pub fn from_summary(count: f64, mean: f64, deviation: f64) -> Self {
        Self {
            count,
            mean,
            sum_sq: deviation * deviation * (count - 1.0).max(0.0),
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0.0
    }

    #[inline]
    pub fn count(&self) -> f64 {
        self.count
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sum(&self) -> f64 {
        self.count * self.mean
    }

    pub fn variance(&self) -> f64 {
        self.sum_sq / (self.count - 1.0).max(1.0)
    }

    pub fn deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Mean plus `sigmas` standard deviations.
    pub fn mean_plus_sigmas(&self, sigmas: f64) -> f64 {
        self.mean + sigmas * self.deviation()
    }

    /// The accumulated distribution as a normal-economy burden.
    pub fn burden_norm(&self) -> NormalBurden {
        NormalBurden::new(self.mean(), self.variance())
    }

    /// Incorporate one sample (one Welford step).
    pub fn push(&mut self, burden: f64) {
        let dm = burden - self.mean;
        let dv = if self.count > 0.0 { dm } else { 0.0 };
        self.count += 1.0;
        self.mean += dm / self.count;
        self.sum_sq += dv * (burden - self.mean);
    }

    /// Age the accumulator without a sample: the count decays toward 1 and
    /// the spread toward 0; the mean is untouched. `0 < alpha < 1`.
    pub fn decay(&mut self, alpha: f64) {
        debug_assert!(alpha > 0.0 && alpha < 1.0);
        if !self.has_data() {
            return;
        }
        self.count = 1.0 + (self.count - 1.0) * alpha;
        self.sum_sq *= alpha;
    }

    /// Age, then incorporate one sample (exponential recency weighting).
    pub fn push_decay(&mut self, burden: f64, alpha: f64) {
        debug_assert!(alpha > 0.0 && alpha < 1.0);
        self.count *= alpha;
        let dm = burden - self.mean;
        let dv = if self.count > 0.0 { dm } else { 0.0 };
        self.count += 1.0;
        self.mean += dm / self.count;
        self.sum_sq = self.sum_sq * alpha + dv * (burden - self.mean);
    }

    /// Scale the distribution by `factor`: mean by `factor`, spread by
    /// `factor²`. Used to carry a past run's stats into this run's regime.
    pub fn scale(&mut self, factor: f64) {
        self.mean *= factor;
        self.sum_sq *= factor * factor;
    }

    /// Unbiased combination of two independent accumulators
    /// (O'Neill's pooled-variance formula).
    #[must_use]
    pub fn pool(&self, other: &BurdenStat) -> BurdenStat {
        if !self.has_data() {
            return *other;
        }
        if !other.has_data() {
            return *self;
        }
        let count = self.count + other.count;
        let mean = (self.sum() + other.sum()) / count;
        let diff = other.mean - self.mean;
        let sum_sq = self.sum_sq + other.sum_sq + diff * diff * (self.count * other.count) / count;
        BurdenStat {
            count,
            mean,
            sum_sq,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_mean_var(samples: &[f64]) -> (f64, f64) {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1.0).max(1.0);
        (mean, var)
    }

    #[test]
    fn test_push_matches_naive_formulas() {
        let samples = [3.0, 1.5, 4.25, 0.75, 2.0, 5.5, 3.125, 2.875];
        let mut stat = BurdenStat::new();
        for &s in &samples {
            stat.push(s);
        }
        let (mean, var) = naive_mean_var(&samples);
        assert!((stat.mean() - mean).abs() < 1e-12);
        assert!((stat.variance() - var).abs() < 1e-12);
        assert_eq!(stat.count(), samples.len() as f64);
    }

    #[test]
    fn test_single_sample_has_zero_variance() {
        let mut stat = BurdenStat::new();
        stat.push(7.0);
        assert_eq!(stat.mean(), 7.0);
        assert_eq!(stat.variance(), 0.0);
        assert_eq!(stat.deviation(), 0.0);
    }

    #[test]
    fn test_pool_equals_concatenated_stream() {
        let left = [1.0, 2.0, 3.0, 4.0];
        let right = [10.0, 12.0, 9.5];

        let mut a = BurdenStat::new();
        let mut b = BurdenStat::new();
        let mut whole = BurdenStat::new();
        for &s in &left {
            a.push(s);
            whole.push(s);
        }
        for &s in &right {
            b.push(s);
            whole.push(s);
        }

        let pooled = a.pool(&b);
        assert!((pooled.mean() - whole.mean()).abs() < 1e-12);
        assert!((pooled.variance() - whole.variance()).abs() < 1e-9);
        assert_eq!(pooled.count(), whole.count());
    }

    #[test]
    fn test_pool_with_empty_is_identity() {
        let mut a = BurdenStat::new();
        a.push(2.0);
        a.push(4.0);
        let empty = BurdenStat::new();
        assert_eq!(a.pool(&empty), a);
        assert_eq!(empty.pool(&a), a);
    }

    #[test]
    fn test_decay_shrinks_count_keeps_mean() {
        let mut stat = BurdenStat::new();
        for i in 0..20 {
            stat.push(5.0 + (i % 3) as f64);
        }
        let mean_before = stat.mean();
        let count_before = stat.count();
        let sum_sq_spread = stat.variance();

        stat.decay(0.9);
        assert_eq!(stat.mean(), mean_before);
        assert!(stat.count() < count_before);
        assert!(stat.count() >= 1.0);
        assert!(stat.variance() <= sum_sq_spread * 1.01);

        // Repeated decay converges to a count of one.
        for _ in 0..1000 {
            stat.decay(0.9);
        }
        assert!((stat.count() - 1.0).abs() < 1e-9);
        assert_eq!(stat.mean(), mean_before);
    }

    #[test]
    fn test_decay_on_empty_is_noop() {
        let mut stat = BurdenStat::new();
        stat.decay(0.5);
        assert!(!stat.has_data());
        assert_eq!(stat.count(), 0.0);
    }

    #[test]
    fn test_push_decay_tracks_recent_regime() {
        let mut stat = BurdenStat::new();
        for _ in 0..200 {
            stat.push_decay(1.0, 0.9);
        }
        // A regime shift should dominate within a few dozen samples.
        for _ in 0..100 {
            stat.push_decay(10.0, 0.9);
        }
        assert!(stat.mean() > 9.5, "mean lags regime: {}", stat.mean());
        // Decayed count stays bounded near the effective window 1/(1-alpha).
        assert!(stat.count() < 11.0);
    }

    #[test]
    fn test_scale() {
        let mut stat = BurdenStat::new();
        for &s in &[1.0, 2.0, 3.0] {
            stat.push(s);
        }
        let var = stat.variance();
        stat.scale(2.0);
        assert_eq!(stat.mean(), 4.0);
        assert!((stat.variance() - var * 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_summary_round_trip() {
        let mut stat = BurdenStat::new();
        for &s in &[2.0, 4.0, 6.0, 8.0] {
            stat.push(s);
        }
        let rebuilt = BurdenStat::from_summary(stat.count(), stat.mean(), stat.deviation());
        assert!((rebuilt.mean() - stat.mean()).abs() < 1e-12);
        assert!((rebuilt.variance() - stat.variance()).abs() < 1e-9);
        assert_eq!(rebuilt.count(), stat.count());
    }

    #[test]
    fn test_burden_norm() {
        let mut stat = BurdenStat::new();
        for &s in &[1.0, 3.0] {
            stat.push(s);
        }
        let norm = stat.burden_norm();
        assert_eq!(norm.mean, 2.0);
        assert_eq!(norm.var, 2.0);
    }
}
