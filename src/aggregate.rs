use crate::record::Telemetry;
use bytemuck::{Pod, Zeroable};

/// Compensated running sum of one metric plus the number of observations.
///
/// Uses Neumaier summation so long runs of small `f32` readings keep their
/// low-order bits; the mean is `(sum + compensation) / count`. Infinite and
/// NaN readings propagate exactly as in a plain `f64` sum.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct MetricSum {
    sum: f64,
    compensation: f64,
    count: u64,
}

impl MetricSum {
    #[inline(always)]
    fn accumulate(&mut self, value: f64) {
        let t = self.sum + value;
        // Non-finite sums are sticky; the compensation term stays finite.
        if !t.is_finite() {
            self.sum = t;
            return;
        }
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    #[inline(always)]
    pub fn observe(&mut self, value: f64) {
        self.accumulate(value);
        self.count += 1;
    }

    pub fn merge(&mut self, other: &MetricSum) {
        self.accumulate(other.sum);
        self.compensation += other.compensation;
        self.count += other.count;
    }

    pub fn total(&self) -> f64 {
        if self.sum.is_finite() {
            self.sum + self.compensation
        } else {
            self.sum
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Average of the observed values, `0` when nothing was observed.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total() / self.count as f64
        }
    }
}

/// Running statistics of one bucket.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct RunningAggregate {
    pub temperature: MetricSum,
    pub active_power: MetricSum,
    pub compressor_hz: MetricSum,
    pub alarm_count: u64,
    pub total_count: u64,
}

impl RunningAggregate {
    /// Folds the present aggregated slots of `record` into the bucket.
    #[inline(always)]
    pub fn observe<R: Telemetry + ?Sized>(&mut self, record: &R) {
        if let Some(v) = record.temperature() {
            self.temperature.observe(v as f64);
        }
        if let Some(v) = record.active_power() {
            self.active_power.observe(v as f64);
        }
        if let Some(v) = record.compressor_hz() {
            self.compressor_hz.observe(v as f64);
        }
        if let Some(alarm) = record.alarm_active()
            && alarm > 0
        {
            self.alarm_count += 1;
        }
        self.total_count += 1;
    }

    pub fn merge(&mut self, other: &RunningAggregate) {
        self.temperature.merge(&other.temperature);
        self.active_power.merge(&other.active_power);
        self.compressor_hz.merge(&other.compressor_hz);
        self.alarm_count += other.alarm_count;
        self.total_count += other.total_count;
    }

    pub fn alarm_ratio(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.alarm_count as f64 / self.total_count as f64
        }
    }

    pub fn finalize(&self, key: i64, start_nanos: i64) -> BucketResult {
        BucketResult {
            key,
            start_nanos,
            avg_temperature: self.temperature.mean(),
            avg_active_power: self.active_power.mean(),
            avg_compressor_hz: self.compressor_hz.mean(),
            alarm_ratio: self.alarm_ratio(),
            total_count: self.total_count,
        }
    }
}

/// Finalized statistics of one bucket.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BucketResult {
    pub key: i64,
    /// First nanosecond covered by the bucket.
    pub start_nanos: i64,
    pub avg_temperature: f64,
    pub avg_active_power: f64,
    pub avg_compressor_hz: f64,
    pub alarm_ratio: f64,
    pub total_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SparseReading;

    #[test]
    fn test_empty_aggregate_finalizes_to_zero() {
        let agg = RunningAggregate::zeroed();
        let res = agg.finalize(3, 30);
        assert_eq!(res.avg_temperature, 0.0);
        assert_eq!(res.avg_active_power, 0.0);
        assert_eq!(res.avg_compressor_hz, 0.0);
        assert_eq!(res.alarm_ratio, 0.0);
        assert_eq!(res.total_count, 0);
        assert_eq!((res.key, res.start_nanos), (3, 30));
    }

    #[test]
    fn test_negative_alarm_code_is_not_an_alarm() {
        let mut agg = RunningAggregate::zeroed();
        agg.observe(&SparseReading {
            alarm_active: Some(-1),
            ..Default::default()
        });
        agg.observe(&SparseReading {
            alarm_active: Some(0),
            ..Default::default()
        });
        agg.observe(&SparseReading {
            alarm_active: Some(4),
            ..Default::default()
        });
        assert_eq!(agg.alarm_count, 1);
        assert_eq!(agg.total_count, 3);
    }

    #[test]
    fn test_compensated_sum_keeps_small_terms() {
        let mut sum = MetricSum::default();
        sum.observe(1e16);
        for _ in 0..1000 {
            sum.observe(1.0);
        }
        sum.observe(-1e16);
        assert_eq!(sum.total(), 1000.0);
        assert_eq!(sum.count(), 1002);
    }

    #[test]
    fn test_infinite_reading_gives_infinite_mean() {
        let mut sum = MetricSum::default();
        sum.observe(21.5);
        sum.observe(f64::INFINITY);
        sum.observe(3.0);
        assert_eq!(sum.total(), f64::INFINITY);
        assert_eq!(sum.mean(), f64::INFINITY);

        let mut neg = MetricSum::default();
        neg.observe(f64::NEG_INFINITY);
        assert_eq!(neg.mean(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_overflowing_sum_saturates_to_infinity() {
        let mut sum = MetricSum::default();
        sum.observe(f64::MAX);
        sum.observe(f64::MAX);
        assert_eq!(sum.total(), f64::INFINITY);
        assert!(!sum.mean().is_nan());
    }

    #[test]
    fn test_merge_keeps_infinite_partial() {
        let mut a = MetricSum::default();
        a.observe(1.0);
        let mut b = MetricSum::default();
        b.observe(f64::INFINITY);
        a.merge(&b);
        assert_eq!(a.total(), f64::INFINITY);
        assert_eq!(a.count(), 2);
    }

    #[test]
    fn test_merge_adds_counts_and_sums() {
        let mut a = MetricSum::default();
        a.observe(1.5);
        let mut b = MetricSum::default();
        b.observe(2.5);
        b.observe(3.0);
        a.merge(&b);
        assert_eq!(a.count(), 3);
        assert_eq!(a.total(), 7.0);
        assert!((a.mean() - 7.0 / 3.0).abs() < 1e-12);
    }
}
