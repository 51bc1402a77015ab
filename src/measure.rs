//! Sampled latency measurement for the ingest loop.

use hdrhistogram::{CreationError, Histogram};
use std::time::{Duration, Instant};

const MAX_TRACKABLE_NANOS: u64 = 1_000_000_000_000;

/// Latency distribution summary, all values in nanoseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
}

/// Records one in every `sample_rate` measurements into an HdrHistogram.
///
/// Ingest calls take a few nanoseconds each, so timing all of them would
/// dominate the loop being measured. Sampling keeps the clock reads rare.
pub struct LatencyMeasurer {
    histogram: Histogram<u64>,
    sample_rate: u64,
    step: u64,
}

/// Times the scope it lives in; records on drop if the step was sampled.
pub struct LatencyGuard<'a> {
    measurer: &'a mut LatencyMeasurer,
    start: Option<Instant>,
}

impl Drop for LatencyGuard<'_> {
    fn drop(&mut self) {
        if let Some(start) = self.start {
            self.measurer.record(start.elapsed());
        }
    }
}

impl LatencyMeasurer {
    /// `sample_rate` of `0` is treated as `1` (measure everything).
    pub fn new(sample_rate: u64) -> Result<Self, CreationError> {
        // 1ns .. 1000s, 3 significant figures
        let histogram = Histogram::<u64>::new_with_bounds(1, MAX_TRACKABLE_NANOS, 3)?;
        Ok(Self {
            histogram,
            sample_rate: sample_rate.max(1),
            step: 0,
        })
    }

    #[inline(always)]
    fn sampled(&mut self) -> bool {
        self.step += 1;
        self.step.is_multiple_of(self.sample_rate)
    }

    fn record(&mut self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos())
            .unwrap_or(u64::MAX)
            .clamp(1, MAX_TRACKABLE_NANOS);
        self.histogram.saturating_record(nanos);
    }

    pub fn measure(&mut self, duration: Duration) {
        if self.sampled() {
            self.record(duration);
        }
    }

    #[inline(always)]
    pub fn measure_with_guard(&mut self) -> LatencyGuard<'_> {
        let start = if self.sampled() {
            Some(Instant::now())
        } else {
            None
        };
        LatencyGuard {
            measurer: self,
            start,
        }
    }

    pub fn reset(&mut self) {
        self.histogram.reset();
        self.step = 0;
    }

    pub fn stats(&self) -> LatencyStats {
        let count = self.histogram.len();
        if count == 0 {
            return LatencyStats::default();
        }
        LatencyStats {
            count,
            min: self.histogram.min(),
            max: self.histogram.max(),
            mean: self.histogram.mean(),
            p50: self.histogram.value_at_quantile(0.5),
            p90: self.histogram.value_at_quantile(0.9),
            p99: self.histogram.value_at_quantile(0.99),
            p999: self.histogram.value_at_quantile(0.999),
        }
    }

    pub fn format_stats(&self) -> String {
        let stats = self.stats();
        if stats.count == 0 {
            return "no samples".into();
        }
        format!(
            "samples={} min={} mean={} p50={} p99={} p999={} max={}",
            stats.count,
            format_nanos(stats.min as f64),
            format_nanos(stats.mean),
            format_nanos(stats.p50 as f64),
            format_nanos(stats.p99 as f64),
            format_nanos(stats.p999 as f64),
            format_nanos(stats.max as f64),
        )
    }
}

pub(crate) fn format_nanos(nanos: f64) -> String {
    if nanos < 1000.0 {
        format!("{:.1}ns", nanos)
    } else if nanos < 1_000_000.0 {
        format!("{:.1}us", nanos / 1000.0)
    } else if nanos < 1_000_000_000.0 {
        format!("{:.1}ms", nanos / 1_000_000.0)
    } else {
        format!("{:.2}s", nanos / 1_000_000_000.0)
    }
}
