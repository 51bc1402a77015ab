use crate::aggregate::{BucketResult, RunningAggregate};
use crate::bucket::BucketWidth;
use crate::error::AggregatorError;
use crate::record::Telemetry;
use crate::timed::Timestamped;
use bytemuck::Zeroable;
use fxhash::FxHashMap;
use spdlog::debug;
use std::time::Duration;

pub struct BucketAggregatorOptions {
    /// Bucket width in the timestamp unit (nanoseconds). Must be positive.
    pub bucket_width_nanos: i64,
    /// Number of buckets to reserve room for up front.
    pub capacity: usize,
}

impl Default for BucketAggregatorOptions {
    fn default() -> Self {
        Self {
            bucket_width_nanos: BucketWidth::TEN_MINUTES.as_nanos(),
            capacity: 0,
        }
    }
}

/// Folds timestamped telemetry into fixed-width time buckets.
///
/// One instance is one sequential pass. Buckets are created lazily on the
/// first record that maps to them and are never materialized for gaps. Use
/// [`BucketAggregator::merge`] to combine instances that ingested disjoint
/// parts of a stream.
#[derive(Debug, Clone)]
pub struct BucketAggregator {
    width: BucketWidth,
    buckets: FxHashMap<i64, RunningAggregate>,
}

impl BucketAggregator {
    pub fn new(options: BucketAggregatorOptions) -> Result<Self, AggregatorError> {
        let width = BucketWidth::from_nanos(options.bucket_width_nanos)?;
        Ok(Self::from_width(width, options.capacity))
    }

    pub fn with_width(width: Duration) -> Result<Self, AggregatorError> {
        Ok(Self::from_width(BucketWidth::from_duration(width)?, 0))
    }

    pub fn from_width(width: BucketWidth, capacity: usize) -> Self {
        debug!(
            "bucket aggregator created: width={}ns capacity={}",
            width.as_nanos(),
            capacity
        );
        Self {
            width,
            buckets: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    pub fn bucket_width(&self) -> BucketWidth {
        self.width
    }

    #[inline(always)]
    pub fn bucket_key(&self, timestamp_nanos: i64) -> i64 {
        self.width.key(timestamp_nanos)
    }

    /// Folds one record into the bucket its timestamp falls in.
    ///
    /// Negative timestamps floor toward negative infinity. Only the bucket for
    /// `timestamp_nanos` is touched, and nothing is allocated unless a new
    /// bucket has to be created in a full map.
    #[inline]
    pub fn ingest<R: Telemetry + ?Sized>(&mut self, record: &R, timestamp_nanos: i64) {
        let key = self.width.key(timestamp_nanos);
        self.buckets
            .entry(key)
            .or_insert_with(RunningAggregate::zeroed)
            .observe(record);
    }

    pub fn ingest_all<T: Timestamped>(&mut self, items: &[T]) {
        for item in items {
            self.ingest(item.record(), item.timestamp_nanos());
        }
    }

    /// Number of non-empty buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn total_observations(&self) -> u64 {
        self.buckets.values().map(|b| b.total_count).sum()
    }

    pub fn get(&self, key: i64) -> Option<&RunningAggregate> {
        self.buckets.get(&key)
    }

    /// Snapshot of every bucket, in no particular order.
    ///
    /// Leaves the running state untouched; ingestion may continue afterwards.
    pub fn finalize(&self) -> impl Iterator<Item = BucketResult> + '_ {
        let width = self.width;
        self.buckets
            .iter()
            .map(move |(&key, agg)| agg.finalize(key, width.start(key)))
    }

    pub fn finalize_sorted(&self) -> Vec<BucketResult> {
        let mut results: Vec<BucketResult> = self.finalize().collect();
        results.sort_unstable_by_key(|r| r.key);
        results
    }

    /// Removes one bucket and returns its finalized result.
    pub fn take(&mut self, key: i64) -> Option<BucketResult> {
        let width = self.width;
        self.buckets
            .remove(&key)
            .map(|agg| agg.finalize(key, width.start(key)))
    }

    /// Consumes every bucket, returning results ordered by key.
    pub fn drain(&mut self) -> Vec<BucketResult> {
        let width = self.width;
        let mut results: Vec<BucketResult> = self
            .buckets
            .drain()
            .map(|(key, agg)| agg.finalize(key, width.start(key)))
            .collect();
        results.sort_unstable_by_key(|r| r.key);
        debug!("drained {} buckets", results.len());
        results
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Adds `other`'s running state into this aggregator, bucket by bucket.
    ///
    /// Nothing is touched when the widths differ.
    pub fn merge_from(&mut self, other: &BucketAggregator) -> Result<(), AggregatorError> {
        self.check_width(other)?;
        for (&key, agg) in &other.buckets {
            self.buckets
                .entry(key)
                .or_insert_with(RunningAggregate::zeroed)
                .merge(agg);
        }
        debug!(
            "merged {} buckets, now holding {}",
            other.buckets.len(),
            self.buckets.len()
        );
        Ok(())
    }

    /// Owning form of [`BucketAggregator::merge_from`].
    ///
    /// Both aggregators are dropped on [`AggregatorError::WidthMismatch`];
    /// use `merge_from` when the running state must survive a failed merge.
    pub fn merge(mut self, other: BucketAggregator) -> Result<Self, AggregatorError> {
        self.merge_from(&other)?;
        Ok(self)
    }

    fn check_width(&self, other: &BucketAggregator) -> Result<(), AggregatorError> {
        if self.width != other.width {
            return Err(AggregatorError::WidthMismatch {
                left: self.width.as_nanos(),
                right: other.width.as_nanos(),
            });
        }
        Ok(())
    }
}
