use crate::aggregate::BucketResult;
use crate::aggregator::{BucketAggregator, BucketAggregatorOptions};
use crate::error::AggregatorError;
use crate::stage::{OutputCollector, Stage};
use crate::timed::TimedLog;
use spdlog::debug;

/// Streams bucket results out of an in-order feed of logs.
///
/// Each input is folded into its bucket. When an input lands in a different
/// bucket than the one before it, the previous bucket is evicted and its
/// result pushed downstream, so memory stays bounded by the number of buckets
/// in flight. A log that goes back to an already emitted bucket opens a new
/// partial bucket for that key.
pub struct Rollover {
    aggregator: BucketAggregator,
    current: Option<i64>,
    emitted: u64,
}

impl Rollover {
    pub fn new(options: BucketAggregatorOptions) -> Result<Self, AggregatorError> {
        Ok(Self {
            aggregator: BucketAggregator::new(options)?,
            current: None,
            emitted: 0,
        })
    }

    /// Buckets still open, i.e. not yet pushed downstream.
    pub fn pending(&self) -> &BucketAggregator {
        &self.aggregator
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Pushes every open bucket, in key order, and resets the stage.
    pub fn flush<C>(&mut self, collector: &mut C)
    where
        C: OutputCollector<BucketResult>,
    {
        let results = self.aggregator.drain();
        debug!("rollover flush: {} open buckets", results.len());
        for result in &results {
            collector.push(result);
        }
        self.emitted += results.len() as u64;
        self.current = None;
    }
}

impl Stage<TimedLog, BucketResult> for Rollover {
    #[inline(always)]
    fn process<C>(&mut self, data: &TimedLog, collector: &mut C)
    where
        C: OutputCollector<BucketResult>,
    {
        let key = self.aggregator.bucket_key(data.timestamp_nanos);
        if let Some(prev) = self.current
            && prev != key
            && let Some(done) = self.aggregator.take(prev)
        {
            collector.push(&done);
            self.emitted += 1;
        }
        self.current = Some(key);
        self.aggregator.ingest(&data.log, data.timestamp_nanos);
    }
}

pub fn rollover(options: BucketAggregatorOptions) -> Result<Rollover, AggregatorError> {
    Rollover::new(options)
}
