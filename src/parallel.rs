use crate::aggregator::{BucketAggregator, BucketAggregatorOptions};
use crate::bucket::BucketWidth;
use crate::error::AggregatorError;
use crate::timed::Timestamped;
use spdlog::info;
use std::thread;
use std::time::Instant;

pub struct ParallelOptions {
    pub workers: usize,
    /// Pin worker `i` to core `i % cores`.
    pub pin_cores: bool,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(1, |n| n.get()),
            pin_cores: false,
        }
    }
}

/// Folds `items` on several threads and merges the per-thread buckets.
///
/// The input is cut into contiguous chunks, one per worker; every worker owns
/// a private [`BucketAggregator`]. Partial aggregates are merged in worker
/// order, so the result matches a sequential fold up to floating point
/// rounding.
pub fn ingest_parallel<T>(
    options: &BucketAggregatorOptions,
    parallel: &ParallelOptions,
    items: &[T],
) -> Result<BucketAggregator, AggregatorError>
where
    T: Timestamped + Sync,
{
    if parallel.workers == 0 {
        return Err(AggregatorError::NoWorkers);
    }
    let width = BucketWidth::from_nanos(options.bucket_width_nanos)?;
    if items.is_empty() {
        return Ok(BucketAggregator::from_width(width, options.capacity));
    }

    let chunk_size = items.len().div_ceil(parallel.workers);
    let per_worker_capacity = options.capacity.div_ceil(parallel.workers);
    let core_ids = if parallel.pin_cores {
        core_affinity::get_core_ids().unwrap_or_default()
    } else {
        Vec::new()
    };

    info!(
        "parallel ingest: {} records across {} workers (chunk={})",
        items.len(),
        parallel.workers,
        chunk_size
    );
    let started = Instant::now();

    let partials: Vec<Result<BucketAggregator, AggregatorError>> = thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .enumerate()
            .map(|(worker_id, chunk)| {
                let core_id = (!core_ids.is_empty()).then(|| core_ids[worker_id % core_ids.len()]);
                scope.spawn(move || {
                    if let Some(core_id) = core_id {
                        core_affinity::set_for_current(core_id);
                    }
                    let mut aggregator = BucketAggregator::from_width(width, per_worker_capacity);
                    aggregator.ingest_all(chunk);
                    aggregator
                })
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(worker, handle)| {
                handle
                    .join()
                    .map_err(|_| AggregatorError::WorkerPanicked { worker })
            })
            .collect()
    });

    let mut partials = partials.into_iter();
    let mut merged = match partials.next() {
        Some(first) => first?,
        None => BucketAggregator::from_width(width, options.capacity),
    };
    for partial in partials {
        merged = merged.merge(partial?)?;
    }

    info!(
        "parallel ingest done in {:?}: {} buckets",
        started.elapsed(),
        merged.len()
    );
    Ok(merged)
}
