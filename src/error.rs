use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AggregatorError {
    /// Bucket width must be a strictly positive number of nanoseconds.
    #[error("bucket width must be positive, got {width_nanos}ns")]
    NonPositiveWidth { width_nanos: i64 },

    /// The requested width does not fit into a signed 64-bit nanosecond count.
    #[error("bucket width does not fit into i64 nanoseconds")]
    WidthOverflow,

    /// Two aggregators with different bucket widths cannot be merged.
    #[error("cannot merge buckets of different widths: {left}ns vs {right}ns")]
    WidthMismatch { left: i64, right: i64 },

    #[error("parallel ingestion needs at least one worker")]
    NoWorkers,

    #[error("ingest worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}
