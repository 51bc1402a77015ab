mod aggregate;
mod aggregator;
mod bucket;
mod error;
pub mod measure;
mod parallel;
pub mod record;
mod rollover;
mod stage;
mod timed;

pub use crate::aggregate::{BucketResult, MetricSum, RunningAggregate};
pub use crate::aggregator::{BucketAggregator, BucketAggregatorOptions};
pub use crate::bucket::BucketWidth;
pub use crate::error::AggregatorError;
pub use crate::parallel::{ParallelOptions, ingest_parallel};
pub use crate::record::{Field, FieldKind, HistoryLog, SparseReading, Telemetry, Value};
pub use crate::rollover::{Rollover, rollover};
pub use crate::stage::{OutputCollector, Pipeline, Stage, StageExt};
pub use crate::timed::{TimedLog, Timestamped};
