mod synthetic;

use clap::Parser;
use historial_buckets::measure::LatencyMeasurer;
use historial_buckets::{
    BucketAggregator, BucketAggregatorOptions, BucketResult, Field, ParallelOptions, Stage,
    TimedLog, ingest_parallel, pipe, rollover,
};
use spdlog::prelude::*;
use std::time::Instant;
use synthetic::{LogGenerator, MINUTE_NANOS};

#[derive(Parser)]
struct Args {
    #[arg(long, default_value_t = 1_000_000)]
    records: usize,
    #[arg(long, default_value_t = 10)]
    bucket_minutes: i64,
    /// More than one worker materializes the input and folds it in parallel.
    #[arg(long, default_value_t = 1)]
    workers: usize,
    #[arg(long)]
    pin_cores: bool,
    /// Emit buckets as the stream rolls over instead of finalizing at the end.
    #[arg(long)]
    streaming: bool,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value_t = 1000)]
    sample_rate: u64,
}

fn options(args: &Args) -> BucketAggregatorOptions {
    let width = args.bucket_minutes * MINUTE_NANOS;
    BucketAggregatorOptions {
        bucket_width_nanos: width,
        capacity: args.records / (args.bucket_minutes.max(1) as usize) + 1,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    spdlog::init_env_level()?;
    let args = Args::parse();

    info!(
        "[System] Folding {} synthetic logs into {}-minute buckets...",
        args.records, args.bucket_minutes
    );
    let generator = LogGenerator::new(args.seed, 0);
    let started = Instant::now();

    let results: Vec<BucketResult> = if args.streaming {
        let mut stage = pipe![
            // Logs without a temperature reading are dropped before bucketing
            |t: &TimedLog| t.log.is_present(Field::Temperature).then_some(*t),
            rollover(options(&args))?
        ];
        let mut results = Vec::new();
        for timed in generator.take(args.records) {
            stage.process(&timed, &mut |r: &BucketResult| results.push(*r));
        }
        stage.second().flush(&mut |r: &BucketResult| results.push(*r));
        results
    } else if args.workers > 1 {
        let logs: Vec<TimedLog> = generator.take(args.records).collect();
        info!("[System] Generated {} logs in {:?}", logs.len(), started.elapsed());
        let parallel = ParallelOptions {
            workers: args.workers,
            pin_cores: args.pin_cores,
        };
        ingest_parallel(&options(&args), &parallel, &logs)?.finalize_sorted()
    } else {
        let mut aggregator = BucketAggregator::new(options(&args))?;
        let mut measurer = LatencyMeasurer::new(args.sample_rate)?;
        for timed in generator.take(args.records) {
            let _guard = measurer.measure_with_guard();
            aggregator.ingest(&timed.log, timed.timestamp_nanos);
        }
        info!("[Latency/ingest] {}", measurer.format_stats());
        aggregator.finalize_sorted()
    };

    let elapsed = started.elapsed();
    info!("[System] Done in {:.3}s", elapsed.as_secs_f64());
    info!(
        "[System] Throughput: {:.0} logs/s",
        args.records as f64 / elapsed.as_secs_f64()
    );
    info!("[System] Buckets calculated: {}", results.len());
    if let Some(first) = results.first() {
        debug!("[System] First bucket: {:?}", first);
    }

    Ok(())
}
