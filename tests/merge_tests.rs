use historial_buckets::{
    AggregatorError, BucketAggregator, BucketAggregatorOptions, BucketResult, ParallelOptions,
    SparseReading, ingest_parallel,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WIDTH: i64 = 1_000;

fn options() -> BucketAggregatorOptions {
    BucketAggregatorOptions {
        bucket_width_nanos: WIDTH,
        capacity: 64,
    }
}

fn random_stream(seed: u64, len: usize) -> Vec<(i64, SparseReading)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let ts = rng.random_range(-20 * WIDTH..40 * WIDTH);
            let reading = SparseReading {
                temperature: rng.random_bool(0.9).then(|| rng.random_range(-10.0..40.0)),
                active_power: rng.random_bool(0.9).then(|| rng.random_range(0.0..3500.0)),
                compressor_hz: rng.random_bool(0.5).then(|| rng.random_range(0.0..90.0)),
                alarm_active: rng.random_bool(0.9).then(|| rng.random_range(-1..3)),
            };
            (ts, reading)
        })
        .collect()
}

fn fold(items: &[(i64, SparseReading)]) -> BucketAggregator {
    let mut agg = BucketAggregator::new(options()).unwrap();
    agg.ingest_all(items);
    agg
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

fn assert_same_results(left: &[BucketResult], right: &[BucketResult]) {
    assert_eq!(left.len(), right.len());
    for (l, r) in left.iter().zip(right) {
        assert_eq!(l.key, r.key);
        assert_eq!(l.start_nanos, r.start_nanos);
        assert_eq!(l.total_count, r.total_count);
        assert_eq!(l.alarm_ratio, r.alarm_ratio);
        assert!(close(l.avg_temperature, r.avg_temperature), "{l:?} vs {r:?}");
        assert!(close(l.avg_active_power, r.avg_active_power), "{l:?} vs {r:?}");
        assert!(close(l.avg_compressor_hz, r.avg_compressor_hz), "{l:?} vs {r:?}");
    }
}

#[test]
fn test_merge_matches_sequential_fold() {
    let items = random_stream(1, 20_000);
    let sequential = fold(&items).finalize_sorted();

    let (a, rest) = items.split_at(7_000);
    let (b, c) = rest.split_at(9_500);

    let merged = fold(a)
        .merge(fold(b))
        .unwrap()
        .merge(fold(c))
        .unwrap();
    assert_same_results(&merged.finalize_sorted(), &sequential);
}

#[test]
fn test_merge_is_associative_and_commutative() {
    let items = random_stream(2, 9_000);
    let (a, rest) = items.split_at(3_000);
    let (b, c) = rest.split_at(3_000);

    let left = fold(a).merge(fold(b)).unwrap().merge(fold(c)).unwrap();
    let right = fold(a).merge(fold(b).merge(fold(c)).unwrap()).unwrap();
    let reversed = fold(c).merge(fold(b)).unwrap().merge(fold(a)).unwrap();

    let left = left.finalize_sorted();
    assert_same_results(&left, &right.finalize_sorted());
    assert_same_results(&left, &reversed.finalize_sorted());
}

#[test]
fn test_merge_from_keeps_other_intact() {
    let items = random_stream(3, 1_000);
    let (a, b) = items.split_at(400);

    let mut target = fold(a);
    let source = fold(b);
    target.merge_from(&source).unwrap();

    assert_eq!(source.total_observations(), 600);
    assert_eq!(target.total_observations(), 1_000);
    assert_same_results(&target.finalize_sorted(), &fold(&items).finalize_sorted());
}

#[test]
fn test_merge_with_empty_is_identity() {
    let items = random_stream(4, 500);
    let full = fold(&items);
    let expected = full.finalize_sorted();

    let merged = full.merge(BucketAggregator::new(options()).unwrap()).unwrap();
    assert_eq!(merged.finalize_sorted(), expected);
}

#[test]
fn test_parallel_matches_sequential() {
    let items = random_stream(5, 30_000);
    let sequential = fold(&items).finalize_sorted();

    for workers in [1, 2, 3, 8] {
        let parallel = ingest_parallel(
            &options(),
            &ParallelOptions {
                workers,
                pin_cores: false,
            },
            &items,
        )
        .unwrap();
        assert_same_results(&parallel.finalize_sorted(), &sequential);
    }
}

#[test]
fn test_parallel_rejects_invalid_configuration() {
    let items = random_stream(6, 10);
    let no_workers = ingest_parallel(
        &options(),
        &ParallelOptions {
            workers: 0,
            pin_cores: false,
        },
        &items,
    );
    assert_eq!(no_workers.unwrap_err(), AggregatorError::NoWorkers);

    let bad_width = ingest_parallel(
        &BucketAggregatorOptions {
            bucket_width_nanos: 0,
            capacity: 0,
        },
        &ParallelOptions::default(),
        &items,
    );
    assert_eq!(
        bad_width.unwrap_err(),
        AggregatorError::NonPositiveWidth { width_nanos: 0 }
    );
}

#[test]
fn test_parallel_empty_input() {
    let items: Vec<(i64, SparseReading)> = Vec::new();
    let agg = ingest_parallel(&options(), &ParallelOptions::default(), &items).unwrap();
    assert!(agg.is_empty());
}
