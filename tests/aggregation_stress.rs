//! Stress tests for the bucketed aggregation engine
//!
//! Runs the coordinator on a multi-threaded runtime with large bucket × tag
//! grids and seeded-random data, asserting that worker interleaving never
//! produces a missing or corrupted row and that results are reproducible
//! bit-for-bit across runs and concurrency bounds.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tagpivot::aggregate::PivotAggregator;
use tagpivot::plan::plan_buckets;
use tagpivot::records::RawRecordSet;
use tagpivot::types::{Bucket, RawRecord};

// ============================================================================
// Helper Functions
// ============================================================================

fn reference() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 6, 15, 8, 0, 0).unwrap()
}

/// Generate a seeded-random record set covering every (bucket, tag) pair
///
/// Roughly a third of the tags behave as boolean flags, the rest as floats;
/// every pair gets between 1 and 4 records so the whole table populates.
fn random_records(buckets: &[Bucket], tags: usize, seed: u64) -> Vec<RawRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::new();
    let mut id = 0;

    for bucket in buckets {
        for tag_idx in 0..tags {
            let tag = format!("tag{:03}", tag_idx);
            let per_pair = rng.gen_range(1..=4);

            for i in 0..per_pair {
                let offset_secs = rng.gen_range(1..=599);
                let ts = bucket.boundary() - Duration::seconds(offset_secs);

                let value = if tag_idx % 3 == 0 {
                    if rng.gen_bool(0.3) { "1" } else { "0" }.to_string()
                } else {
                    format!("{:.3}", rng.gen_range(-50.0..50.0))
                };

                records.push(RawRecord::new(&tag, id + i, value, ts, 192));
            }
            id += per_pair;
        }
    }

    records
}

// ============================================================================
// Stress
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_large_grid_fully_populated() {
    let buckets = plan_buckets(reference(), 16.0); // 97 buckets
    let tags = 20;
    let records = Arc::new(RawRecordSet::new(random_records(&buckets, tags, 42)));

    let table = PivotAggregator::new()
        .with_max_workers(16)
        .aggregate(records, &buckets)
        .await
        .unwrap();

    assert_eq!(table.row_count(), 97);
    assert_eq!(table.column_count(), tags);
    // Every pair had at least one record, so no cell may be unset
    assert_eq!(table.populated_cells(), 97 * tags);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrency_bound_does_not_change_result() {
    let buckets = plan_buckets(reference(), 8.0);
    let records = Arc::new(RawRecordSet::new(random_records(&buckets, 12, 7)));

    let serial = PivotAggregator::new()
        .with_max_workers(1)
        .aggregate(Arc::clone(&records), &buckets)
        .await
        .unwrap();

    for max_workers in [2, 8, 64, 1024] {
        let parallel = PivotAggregator::new()
            .with_max_workers(max_workers)
            .aggregate(Arc::clone(&records), &buckets)
            .await
            .unwrap();
        assert_eq!(serial, parallel, "max_workers={} diverged", max_workers);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_repeated_runs_bit_identical() {
    let buckets = plan_buckets(reference(), 4.0);
    let records = Arc::new(RawRecordSet::new(random_records(&buckets, 10, 99)));
    let aggregator = PivotAggregator::new().with_max_workers(8);

    let baseline = aggregator
        .aggregate(Arc::clone(&records), &buckets)
        .await
        .unwrap();

    for _ in 0..10 {
        let rerun = aggregator
            .aggregate(Arc::clone(&records), &buckets)
            .await
            .unwrap();
        assert_eq!(baseline, rerun);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_sparse_data_leaves_cells_unset() {
    // Records only in every third bucket for a single tag
    let buckets = plan_buckets(reference(), 5.0);
    let mut records = Vec::new();
    for (row, bucket) in buckets.iter().enumerate() {
        if row % 3 == 0 {
            records.push(RawRecord::new(
                "lonely",
                row as i64,
                "4.0",
                bucket.boundary() - Duration::minutes(1),
                192,
            ));
        }
    }
    let expected_populated = buckets.len().div_ceil(3);

    let table = PivotAggregator::new()
        .aggregate(Arc::new(RawRecordSet::new(records)), &buckets)
        .await
        .unwrap();

    assert_eq!(table.populated_cells(), expected_populated);
    assert_eq!(table.get(0, "lonely"), Some("4"));
    assert_eq!(table.get(1, "lonely"), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_one_bad_record_fails_large_run() {
    let buckets = plan_buckets(reference(), 8.0);
    let mut records = random_records(&buckets, 12, 3);
    // Poison one record in the middle of the window with a float-typed tag
    records.push(RawRecord::new(
        "tag001",
        i64::MAX,
        "NaN?",
        reference() - Duration::hours(4) - Duration::minutes(1),
        0,
    ));

    let result = PivotAggregator::new()
        .with_max_workers(16)
        .aggregate(Arc::new(RawRecordSet::new(records)), &buckets)
        .await;

    assert!(matches!(
        result,
        Err(tagpivot::Error::Aggregation(
            tagpivot::AggregationError::BadValue { .. }
        ))
    ));
}
