//! Bucketed aggregation engine
//!
//! This is the core of the crate: given the fetched record set and the
//! planned bucket sequence, compute one aggregate cell per (bucket, tag)
//! pair and assemble the pivot table.
//!
//! # Aggregation rule
//!
//! Tag values are heterogeneous: some tags are boolean flags stored as the
//! literal strings `"0"`/`"1"`, others are continuous floats. Per cell, the
//! records inside the bucket window are scanned in retrieval order:
//!
//! - a literal `"1"` wins immediately (a flag that fired at all during the
//!   bucket flags the whole bucket) and the scan stops;
//! - a literal `"0"` resets the accumulator to integer zero;
//! - anything else is parsed as a float and added to the accumulator.
//!
//! If the accumulator ends as integer zero the cell is `"0"`; a float
//! landing on exactly 0.0 or 1.0 renders `"0.0"` / `"1.0"`; any other sum
//! is divided by the record count and rendered with 5 significant digits.
//! An unparseable value fails the entire run.
//!
//! # Concurrency model
//!
//! One task per bucket, spawned into a `JoinSet` behind a semaphore that
//! bounds how many run at once. Each worker owns exactly one row and builds
//! it locally; nothing is shared mutably. The coordinator drains the join
//! set (the completion barrier), then copies every staged row into the
//! authoritative table in a single sequential reconciliation pass, so a
//! caller can never observe a partially populated table. Any worker error
//! or panic fails the whole run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, trace};

use crate::config::AggregationConfig;
use crate::error::{AggregationError, Result};
use crate::pivot::{PivotTable, Row};
use crate::records::RawRecordSet;
use crate::types::Bucket;

// ============================================================================
// Cell aggregation rule
// ============================================================================

/// Running accumulator for one cell scan
///
/// The integer/float distinction is significant for finalization: a zero
/// reached only through `"0"` literals renders `"0"`, while float
/// accumulation that happens to land on 0.0 or 1.0 renders `"0.0"`/`"1.0"`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Accumulator {
    Integer(i64),
    Float(f64),
}

impl Accumulator {
    fn as_f64(self) -> f64 {
        match self {
            Accumulator::Integer(n) => n as f64,
            Accumulator::Float(x) => x,
        }
    }
}

/// Compute the aggregate cell for one (bucket, tag) pair
///
/// `values` must be the value strings of the matching records in retrieval
/// order. Returns `Ok(None)` when there are no records (the cell stays
/// unset), `Ok(Some(..))` with the formatted cell otherwise.
pub fn aggregate_values<'a, I>(
    values: I,
    bucket: Bucket,
    tag: &str,
) -> std::result::Result<Option<String>, AggregationError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut acc = Accumulator::Integer(0);
    let mut count: usize = 0;

    for value in values {
        count += 1;
        match value {
            // Boolean override: a single "on" observation wins outright,
            // later records are never inspected
            "1" => return Ok(Some("1".to_string())),
            "0" => acc = Accumulator::Integer(0),
            other => {
                let parsed: f64 =
                    other
                        .trim()
                        .parse()
                        .map_err(|_| AggregationError::BadValue {
                            bucket: bucket.boundary(),
                            tag: tag.to_string(),
                            value: other.to_string(),
                        })?;
                acc = Accumulator::Float(acc.as_f64() + parsed);
            }
        }
    }

    if count == 0 {
        return Ok(None);
    }

    Ok(Some(match acc {
        Accumulator::Integer(n) => format!("{}", n),
        Accumulator::Float(x) if x == 0.0 => "0.0".to_string(),
        Accumulator::Float(x) if x == 1.0 => "1.0".to_string(),
        Accumulator::Float(sum) => format_significant(sum / count as f64, 5),
    }))
}

/// Render a float with the given number of significant digits
///
/// Matches `%.5g`-style output: trailing zeros stripped, plain decimal
/// notation inside the exponent range `[-4, digits)`, otherwise scientific
/// notation with a signed two-digit exponent.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    // Normalize through exponent form to learn the decimal exponent after
    // rounding (e.g. 0.99999 at 4 digits carries into 1.000e0)
    let exp_form = format!("{:.*e}", digits.saturating_sub(1), value);
    let (mantissa, exponent) = match exp_form.split_once('e') {
        Some(parts) => parts,
        None => return exp_form,
    };
    let exponent: i32 = match exponent.parse() {
        Ok(e) => e,
        Err(_) => return exp_form,
    };

    if exponent < -4 || exponent >= digits as i32 {
        let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        let fixed = format!("{:.*}", decimals, value);
        if fixed.contains('.') {
            fixed
                .trim_end_matches('0')
                .trim_end_matches('.')
                .to_string()
        } else {
            fixed
        }
    }
}

// ============================================================================
// Bucket worker
// ============================================================================

/// Compute the full row for one bucket
///
/// Iterates every tag column, filters the shared record set down to the
/// bucket's `(boundary − 10min, boundary]` window, and applies the cell
/// rule. Columns with no matching records stay unset.
fn fill_bucket_row(
    records: &RawRecordSet,
    columns: &[String],
    bucket: Bucket,
) -> std::result::Result<Row, AggregationError> {
    let window = bucket.window();
    let mut row: Row = Vec::with_capacity(columns.len());

    for tag in columns {
        let values = records.filter(tag, window).map(|r| r.value.as_str());
        let cell = aggregate_values(values, bucket, tag)?;
        if let Some(ref value) = cell {
            trace!(bucket = %bucket, tag = %tag, value = %value, "Filled cell");
        }
        row.push(cell);
    }

    Ok(row)
}

// ============================================================================
// Coordinator
// ============================================================================

/// Coordinates per-bucket workers and assembles the pivot table
///
/// Spawns one task per bucket behind a concurrency bound, blocks until all
/// of them have finished, then reconciles the worker rows into the table.
/// The caller only ever observes the all-or-nothing boundary: either a
/// fully populated table or an error.
#[derive(Debug, Clone)]
pub struct PivotAggregator {
    /// Maximum workers running at once
    max_concurrent_workers: usize,

    /// Optional overall deadline for the run
    timeout: Option<Duration>,
}

impl Default for PivotAggregator {
    fn default() -> Self {
        Self {
            max_concurrent_workers: 32,
            timeout: None,
        }
    }
}

impl PivotAggregator {
    /// Create a coordinator with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a coordinator from configuration
    pub fn from_config(config: &AggregationConfig) -> Self {
        Self {
            max_concurrent_workers: config.max_concurrent_workers.max(1),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Set the worker concurrency bound
    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.max_concurrent_workers = max.max(1);
        self
    }

    /// Set an overall deadline for the run
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run the aggregation and return the completed pivot table
    ///
    /// Columns are the record set's distinct tags in first-appearance
    /// order; rows follow the given bucket sequence. A single worker
    /// failure (bad value, panic) fails the whole run.
    pub async fn aggregate(
        &self,
        records: Arc<RawRecordSet>,
        buckets: &[Bucket],
    ) -> Result<PivotTable> {
        let columns = Arc::new(records.distinct_tags());
        let mut table = PivotTable::new(buckets.to_vec(), columns.as_ref().clone());

        if buckets.is_empty() || columns.is_empty() {
            return Ok(table);
        }

        debug!(
            buckets = buckets.len(),
            tags = columns.len(),
            max_workers = self.max_concurrent_workers,
            "Starting bucketed aggregation"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_workers));
        let mut join_set: JoinSet<std::result::Result<(usize, Row), AggregationError>> =
            JoinSet::new();
        let mut task_buckets: HashMap<tokio::task::Id, Bucket> = HashMap::new();

        for (row_idx, bucket) in buckets.iter().copied().enumerate() {
            let records = Arc::clone(&records);
            let columns = Arc::clone(&columns);
            let permit = Arc::clone(&semaphore);

            let handle = join_set.spawn(async move {
                // Holds a permit for the whole computation to bound fan-out
                let _permit = permit.acquire().await;
                let row = fill_bucket_row(&records, &columns, bucket)?;
                debug!(bucket = %bucket, row = row_idx, "Bucket worker finished");
                Ok((row_idx, row))
            });
            task_buckets.insert(handle.id(), bucket);
        }

        // Completion barrier: drain the join set, staging rows as workers
        // return them. Nothing is written to the table until all are done.
        let mut staged: Vec<Option<Row>> = vec![None; buckets.len()];
        let collect = Self::collect_rows(&mut join_set, &task_buckets, &mut staged);

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, collect).await.map_err(|_| {
                AggregationError::Timeout {
                    elapsed_secs: limit.as_secs(),
                }
            })??,
            None => collect.await?,
        }

        // Reconciliation pass: sequentially copy each worker row into the
        // authoritative table, keyed by bucket row index
        for (row_idx, row) in staged.into_iter().enumerate() {
            match row {
                Some(cells) => table.set_row(row_idx, cells),
                None => {
                    return Err(AggregationError::WorkerFailed {
                        bucket: buckets[row_idx].boundary(),
                        reason: "worker returned no row".to_string(),
                    }
                    .into())
                }
            }
        }

        info!(
            rows = table.row_count(),
            columns = table.column_count(),
            cells = table.populated_cells(),
            "Aggregation complete"
        );

        Ok(table)
    }

    /// Drain the join set into the staging area, propagating worker errors
    async fn collect_rows(
        join_set: &mut JoinSet<std::result::Result<(usize, Row), AggregationError>>,
        task_buckets: &HashMap<tokio::task::Id, Bucket>,
        staged: &mut [Option<Row>],
    ) -> Result<()> {
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((_, Ok((row_idx, row)))) => {
                    staged[row_idx] = Some(row);
                }
                Ok((_, Err(e))) => {
                    // One bad cell aborts the whole run; cancel the rest
                    join_set.abort_all();
                    return Err(e.into());
                }
                Err(join_err) => {
                    let bucket = task_buckets
                        .get(&join_err.id())
                        .map(|b| b.boundary())
                        .unwrap_or_default();
                    join_set.abort_all();
                    return Err(AggregationError::WorkerFailed {
                        bucket,
                        reason: join_err.to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
