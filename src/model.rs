//! End-to-end model build runner
//!
//! Wires the collaborators together for one run: probe the source, fetch
//! every record in the padded query window, dump the raw records, run the
//! bucketed aggregation, and write the pivoted model CSV. Progress and
//! timings are reported through `tracing`.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::aggregate::PivotAggregator;
use crate::config::Config;
use crate::error::Result;
use crate::output::{
    default_base_dir, default_model_dir, default_query_dir, ensure_dir, model_file_name,
    next_available_path, query_file_name, write_model_csv, write_query_csv,
};
use crate::plan::{parse_sample_instant, plan_buckets, query_window, validate_span};
use crate::source::{PagedFetcher, RecordSource};

/// A validated build request: the reference instant and lookback span
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest {
    /// Reference instant; the last bucket ends here
    pub reference: DateTime<Utc>,

    /// Hours to look back from the reference instant
    pub span_hours: f64,
}

impl ModelRequest {
    /// Build a request from raw user input, validating all three fields
    pub fn parse(date: &str, time: &str, span_hours: f64) -> Result<Self> {
        let reference = parse_sample_instant(date, time)?;
        let span_hours = validate_span(span_hours)?;
        Ok(Self {
            reference,
            span_hours,
        })
    }
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct ModelReport {
    /// Where the pivoted model CSV was written
    pub model_path: PathBuf,

    /// Where the raw query dump CSV was written
    pub query_path: PathBuf,

    /// Rows (buckets) in the model table
    pub rows: usize,

    /// Columns (distinct tags) in the model table
    pub columns: usize,

    /// Raw records fetched for the window
    pub records: usize,

    /// Wall time for the whole run
    pub elapsed: Duration,
}

/// Runs the fetch → aggregate → write pipeline for one request
#[derive(Debug, Clone)]
pub struct ModelRunner {
    config: Config,
}

impl ModelRunner {
    /// Create a runner over a validated configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Execute a full model build against the given source
    pub async fn run<S: RecordSource + ?Sized>(
        &self,
        source: &S,
        request: &ModelRequest,
    ) -> Result<ModelReport> {
        let started = Instant::now();

        source.probe().await?;

        let (model_dir, query_dir) = self.resolve_output_dirs()?;

        let window = query_window(request.reference, request.span_hours);
        let buckets = plan_buckets(request.reference, request.span_hours);
        info!(
            window = %window,
            span_hours = request.span_hours,
            buckets = buckets.len(),
            table = %self.config.source.table,
            "Building model"
        );

        let fetcher = PagedFetcher::new(self.config.source.chunk_size);
        let records = Arc::new(fetcher.fetch_all(source, &window).await?);

        let query_path = next_available_path(
            &query_dir,
            &query_file_name(request.span_hours, request.reference),
        );
        write_query_csv(&query_path, &records, &self.config.columns)?;

        let aggregator = PivotAggregator::from_config(&self.config.aggregation);
        let table = aggregator.aggregate(Arc::clone(&records), &buckets).await?;
        info!(columns = table.column_count(), "Base dataframe created");

        let model_path = next_available_path(
            &model_dir,
            &model_file_name(request.span_hours, request.reference),
        );
        write_model_csv(&model_path, &table, &self.config.columns.index)?;

        let elapsed = started.elapsed();
        let (hours, minutes, seconds) = split_elapsed(elapsed);
        info!(hours, minutes, seconds, "Time elapsed");

        Ok(ModelReport {
            model_path,
            query_path,
            rows: table.row_count(),
            columns: table.column_count(),
            records: records.len(),
            elapsed,
        })
    }

    /// Resolve (and create) the output directories
    ///
    /// Configured paths win; otherwise the defaults under the home
    /// directory are used.
    fn resolve_output_dirs(&self) -> Result<(PathBuf, PathBuf)> {
        let base = default_base_dir();

        let model_dir = match &self.config.output.model_dir {
            Some(dir) => dir.clone(),
            None => {
                let dir = default_model_dir(&base);
                info!(path = %dir.display(), "No model output directory specified, using default");
                dir
            }
        };
        let query_dir = match &self.config.output.query_dir {
            Some(dir) => dir.clone(),
            None => {
                let dir = default_query_dir(&base);
                info!(path = %dir.display(), "No query output directory specified, using default");
                dir
            }
        };

        ensure_dir(&model_dir)?;
        ensure_dir(&query_dir)?;
        Ok((model_dir, query_dir))
    }
}

/// Break a wall-time duration into whole hours, whole minutes, and seconds
fn split_elapsed(elapsed: Duration) -> (u64, u64, f64) {
    let total = elapsed.as_secs_f64();
    let hours = (total / 3600.0) as u64;
    let minutes = ((total - hours as f64 * 3600.0) / 60.0) as u64;
    let seconds = total - hours as f64 * 3600.0 - minutes as f64 * 60.0;
    (hours, minutes, seconds)
}
