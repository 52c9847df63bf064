//! Error types for the model builder

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Aggregation error
    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    /// Record source error
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Input validation error
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Output error
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while computing pivot-table cells
#[derive(Error, Debug)]
pub enum AggregationError {
    /// A value string was neither a boolean literal nor a parseable float.
    ///
    /// One bad value fails the whole run; there is no per-cell recovery.
    #[error("Unparseable value {value:?} for tag {tag:?} in bucket {bucket}")]
    BadValue {
        /// End boundary of the bucket being computed
        bucket: DateTime<Utc>,
        /// Tag column being computed
        tag: String,
        /// The offending value string
        value: String,
    },

    /// A worker task panicked or was cancelled before returning its row
    #[error("Worker for bucket {bucket} did not complete: {reason}")]
    WorkerFailed {
        /// End boundary of the bucket the worker owned
        bucket: DateTime<Utc>,
        /// Join error description
        reason: String,
    },

    /// The optional overall deadline elapsed before all workers finished
    #[error("Aggregation timed out after {elapsed_secs} seconds")]
    Timeout {
        /// Seconds spent before giving up
        elapsed_secs: u64,
    },
}

/// Errors from the external record source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Connectivity probe failed
    #[error("Source not reachable: {0}")]
    Connection(String),

    /// The configured table does not exist at the source
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// A fetched page could not be decoded
    #[error("Bad record in page at offset {offset}: {message}")]
    BadPage {
        /// Page offset where decoding failed
        offset: usize,
        /// Description of the decode failure
        message: String,
    },

    /// CSV-backed source failed to read
    #[error("CSV source error: {0}")]
    Csv(#[from] csv::Error),

    /// IO failure while reading the source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from user-supplied date/time/span input
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Date string did not match `YYYY-MM-DD`
    #[error("Incorrect date format {0:?}, should be YYYY-MM-DD")]
    BadDate(String),

    /// Time string did not match `HH:MM:SS`
    #[error("Incorrect time format {0:?}, should be HH:MM:SS")]
    BadTime(String),

    /// Span must be a positive number of hours
    #[error("Time span must be positive, got {0}")]
    NonPositiveSpan(f64),
}

/// Errors while resolving paths or writing CSV output
#[derive(Error, Debug)]
pub enum OutputError {
    /// Output directory could not be created
    #[error("Cannot create output directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// CSV serialization failed
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// IO failure while writing output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
