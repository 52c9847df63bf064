//! tagpivot - Pivoted CSV model builder for event-sourced tag records
//!
//! This library converts irregular, event-sourced time-series tag records
//! (name, value, timestamp, quality) into a regular fixed-interval pivoted
//! table: one row per 10-minute bucket, one column per tag, each cell a
//! single representative value. The populated table and the raw record dump
//! are written as CSV files for downstream modeling.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │          Record Source              │
//! │  paged fetch over (start, end]      │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │          RawRecordSet               │
//! │  immutable, retrieval-ordered       │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │         PivotAggregator             │
//! │  one bounded worker per bucket      │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │           PivotTable                │
//! │  bucket × tag grid → model CSV      │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tagpivot::aggregate::PivotAggregator;
//! use tagpivot::plan::plan_buckets;
//! use tagpivot::records::RawRecordSet;
//!
//! let buckets = plan_buckets(window_end, 1.0);
//! let records = Arc::new(RawRecordSet::new(fetched));
//!
//! let table = PivotAggregator::new()
//!     .with_max_workers(16)
//!     .aggregate(records, &buckets)
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod pivot;
pub mod plan;
pub mod records;
pub mod source;
pub mod types;

// Re-export main types
pub use aggregate::{aggregate_values, format_significant, PivotAggregator};
pub use config::Config;
pub use error::{AggregationError, Error, OutputError, Result, SourceError, ValidationError};
pub use model::{ModelReport, ModelRequest, ModelRunner};
pub use pivot::PivotTable;
pub use plan::{plan_buckets, query_window};
pub use records::RawRecordSet;
pub use source::{CsvSource, InMemorySource, PagedFetcher, RecordSource};
pub use types::{Bucket, RawRecord, TimeWindow};
