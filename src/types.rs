//! Core data types used throughout the model builder
//!
//! # Key Types
//!
//! - **`RawRecord`**: A single event-sourced tag observation as fetched from
//!   the source table (name, numeric id, value string, timestamp, quality)
//! - **`Bucket`**: A fixed 10-minute interval identified by its end boundary;
//!   one bucket becomes one row of the pivoted output table
//! - **`TimeWindow`**: A half-open time interval `(start, end]` used both for
//!   the overall query window and for per-bucket record filtering
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use tagpivot::types::Bucket;
//!
//! let bucket = Bucket::new(Utc.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap());
//! let window = bucket.window();
//! assert_eq!(window.end, bucket.boundary());
//! assert_eq!(window.end - window.start, chrono::Duration::minutes(10));
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of one bucket in minutes
///
/// Fixed by design: the output table is a uniform 10-minute grid and the
/// query window carries a matching 10-minute lookback pad so the first
/// bucket has a full source window.
pub const BUCKET_MINUTES: i64 = 10;

/// A single raw tag observation fetched from the source table
///
/// Records are immutable once fetched. Multiple records may share a tag and
/// fall inside the same bucket window; their retrieval order (ascending
/// numeric id) is significant for the boolean-override scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Tag name; becomes one column of the pivot table
    pub tag: String,

    /// Source-assigned numeric record id; defines retrieval order
    pub numeric_id: i64,

    /// Value as stored at the source: `"0"`/`"1"` boolean literals or a
    /// decimal float rendering
    pub value: String,

    /// Instant the observation was recorded
    pub timestamp: DateTime<Utc>,

    /// Source quality code, carried through to the raw dump unchanged
    pub quality: i32,
}

impl RawRecord {
    /// Create a new record
    pub fn new(
        tag: impl Into<String>,
        numeric_id: i64,
        value: impl Into<String>,
        timestamp: DateTime<Utc>,
        quality: i32,
    ) -> Self {
        Self {
            tag: tag.into(),
            numeric_id,
            value: value.into(),
            timestamp,
            quality,
        }
    }
}

/// A half-open time interval `(start, end]`
///
/// Matches the source query contract: a record belongs to the window when
/// `start < timestamp <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Exclusive start of the window
    pub start: DateTime<Utc>,

    /// Inclusive end of the window
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a new window
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Check whether an instant falls inside `(start, end]`
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start < ts && ts <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.start, self.end)
    }
}

/// A 10-minute bucket identified by its end boundary
///
/// The bucket's source window is `(boundary − 10min, boundary]`. Buckets are
/// generated as a strictly increasing, evenly spaced sequence by the planner
/// and each one maps to exactly one row of the pivot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bucket(DateTime<Utc>);

impl Bucket {
    /// Create a bucket from its end boundary
    pub fn new(boundary: DateTime<Utc>) -> Self {
        Self(boundary)
    }

    /// End boundary of the bucket
    pub fn boundary(&self) -> DateTime<Utc> {
        self.0
    }

    /// Source window for this bucket: `(boundary − 10min, boundary]`
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.0 - Duration::minutes(BUCKET_MINUTES), self.0)
    }

    /// Render the boundary in the stable output format `%Y-%m-%d %H:%M:%S`
    pub fn format_boundary(&self) -> String {
        self.0.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_boundary())
    }
}
