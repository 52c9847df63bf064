//! Record source boundary
//!
//! The relational fetch is an external collaborator: the aggregation core
//! only requires that something delivers every record whose timestamp falls
//! in the half-open query window `(start, end]`, ordered by numeric id.
//! That contract lives in the [`RecordSource`] trait so the engine can run
//! against different backends (a database client, a saved query dump, or an
//! in-memory set in tests) without a process-wide connection singleton.
//!
//! [`PagedFetcher`] drives a source through fixed-size pages and
//! concatenates the result into a [`RawRecordSet`], mirroring the chunked
//! fetch loop of the upstream table reader.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, SourceError};
use crate::records::RawRecordSet;
use crate::types::{RawRecord, TimeWindow};

/// Abstraction over the upstream record store
///
/// Implementations own their connection lifecycle explicitly; callers
/// construct a source, probe it, and pass it by reference.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Check that the source is reachable and the backing table exists
    ///
    /// Called once before fetching; a failure here aborts the run before
    /// any output paths are created.
    async fn probe(&self) -> Result<()>;

    /// Fetch one page of records inside the window
    ///
    /// Must return records with `window.start < timestamp <= window.end`,
    /// ordered by numeric id, skipping `offset` rows and returning at most
    /// `limit`. A page shorter than `limit` marks the end of the data.
    async fn fetch_page(
        &self,
        window: &TimeWindow,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawRecord>>;
}

/// Pages through a [`RecordSource`] until the data is exhausted
#[derive(Debug, Clone)]
pub struct PagedFetcher {
    chunk_size: usize,
}

impl PagedFetcher {
    /// Create a fetcher with the given page size
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Fetch every record in the window into a [`RawRecordSet`]
    pub async fn fetch_all<S: RecordSource + ?Sized>(
        &self,
        source: &S,
        window: &TimeWindow,
    ) -> Result<RawRecordSet> {
        info!(window = %window, "Querying source for tag records");

        let mut all = Vec::new();
        let mut offset = 0;

        loop {
            let page = source.fetch_page(window, offset, self.chunk_size).await?;
            let page_len = page.len();
            debug!(offset, rows = page_len, "Fetched page");

            all.extend(page);
            offset += self.chunk_size;

            if page_len < self.chunk_size {
                break;
            }
        }

        info!(rows = all.len(), "Fetch complete");
        Ok(RawRecordSet::new(all))
    }
}

/// In-memory source for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<RawRecord>,
}

impl InMemorySource {
    /// Create a source over a fixed set of records
    pub fn new(mut records: Vec<RawRecord>) -> Self {
        records.sort_by_key(|r| r.numeric_id);
        Self { records }
    }
}

#[async_trait]
impl RecordSource for InMemorySource {
    async fn probe(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_page(
        &self,
        window: &TimeWindow,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| window.contains(r.timestamp))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Source backed by a previously saved query dump CSV
///
/// Reads the same column shape the query writer produces: tag name,
/// numeric id, value, timestamp (`%Y-%m-%d %H:%M:%S`), quality, with a
/// header row.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    /// Create a source over a dump file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<RawRecord>> {
        let mut reader = csv::Reader::from_path(&self.path).map_err(SourceError::from)?;
        let mut records = Vec::new();

        for (row, result) in reader.records().enumerate() {
            let row_fields = result.map_err(SourceError::from)?;
            records.push(parse_dump_row(&row_fields, row)?);
        }

        Ok(records)
    }
}

/// Decode one dump row into a record
fn parse_dump_row(fields: &csv::StringRecord, row: usize) -> Result<RawRecord> {
    let field = |idx: usize| -> std::result::Result<&str, SourceError> {
        fields.get(idx).ok_or_else(|| SourceError::BadPage {
            offset: row,
            message: format!("missing column {}", idx),
        })
    };

    let tag = field(0)?.to_string();
    let numeric_id: i64 = field(1)?.parse().map_err(|_| SourceError::BadPage {
        offset: row,
        message: format!("bad numeric id {:?}", field(1).unwrap_or_default()),
    })?;
    let value = field(2)?.to_string();
    let timestamp = parse_dump_timestamp(field(3)?).ok_or_else(|| SourceError::BadPage {
        offset: row,
        message: format!("bad timestamp {:?}", field(3).unwrap_or_default()),
    })?;
    let quality: i32 = field(4)?.parse().map_err(|_| SourceError::BadPage {
        offset: row,
        message: format!("bad quality {:?}", field(4).unwrap_or_default()),
    })?;

    Ok(RawRecord {
        tag,
        numeric_id,
        value,
        timestamp,
        quality,
    })
}

fn parse_dump_timestamp(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    // Accept fractional seconds if the dump carries them
    let parsed = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()?;
    Some(parsed.and_utc())
}

#[async_trait]
impl RecordSource for CsvSource {
    async fn probe(&self) -> Result<()> {
        if !self.path.is_file() {
            return Err(SourceError::Connection(format!(
                "dump file {} does not exist",
                self.path.display()
            ))
            .into());
        }
        Ok(())
    }

    async fn fetch_page(
        &self,
        window: &TimeWindow,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawRecord>> {
        // The dump is small enough to re-read per page; ordering by numeric
        // id is restored before slicing so pagination is deterministic.
        let mut records = self.load()?;
        records.sort_by_key(|r| r.numeric_id);

        Ok(records
            .into_iter()
            .filter(|r| window.contains(r.timestamp))
            .skip(offset)
            .take(limit)
            .collect())
    }
}
