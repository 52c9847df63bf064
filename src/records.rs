//! In-memory raw record collection
//!
//! `RawRecordSet` holds every record fetched for the query window, in
//! retrieval order (ascending numeric id). It is immutable after
//! construction and shared read-only across all bucket workers via `Arc`,
//! so no locking is needed anywhere in the aggregation path.

use crate::types::{RawRecord, TimeWindow};

/// Immutable, queryable collection of raw tag records
///
/// Construction sorts by numeric id so that iteration order matches the
/// source's retrieval order regardless of how pages were concatenated.
/// That order is load-bearing: the boolean-override scan short-circuits on
/// the first `"1"` observation.
#[derive(Debug, Clone, Default)]
pub struct RawRecordSet {
    records: Vec<RawRecord>,
}

impl RawRecordSet {
    /// Build a record set from fetched records, restoring retrieval order
    pub fn new(mut records: Vec<RawRecord>) -> Self {
        records.sort_by_key(|r| r.numeric_id);
        Self { records }
    }

    /// Number of records in the set
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in retrieval order
    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    /// Distinct tag names in first-appearance order
    ///
    /// First-appearance order is stable for a given record set, which keeps
    /// the pivot table's column layout identical across re-runs.
    pub fn distinct_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for record in &self.records {
            if !tags.iter().any(|t| t == &record.tag) {
                tags.push(record.tag.clone());
            }
        }
        tags
    }

    /// Records for one tag inside a bucket window, in retrieval order
    pub fn filter<'a>(
        &'a self,
        tag: &'a str,
        window: TimeWindow,
    ) -> impl Iterator<Item = &'a RawRecord> {
        self.records
            .iter()
            .filter(move |r| r.tag == tag && window.contains(r.timestamp))
    }
}
