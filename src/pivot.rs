//! Pivoted output table
//!
//! `PivotTable` is the bucket × tag output grid: rows keyed by bucket end
//! boundary (unique, time-ordered), columns keyed by distinct tag name.
//! Each cell is either unset (no data for that tag in that bucket) or a
//! formatted decimal string produced by the aggregation rule.
//!
//! Workers never touch the table directly; they compute worker-local rows
//! that the coordinator copies in sequentially after every worker has
//! finished, so the table needs no interior locking.

use crate::types::Bucket;

/// One worker-local row: a cell per column, aligned to the table's columns
pub type Row = Vec<Option<String>>;

/// The bucket × tag output grid
#[derive(Debug, Clone, PartialEq)]
pub struct PivotTable {
    buckets: Vec<Bucket>,
    columns: Vec<String>,
    cells: Vec<Row>,
}

impl PivotTable {
    /// Create an empty table with the given row and column layout
    pub fn new(buckets: Vec<Bucket>, columns: Vec<String>) -> Self {
        let cells = buckets.iter().map(|_| vec![None; columns.len()]).collect();
        Self {
            buckets,
            columns,
            cells,
        }
    }

    /// Bucket boundaries, one per row in time order
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Column names, one per distinct tag
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Index of a tag column, if present
    pub fn column_index(&self, tag: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == tag)
    }

    /// Cells of one row
    pub fn row(&self, row: usize) -> &Row {
        &self.cells[row]
    }

    /// Replace one row with a worker-computed row
    ///
    /// Panics if the row length does not match the column count; workers
    /// always build rows from this table's own column slice.
    pub fn set_row(&mut self, row: usize, cells: Row) {
        assert_eq!(cells.len(), self.columns.len(), "row/column shape mismatch");
        self.cells[row] = cells;
    }

    /// Look up a cell by bucket row and tag name
    pub fn get(&self, row: usize, tag: &str) -> Option<&str> {
        let col = self.column_index(tag)?;
        self.cells[row][col].as_deref()
    }

    /// Iterate rows as `(bucket, cells)` pairs in time order
    pub fn rows(&self) -> impl Iterator<Item = (&Bucket, &Row)> {
        self.buckets.iter().zip(self.cells.iter())
    }

    /// Count of populated cells across the table
    pub fn populated_cells(&self) -> usize {
        self.cells
            .iter()
            .map(|row| row.iter().filter(|c| c.is_some()).count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn buckets(count: u32) -> Vec<Bucket> {
        (0..count)
            .map(|i| Bucket::new(Utc.with_ymd_and_hms(2021, 3, 1, 12, i * 10, 0).unwrap()))
            .collect()
    }

    #[test]
    fn test_new_table_is_unset() {
        let table = PivotTable::new(buckets(3), vec!["a".into(), "b".into()]);

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.populated_cells(), 0);
        assert_eq!(table.get(0, "a"), None);
    }

    #[test]
    fn test_set_row_and_lookup() {
        let mut table = PivotTable::new(buckets(2), vec!["a".into(), "b".into()]);
        table.set_row(1, vec![Some("1".into()), None]);

        assert_eq!(table.get(1, "a"), Some("1"));
        assert_eq!(table.get(1, "b"), None);
        assert_eq!(table.get(0, "a"), None);
        assert_eq!(table.populated_cells(), 1);
    }

    #[test]
    fn test_unknown_tag_lookup() {
        let table = PivotTable::new(buckets(1), vec!["a".into()]);
        assert_eq!(table.get(0, "missing"), None);
    }

    #[test]
    #[should_panic(expected = "shape mismatch")]
    fn test_row_shape_enforced() {
        let mut table = PivotTable::new(buckets(1), vec!["a".into(), "b".into()]);
        table.set_row(0, vec![None]);
    }
}
