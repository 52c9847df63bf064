//! Output path resolution and CSV serialization
//!
//! Two files are written per run: the pivoted model table and the raw
//! query dump. File names encode the span and reference instant
//! (`model_R1_0 (2021-03-01 12_00_00).csv`) and collide-resolve by
//! appending an incrementing numeric suffix before the extension, so a
//! re-run never overwrites an earlier result.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::ColumnConfig;
use crate::error::{OutputError, Result};
use crate::pivot::PivotTable;
use crate::records::RawRecordSet;

/// Fixed dump column names for the fields not configurable per deployment
const NUMERIC_ID_COLUMN: &str = "_NUMERICID";
const VALUE_COLUMN: &str = "_VALUE";
const QUALITY_COLUMN: &str = "_QUALITY";

/// Default model output directory under a base path
pub fn default_model_dir(base: &Path) -> PathBuf {
    base.join("modeling").join("output_models")
}

/// Default query dump directory under a base path
pub fn default_query_dir(base: &Path) -> PathBuf {
    base.join("modeling").join("saved_queries")
}

/// Base path for default output directories
///
/// The user's home directory when known, the working directory otherwise.
pub fn default_base_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// File name for the pivoted model CSV
pub fn model_file_name(span_hours: f64, reference: DateTime<Utc>) -> String {
    run_file_name("model", span_hours, reference)
}

/// File name for the raw query dump CSV
pub fn query_file_name(span_hours: f64, reference: DateTime<Utc>) -> String {
    run_file_name("sql_query", span_hours, reference)
}

fn run_file_name(prefix: &str, span_hours: f64, reference: DateTime<Utc>) -> String {
    // Whole-hour spans keep one decimal place so 1.0 reads "R1_0"
    let span = if span_hours == span_hours.trunc() {
        format!("{:.1}", span_hours)
    } else {
        span_hours.to_string()
    }
    .replace('.', "_");
    let stamp = reference
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
        .replace(':', "_");
    format!("{}_R{} ({}).csv", prefix, span, stamp)
}

/// Create an output directory if it does not exist
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        std::fs::create_dir_all(path).map_err(|source| OutputError::CreateDir {
            path: path.display().to_string(),
            source,
        })?;
    }
    Ok(())
}

/// Resolve a non-colliding path for a file in a directory
///
/// If `name.csv` already exists the candidate becomes `name.1.csv`, then
/// `name.2.csv`, and so on until a free slot is found.
pub fn next_available_path(dir: &Path, file_name: &str) -> PathBuf {
    let mut candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
    // A trailing ".N" on the stem continues an existing numbering chain
    let (base, mut counter) = match stem.rsplit_once('.') {
        Some((base, suffix)) => match suffix.parse::<u64>() {
            Ok(n) => (base, n),
            Err(_) => (stem, 0),
        },
        None => (stem, 0),
    };

    loop {
        counter += 1;
        candidate = dir.join(format!("{}.{}.csv", base, counter));
        if !candidate.exists() {
            return candidate;
        }
    }
}

/// Write the pivoted model table
///
/// First column is the configured index column holding the bucket end
/// boundary (`%Y-%m-%d %H:%M:%S`), followed by one column per tag. Unset
/// cells serialize as empty fields.
pub fn write_model_csv(path: &Path, table: &PivotTable, index_column: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(OutputError::from)?;

    let mut header = Vec::with_capacity(table.column_count() + 1);
    header.push(index_column);
    header.extend(table.columns().iter().map(String::as_str));
    writer.write_record(&header).map_err(OutputError::from)?;

    for (bucket, cells) in table.rows() {
        let mut record = Vec::with_capacity(cells.len() + 1);
        record.push(bucket.format_boundary());
        record.extend(cells.iter().map(|c| c.clone().unwrap_or_default()));
        writer.write_record(&record).map_err(OutputError::from)?;
    }

    writer.flush().map_err(OutputError::from)?;
    info!(path = %path.display(), "Output model saved");
    Ok(())
}

/// Write the raw query dump
///
/// Column order matches what `CsvSource` reads back: tag name, numeric id,
/// value, timestamp, quality.
pub fn write_query_csv(path: &Path, records: &RawRecordSet, columns: &ColumnConfig) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(OutputError::from)?;

    writer
        .write_record([
            columns.tag.as_str(),
            NUMERIC_ID_COLUMN,
            VALUE_COLUMN,
            columns.index.as_str(),
            QUALITY_COLUMN,
        ])
        .map_err(OutputError::from)?;

    for record in records.records() {
        let row = [
            record.tag.clone(),
            record.numeric_id.to_string(),
            record.value.clone(),
            record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.quality.to_string(),
        ];
        writer.write_record(&row).map_err(OutputError::from)?;
    }

    writer.flush().map_err(OutputError::from)?;
    info!(path = %path.display(), "SQL query saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bucket, RawRecord};
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_file_names_encode_span_and_instant() {
        assert_eq!(
            model_file_name(1.0, reference()),
            "model_R1_0 (2021-03-01 12_00_00).csv"
        );
        assert_eq!(
            model_file_name(2.5, reference()),
            "model_R2_5 (2021-03-01 12_00_00).csv"
        );
        assert_eq!(
            query_file_name(0.5, reference()),
            "sql_query_R0_5 (2021-03-01 12_00_00).csv"
        );
    }

    #[test]
    fn test_collision_numbering_chain() {
        let dir = tempfile::tempdir().unwrap();

        let first = next_available_path(dir.path(), "model.csv");
        assert_eq!(first, dir.path().join("model.csv"));
        std::fs::write(&first, "x").unwrap();

        let second = next_available_path(dir.path(), "model.csv");
        assert_eq!(second, dir.path().join("model.1.csv"));
        std::fs::write(&second, "x").unwrap();

        let third = next_available_path(dir.path(), "model.csv");
        assert_eq!(third, dir.path().join("model.2.csv"));
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("modeling").join("output_models");

        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // Idempotent
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn test_model_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.csv");

        let mut table = PivotTable::new(
            vec![Bucket::new(reference())],
            vec!["alarm".into(), "flow".into()],
        );
        table.set_row(0, vec![Some("1".into()), None]);

        write_model_csv(&path, &table, "_TIMESTAMP").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "_TIMESTAMP,alarm,flow\n2021-03-01 12:00:00,1,\n"
        );
    }

    #[test]
    fn test_query_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.csv");

        let records = RawRecordSet::new(vec![RawRecord::new("flow", 7, "1.5", reference(), 192)]);
        write_query_csv(&path, &records, &ColumnConfig::default()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "_NAME,_NUMERICID,_VALUE,_TIMESTAMP,_QUALITY\nflow,7,1.5,2021-03-01 12:00:00,192\n"
        );
    }
}
