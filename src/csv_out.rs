//! CSV serialization of extracted rows.
//!
//! Every field is quoted, with embedded double quotes doubled — the
//! worksheets this was built for are full of measurements like `4'-7 1/8"`,
//! and always-quoting means a reader never has to guess. The header row is
//! the first data row's key set in first-appearance order; a row missing a
//! key yields an empty cell, not an error.

use crate::error::Scan2CsvError;
use crate::table::TableData;
use csv::{QuoteStyle, WriterBuilder};
use std::path::Path;
use tracing::debug;

/// Filename used when the caller does not pick one.
pub const DEFAULT_CSV_FILENAME: &str = "extracted_data.csv";

/// MIME type of the produced artifact, for embedders that serve it.
pub const CSV_MIME: &str = "text/csv;charset=utf-8";

/// Serialize extracted rows to CSV text.
///
/// Returns the empty string for empty data. Output is terminated by a final
/// newline when non-empty.
pub fn to_csv(data: &TableData) -> Result<String, Scan2CsvError> {
    if data.is_empty() {
        return Ok(String::new());
    }

    let headers = data.headers();
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::<u8>::new());

    writer
        .write_record(&headers)
        .map_err(|e| Scan2CsvError::Internal(format!("csv write: {e}")))?;
    for row in &data.rows {
        let record = headers
            .iter()
            .map(|&key| row.get(key).map(String::as_str).unwrap_or(""));
        writer
            .write_record(record)
            .map_err(|e| Scan2CsvError::Internal(format!("csv write: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| Scan2CsvError::Internal(format!("csv flush: {e}")))?;

    let bytes = writer
        .into_inner()
        .map_err(|e| Scan2CsvError::Internal(format!("csv finish: {e}")))?;
    String::from_utf8(bytes).map_err(|e| Scan2CsvError::Internal(format!("csv utf-8: {e}")))
}

/// Write extracted rows to a CSV file, atomically (temp file + rename).
///
/// A no-op for empty data, per the download contract: returns `Ok(false)`
/// and creates nothing. Returns `Ok(true)` once the file is in place.
pub async fn write_csv_file(
    path: impl AsRef<Path>,
    data: &TableData,
) -> Result<bool, Scan2CsvError> {
    if data.is_empty() {
        debug!("No rows extracted; skipping CSV write");
        return Ok(false);
    }

    let path = path.as_ref();
    let text = to_csv(data)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Scan2CsvError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
        }
    }

    let tmp_path = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp_path, &text)
        .await
        .map_err(|e| Scan2CsvError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Scan2CsvError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    debug!("Wrote {} bytes of CSV to {}", text.len(), path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableRow;

    fn row(pairs: &[(&str, &str)]) -> TableRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_data_serializes_to_empty_string() {
        assert_eq!(to_csv(&TableData::default()).unwrap(), "");
    }

    #[test]
    fn header_line_matches_first_row_key_count() {
        let data = TableData::new(vec![
            row(&[("row", "1"), ("J", "a"), ("K", "b"), ("L", "c")]),
            row(&[("row", "2"), ("J", "d"), ("K", "e"), ("L", "f")]),
        ]);
        let csv = to_csv(&data).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert_eq!(header.split(',').count(), 4);
        assert_eq!(header, r#""row","J","K","L""#);
        // Every subsequent line carries the same field count.
        for line in lines {
            assert_eq!(line.split(',').count(), 4, "line: {line}");
        }
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let data = TableData::new(vec![row(&[("Depth", "4'-7 1/8\"")])]);
        let csv = to_csv(&data).unwrap();
        assert!(csv.contains(r#""4'-7 1/8""""#), "got: {csv}");
    }

    #[test]
    fn missing_keys_become_empty_cells() {
        let data = TableData::new(vec![
            row(&[("a", "1"), ("b", "2")]),
            row(&[("a", "3")]),
        ]);
        let csv = to_csv(&data).unwrap();
        let last = csv.lines().last().unwrap();
        assert_eq!(last, r#""3","""#);
    }

    #[test]
    fn commas_inside_cells_stay_inside_quotes() {
        let data = TableData::new(vec![row(&[("Notes", "loose, re-check")])]);
        let csv = to_csv(&data).unwrap();
        let mut rdr = csv::Reader::from_reader(csv.as_bytes());
        let record = rdr.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "loose, re-check");
    }

    #[tokio::test]
    async fn write_is_a_noop_for_empty_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CSV_FILENAME);
        let written = write_csv_file(&path, &TableData::default()).await.unwrap();
        assert!(!written);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn write_lands_atomically_at_the_target_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CSV_FILENAME);
        let data = TableData::new(vec![row(&[("a", "1")])]);

        let written = write_csv_file(&path, &data).await.unwrap();
        assert!(written);
        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(text, "\"a\"\n\"1\"\n");
        // No stray temp file left behind.
        assert!(!path.with_extension("csv.tmp").exists());
    }
}
