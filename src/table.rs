//! Tabular data model: ordered rows of column-name → cell-value.
//!
//! The column set is *data*, not a compile-time constant: in dynamic-header
//! mode the headers are whatever keys the model put on the first row, in the
//! order it emitted them. [`IndexMap`] preserves that insertion order, and
//! `serde_json`'s `preserve_order` feature keeps it intact through parsing.
//! Rows are expected to share the first row's key set but this is not
//! enforced; a missing key renders as an empty cell downstream.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One transcribed row of the source table, keyed by column name.
///
/// Iteration order is the order of first appearance, never sorted.
pub type TableRow = IndexMap<String, String>;

/// The ordered result of one extraction call.
///
/// Row order reflects the order rows appeared in the source image. Empty
/// means the extraction ran and found nothing; "nothing extracted yet" is
/// represented by the absence of a `TableData` (e.g. `Option::None` in
/// [`crate::session::Session`]), not by a sentinel value here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableData {
    pub rows: Vec<TableRow>,
}

impl TableData {
    pub fn new(rows: Vec<TableRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Header set: the keys of row 0 in first-appearance order.
    ///
    /// Empty for empty data.
    pub fn headers(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> TableRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn headers_come_from_first_row_in_order() {
        let data = TableData::new(vec![
            row(&[("row", "1"), ("J", "a"), ("K", "b"), ("L", "c")]),
            row(&[("row", "2"), ("J", "d"), ("K", "e"), ("L", "f")]),
        ]);
        assert_eq!(data.headers(), vec!["row", "J", "K", "L"]);
    }

    #[test]
    fn headers_of_empty_data_are_empty() {
        assert!(TableData::default().headers().is_empty());
        assert!(TableData::default().is_empty());
    }

    #[test]
    fn insertion_order_is_not_sorted() {
        // "Z" before "A": natural iteration order must win over lexical.
        let data = TableData::new(vec![row(&[("Z", "1"), ("A", "2")])]);
        assert_eq!(data.headers(), vec!["Z", "A"]);
    }
}
