//! Response parsing: raw model text → [`TableData`].
//!
//! ## Why hygiene passes before `serde_json`?
//!
//! Even well-prompted VLMs occasionally disobey the "no fences" rule and
//! wrap their answer in ` ```json … ``` `, or pad it with whitespace. Both
//! are *semantically correct* answers that would fail a strict parse, so we
//! trim and strip the outer fence first. Anything that still fails to parse
//! is classified as [`Scan2CsvError::MalformedResponse`] — the caller sees
//! the fixed user-facing message, never a raw parser diagnostic.
//!
//! Models also occasionally return `{"rows": [...]}` instead of a bare
//! array; a single-key object wrapping an array is unwrapped before the
//! shape check.

use crate::config::SchemaPolicy;
use crate::error::Scan2CsvError;
use crate::table::{TableData, TableRow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\n(.*)\n```\s*$").unwrap());

/// Parse the raw model output into table rows, enforcing the schema policy.
pub fn parse_rows(raw: &str, policy: &SchemaPolicy) -> Result<TableData, Scan2CsvError> {
    let cleaned = strip_json_fences(raw.trim());

    let value: Value =
        serde_json::from_str(cleaned.trim()).map_err(|e| Scan2CsvError::MalformedResponse {
            detail: e.to_string(),
        })?;

    let items = into_row_array(value)?;

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(object) = item else {
            return Err(Scan2CsvError::MalformedResponse {
                detail: "array element is not an object".into(),
            });
        };
        rows.push(object_to_row(object, policy)?);
    }

    Ok(TableData::new(rows))
}

/// Strip a single outer ```json fence, if the model added one.
fn strip_json_fences(input: &str) -> &str {
    match RE_OUTER_FENCES.captures(input) {
        Some(caps) => caps.get(1).map_or(input, |m| m.as_str()),
        None => input,
    }
}

/// Accept either a bare array or a single-key object wrapping one.
fn into_row_array(value: Value) -> Result<Vec<Value>, Scan2CsvError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) if map.len() == 1 => {
            match map.into_iter().next() {
                Some((_, Value::Array(items))) => Ok(items),
                _ => Err(Scan2CsvError::MalformedResponse {
                    detail: "top-level JSON is not an array of rows".into(),
                }),
            }
        }
        _ => Err(Scan2CsvError::MalformedResponse {
            detail: "top-level JSON is not an array of rows".into(),
        }),
    }
}

/// Convert one JSON object into a row, applying the schema policy.
///
/// Dynamic: keys pass through in the order the model emitted them
/// (`serde_json`'s `preserve_order` keeps `Map` insertion-ordered).
///
/// Fixed: the object must carry exactly the declared keys; the row is
/// rebuilt in declared-column order so rendering is deterministic even if
/// the model shuffled the keys.
fn object_to_row(
    object: serde_json::Map<String, Value>,
    policy: &SchemaPolicy,
) -> Result<TableRow, Scan2CsvError> {
    match policy {
        SchemaPolicy::Dynamic => Ok(object
            .into_iter()
            .map(|(key, value)| (key, value_to_cell(value)))
            .collect()),
        SchemaPolicy::Fixed(columns) => {
            if object.len() != columns.len() {
                return Err(Scan2CsvError::MalformedResponse {
                    detail: format!(
                        "expected {} fixed columns, row has {} keys",
                        columns.len(),
                        object.len()
                    ),
                });
            }
            let mut object = object;
            let mut row = TableRow::with_capacity(columns.len());
            for column in columns {
                let value = object.remove(column).ok_or_else(|| {
                    Scan2CsvError::MalformedResponse {
                        detail: format!("row is missing fixed column '{column}'"),
                    }
                })?;
                row.insert(column.clone(), value_to_cell(value));
            }
            Ok(row)
        }
    }
}

/// Coerce a JSON scalar to a cell string. Models sometimes emit bare
/// numbers for numeric-looking cells; those transcribe as their literal
/// text rather than failing the whole extraction.
fn value_to_cell(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Nested structure is not table data, but losing the whole sheet
        // over one odd cell is worse than a JSON-literal cell.
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_schema_rows_in_declared_order() {
        let raw = r#"[{"row":"1","J":"a","K":"b","L":"c"}]"#;
        let data = parse_rows(raw, &SchemaPolicy::fixed_default()).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.headers(), vec!["row", "J", "K", "L"]);
        assert_eq!(
            data.rows[0].values().collect::<Vec<_>>(),
            vec!["1", "a", "b", "c"]
        );
    }

    #[test]
    fn fixed_schema_reorders_shuffled_keys() {
        let raw = r#"[{"L":"c","row":"1","K":"b","J":"a"}]"#;
        let data = parse_rows(raw, &SchemaPolicy::fixed_default()).unwrap();
        assert_eq!(data.headers(), vec!["row", "J", "K", "L"]);
    }

    #[test]
    fn fixed_schema_rejects_missing_key() {
        let raw = r#"[{"row":"1","J":"a","K":"b"}]"#;
        let err = parse_rows(raw, &SchemaPolicy::fixed_default()).unwrap_err();
        assert!(matches!(err, Scan2CsvError::MalformedResponse { .. }));
    }

    #[test]
    fn fixed_schema_rejects_extra_key() {
        let raw = r#"[{"row":"1","J":"a","K":"b","L":"c","M":"d"}]"#;
        let err = parse_rows(raw, &SchemaPolicy::fixed_default()).unwrap_err();
        assert!(matches!(err, Scan2CsvError::MalformedResponse { .. }));
    }

    #[test]
    fn dynamic_headers_preserve_model_order() {
        let raw = r#"[{"Depth":"4'-7 1/8\"","Notes":"ok"}]"#;
        let data = parse_rows(raw, &SchemaPolicy::Dynamic).unwrap();
        assert_eq!(data.headers(), vec!["Depth", "Notes"]);
        assert_eq!(data.rows[0]["Depth"], "4'-7 1/8\"");
    }

    #[test]
    fn incidental_whitespace_and_fences_are_tolerated() {
        let raw = "\n  ```json\n[{\"a\":\"1\"}]\n```  \n";
        let data = parse_rows(raw, &SchemaPolicy::Dynamic).unwrap();
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn single_key_object_wrapper_is_unwrapped() {
        let raw = r#"{"rows": [{"a":"1"},{"a":"2"}]}"#;
        let data = parse_rows(raw, &SchemaPolicy::Dynamic).unwrap();
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn empty_array_is_valid_and_empty() {
        let data = parse_rows("[]", &SchemaPolicy::Dynamic).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn non_json_is_malformed_with_fixed_message() {
        let err = parse_rows("Sorry, I can't read this image.", &SchemaPolicy::Dynamic)
            .unwrap_err();
        assert!(matches!(err, Scan2CsvError::MalformedResponse { .. }));
        assert!(err.to_string().contains("unexpected format"));
    }

    #[test]
    fn scalar_cells_are_coerced_to_strings() {
        let raw = r#"[{"row": 1, "J": null, "K": true, "L": "x"}]"#;
        let data = parse_rows(raw, &SchemaPolicy::fixed_default()).unwrap();
        assert_eq!(
            data.rows[0].values().collect::<Vec<_>>(),
            vec!["1", "", "true", "x"]
        );
    }
}
