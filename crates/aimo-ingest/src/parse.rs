//! File-shape detection and row parsing (`spec.md` §4.3 step 1).

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("no CSV header row found in {path}")]
    NoHeader { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileShape {
    Csv,
    JsonArray,
    JsonLines,
}

/// Sniff whether a file is CSV, a JSON array-of-objects, or JSON-Lines, by
/// peeking at the first non-whitespace byte.
pub fn detect_shape(path: &Path) -> Result<FileShape, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        Ok(FileShape::JsonArray)
    } else if trimmed.starts_with('{') {
        Ok(FileShape::JsonLines)
    } else {
        Ok(FileShape::Csv)
    }
}

/// One parsed row plus its 0-based index within the file, both required for
/// `ingest_lineage_hash` (`spec.md` §4.3 step 5) and for skip-with-warning
/// diagnostics.
pub struct ParsedRow {
    pub row_index: u64,
    pub fields: HashMap<String, String>,
}

/// A row that failed to parse structurally (not a canonicalization failure);
/// always logged, never silently dropped (`spec.md` §4.3 step 1).
#[derive(Debug, Clone)]
pub struct RowParseWarning {
    pub row_index: u64,
    pub reason: String,
}

pub struct ParseOutcome {
    pub rows: Vec<ParsedRow>,
    pub warnings: Vec<RowParseWarning>,
}

/// Try `,`, `;`, then tab as the CSV delimiter against the header row;
/// the delimiter that yields the most columns wins.
fn sniff_csv_delimiter(header_line: &str) -> u8 {
    let candidates = [b',', b';', b'\t'];
    candidates
        .into_iter()
        .max_by_key(|&d| header_line.as_bytes().iter().filter(|&&b| b == d).count())
        .unwrap_or(b',')
}

pub fn parse_csv(path: &Path) -> Result<ParseOutcome, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let header_line = content.lines().next().ok_or_else(|| ParseError::NoHeader {
        path: path.display().to_string(),
    })?;
    let delimiter = sniff_csv_delimiter(header_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map(|h| h.iter().map(str::to_string).collect())
        .unwrap_or_default();

    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let row_index = idx as u64;
        match record {
            Ok(record) => {
                let mut fields = HashMap::with_capacity(headers.len());
                for (name, value) in headers.iter().zip(record.iter()) {
                    fields.insert(name.clone(), value.to_string());
                }
                rows.push(ParsedRow { row_index, fields });
            }
            Err(e) => warnings.push(RowParseWarning {
                row_index,
                reason: e.to_string(),
            }),
        }
    }

    Ok(ParseOutcome { rows, warnings })
}

fn json_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn object_to_fields(obj: &serde_json::Map<String, Value>) -> HashMap<String, String> {
    obj.iter().map(|(k, v)| (k.clone(), json_value_to_string(v))).collect()
}

pub fn parse_json_array(path: &Path) -> Result<ParseOutcome, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    match serde_json::from_str::<Vec<Value>>(&content) {
        Ok(values) => {
            for (idx, value) in values.into_iter().enumerate() {
                let row_index = idx as u64;
                match value {
                    Value::Object(obj) => rows.push(ParsedRow {
                        row_index,
                        fields: object_to_fields(&obj),
                    }),
                    _ => warnings.push(RowParseWarning {
                        row_index,
                        reason: "array element is not a JSON object".to_string(),
                    }),
                }
            }
        }
        Err(e) => warnings.push(RowParseWarning {
            row_index: 0,
            reason: format!("failed to parse JSON array: {e}"),
        }),
    }

    Ok(ParseOutcome { rows, warnings })
}

pub fn parse_jsonl(path: &Path) -> Result<ParseOutcome, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let row_index = idx as u64;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(obj)) => rows.push(ParsedRow {
                row_index,
                fields: object_to_fields(&obj),
            }),
            Ok(_) => warnings.push(RowParseWarning {
                row_index,
                reason: "line is not a JSON object".to_string(),
            }),
            Err(e) => warnings.push(RowParseWarning {
                row_index,
                reason: format!("invalid JSON line: {e}"),
            }),
        }
    }

    Ok(ParseOutcome { rows, warnings })
}

pub fn parse_file(path: &Path) -> Result<ParseOutcome, ParseError> {
    match detect_shape(path)? {
        FileShape::Csv => parse_csv(path),
        FileShape::JsonArray => parse_json_array(path),
        FileShape::JsonLines => parse_jsonl(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detects_csv_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        assert_eq!(detect_shape(&path).unwrap(), FileShape::Csv);
    }

    #[test]
    fn detects_json_array_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        std::fs::write(&path, "[{\"a\":1}]").unwrap();
        assert_eq!(detect_shape(&path).unwrap(), FileShape::JsonArray);
    }

    #[test]
    fn detects_jsonl_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        std::fs::write(&path, "{\"a\":1}\n{\"a\":2}\n").unwrap();
        assert_eq!(detect_shape(&path).unwrap(), FileShape::JsonLines);
    }

    #[test]
    fn sniffs_semicolon_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "a;b;c").unwrap();
        writeln!(f, "1;2;3").unwrap();
        let outcome = parse_csv(&path).unwrap();
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].fields.get("b"), Some(&"2".to_string()));
    }

    #[test]
    fn malformed_csv_row_is_a_warning_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        std::fs::write(&path, "a,b\n1,2\n3\n").unwrap();
        let outcome = parse_csv(&path).unwrap();
        assert_eq!(outcome.rows.len(), 2);
    }

    #[test]
    fn jsonl_skips_non_object_lines_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        std::fs::write(&path, "{\"a\":1}\n[1,2]\n").unwrap();
        let outcome = parse_jsonl(&path).unwrap();
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
    }
}
