//! Tabular schema reader with encoding and delimiter auto-detection.
//!
//! Field schemas are usually exported from spreadsheets, so the file may be
//! Latin-1 or Windows-1252 and use `;` as well as `,`. The reader only turns
//! the file into header-keyed rows; it knows nothing about configurations.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{SchemaError, SchemaResult};

/// One data row of the schema, keyed by trimmed header.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRow {
    /// Line of the row in the file (header is line 1)
    pub line: usize,
    cells: HashMap<String, String>,
}

impl SchemaRow {
    pub fn new(line: usize, cells: HashMap<String, String>) -> Self {
        Self { line, cells }
    }

    /// Trimmed cell value; `None` when the row has no such column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(|v| v.trim())
    }

    /// Cell value, or [`SchemaError::MissingColumn`] naming this row's line.
    pub fn require(&self, column: &str) -> SchemaResult<&str> {
        self.get(column).ok_or_else(|| SchemaError::MissingColumn {
            line: self.line,
            column: column.to_string(),
        })
    }
}

/// A parsed schema file with detection metadata
#[derive(Debug, Clone)]
pub struct SchemaTable {
    pub headers: Vec<String>,
    pub rows: Vec<SchemaRow>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string; unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    decoded
        .strip_prefix('\u{feff}')
        .map(str::to_string)
        .unwrap_or(decoded)
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse schema text with an explicit delimiter.
///
/// Rows shorter than the header simply lack the trailing columns; blank
/// lines are skipped.
pub fn parse_schema(content: &str, delimiter: char, encoding: String) -> SchemaResult<SchemaTable> {
    if content.trim().is_empty() {
        return Err(SchemaError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| SchemaError::ParseError(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| SchemaError::ParseError(e.to_string()))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        let cells = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(SchemaRow::new(line, cells));
    }

    Ok(SchemaTable {
        headers,
        rows,
        encoding,
        delimiter,
    })
}

/// Parse schema bytes with auto-detection of encoding and delimiter.
pub fn parse_schema_bytes(bytes: &[u8]) -> SchemaResult<SchemaTable> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    parse_schema(&content, delimiter, encoding)
}

/// Read a schema file with auto-detection of encoding and delimiter.
pub fn read_schema_file(path: impl AsRef<Path>) -> SchemaResult<SchemaTable> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_schema_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comma_schema() {
        let table = parse_schema_bytes(b"name,xpath,equity\nID,@id,1\nName,Name,\n").unwrap();
        assert_eq!(table.delimiter, ',');
        assert_eq!(table.headers, vec!["name", "xpath", "equity"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("xpath"), Some("@id"));
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[1].get("equity"), Some(""));
    }

    #[test]
    fn test_quoted_cells_keep_delimiters() {
        let table = parse_schema_bytes(b"name;xpath\nA;\"Id[@type='a;b']\"\n").unwrap();
        assert_eq!(table.delimiter, ';');
        assert_eq!(table.rows[0].get("xpath"), Some("Id[@type='a;b']"));
    }

    #[test]
    fn test_short_row_lacks_columns() {
        let table = parse_schema("name,xpath,data_type\nA,A\n", ',', "utf-8".into()).unwrap();
        let row = &table.rows[0];
        assert_eq!(row.get("data_type"), None);
        assert!(matches!(
            row.require("data_type"),
            Err(SchemaError::MissingColumn { line: 2, .. })
        ));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let table = parse_schema("name,xpath\nA,A\n,\nB,B\n", ',', "utf-8".into()).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].line, 4);
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(parse_schema_bytes(b""), Err(SchemaError::EmptyFile)));
        assert!(matches!(parse_schema_bytes(b"  \n"), Err(SchemaError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        assert_eq!(decode_content(bytes, "iso-8859-1"), "Société");
    }

    #[test]
    fn test_bom_stripped() {
        let table = parse_schema_bytes("\u{feff}name,xpath\nA,A\n".as_bytes()).unwrap();
        assert_eq!(table.headers[0], "name");
    }
}
