//! Row expansion and CSV emission.
//!
//! A logical record becomes one or more flat rows. Unbounded fields are
//! zipped by position: the record yields as many rows as its longest
//! sequence, shorter sequences are padded with null and single values are
//! repeated on every row.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{OutputError, OutputResult};
use crate::logs::log_warning;
use crate::models::{FieldValue, LogicalRecord, OutputRow};

pub const DEFAULT_DELIMITER: u8 = b',';

/// Expand one record into rows restricted to `field_order`.
///
/// The row count is the longest sequence among all of the record's fields,
/// including fields left out of `field_order`. Without sequences (or with
/// only empty ones) the record yields exactly one row.
pub fn expand(record: &LogicalRecord, field_order: &[String]) -> Vec<OutputRow> {
    let n = record
        .values
        .values()
        .filter_map(FieldValue::repeat_len)
        .max()
        .unwrap_or(0);

    let build = |i: usize| {
        let cells = field_order
            .iter()
            .map(|name| {
                let value = match record.get(name) {
                    Some(FieldValue::Single(v)) => v.clone(),
                    Some(FieldValue::Repeated(values)) => values.get(i).cloned().flatten(),
                    None => None,
                };
                (name.clone(), value)
            })
            .collect();
        OutputRow::new(cells)
    };

    if n == 0 {
        vec![build(0)]
    } else {
        (0..n).map(build).collect()
    }
}

/// Header and rows ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Serialized {
    pub header: Vec<String>,
    pub rows: Vec<OutputRow>,
    pub warnings: Vec<String>,
}

/// Expand every record, in order.
pub fn serialize(records: &[LogicalRecord], field_order: &[String]) -> Serialized {
    let mut warnings = Vec::new();
    if records.is_empty() {
        let message = "No records to write, output has a header only".to_string();
        log_warning(&message);
        warnings.push(message);
    }

    let rows = records
        .iter()
        .flat_map(|record| expand(record, field_order))
        .collect();

    Serialized {
        header: field_order.to_vec(),
        rows,
        warnings,
    }
}

impl Serialized {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Write header and rows as delimited text.
    pub fn write_csv<W: Write>(&self, writer: W, delimiter: u8) -> OutputResult<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);

        csv_writer.write_record(&self.header)?;
        for row in &self.rows {
            csv_writer.write_record(row.to_record())?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self, delimiter: u8) -> OutputResult<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf, delimiter)?;
        String::from_utf8(buf)
            .map_err(|e| OutputError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    /// Write to a file, creating parent directories as needed.
    pub fn write_to_file(&self, path: &Path, delimiter: u8) -> OutputResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.write_csv(file, delimiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scalar;

    fn text(s: &str) -> Option<Scalar> {
        Some(Scalar::Text(s.to_string()))
    }

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_row_without_sequences() {
        let record = LogicalRecord::new(0)
            .with_value("ID", FieldValue::Single(text("1")))
            .with_value("Price", FieldValue::Single(Some(Scalar::Decimal(2.0))));

        let rows = expand(&record, &order(&["ID", "Price"]));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].to_record(), vec!["1", "2.0"]);
    }

    #[test]
    fn test_empty_sequence_yields_one_row() {
        let record = LogicalRecord::new(0)
            .with_value("ID", FieldValue::Single(text("2")))
            .with_value("Tag", FieldValue::Repeated(vec![]));

        let rows = expand(&record, &order(&["ID", "Tag"]));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("ID"), text("2").as_ref());
        assert_eq!(rows[0].get("Tag"), None);
    }

    #[test]
    fn test_positional_zip_pads_shorter_sequences() {
        let record = LogicalRecord::new(0)
            .with_value("ID", FieldValue::Single(text("1")))
            .with_value("A", FieldValue::Repeated(vec![text("a1"), text("a2"), text("a3")]))
            .with_value("B", FieldValue::Repeated(vec![text("b1")]));

        let rows = expand(&record, &order(&["ID", "A", "B"]));
        let rendered: Vec<Vec<String>> = rows.iter().map(OutputRow::to_record).collect();
        assert_eq!(
            rendered,
            vec![
                vec!["1", "a1", "b1"],
                vec!["1", "a2", ""],
                vec!["1", "a3", ""],
            ]
        );
    }

    #[test]
    fn test_field_order_restricts_and_orders_columns() {
        let record = LogicalRecord::new(0)
            .with_value("A", FieldValue::Single(text("a")))
            .with_value("B", FieldValue::Single(text("b")))
            .with_value("Hidden", FieldValue::Repeated(vec![text("x"), text("y")]));

        let rows = expand(&record, &order(&["B", "A"]));
        // the hidden sequence still drives the row count
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].to_record(), vec!["b", "a"]);
    }

    #[test]
    fn test_serialize_csv_quoting() {
        let record = LogicalRecord::new(0)
            .with_value("Name", FieldValue::Single(text("Acme, Inc")))
            .with_value("Note", FieldValue::Single(text("say \"hi\"")));

        let out = serialize(&[record], &order(&["Name", "Note"]));
        assert!(out.warnings.is_empty());
        let csv = out.to_csv_string(DEFAULT_DELIMITER).unwrap();
        assert_eq!(csv, "Name,Note\n\"Acme, Inc\",\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn test_serialize_empty_is_header_only_with_warning() {
        let mut capture = crate::logs::capture();
        let out = serialize(&[], &order(&["ID", "Tag"]));
        assert_eq!(out.row_count(), 0);
        assert_eq!(out.warnings.len(), 1);
        assert!(capture.warnings().contains(&out.warnings[0]));
        assert_eq!(out.to_csv_string(DEFAULT_DELIMITER).unwrap(), "ID,Tag\n");
    }

    #[test]
    fn test_custom_delimiter_and_file_output() {
        let record = LogicalRecord::new(0).with_value("ID", FieldValue::Single(text("1")));
        let out = serialize(&[record], &order(&["ID", "Missing"]));
        assert_eq!(out.to_csv_string(b';').unwrap(), "ID;Missing\n1;\n");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        out.write_to_file(&path, DEFAULT_DELIMITER).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ID,Missing\n1,\n");
    }
}
