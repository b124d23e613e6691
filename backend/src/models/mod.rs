//! Domain models for the xmlflat conversion pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`DataType`] - Declared type of a configured field
//! - [`Scalar`] - A typed value produced by coercion
//! - [`FieldValue`] - A field's value inside one logical record
//! - [`LogicalRecord`] - All field values extracted from one record element
//! - [`OutputRow`] - One flat CSV row in `field_order`
//! - [`SkippedRecord`] - A record dropped during extraction

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Data Types
// =============================================================================

/// Declared type of a field in a configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Decimal,
    Integer,
    Boolean,
    Date,
}

impl DataType {
    /// Every supported data type, in declaration order.
    pub const ALL: [DataType; 5] = [
        DataType::String,
        DataType::Decimal,
        DataType::Integer,
        DataType::Boolean,
        DataType::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Decimal => "decimal",
            DataType::Integer => "integer",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        DataType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| s.to_string())
    }
}

// =============================================================================
// Scalars
// =============================================================================

/// A typed scalar value.
///
/// `Text` also carries dates that failed to parse, which are kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Decimal(f64),
    Integer(i64),
    Boolean(bool),
    Date(NaiveDate),
}

impl Scalar {
    /// Render the value as a CSV cell.
    pub fn render(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            Scalar::Decimal(d) => render_decimal(*d),
            Scalar::Integer(i) => i.to_string(),
            Scalar::Boolean(b) => b.to_string(),
            Scalar::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

/// Decimals render the way Python prints floats: positional between `1e-4`
/// and `1e16` (integral values keep a trailing `.0`), scientific with a signed
/// two-digit exponent outside that range.
fn render_decimal(d: f64) -> String {
    if d.is_nan() {
        return "nan".to_string();
    }
    let magnitude = d.abs();
    if d.is_infinite() || magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        if d.is_finite() && d.fract() == 0.0 {
            format!("{:.1}", d)
        } else {
            d.to_string()
        }
    } else {
        let sci = format!("{:e}", d);
        match sci.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ("-", digits),
                    None => ("+", exponent),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => sci,
        }
    }
}

/// Render an optional scalar; null becomes an empty cell.
pub fn render_cell(value: Option<&Scalar>) -> String {
    value.map(Scalar::render).unwrap_or_default()
}

// =============================================================================
// Records
// =============================================================================

/// The value of one field inside a logical record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Single-occurrence field (possibly null).
    Single(Option<Scalar>),
    /// Unbounded field: one entry per matching node, in document order.
    Repeated(Vec<Option<Scalar>>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Single(None))
    }

    /// Number of values when repeated, `None` for single fields.
    pub fn repeat_len(&self) -> Option<usize> {
        match self {
            FieldValue::Repeated(values) => Some(values.len()),
            FieldValue::Single(_) => None,
        }
    }
}

/// All values extracted from one record element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogicalRecord {
    /// Position of the record element among all record elements of the document.
    pub index: usize,
    pub values: HashMap<String, FieldValue>,
}

impl LogicalRecord {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            values: HashMap::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }
}

/// One flat output row. Cells follow the `field_order` the row was built with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputRow {
    cells: Vec<(String, Option<Scalar>)>,
}

impl OutputRow {
    pub fn new(cells: Vec<(String, Option<Scalar>)>) -> Self {
        Self { cells }
    }

    /// Value of a column, `None` when the column is null or unknown.
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.cells
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn cells(&self) -> &[(String, Option<Scalar>)] {
        &self.cells
    }

    /// Rendered cells, ready for the CSV writer.
    pub fn to_record(&self) -> Vec<String> {
        self.cells.iter().map(|(_, v)| render_cell(v.as_ref())).collect()
    }
}

/// A record element that was dropped during extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// Document-order index of the record element.
    pub index: usize,
    pub reason: String,
    /// Fields responsible for the drop.
    pub fields: Vec<String>,
}
