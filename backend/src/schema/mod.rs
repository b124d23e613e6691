//! Schema Compiler - field schema to per-asset-class configurations
//!
//! A field schema is a table with one row per field and these columns:
//!
//! | Column        | Meaning                                              |
//! |---------------|------------------------------------------------------|
//! | `name`        | output column name                                   |
//! | `xpath`       | path expression relative to the record element       |
//! | `category`    | descriptive, optional                                |
//! | `data_type`   | `string`, `decimal`, `integer`, `boolean` or `date`  |
//! | `occurrence`  | `1` (required), `unbounded`, anything else optional  |
//! | *other*       | one flag column per asset class                      |
//!
//! Every column that is not one of the above is an asset class. A row goes
//! into an asset class's configuration when its flag is truthy (`1`, `true`,
//! `yes`, `y` or `x`). Fields keep schema row order, which is also the
//! output column order.

pub mod reader;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{
    Configuration, FieldDefinition, DEFAULT_FILE_PATTERN, DEFAULT_RECORD_ELEMENT,
    DEFAULT_ROOT_ELEMENT,
};
use crate::error::{SchemaError, SchemaResult};
use crate::logs::{log_info, log_success};
use crate::models::DataType;

pub use reader::{
    decode_content, detect_delimiter, detect_encoding, parse_schema, parse_schema_bytes,
    read_schema_file, SchemaRow, SchemaTable,
};

/// Columns that describe a field rather than an asset class.
pub const FIELD_COLUMNS: [&str; 5] = ["name", "xpath", "category", "data_type", "occurrence"];

/// Columns every row must have.
pub const REQUIRED_COLUMNS: [&str; 4] = ["name", "xpath", "data_type", "occurrence"];

const TRUTHY_FLAGS: [&str; 5] = ["1", "true", "yes", "y", "x"];

/// Defaults written into every generated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub root_element: String,
    pub record_element: String,
    pub file_pattern: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            root_element: DEFAULT_ROOT_ELEMENT.to_string(),
            record_element: DEFAULT_RECORD_ELEMENT.to_string(),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
        }
    }
}

/// A schema row checked for required columns and a known data type.
struct FieldRow<'a> {
    row: &'a SchemaRow,
    name: &'a str,
    xpath: &'a str,
    category: &'a str,
    data_type: DataType,
    occurrence: &'a str,
}

impl<'a> FieldRow<'a> {
    fn parse(row: &'a SchemaRow) -> SchemaResult<Self> {
        for column in REQUIRED_COLUMNS {
            row.require(column)?;
        }
        let name = row.require("name")?;
        let xpath = row.require("xpath")?;
        // A blank name or path is as good as a missing one
        for (column, value) in [("name", name), ("xpath", xpath)] {
            if value.is_empty() {
                return Err(SchemaError::MissingColumn {
                    line: row.line,
                    column: column.to_string(),
                });
            }
        }

        let raw_type = row.require("data_type")?;
        let data_type = raw_type
            .parse::<DataType>()
            .map_err(|value| SchemaError::UnknownDataType {
                line: row.line,
                value,
            })?;

        Ok(Self {
            row,
            name,
            xpath,
            category: row.get("category").unwrap_or(""),
            data_type,
            occurrence: row.require("occurrence")?,
        })
    }

    fn to_field(&self) -> FieldDefinition {
        let mut field = FieldDefinition::new(self.name, self.xpath, self.data_type)
            .with_category(self.category);
        field.required = self.occurrence == "1";
        field.unbounded = self.occurrence.eq_ignore_ascii_case("unbounded");
        field
    }

    fn is_flagged(&self, asset_class: &str) -> bool {
        self.row
            .get(asset_class)
            .is_some_and(|flag| TRUTHY_FLAGS.iter().any(|t| flag.eq_ignore_ascii_case(t)))
    }
}

/// Asset class columns of a schema, in header order.
pub fn asset_classes(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .filter(|h| !h.is_empty() && !FIELD_COLUMNS.contains(&h.as_str()))
        .cloned()
        .collect()
}

/// Compile one configuration per asset class column.
pub fn compile(table: &SchemaTable, options: &CompileOptions) -> SchemaResult<Vec<Configuration>> {
    let classes = asset_classes(&table.headers);
    if classes.is_empty() {
        return Err(SchemaError::NoAssetClasses);
    }

    let rows = table
        .rows
        .iter()
        .map(FieldRow::parse)
        .collect::<SchemaResult<Vec<_>>>()?;

    classes
        .iter()
        .map(|asset_class| compile_rows(&rows, asset_class, options))
        .collect()
}

/// Compile the configuration of a single asset class.
pub fn compile_asset_class(
    table: &SchemaTable,
    asset_class: &str,
    options: &CompileOptions,
) -> SchemaResult<Configuration> {
    if !asset_classes(&table.headers).iter().any(|c| c == asset_class) {
        return Err(SchemaError::UnknownAssetClass(asset_class.to_string()));
    }
    let rows = table
        .rows
        .iter()
        .map(FieldRow::parse)
        .collect::<SchemaResult<Vec<_>>>()?;
    compile_rows(&rows, asset_class, options)
}

fn compile_rows(
    rows: &[FieldRow],
    asset_class: &str,
    options: &CompileOptions,
) -> SchemaResult<Configuration> {
    let mut seen = HashSet::new();
    let mut fields = Vec::new();

    for row in rows.iter().filter(|r| r.is_flagged(asset_class)) {
        if !seen.insert(row.name) {
            return Err(SchemaError::DuplicateField {
                line: row.row.line,
                name: row.name.to_string(),
                asset_class: asset_class.to_string(),
            });
        }
        fields.push(row.to_field());
    }

    let mut config = Configuration::new(asset_class, &options.record_element, fields)?;
    config.xml_structure.root_element = options.root_element.clone();
    config.csv_output.file_pattern = options.file_pattern.clone();
    Ok(config)
}

/// Read a schema file, compile it and write `<asset_class>_config.json`
/// files into `config_dir`.
pub fn compile_to_dir(
    schema_file: &Path,
    config_dir: &Path,
    options: &CompileOptions,
) -> SchemaResult<Vec<PathBuf>> {
    log_info(format!("📖 Reading schema {}", schema_file.display()));
    let table = read_schema_file(schema_file)?;
    log_success(format!(
        "Detected encoding: {}, separator: '{}'",
        table.encoding,
        format_delimiter(table.delimiter)
    ));
    log_success(format!("Read {} field rows", table.rows.len()));

    let configs = compile(&table, options)?;

    fs::create_dir_all(config_dir)?;
    let mut written = Vec::new();
    for config in configs {
        let path = config_dir.join(config.file_name());
        config
            .save(&path)
            .map_err(|e| SchemaError::WriteError(format!("{}: {}", path.display(), e)))?;
        log_success(format!(
            "Generated {} ({} fields)",
            path.display(),
            config.fields().len()
        ));
        written.push(path);
    }

    Ok(written)
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}
