//! Field-mapping configuration.
//!
//! A configuration tells the extractor which elements are records, how to
//! reach every field from a record element, which type each field has, and in
//! which order the fields become CSV columns. Configurations are produced by
//! [`crate::schema`] and persisted as JSON:
//!
//! ```json
//! {
//!   "asset_class": "equity",
//!   "xml_structure": {
//!     "root_element": "Instruments",
//!     "record_element": "Instrument",
//!     "fields": [
//!       { "name": "ISIN", "xpath": "@isin", "category": "id", "data_type": "string", "required": true }
//!     ]
//!   },
//!   "csv_output": { "file_pattern": "{input_filename}_{asset_class}.csv", "field_order": ["ISIN"] }
//! }
//! ```
//!
//! Loading is eager: the document is checked against the embedded JSON
//! schema, deserialized into typed structs, then checked for duplicate names
//! and dangling `field_order` entries. A [`Configuration`] that exists is valid.

pub mod store;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::models::DataType;
use crate::validation::validate_config_document;

pub use store::ConfigStore;

pub const DEFAULT_ROOT_ELEMENT: &str = "Instruments";
pub const DEFAULT_RECORD_ELEMENT: &str = "Instrument";
pub const DEFAULT_FILE_PATTERN: &str = "{input_filename}_{asset_class}.csv";

/// A complete field-mapping configuration for one asset class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Configuration {
    pub asset_class: String,
    pub xml_structure: XmlStructure,
    pub csv_output: CsvOutput,
}

/// Where records live in the document and how fields are reached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XmlStructure {
    pub root_element: String,
    pub record_element: String,
    pub fields: Vec<FieldDefinition>,
}

/// Output naming and column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CsvOutput {
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    pub field_order: Vec<String>,
}

fn default_file_pattern() -> String {
    DEFAULT_FILE_PATTERN.to_string()
}

/// Extraction rule for a single field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDefinition {
    pub name: String,

    /// Path expression relative to the record element.
    #[serde(rename = "xpath")]
    pub path_expression: String,

    /// Free-form, descriptive only.
    #[serde(default)]
    pub category: String,

    pub data_type: DataType,

    #[serde(default)]
    pub required: bool,

    /// Field may occur any number of times per record.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unbounded: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl FieldDefinition {
    /// Create an optional, single-occurrence field
    pub fn new(name: &str, path_expression: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            path_expression: path_expression.to_string(),
            category: String::new(),
            data_type,
            required: false,
            unbounded: false,
        }
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark as unbounded
    pub fn unbounded(mut self) -> Self {
        self.unbounded = true;
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }
}

impl Configuration {
    /// Build and validate a configuration whose `field_order` follows field declaration order.
    pub fn new(
        asset_class: &str,
        record_element: &str,
        fields: Vec<FieldDefinition>,
    ) -> ConfigResult<Self> {
        let field_order = fields.iter().map(|f| f.name.clone()).collect();
        let config = Self {
            asset_class: asset_class.to_string(),
            xml_structure: XmlStructure {
                root_element: DEFAULT_ROOT_ELEMENT.to_string(),
                record_element: record_element.to_string(),
                fields,
            },
            csv_output: CsvOutput {
                file_pattern: default_file_pattern(),
                field_order,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the column order, re-validating it.
    pub fn with_field_order(mut self, field_order: Vec<String>) -> ConfigResult<Self> {
        self.csv_output.field_order = field_order;
        self.validate()?;
        Ok(self)
    }

    /// Parse a configuration from a JSON string
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a configuration from a JSON value
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        validate_config_document(&value)
            .map_err(|errors| ConfigError::SchemaViolation { errors })?;
        let config: Configuration = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        Ok(())
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.xml_structure.record_element.trim().is_empty() {
            return Err(ConfigError::EmptyRecordElement);
        }

        let mut names = HashSet::new();
        for field in &self.xml_structure.fields {
            if !names.insert(field.name.as_str()) {
                return Err(ConfigError::DuplicateField(field.name.clone()));
            }
        }

        if let Some(unknown) = self
            .csv_output
            .field_order
            .iter()
            .find(|name| !names.contains(name.as_str()))
        {
            return Err(ConfigError::UnknownFieldInOrder(unknown.clone()));
        }

        Ok(())
    }

    pub fn root_element(&self) -> &str {
        &self.xml_structure.root_element
    }

    pub fn record_element(&self) -> &str {
        &self.xml_structure.record_element
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.xml_structure.fields
    }

    pub fn field_order(&self) -> &[String] {
        &self.csv_output.field_order
    }

    /// Get a field definition by name
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.xml_structure.fields.iter().find(|f| f.name == name)
    }

    /// Output file name for an input file stem, from `file_pattern`.
    pub fn output_file_name(&self, input_filename: &str) -> String {
        self.csv_output
            .file_pattern
            .replace("{input_filename}", input_filename)
            .replace("{asset_class}", &self.asset_class)
    }

    /// Conventional file name for this configuration inside a config directory.
    pub fn file_name(&self) -> String {
        config_file_name(&self.asset_class)
    }
}

/// `<asset_class>_config.json`
pub fn config_file_name(asset_class: &str) -> String {
    format!("{}_config.json", asset_class)
}
