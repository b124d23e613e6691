//! Error types for the xmlflat conversion pipeline.
//!
//! This module defines one error type per stage:
//!
//! - [`SchemaError`] - Malformed tabular field schema (config generation)
//! - [`ConfigError`] - Malformed or missing persisted configuration
//! - [`XmlError`] - Input document that cannot be parsed into a tree
//! - [`PathResolutionError`] - Path expression that cannot be evaluated
//! - [`CoercionError`] - Text that cannot be parsed as the declared type
//! - [`ValidationError`] - Record missing a required field
//! - [`OutputError`] - CSV emission failures
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Structural errors (schema, config, XML) are fatal to a run. Path, coercion
//! and validation errors are per-record and are recovered by the extractor.
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors while reading the tabular field schema or compiling configurations.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Failed to read file.
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV structure.
    #[error("Invalid schema CSV: {0}")]
    ParseError(String),

    /// Empty file.
    #[error("Schema file is empty")]
    EmptyFile,

    /// A required column is absent from a row.
    #[error("Schema line {line}: missing required column '{column}'")]
    MissingColumn { line: usize, column: String },

    /// `data_type` holds a value outside the supported set.
    #[error("Schema line {line}: unknown data_type '{value}'")]
    UnknownDataType { line: usize, value: String },

    /// Two rows flagged for the same asset class share a name.
    #[error("Schema line {line}: duplicate field '{name}' for asset class '{asset_class}'")]
    DuplicateField {
        line: usize,
        name: String,
        asset_class: String,
    },

    /// No asset class flag columns were found.
    #[error("Schema has no asset class columns")]
    NoAssetClasses,

    /// The requested asset class has no column in the schema.
    #[error("Schema has no column for asset class '{0}'")]
    UnknownAssetClass(String),

    /// A generated configuration failed validation.
    #[error("Invalid generated configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Failed to persist a generated configuration.
    #[error("Failed to write configuration: {0}")]
    WriteError(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors loading or validating a persisted field-mapping configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error.
    #[error("Config IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error (including unknown `data_type` values).
    #[error("Config JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The document does not match the configuration JSON schema.
    #[error("Config does not match schema: {errors:?}")]
    SchemaViolation { errors: Vec<String> },

    /// Two fields share a name.
    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    /// `field_order` names a field that is not declared.
    #[error("field_order references unknown field: {0}")]
    UnknownFieldInOrder(String),

    /// `record_element` is empty.
    #[error("record_element must not be empty")]
    EmptyRecordElement,

    /// No configuration for the requested asset class.
    #[error("Configuration not found: {0}")]
    NotFound(String),
}

// =============================================================================
// XML Errors
// =============================================================================

/// Errors while building the element tree.
#[derive(Debug, Error)]
pub enum XmlError {
    /// Failed to read file.
    #[error("Failed to read XML file: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed XML.
    #[error("XML parse error at position {position}: {message}")]
    ParseError { position: u64, message: String },

    /// Declared encoding is unknown, or the bytes do not decode with it.
    #[error("XML encoding error: {0}")]
    EncodingError(String),

    /// Document contains no element.
    #[error("XML document has no root element")]
    NoRoot,
}

// =============================================================================
// Path Resolution Errors
// =============================================================================

/// A path expression that cannot be evaluated.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Invalid path '{expression}': {message}")]
pub struct PathResolutionError {
    pub expression: String,
    pub message: String,
}

impl PathResolutionError {
    pub fn new(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Coercion Errors
// =============================================================================

/// Non-null text that cannot be parsed as the declared numeric type.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoercionError {
    #[error("'{0}' is not a valid decimal")]
    InvalidDecimal(String),

    #[error("'{0}' is not a valid integer")]
    InvalidInteger(String),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Record-level validation failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// Required scalar fields resolved to null.
    #[error("Record {record}: missing required field(s): {}", .fields.join(", "))]
    MissingRequired { record: usize, fields: Vec<String> },

    /// A field value could not be coerced.
    #[error("Record {record}: field '{field}': {source}")]
    InvalidValue {
        record: usize,
        field: String,
        source: CoercionError,
    },
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while emitting delimited text.
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error.
    #[error("Output IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV writer error.
    #[error("CSV write error: {0}")]
    CsvError(#[from] csv::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline`].
/// It wraps all fatal lower-level errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Schema compilation error.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// XML parse error.
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    /// Output error.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// No configuration matched an input file.
    #[error("Could not determine asset class for {0}")]
    NoConfigForFile(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for XML operations.
pub type XmlResult<T> = Result<T, XmlError>;

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // SchemaError -> PipelineError
        let schema_err = SchemaError::EmptyFile;
        let pipeline_err: PipelineError = schema_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // ConfigError -> PipelineError
        let config_err = ConfigError::UnknownFieldInOrder("ISIN".into());
        let pipeline_err: PipelineError = config_err.into();
        assert!(pipeline_err.to_string().contains("ISIN"));
    }

    #[test]
    fn test_validation_error_format() {
        let err = ValidationError::MissingRequired {
            record: 3,
            fields: vec!["ID".into(), "Name".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Record 3"));
        assert!(msg.contains("ID, Name"));

        let err = ValidationError::InvalidValue {
            record: 1,
            field: "Price".into(),
            source: CoercionError::InvalidDecimal("N/A".into()),
        };
        assert!(err.to_string().contains("'N/A' is not a valid decimal"));
    }

    #[test]
    fn test_missing_column_format() {
        let err = SchemaError::MissingColumn {
            line: 4,
            column: "xpath".into(),
        };
        assert_eq!(err.to_string(), "Schema line 4: missing required column 'xpath'");
    }
}
