//! # xmlflat - schema-driven XML to CSV flattening
//!
//! xmlflat converts XML record documents into flat CSV files. What to
//! extract is described by a field-mapping configuration, generated once per
//! asset class from a tabular field schema.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ schema.csv  │────▶│  Compiler   │────▶│  *_config   │     │             │
//! └─────────────┘     └─────────────┘     │   .json     │     │             │
//!                                         └──────┬──────┘     │             │
//! ┌─────────────┐     ┌─────────────┐     ┌──────▼──────┐     │    CSV      │
//! │  input.xml  │────▶│  XML tree   │────▶│  Extractor  │────▶│ (expanded)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use xmlflat::{convert_str, Configuration};
//!
//! let config = Configuration::from_file("configs/equity_config.json")?;
//! let conversion = convert_str(&std::fs::read_to_string("equity.xml")?, &config)?;
//! print!("{}", conversion.output.to_csv_string(b',')?);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per stage
//! - [`models`] - Data types, scalars, records and rows
//! - [`schema`] - Field schema reading and config compilation
//! - [`config`] - Field-mapping configuration and its directory store
//! - [`validation`] - JSON Schema validation of configuration documents
//! - [`xml`] - Element tree and path expressions
//! - [`transform`] - Coercion, extraction, row expansion and pipeline
//! - [`logs`] - Leveled logging

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Configuration
pub mod config;
pub mod schema;
pub mod validation;

// Documents
pub mod xml;

// Transformation
pub mod transform;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CoercionError, ConfigError, OutputError, PathResolutionError, PipelineError, SchemaError,
    ValidationError, XmlError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{DataType, FieldValue, LogicalRecord, OutputRow, Scalar, SkippedRecord};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{ConfigStore, Configuration, CsvOutput, FieldDefinition, XmlStructure};
pub use schema::{compile, compile_asset_class, compile_to_dir, read_schema_file, CompileOptions};
pub use validation::{is_valid_config_document, validate_config_document};

// =============================================================================
// Re-exports - Documents
// =============================================================================

pub use xml::{resolve, resolve_all, split_expression, PathExpr, XmlDocument, XmlNode};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    coerce, convert_document, convert_file, convert_str, expand, extract, run_batch,
    serialize, BatchReport, Conversion, ConversionReport, ConvertOptions, ExtractResult,
    Serialized,
};
