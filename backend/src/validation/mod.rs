//! JSON Schema validation for persisted field-mapping configurations.
//!
//! Configurations are hand-off artifacts between the schema compiler and the
//! record extractor, and they are often edited by hand. Before a document is
//! deserialized into [`crate::config::Configuration`] it is checked against
//! an embedded JSON Schema (Draft 7) so that structural mistakes are reported
//! all at once instead of as the first serde failure.
//!
//! # Embedded Schema
//!
//! The schema is embedded at compile time from `schemas/field-mapping-config.json`.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use xmlflat::validation::validate_config_document;
//!
//! let doc = json!({
//!     "asset_class": "equity",
//!     "xml_structure": { "root_element": "Instruments", "record_element": "Instrument", "fields": [] },
//!     "csv_output": { "field_order": [] }
//! });
//! assert!(validate_config_document(&doc).is_ok());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static CONFIG_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/field-mapping-config.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick check, true/false only.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate a raw configuration document against the embedded config schema.
pub fn validate_config_document(data: &Value) -> Result<(), Vec<String>> {
    validate(&CONFIG_SCHEMA, data)
}

/// Quick check against the embedded config schema.
pub fn is_valid_config_document(data: &Value) -> bool {
    is_valid(&CONFIG_SCHEMA, data)
}
