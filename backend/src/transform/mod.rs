//! Transformation module.
//!
//! This module handles XML to CSV conversion:
//! - Coerce: typed value coercion
//! - Extractor: record elements to logical records
//! - Expand: logical records to flat rows and CSV
//! - Pipeline: file and batch conversion

pub mod coerce;
pub mod expand;
pub mod extractor;
pub mod pipeline;

pub use coerce::{coerce, coerce_all};
pub use expand::{expand, serialize, Serialized, DEFAULT_DELIMITER};
pub use extractor::{extract, ExtractResult, ExtractStats};
pub use pipeline::*;
