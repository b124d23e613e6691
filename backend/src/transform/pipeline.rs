//! High-level pipeline API for XML to CSV conversion.
//!
//! This module combines all steps: parsing the document, extracting records
//! with a configuration, expanding them into rows and writing the CSV.
//!
//! # Example
//!
//! ```rust,ignore
//! use xmlflat::{convert_file, ConfigStore, ConvertOptions};
//! use std::path::Path;
//!
//! let store = ConfigStore::with_dir("configs");
//! let config = store.require("equity")?;
//! let report = convert_file(
//!     Path::new("FULINS_E_20240105_equity.xml"),
//!     config,
//!     Path::new("out/FULINS_E_20240105_equity.csv"),
//!     &ConvertOptions::default(),
//! )?;
//! println!("Wrote {} rows", report.rows);
//! ```

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::expand::{serialize, Serialized, DEFAULT_DELIMITER};
use super::extractor::{extract, ExtractResult, ExtractStats};
use crate::config::{ConfigStore, Configuration};
use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_error, log_info, log_success, log_warning};
use crate::models::SkippedRecord;
use crate::xml::XmlDocument;

/// Options for the conversion pipeline
#[derive(Debug, Clone, Serialize)]
pub struct ConvertOptions {
    /// Output field delimiter
    pub delimiter: u8,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

/// In-memory result of converting one document
#[derive(Debug)]
pub struct Conversion {
    pub extract: ExtractResult,
    pub output: Serialized,
}

/// Summary of one converted file
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub asset_class: String,
    pub stats: ExtractStats,
    /// Rows written, header excluded
    pub rows: usize,
    pub skipped: Vec<SkippedRecord>,
    pub warnings: Vec<String>,
}

/// Summary of a batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub converted: Vec<ConversionReport>,
    /// Input files that could not be converted, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} file(s) converted, {} failed",
            self.converted.len(),
            self.failed.len()
        )
    }
}

/// Extract and expand a parsed document.
pub fn convert_document(doc: &XmlDocument, config: &Configuration) -> Conversion {
    let extract = extract(doc, config);
    let output = serialize(&extract.records, config.field_order());
    Conversion { extract, output }
}

/// Convert XML text with a configuration.
pub fn convert_str(xml: &str, config: &Configuration) -> PipelineResult<Conversion> {
    let doc = XmlDocument::parse(xml)?;
    Ok(convert_document(&doc, config))
}

/// Convert one XML file and write the CSV to `output`.
pub fn convert_file(
    input: &Path,
    config: &Configuration,
    output: &Path,
    options: &ConvertOptions,
) -> PipelineResult<ConversionReport> {
    log_info(format!("📖 Reading {}", input.display()));
    let doc = XmlDocument::from_file(input)?;
    log_success(format!("Parsed {} elements", doc.element_count()));

    log_info(format!(
        "⚙️  Extracting <{}> records ({})",
        config.record_element(),
        config.asset_class
    ));
    let conversion = convert_document(&doc, config);
    print_extract_result(&conversion.extract);

    conversion.output.write_to_file(output, options.delimiter)?;
    log_success(format!(
        "Wrote {} rows to {}",
        conversion.output.row_count(),
        output.display()
    ));

    let mut warnings: Vec<String> = conversion
        .extract
        .path_errors
        .iter()
        .map(|e| e.to_string())
        .collect();
    warnings.extend(conversion.output.warnings.iter().cloned());

    Ok(ConversionReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        asset_class: config.asset_class.clone(),
        stats: ExtractStats::from(&conversion.extract),
        rows: conversion.output.row_count(),
        skipped: conversion.extract.skipped,
        warnings,
    })
}

/// Output path for an input file: `file_pattern` applied to the input stem.
pub fn output_path_for(input: &Path, config: &Configuration, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    output_dir.join(config.output_file_name(stem))
}

/// List the `*.xml` files of a directory, sorted by name.
pub fn xml_files(input_dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(input_dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Convert every XML file of `input_dir` into `output_dir`.
///
/// The configuration for a file is the one whose asset class occurs in the
/// file name. A file without a configuration, or one that fails to convert,
/// is logged and recorded in the report; the batch continues.
pub fn run_batch(
    input_dir: &Path,
    store: &ConfigStore,
    output_dir: &Path,
    options: &ConvertOptions,
) -> PipelineResult<BatchReport> {
    if store.is_empty() {
        log_warning(format!("No configurations found in {}", store.dir().display()));
    }

    fs::create_dir_all(output_dir)?;
    let files = xml_files(input_dir)?;
    log_info(format!(
        "📋 {} XML file(s) in {}",
        files.len(),
        input_dir.display()
    ));

    let mut report = BatchReport::default();

    for input in files {
        let Some(config) = store.find_for_file(&input) else {
            let err = PipelineError::NoConfigForFile(input.display().to_string());
            log_error(err.to_string());
            report.failed.push((input, err.to_string()));
            continue;
        };

        let output = output_path_for(&input, config, output_dir);
        match convert_file(&input, config, &output, options) {
            Ok(converted) => report.converted.push(converted),
            Err(e) => {
                log_error(format!("{}: {}", input.display(), e));
                report.failed.push((input, e.to_string()));
            }
        }
    }

    if report.is_ok() {
        log_success(report.summary());
    } else {
        log_warning(report.summary());
    }

    Ok(report)
}

/// Print extraction result details
fn print_extract_result(result: &ExtractResult) {
    log_success(format!("Extracted {} records", result.records.len()));

    if !result.path_errors.is_empty() {
        log_warning(format!(
            "{} field path(s) could not be resolved",
            result.path_errors.len()
        ));
    }
    if !result.skipped.is_empty() {
        log_warning(format!("{} records skipped", result.skipped.len()));

        // Group by reason
        let mut reasons: std::collections::BTreeMap<String, Vec<usize>> =
            std::collections::BTreeMap::new();
        for skip in &result.skipped {
            let key = format!("{}: {}", skip.reason, skip.fields.join(", "));
            reasons.entry(key).or_default().push(skip.index);
        }

        for (reason, indices) in reasons.iter().take(5) {
            let sample: Vec<String> = indices.iter().take(5).map(|i| i.to_string()).collect();
            let more = if indices.len() > 5 {
                format!("... +{}", indices.len() - 5)
            } else {
                String::new()
            };
            log_warning(format!("• {} (records: {}{})", reason, sample.join(", "), more));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldDefinition;
    use crate::models::DataType;
    use tempfile::tempdir;

    fn config(asset_class: &str) -> Configuration {
        Configuration::new(
            asset_class,
            "Instrument",
            vec![
                FieldDefinition::new("ID", "ID", DataType::String).required(),
                FieldDefinition::new("Tag", "Tags/Tag", DataType::String).unbounded(),
            ],
        )
        .unwrap()
    }

    const XML: &str = "<Instruments>\
        <Instrument><ID>1</ID><Tags><Tag>x</Tag><Tag>y</Tag></Tags></Instrument>\
        <Instrument><ID>2</ID></Instrument>\
        </Instruments>";

    #[test]
    fn test_default_options() {
        assert_eq!(ConvertOptions::default().delimiter, b',');
    }

    #[test]
    fn test_convert_str() {
        let conversion = convert_str(XML, &config("equity")).unwrap();
        assert_eq!(conversion.extract.records.len(), 2);
        assert_eq!(
            conversion.output.to_csv_string(b',').unwrap(),
            "ID,Tag\n1,x\n1,y\n2,\n"
        );
    }

    #[test]
    fn test_convert_str_malformed() {
        let err = convert_str("<Instruments>", &config("equity")).unwrap_err();
        assert!(matches!(err, PipelineError::Xml(_)));
    }

    #[test]
    fn test_output_path_for() {
        let path = output_path_for(
            Path::new("in/FULINS_equity.xml"),
            &config("equity"),
            Path::new("out"),
        );
        assert_eq!(path, Path::new("out/FULINS_equity_equity.csv"));
    }

    #[test]
    fn test_run_batch_continues_after_failures() {
        let dir = tempdir().unwrap();
        let input_dir = dir.path().join("in");
        let output_dir = dir.path().join("out");
        fs::create_dir_all(&input_dir).unwrap();

        let mut store = ConfigStore::with_dir(dir.path().join("configs"));
        store.save(config("equity")).unwrap();

        fs::write(input_dir.join("a_equity.xml"), XML).unwrap();
        fs::write(input_dir.join("b_equity.xml"), "<broken").unwrap();
        fs::write(input_dir.join("c_bond.xml"), XML).unwrap();
        fs::write(input_dir.join("notes.txt"), "ignored").unwrap();

        let report = run_batch(&input_dir, &store, &output_dir, &ConvertOptions::default()).unwrap();
        assert_eq!(report.converted.len(), 1);
        assert_eq!(report.failed.len(), 2);
        assert!(!report.is_ok());

        let written = fs::read_to_string(output_dir.join("a_equity_equity.csv")).unwrap();
        assert_eq!(written, "ID,Tag\n1,x\n1,y\n2,\n");
        assert_eq!(report.converted[0].rows, 3);
    }
}
