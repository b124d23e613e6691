//! Record Extractor
//!
//! Builds one [`LogicalRecord`] per record element of a document.

use serde::Serialize;

use super::coerce::{coerce, coerce_all};
use crate::config::{Configuration, FieldDefinition};
use crate::error::{PathResolutionError, ValidationError};
use crate::logs::log_warning;
use crate::models::{FieldValue, LogicalRecord, SkippedRecord};
use crate::xml::{PathExpr, XmlDocument, XmlNode};

/// Result of extracting records from a document
#[derive(Debug, Default)]
pub struct ExtractResult {
    /// Records that passed validation, in document order
    pub records: Vec<LogicalRecord>,
    /// Records dropped for missing required fields or bad values
    pub skipped: Vec<SkippedRecord>,
    /// Path expressions that could not be compiled (their fields are null)
    pub path_errors: Vec<PathResolutionError>,
}

impl ExtractResult {
    /// Number of record elements seen
    pub fn total(&self) -> usize {
        self.records.len() + self.skipped.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "Extracted: {} records, {} skipped, {} invalid paths",
            self.records.len(),
            self.skipped.len(),
            self.path_errors.len()
        )
    }
}

/// Counts only, for reports.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExtractStats {
    pub records: usize,
    pub skipped: usize,
    pub path_errors: usize,
}

impl From<&ExtractResult> for ExtractStats {
    fn from(result: &ExtractResult) -> Self {
        Self {
            records: result.records.len(),
            skipped: result.skipped.len(),
            path_errors: result.path_errors.len(),
        }
    }
}

/// A field with its path compiled once per document.
struct CompiledField<'a> {
    def: &'a FieldDefinition,
    path: Option<PathExpr>,
}

/// Extract every record element of `doc` described by `config`.
///
/// Record elements are all elements named `record_element` below the root,
/// in document order. A record with a null required field, or a value that
/// cannot be coerced, is skipped and reported; extraction goes on.
pub fn extract(doc: &XmlDocument, config: &Configuration) -> ExtractResult {
    let mut result = ExtractResult::default();

    if doc.root().name() != config.root_element() {
        log_warning(format!(
            "Root element is <{}>, configuration expects <{}>",
            doc.root().name(),
            config.root_element()
        ));
    }

    let fields: Vec<CompiledField> = config
        .fields()
        .iter()
        .map(|def| {
            let path = match PathExpr::compile(&def.path_expression) {
                Ok(path) => Some(path),
                Err(e) => {
                    log_warning(format!("Field '{}': {}", def.name, e));
                    result.path_errors.push(e);
                    None
                }
            };
            CompiledField { def, path }
        })
        .collect();

    for (index, element) in doc
        .elements_named(config.record_element())
        .into_iter()
        .enumerate()
    {
        match extract_record(element, index, &fields) {
            Ok(record) => result.records.push(record),
            Err(e) => {
                log_warning(format!("Skipping {}", e));
                result.skipped.push(skipped_record(&e));
            }
        }
    }

    result
}

fn extract_record(
    element: &XmlNode,
    index: usize,
    fields: &[CompiledField],
) -> Result<LogicalRecord, ValidationError> {
    let mut record = LogicalRecord::new(index);
    let mut missing = Vec::new();

    for field in fields {
        let def = field.def;
        let invalid = |source| ValidationError::InvalidValue {
            record: index,
            field: def.name.clone(),
            source,
        };

        let value = if def.unbounded {
            let raw = field
                .path
                .as_ref()
                .map(|p| p.all_values(element))
                .unwrap_or_default();
            FieldValue::Repeated(coerce_all(&raw, def.data_type).map_err(invalid)?)
        } else {
            let raw = field.path.as_ref().and_then(|p| p.first_value(element));
            FieldValue::Single(coerce(raw.as_deref(), def.data_type).map_err(invalid)?)
        };

        // An unbounded field is never null, even with no occurrences
        if def.required && value.is_null() {
            missing.push(def.name.clone());
        }
        record.values.insert(def.name.clone(), value);
    }

    if !missing.is_empty() {
        return Err(ValidationError::MissingRequired {
            record: index,
            fields: missing,
        });
    }

    Ok(record)
}

fn skipped_record(err: &ValidationError) -> SkippedRecord {
    match err {
        ValidationError::MissingRequired { record, fields } => SkippedRecord {
            index: *record,
            reason: "Missing required fields".to_string(),
            fields: fields.clone(),
        },
        ValidationError::InvalidValue {
            record,
            field,
            source,
        } => SkippedRecord {
            index: *record,
            reason: format!("Coercion failed: {}", source),
            fields: vec![field.clone()],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Scalar};

    fn config(fields: Vec<FieldDefinition>) -> Configuration {
        Configuration::new("equity", "Instrument", fields).unwrap()
    }

    fn text(s: &str) -> Option<Scalar> {
        Some(Scalar::Text(s.to_string()))
    }

    #[test]
    fn test_extract_single_and_unbounded() {
        let doc = XmlDocument::parse(
            r#"<Instruments>
                 <Instrument><ID>1</ID><Tags><Tag>x</Tag><Tag>y</Tag></Tags></Instrument>
                 <Instrument><ID>2</ID></Instrument>
               </Instruments>"#,
        )
        .unwrap();
        let config = config(vec![
            FieldDefinition::new("ID", "ID", DataType::String).required(),
            FieldDefinition::new("Tag", "Tags/Tag", DataType::String).unbounded(),
        ]);

        let result = extract(&doc, &config);
        assert_eq!(result.records.len(), 2);
        assert!(result.skipped.is_empty());

        let first = &result.records[0];
        assert_eq!(first.index, 0);
        assert_eq!(first.get("ID"), Some(&FieldValue::Single(text("1"))));
        assert_eq!(
            first.get("Tag"),
            Some(&FieldValue::Repeated(vec![text("x"), text("y")]))
        );
        assert_eq!(result.records[1].get("Tag"), Some(&FieldValue::Repeated(vec![])));
    }

    #[test]
    fn test_missing_required_field_skips_record() {
        let doc = XmlDocument::parse(
            "<Instruments><Instrument><Name>a</Name></Instrument><Instrument><ID>2</ID></Instrument></Instruments>",
        )
        .unwrap();
        let config = config(vec![
            FieldDefinition::new("ID", "ID", DataType::String).required(),
            FieldDefinition::new("Name", "Name", DataType::String),
        ]);

        let mut capture = crate::logs::capture();
        let result = extract(&doc, &config);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].index, 1);
        assert_eq!(result.skipped.len(), 1);
        assert!(capture
            .warnings()
            .iter()
            .any(|w| w == "Skipping Record 0: missing required field(s): ID"));
        assert_eq!(result.skipped[0].index, 0);
        assert_eq!(result.skipped[0].fields, vec!["ID".to_string()]);
        assert_eq!(result.total(), 2);
    }

    #[test]
    fn test_whitespace_text_is_a_value() {
        let doc = XmlDocument::parse(
            "<Instruments><Instrument><ID>   </ID><Name>  Acme  </Name></Instrument></Instruments>",
        )
        .unwrap();
        let config = config(vec![
            FieldDefinition::new("ID", "ID", DataType::String).required(),
            FieldDefinition::new("Name", "Name", DataType::String),
        ]);

        let result = extract(&doc, &config);
        assert!(result.skipped.is_empty());
        assert_eq!(result.records[0].get("ID"), Some(&FieldValue::Single(text("   "))));
        assert_eq!(result.records[0].get("Name"), Some(&FieldValue::Single(text("  Acme  "))));
    }

    #[test]
    fn test_coercion_failure_skips_record() {
        let doc = XmlDocument::parse(
            "<Instruments><Instrument><Px>N/A</Px></Instrument><Instrument><Px>1.5</Px></Instrument></Instruments>",
        )
        .unwrap();
        let config = config(vec![FieldDefinition::new("Price", "Px", DataType::Decimal)]);

        let result = extract(&doc, &config);
        assert_eq!(result.records.len(), 1);
        assert_eq!(
            result.records[0].get("Price"),
            Some(&FieldValue::Single(Some(Scalar::Decimal(1.5))))
        );
        assert_eq!(result.skipped[0].fields, vec!["Price".to_string()]);
        assert!(result.skipped[0].reason.contains("N/A"));
    }

    #[test]
    fn test_invalid_path_is_null_not_fatal() {
        let doc = XmlDocument::parse("<Instruments><Instrument><A>1</A></Instrument></Instruments>").unwrap();
        let config = config(vec![
            FieldDefinition::new("A", "A", DataType::Integer),
            FieldDefinition::new("B", "B[", DataType::String),
        ]);

        let result = extract(&doc, &config);
        assert_eq!(result.path_errors.len(), 1);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].get("B"), Some(&FieldValue::Single(None)));
        assert_eq!(
            result.records[0].get("A"),
            Some(&FieldValue::Single(Some(Scalar::Integer(1))))
        );
    }

    #[test]
    fn test_required_unbounded_with_no_occurrences_is_kept() {
        let doc = XmlDocument::parse("<Instruments><Instrument/></Instruments>").unwrap();
        let config = config(vec![
            FieldDefinition::new("Tag", "Tag", DataType::String).required().unbounded(),
        ]);

        let result = extract(&doc, &config);
        assert_eq!(result.records.len(), 1);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_root_record_and_other_roots() {
        // the root itself is never a record
        let doc = XmlDocument::parse("<Instrument><Instrument><A>1</A></Instrument></Instrument>").unwrap();
        let config = config(vec![FieldDefinition::new("A", "A", DataType::String)]);
        let result = extract(&doc, &config);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].get("A"), Some(&FieldValue::Single(text("1"))));
    }

    #[test]
    fn test_nested_record_elements_in_document_order() {
        let doc = XmlDocument::parse(
            r#"<Instruments><Group><Instrument id="1"/></Group><Instrument id="2"/></Instruments>"#,
        )
        .unwrap();
        let config = config(vec![FieldDefinition::new("ID", "@id", DataType::Integer)]);
        let result = extract(&doc, &config);
        let ids: Vec<_> = result.records.iter().map(|r| r.get("ID").cloned()).collect();
        assert_eq!(
            ids,
            vec![
                Some(FieldValue::Single(Some(Scalar::Integer(1)))),
                Some(FieldValue::Single(Some(Scalar::Integer(2))))
            ]
        );
        assert_eq!(ExtractStats::from(&result).records, 2);
    }
}
