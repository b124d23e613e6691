// Property-based tests for configuration invariants and row expansion.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;
use xmlflat::transform::coerce;
use xmlflat::{
    expand, Configuration, DataType, FieldDefinition, FieldValue, LogicalRecord, Scalar,
};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn arb_data_type() -> impl Strategy<Value = DataType> {
    prop::sample::select(DataType::ALL.to_vec())
}

/// Field definitions with possibly colliding names.
fn arb_fields() -> impl Strategy<Value = Vec<FieldDefinition>> {
    prop::collection::vec(
        ("[A-D]{1,2}", "[a-z]{1,5}(/[a-z]{1,5})?", arb_data_type(), any::<bool>(), any::<bool>()),
        0..8,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .map(|(name, path, data_type, required, unbounded)| {
                let mut field = FieldDefinition::new(&name, &path, data_type);
                field.required = required;
                field.unbounded = unbounded;
                field
            })
            .collect()
    })
}

fn arb_text() -> impl Strategy<Value = Option<Scalar>> {
    prop_oneof![
        3 => "[a-z0-9]{1,6}".prop_map(|s| Some(Scalar::Text(s))),
        1 => Just(None),
    ]
}

/// A record of single fields `S0..` and repeated fields `R0..`.
fn arb_record() -> impl Strategy<Value = LogicalRecord> {
    (
        prop::collection::vec(arb_text(), 0..4),
        prop::collection::vec(prop::collection::vec(arb_text(), 0..5), 0..4),
    )
        .prop_map(|(singles, repeats)| {
            let mut record = LogicalRecord::new(0);
            for (i, value) in singles.into_iter().enumerate() {
                record = record.with_value(format!("S{}", i), FieldValue::Single(value));
            }
            for (i, values) in repeats.into_iter().enumerate() {
                record = record.with_value(format!("R{}", i), FieldValue::Repeated(values));
            }
            record
        })
}

fn order_of(record: &LogicalRecord) -> Vec<String> {
    let mut names: Vec<String> = record.values.keys().cloned().collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// Configuration invariants
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    /// A configuration either fails on a duplicate or has unique names and a
    /// field_order drawn from them.
    #[test]
    fn config_names_unique_and_order_subset(fields in arb_fields()) {
        let names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
        let unique: HashSet<&String> = names.iter().collect();

        match Configuration::new("equity", "Instrument", fields) {
            Ok(config) => {
                prop_assert_eq!(unique.len(), names.len());
                let declared: HashSet<&str> = config.fields().iter().map(|f| f.name.as_str()).collect();
                for name in config.field_order() {
                    prop_assert!(declared.contains(name.as_str()));
                }

                let reloaded = Configuration::from_json(&config.to_json().unwrap()).unwrap();
                prop_assert_eq!(reloaded, config);
            }
            Err(_) => prop_assert!(unique.len() < names.len()),
        }
    }
}

// ---------------------------------------------------------------------------
// Row expansion
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    /// Row count is the longest sequence, or one.
    #[test]
    fn expand_row_count(record in arb_record()) {
        let longest = record
            .values
            .values()
            .filter_map(FieldValue::repeat_len)
            .max()
            .unwrap_or(0);
        let rows = expand(&record, &order_of(&record));
        prop_assert_eq!(rows.len(), longest.max(1));
    }

    /// Single values repeat on every row; sequences are zipped by position
    /// and padded with null.
    #[test]
    fn expand_positional_zip(record in arb_record()) {
        let order = order_of(&record);
        let rows = expand(&record, &order);

        for (i, row) in rows.iter().enumerate() {
            prop_assert_eq!(row.cells().len(), order.len());
            for (name, cell) in row.cells() {
                let expected = match record.get(name) {
                    Some(FieldValue::Single(v)) => v.clone(),
                    Some(FieldValue::Repeated(values)) => values.get(i).cloned().flatten(),
                    None => None,
                };
                prop_assert_eq!(cell, &expected);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn integer_coercion_round_trips(n in any::<i64>()) {
        let value = coerce(Some(&n.to_string()), DataType::Integer).unwrap().unwrap();
        prop_assert_eq!(value.render(), n.to_string());
    }

    #[test]
    fn decimal_coercion_round_trips(d in -1.0e12f64..1.0e12f64) {
        let value = coerce(Some(&d.to_string()), DataType::Decimal).unwrap().unwrap();
        prop_assert_eq!(value, Scalar::Decimal(d));
    }

    #[test]
    fn date_coercion_round_trips(y in 1900i32..2100, m in 1u32..=12, day in 1u32..=28) {
        let text = format!("{:04}-{:02}-{:02}", y, m, day);
        let value = coerce(Some(&text), DataType::Date).unwrap().unwrap();
        prop_assert_eq!(value.render(), text);
    }

    #[test]
    fn string_coercion_is_identity(s in ".{0,20}") {
        let value = coerce(Some(&s), DataType::String).unwrap();
        prop_assert_eq!(value, Some(Scalar::Text(s.clone())));
    }

    #[test]
    fn non_numeric_text_is_rejected(s in "[a-zA-Z/]{1,8}") {
        // Rust also parses "inf" and "NaN" as floats
        prop_assume!(s.parse::<f64>().is_err());
        prop_assert!(coerce(Some(&s), DataType::Decimal).is_err());
        prop_assert!(coerce(Some(&s), DataType::Integer).is_err());
    }
}
