//! Value coercion
//!
//! Turns resolved text into the typed scalar a field declares.

use chrono::NaiveDate;

use crate::error::CoercionError;
use crate::models::{DataType, Scalar};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Coerce resolved text to `data_type`.
///
/// | Type      | Result                                                   |
/// |-----------|----------------------------------------------------------|
/// | `string`  | the text unchanged                                       |
/// | `decimal` | `f64`, blank is null, anything else unparsable is an error |
/// | `integer` | `i64`, blank is null, anything else unparsable is an error |
/// | `boolean` | `true` iff the text is `true` in any case                |
/// | `date`    | `YYYY-MM-DD`, otherwise the text unchanged               |
///
/// Absent text is always null.
pub fn coerce(raw: Option<&str>, data_type: DataType) -> Result<Option<Scalar>, CoercionError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let value = match data_type {
        DataType::String => Scalar::Text(raw.to_string()),
        DataType::Decimal => match raw.trim() {
            "" => return Ok(None),
            text => text
                .parse::<f64>()
                .map(Scalar::Decimal)
                .map_err(|_| CoercionError::InvalidDecimal(raw.to_string()))?,
        },
        DataType::Integer => match raw.trim() {
            "" => return Ok(None),
            text => text
                .parse::<i64>()
                .map(Scalar::Integer)
                .map_err(|_| CoercionError::InvalidInteger(raw.to_string()))?,
        },
        DataType::Boolean => Scalar::Boolean(raw.trim().eq_ignore_ascii_case("true")),
        DataType::Date => match NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT) {
            Ok(date) => Scalar::Date(date),
            Err(_) => Scalar::Text(raw.to_string()),
        },
    };

    Ok(Some(value))
}

/// Coerce every value of an unbounded field, stopping at the first error.
pub fn coerce_all(
    raw: &[Option<String>],
    data_type: DataType,
) -> Result<Vec<Option<Scalar>>, CoercionError> {
    raw.iter()
        .map(|value| coerce(value.as_deref(), data_type))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_stays_null() {
        for data_type in DataType::ALL {
            assert_eq!(coerce(None, data_type), Ok(None));
        }
    }

    #[test]
    fn test_string() {
        assert_eq!(
            coerce(Some("Acme"), DataType::String),
            Ok(Some(Scalar::Text("Acme".into())))
        );
    }

    #[test]
    fn test_decimal() {
        assert_eq!(coerce(Some("3.14"), DataType::Decimal), Ok(Some(Scalar::Decimal(3.14))));
        assert_eq!(coerce(Some(" 100 "), DataType::Decimal), Ok(Some(Scalar::Decimal(100.0))));
        assert_eq!(coerce(Some("1e3"), DataType::Decimal), Ok(Some(Scalar::Decimal(1000.0))));
        assert_eq!(coerce(Some("  "), DataType::Decimal), Ok(None));
    }

    #[test]
    fn test_decimal_not_a_number() {
        assert_eq!(
            coerce(Some("N/A"), DataType::Decimal),
            Err(CoercionError::InvalidDecimal("N/A".into()))
        );
    }

    #[test]
    fn test_integer() {
        assert_eq!(coerce(Some("42"), DataType::Integer), Ok(Some(Scalar::Integer(42))));
        assert_eq!(coerce(Some("-7"), DataType::Integer), Ok(Some(Scalar::Integer(-7))));
        assert_eq!(coerce(Some(""), DataType::Integer), Ok(None));
        assert_eq!(
            coerce(Some("4.5"), DataType::Integer),
            Err(CoercionError::InvalidInteger("4.5".into()))
        );
    }

    #[test]
    fn test_boolean() {
        assert_eq!(coerce(Some("TRUE"), DataType::Boolean), Ok(Some(Scalar::Boolean(true))));
        assert_eq!(coerce(Some("true"), DataType::Boolean), Ok(Some(Scalar::Boolean(true))));
        assert_eq!(coerce(Some("yes"), DataType::Boolean), Ok(Some(Scalar::Boolean(false))));
        assert_eq!(coerce(Some("1"), DataType::Boolean), Ok(Some(Scalar::Boolean(false))));
    }

    #[test]
    fn test_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let coerced = coerce(Some("2024-01-05"), DataType::Date).unwrap().unwrap();
        assert_eq!(coerced, Scalar::Date(date));
        assert_eq!(coerced.render(), "2024-01-05");
    }

    #[test]
    fn test_unparsable_date_kept_verbatim() {
        assert_eq!(
            coerce(Some("05/01/2024"), DataType::Date),
            Ok(Some(Scalar::Text("05/01/2024".into())))
        );
    }

    #[test]
    fn test_coerce_all() {
        let raw = vec![Some("1".to_string()), None, Some("3".to_string())];
        assert_eq!(
            coerce_all(&raw, DataType::Integer),
            Ok(vec![Some(Scalar::Integer(1)), None, Some(Scalar::Integer(3))])
        );

        let raw = vec![Some("1".to_string()), Some("x".to_string())];
        assert!(coerce_all(&raw, DataType::Integer).is_err());
    }
}
