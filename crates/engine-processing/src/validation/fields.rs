//! Field-level extraction rules shared by the record validators.

use crate::error::ValidationError;
use chrono::NaiveDate;
use serde_json::{Map, Value};

pub type Object = Map<String, Value>;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn as_object(raw: &Value) -> Result<&Object, ValidationError> {
    raw.as_object()
        .ok_or_else(|| ValidationError::NotAnObject(type_name(raw)))
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Missing and `null` are the same thing to every rule below.
fn present<'a>(obj: &'a Object, field: &str) -> Option<&'a Value> {
    obj.get(field).filter(|v| !v.is_null())
}

fn bounded_str(
    value: &Value,
    field: &'static str,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    let s = value.as_str().ok_or_else(|| ValidationError::InvalidType {
        field,
        expected: "a string",
        found: type_name(value).to_string(),
    })?;

    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let actual = trimmed.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }

    Ok(Some(trimmed.to_string()))
}

pub fn required_str(obj: &Object, field: &'static str, max: usize) -> Result<String, ValidationError> {
    let value = present(obj, field).ok_or(ValidationError::MissingField(field))?;
    bounded_str(value, field, max)?.ok_or(ValidationError::MissingField(field))
}

pub fn optional_str(
    obj: &Object,
    field: &'static str,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match present(obj, field) {
        Some(value) => bounded_str(value, field, max),
        None => Ok(None),
    }
}

pub fn optional_date(obj: &Object, field: &'static str) -> Result<Option<NaiveDate>, ValidationError> {
    let Some(value) = present(obj, field) else {
        return Ok(None);
    };

    let s = value.as_str().ok_or_else(|| ValidationError::InvalidType {
        field,
        expected: "a date string",
        found: type_name(value).to_string(),
    })?;

    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate {
            field,
            value: s.to_string(),
        })
}

/// Boolean flag, defaulting to `false` when absent.
///
/// Accepts JSON booleans, `0`/`1`, and the strings true/false/1/0/yes/no.
pub fn flag(obj: &Object, field: &'static str) -> Result<bool, ValidationError> {
    let Some(value) = present(obj, field) else {
        return Ok(false);
    };

    let invalid = || ValidationError::InvalidType {
        field,
        expected: "a boolean",
        found: value.to_string(),
    };

    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(invalid()),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}

pub fn optional_u32(obj: &Object, field: &'static str) -> Result<Option<u32>, ValidationError> {
    let Some(value) = present(obj, field) else {
        return Ok(None);
    };

    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };

    parsed
        .map(Some)
        .ok_or_else(|| ValidationError::InvalidType {
            field,
            expected: "a non-negative integer",
            found: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Object {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn required_str_rejects_missing_null_and_blank() {
        let o = obj(json!({ "a": null, "b": "   " }));
        assert_eq!(
            required_str(&o, "a", 10),
            Err(ValidationError::MissingField("a"))
        );
        assert_eq!(
            required_str(&o, "b", 10),
            Err(ValidationError::MissingField("b"))
        );
        assert_eq!(
            required_str(&o, "c", 10),
            Err(ValidationError::MissingField("c"))
        );
    }

    #[test]
    fn required_str_trims_and_bounds_by_chars() {
        let o = obj(json!({ "name": "  Théros  ", "long": "ääää" }));
        assert_eq!(required_str(&o, "name", 6).unwrap(), "Théros");
        assert_eq!(
            required_str(&o, "long", 3),
            Err(ValidationError::TooLong {
                field: "long",
                max: 3,
                actual: 4
            })
        );
    }

    #[test]
    fn strings_are_not_coerced_from_numbers() {
        let o = obj(json!({ "code": 42 }));
        assert!(matches!(
            required_str(&o, "code", 10),
            Err(ValidationError::InvalidType { field: "code", .. })
        ));
    }

    #[test]
    fn optional_date_parses_calendar_dates_only() {
        let o = obj(json!({ "ok": "2019-05-03", "bad": "2019-02-30", "num": 2019 }));
        assert_eq!(
            optional_date(&o, "ok").unwrap(),
            NaiveDate::from_ymd_opt(2019, 5, 3)
        );
        assert!(matches!(
            optional_date(&o, "bad"),
            Err(ValidationError::InvalidDate { .. })
        ));
        assert!(matches!(
            optional_date(&o, "num"),
            Err(ValidationError::InvalidType { .. })
        ));
        assert_eq!(optional_date(&o, "missing").unwrap(), None);
    }

    #[test]
    fn flag_coercions() {
        let o = obj(json!({
            "t": true, "one": 1, "yes": "YES", "f": "false", "zero": 0,
            "two": 2, "word": "maybe", "arr": []
        }));
        assert!(flag(&o, "t").unwrap());
        assert!(flag(&o, "one").unwrap());
        assert!(flag(&o, "yes").unwrap());
        assert!(!flag(&o, "f").unwrap());
        assert!(!flag(&o, "zero").unwrap());
        assert!(!flag(&o, "absent").unwrap());
        assert!(flag(&o, "two").is_err());
        assert!(flag(&o, "word").is_err());
        assert!(flag(&o, "arr").is_err());
    }

    #[test]
    fn optional_u32_accepts_numbers_and_numeric_strings() {
        let o = obj(json!({ "n": 249, "s": " 12 ", "neg": -1, "big": 5_000_000_000u64 }));
        assert_eq!(optional_u32(&o, "n").unwrap(), Some(249));
        assert_eq!(optional_u32(&o, "s").unwrap(), Some(12));
        assert!(optional_u32(&o, "neg").is_err());
        assert!(optional_u32(&o, "big").is_err());
    }

    #[test]
    fn non_objects_are_named_in_error() {
        assert_eq!(
            as_object(&json!([1, 2])).unwrap_err(),
            ValidationError::NotAnObject("array")
        );
    }
}
