//! Semantic type classification for single JSON values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Semantic type tag of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
}

impl FieldType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }
}

/// Classify a single JSON value.
///
/// Null classifies as `string` (the caller marks the field nullable);
/// arrays are tagged without element-level recursion; strings that look
/// like ISO-8601 datetimes or 13-digit millisecond epochs classify as
/// `date`. Pure and total over any value.
pub fn classify(value: &Value) -> FieldType {
    match value {
        Value::Null => FieldType::String,
        Value::Array(_) => FieldType::Array,
        Value::Bool(_) => FieldType::Boolean,
        Value::Number(_) => FieldType::Number,
        Value::Object(_) => FieldType::Object,
        Value::String(s) => {
            if is_iso_datetime(s) || is_epoch_millis(s) {
                FieldType::Date
            } else {
                FieldType::String
            }
        }
    }
}

/// `YYYY-MM-DDTHH:MM:SS` prefix check, positional rather than a full
/// datetime parse. Anything after the seconds (fraction, zone) is ignored.
fn is_iso_datetime(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() < 19 {
        return false;
    }
    let digit = |i: usize| b[i].is_ascii_digit();
    digit(0)
        && digit(1)
        && digit(2)
        && digit(3)
        && b[4] == b'-'
        && digit(5)
        && digit(6)
        && b[7] == b'-'
        && digit(8)
        && digit(9)
        && b[10] == b'T'
        && digit(11)
        && digit(12)
        && b[13] == b':'
        && digit(14)
        && digit(15)
        && b[16] == b':'
        && digit(17)
        && digit(18)
}

/// A 13-digit all-numeric string is treated as a millisecond epoch.
fn is_epoch_millis(s: &str) -> bool {
    s.len() == 13 && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_defaults_to_string() {
        assert_eq!(classify(&Value::Null), FieldType::String);
    }

    #[test]
    fn arrays_classify_without_recursion() {
        assert_eq!(classify(&json!([1, 2])), FieldType::Array);
        assert_eq!(classify(&json!(["a", {"b": 1}])), FieldType::Array);
    }

    #[test]
    fn scalar_precedence() {
        assert_eq!(classify(&json!(true)), FieldType::Boolean);
        assert_eq!(classify(&json!(42)), FieldType::Number);
        assert_eq!(classify(&json!(4.2)), FieldType::Number);
        assert_eq!(classify(&json!({})), FieldType::Object);
        assert_eq!(classify(&json!("hello")), FieldType::String);
    }

    #[test]
    fn iso_datetime_strings_are_dates() {
        assert_eq!(
            classify(&json!("2024-01-01T00:00:00Z")),
            FieldType::Date
        );
        assert_eq!(
            classify(&json!("2024-06-15T09:30:00.123+02:00")),
            FieldType::Date
        );
    }

    #[test]
    fn thirteen_digit_strings_are_epoch_dates() {
        assert_eq!(classify(&json!("1700000000000")), FieldType::Date);
        // Twelve and fourteen digits are plain strings.
        assert_eq!(classify(&json!("170000000000")), FieldType::String);
        assert_eq!(classify(&json!("17000000000000")), FieldType::String);
    }

    #[test]
    fn date_lookalikes_stay_strings() {
        // Date without a time component.
        assert_eq!(classify(&json!("2024-01-01")), FieldType::String);
        // Malformed separator.
        assert_eq!(classify(&json!("2024-01-01 00:00:00")), FieldType::String);
        // Digits mixed with letters.
        assert_eq!(classify(&json!("1700000000abc")), FieldType::String);
    }
}
