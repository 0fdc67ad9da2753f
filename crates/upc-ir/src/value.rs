//! Scalar values stored in element fields

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Wire format for date values
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Values that can be stored in element fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// String value
    String(String),

    /// Integer value
    Integer(i64),

    /// Decimal value
    Decimal(f64),

    /// Boolean value
    Boolean(bool),

    /// Calendar date
    Date(NaiveDate),

    /// Explicit null; rendered as a nil marker, unlike an absent field
    Null,
}

impl Value {
    /// Convert a loosely typed JSON scalar without any schema knowledge.
    ///
    /// # Errors
    ///
    /// Returns a conversion error for arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> crate::Result<Self> {
        match value {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Boolean(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Decimal(f))
                } else {
                    Err(crate::Error::conversion(
                        "number",
                        format!("'{n}' cannot be represented"),
                    ))
                }
            }
            serde_json::Value::String(s) => Ok(Value::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Err(crate::Error::conversion(
                    "value",
                    "expected a scalar, found a nested structure",
                ))
            }
        }
    }

    /// JSON representation used by the JSON encoder.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Decimal(d) => serde_json::Number::from_f64(*d)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Date(d) => serde_json::Value::String(d.format(DATE_FORMAT).to_string()),
            Value::Null => serde_json::Value::Null,
        }
    }

    /// Text representation used in XML bodies and attributes.
    ///
    /// Booleans render as `1`/`0`; `Null` has no text.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::Boolean(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Value::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
            Value::Null => None,
        }
    }

    /// Check if value is null
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name for error messages
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Null => "null",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from_json(&json!(null)).unwrap(), Value::Null);
        assert_eq!(Value::from_json(&json!(true)).unwrap(), Value::Boolean(true));
        assert_eq!(Value::from_json(&json!(42)).unwrap(), Value::Integer(42));
        assert_eq!(Value::from_json(&json!(2.5)).unwrap(), Value::Decimal(2.5));
        assert_eq!(
            Value::from_json(&json!("abc")).unwrap(),
            Value::String("abc".to_string())
        );
    }

    #[test]
    fn test_from_json_rejects_structures() {
        assert!(Value::from_json(&json!([1, 2])).is_err());
        assert!(Value::from_json(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_text_rendering() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(Value::Boolean(true).as_text().as_deref(), Some("1"));
        assert_eq!(Value::Boolean(false).as_text().as_deref(), Some("0"));
        assert_eq!(Value::Decimal(12.5).as_text().as_deref(), Some("12.5"));
        assert_eq!(Value::Date(date).as_text().as_deref(), Some("2024-01-15"));
        assert_eq!(Value::Null.as_text(), None);
    }

    #[test]
    fn test_json_rendering() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(Value::Boolean(true).to_json(), json!(true));
        assert_eq!(Value::Integer(7).to_json(), json!(7));
        assert_eq!(Value::Date(date).to_json(), json!("2024-01-15"));
        assert_eq!(Value::Decimal(f64::NAN).to_json(), json!(null));
    }
}
