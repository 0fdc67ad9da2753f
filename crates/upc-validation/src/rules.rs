//! Single field validation rules
//!
//! A field value is coerced to its schema type, then checked against the
//! field's length limit and allowed codes. Messages do not name the field;
//! callers prefix them with the field label.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use upc_ir::Value;
use upc_schema::{FieldDefinition, FieldType};

/// Which validation pass a value is checked in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// The value was just supplied; required-ness is not known yet
    Input,
    /// The value is about to be serialized
    Output,
}

const DATE_INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%d-%m-%Y"];
const DATETIME_INPUT_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Validate and convert one field value
///
/// # Errors
///
/// Returns a message when the value cannot be converted to the field type,
/// is too long, is not an allowed code, or is null on a required field in
/// output mode.
pub fn validate_field_value(
    value: &Value,
    field: &FieldDefinition,
    mode: ValidationMode,
) -> Result<Value, String> {
    if value.is_null() {
        if mode == ValidationMode::Output && field.required {
            return Err("a value is required".to_string());
        }
        return Ok(Value::Null);
    }

    let converted = coerce_value(value, field.field_type)?;

    if let (Some(max), Value::String(s)) = (field.max_length, &converted) {
        let len = s.chars().count();
        if len > max {
            return Err(format!("value length {len} exceeds maximum {max}"));
        }
    }

    if let Some(codes) = &field.codes {
        let text = converted.as_text().unwrap_or_default();
        if !codes.iter().any(|c| *c == text) {
            return Err(format!(
                "'{text}' is not one of the allowed codes {}",
                codes.join(", ")
            ));
        }
    }

    Ok(converted)
}

/// Convert a non-null value to the given semantic type
///
/// # Errors
///
/// Returns a message when the value has no representation in that type.
pub fn coerce_value(value: &Value, field_type: FieldType) -> Result<Value, String> {
    match field_type {
        FieldType::String => coerce_string(value),
        FieldType::Boolean => coerce_boolean(value),
        FieldType::Integer => coerce_integer(value),
        FieldType::Decimal => coerce_decimal(value),
        FieldType::Date => coerce_date(value),
    }
}

fn coerce_string(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Null => Ok(Value::Null),
        other => other
            .as_text()
            .map(Value::String)
            .ok_or_else(|| format!("{} cannot be used as text", other.type_name())),
    }
}

fn coerce_boolean(value: &Value) -> Result<Value, String> {
    match value {
        Value::Boolean(_) => Ok(value.clone()),
        Value::Integer(0) => Ok(Value::Boolean(false)),
        Value::Integer(1) => Ok(Value::Boolean(true)),
        Value::Decimal(d) if *d == 0.0 => Ok(Value::Boolean(false)),
        Value::Decimal(d) if *d == 1.0 => Ok(Value::Boolean(true)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Value::Boolean(true)),
            "false" | "0" | "no" => Ok(Value::Boolean(false)),
            _ => Err(format!("'{s}' is not a valid boolean")),
        },
        other => Err(format!("{} is not a valid boolean", describe(other))),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral(d: f64) -> Option<i64> {
    (d.is_finite() && d.fract() == 0.0 && d.abs() < i64::MAX as f64).then_some(d as i64)
}

fn coerce_integer(value: &Value) -> Result<Value, String> {
    match value {
        Value::Integer(_) => Ok(value.clone()),
        Value::Decimal(d) => integral(*d)
            .map(Value::Integer)
            .ok_or_else(|| format!("{d} is not a whole number")),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Value::Integer(i));
            }
            match trimmed.parse::<f64>() {
                Ok(d) => integral(d)
                    .map(Value::Integer)
                    .ok_or_else(|| format!("'{s}' is not a whole number")),
                Err(_) => Err(format!("'{s}' is not a valid integer")),
            }
        }
        other => Err(format!("{} is not a valid integer", describe(other))),
    }
}

#[allow(clippy::cast_precision_loss)]
fn coerce_decimal(value: &Value) -> Result<Value, String> {
    match value {
        Value::Integer(i) => Ok(Value::Decimal(*i as f64)),
        Value::Decimal(d) if d.is_finite() => Ok(value.clone()),
        Value::Decimal(d) => Err(format!("{d} is not a finite number")),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(d) if d.is_finite() => Ok(Value::Decimal(d)),
            _ => Err(format!("'{s}' is not a valid decimal")),
        },
        other => Err(format!("{} is not a valid decimal", describe(other))),
    }
}

fn coerce_date(value: &Value) -> Result<Value, String> {
    match value {
        Value::Date(_) => Ok(value.clone()),
        Value::String(s) => parse_date(s.trim())
            .map(Value::Date)
            .ok_or_else(|| format!("'{s}' is not a valid date")),
        Value::Integer(i) => parse_date(&i.to_string())
            .map(Value::Date)
            .ok_or_else(|| format!("{i} is not a valid date")),
        other => Err(format!("{} is not a valid date", describe(other))),
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_INPUT_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
        .or_else(|| {
            DATETIME_INPUT_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn describe(value: &Value) -> String {
    match value.as_text() {
        Some(text) => format!("{} '{text}'", value.type_name()),
        None => value.type_name().to_string(),
    }
}
