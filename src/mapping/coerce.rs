//! Value coercion between mapping field types
//!
//! Coercion runs in two steps. The raw JSON value is first read as the
//! declared source type, then the typed scalar is converted to the target
//! type. Widening conversions always succeed; narrowing or parsing
//! conversions succeed only when the value converts exactly.

use super::types::FieldType;
use serde_json::{Number, Value};

/// Largest integer magnitude an f64 holds exactly (2^53)
const F64_EXACT_INT: i64 = 1 << 53;

/// Largest integer magnitude an f32 holds exactly (2^24)
const F32_EXACT_INT: i64 = 1 << 24;

/// A value read as one of the mapping field types
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Boolean(bool),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Scalar {
    /// The field type this scalar carries
    pub fn field_type(&self) -> FieldType {
        match self {
            Scalar::Boolean(_) => FieldType::Boolean,
            Scalar::Int(_) => FieldType::Int,
            Scalar::BigInt(_) => FieldType::BigInt,
            Scalar::Float(_) => FieldType::Float,
            Scalar::Double(_) => FieldType::Double,
            Scalar::String(_) => FieldType::String,
        }
    }

    /// Render as a JSON value for the row model
    pub fn into_json(self) -> Value {
        match self {
            Scalar::Boolean(b) => Value::Bool(b),
            Scalar::Int(i) => Value::Number(i.into()),
            Scalar::BigInt(i) => Value::Number(i.into()),
            Scalar::Float(f) => Number::from_f64(f64::from(f)).map_or(Value::Null, Value::Number),
            Scalar::Double(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            Scalar::String(s) => Value::String(s),
        }
    }
}

/// Coerce a raw value from `from` to `to`
///
/// Null passes through untouched. The error string describes why the value
/// could not be converted; the caller attaches record and field context.
pub fn coerce(value: &Value, from: FieldType, to: FieldType) -> Result<Value, String> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let scalar = read_as(value, from)?;
    Ok(convert(scalar, to)?.into_json())
}

/// Read a raw JSON value as the declared type
pub fn read_as(value: &Value, ty: FieldType) -> Result<Scalar, String> {
    match ty {
        FieldType::String => match value {
            Value::String(s) => Ok(Scalar::String(s.clone())),
            Value::Number(n) => Ok(Scalar::String(n.to_string())),
            Value::Bool(b) => Ok(Scalar::String(b.to_string())),
            other => Err(format!("expected string, found {}", json_kind(other))),
        },
        FieldType::BigInt => match value {
            Value::Number(n) => number_to_i64(n).map(Scalar::BigInt),
            Value::String(s) => parse_i64(s).map(Scalar::BigInt),
            other => Err(format!("expected bigint, found {}", json_kind(other))),
        },
        FieldType::Int => match read_as(value, FieldType::BigInt)? {
            Scalar::BigInt(v) => i32::try_from(v)
                .map(Scalar::Int)
                .map_err(|_| format!("{v} is out of range for int")),
            other => Err(format!("expected int, found {other:?}")),
        },
        FieldType::Double => match value {
            Value::Number(n) => n
                .as_f64()
                .map(Scalar::Double)
                .ok_or_else(|| format!("{n} is not representable as double")),
            Value::String(s) => parse_f64(s).map(Scalar::Double),
            other => Err(format!("expected double, found {}", json_kind(other))),
        },
        FieldType::Float => match read_as(value, FieldType::Double)? {
            Scalar::Double(v) => {
                let narrowed = v as f32;
                if narrowed.is_finite() {
                    Ok(Scalar::Float(narrowed))
                } else {
                    Err(format!("{v} is out of range for float"))
                }
            }
            other => Err(format!("expected float, found {other:?}")),
        },
        FieldType::Boolean => match value {
            Value::Bool(b) => Ok(Scalar::Boolean(*b)),
            Value::String(s) => parse_bool(s).map(Scalar::Boolean),
            other => Err(format!("expected boolean, found {}", json_kind(other))),
        },
    }
}

/// Convert a typed scalar to the target type
#[allow(clippy::cast_precision_loss)]
pub fn convert(scalar: Scalar, to: FieldType) -> Result<Scalar, String> {
    if scalar.field_type() == to {
        return Ok(scalar);
    }

    match (scalar, to) {
        (Scalar::String(s), target) => read_as(&Value::String(s), target),
        (Scalar::Boolean(b), FieldType::String) => Ok(Scalar::String(b.to_string())),
        (Scalar::Int(v), FieldType::String) => Ok(Scalar::String(v.to_string())),
        (Scalar::BigInt(v), FieldType::String) => Ok(Scalar::String(v.to_string())),
        (Scalar::Float(v), FieldType::String) => Ok(Scalar::String(v.to_string())),
        (Scalar::Double(v), FieldType::String) => Ok(Scalar::String(v.to_string())),

        (Scalar::Int(v), FieldType::BigInt) => Ok(Scalar::BigInt(i64::from(v))),
        (Scalar::Int(v), FieldType::Double) => Ok(Scalar::Double(f64::from(v))),
        (Scalar::Int(v), FieldType::Float) => exact_f32(i64::from(v)),
        (Scalar::BigInt(v), FieldType::Int) => i32::try_from(v)
            .map(Scalar::Int)
            .map_err(|_| format!("{v} is out of range for int")),
        (Scalar::BigInt(v), FieldType::Double) => {
            if v.unsigned_abs() <= F64_EXACT_INT.unsigned_abs() {
                Ok(Scalar::Double(v as f64))
            } else {
                Err(format!("{v} loses precision as double"))
            }
        }
        (Scalar::BigInt(v), FieldType::Float) => exact_f32(v),

        (Scalar::Float(v), FieldType::Double) => Ok(Scalar::Double(f64::from(v))),
        (Scalar::Float(v), FieldType::BigInt) => integral_f64(f64::from(v)).map(Scalar::BigInt),
        (Scalar::Float(v), FieldType::Int) => integral_f64(f64::from(v))
            .and_then(|i| i32::try_from(i).map_err(|_| format!("{v} is out of range for int")))
            .map(Scalar::Int),
        (Scalar::Double(v), FieldType::Float) => {
            let narrowed = v as f32;
            if f64::from(narrowed) == v {
                Ok(Scalar::Float(narrowed))
            } else {
                Err(format!("{v} loses precision as float"))
            }
        }
        (Scalar::Double(v), FieldType::BigInt) => integral_f64(v).map(Scalar::BigInt),
        (Scalar::Double(v), FieldType::Int) => integral_f64(v)
            .and_then(|i| i32::try_from(i).map_err(|_| format!("{v} is out of range for int")))
            .map(Scalar::Int),

        (scalar, to) => Err(format!(
            "no conversion from {} to {to}",
            scalar.field_type()
        )),
    }
}

#[allow(clippy::cast_precision_loss)]
fn exact_f32(v: i64) -> Result<Scalar, String> {
    if v.unsigned_abs() <= F32_EXACT_INT.unsigned_abs() {
        Ok(Scalar::Float(v as f32))
    } else {
        Err(format!("{v} loses precision as float"))
    }
}

/// Accept a float only when it holds an exact integer in i64 range
#[allow(clippy::cast_precision_loss)]
fn integral_f64(v: f64) -> Result<i64, String> {
    if v.fract() != 0.0 || !v.is_finite() {
        return Err(format!("{v} is not an integer"));
    }
    if v < i64::MIN as f64 || v >= i64::MAX as f64 {
        return Err(format!("{v} is out of range for bigint"));
    }
    Ok(v as i64)
}

fn number_to_i64(n: &Number) -> Result<i64, String> {
    if let Some(v) = n.as_i64() {
        return Ok(v);
    }
    if n.is_u64() {
        return Err(format!("{n} is out of range for bigint"));
    }
    match n.as_f64() {
        Some(f) if f.abs() <= (F64_EXACT_INT as f64) => integral_f64(f),
        _ => Err(format!("{n} is not an integer")),
    }
}

fn parse_i64(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| format!("'{s}' is not a valid bigint"))
}

fn parse_f64(s: &str) -> Result<f64, String> {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("'{s}' is not a valid double")),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format!("'{s}' is not a valid boolean")),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
