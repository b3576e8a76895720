// used for persistence
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};

// used for timestamps in the database
use chrono::{DateTime, NaiveDate, NaiveDateTime};

// used to print out readable forms of a value
use std::fmt;

use crate::error::{ObjsqlError, Result};

/// Extended attributes are kept as a JSON object and packed into one column.
pub type ExtendedAttributes = serde_json::Map<String, serde_json::Value>;

/// Canonical text form used when a timestamp is written to the store.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const TIMESTAMP_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A single attribute or cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Blob(Vec<u8>),
    Json(serde_json::Value),
}

/// The declared type of a record attribute, which drives coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Integer,
    Real,
    Text,
    Boolean,
    Timestamp,
    Extended,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AttributeKind::Integer => "integer",
            AttributeKind::Real => "real",
            AttributeKind::Text => "text",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Timestamp => "timestamp",
            AttributeKind::Extended => "extended attributes",
        };
        write!(f, "{}", name)
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(*r),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
    pub fn into_extended(self) -> Option<ExtendedAttributes> {
        match self {
            Value::Json(serde_json::Value::Object(map)) => Some(map),
            _ => None,
        }
    }
    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Timestamp(_) => "timestamp",
            Value::Blob(_) => "blob",
            Value::Json(_) => "json",
        }
    }

    /// Converts the value into the representation expected by `kind`.
    ///
    /// Numeric kinds accept numbers and numeric strings, booleans accept
    /// `0`/`1` and `"true"`/`"false"`, timestamps accept canonical text only.
    /// Null passes through untouched for every kind.
    pub fn coerce(self, kind: AttributeKind) -> Result<Value> {
        if self.is_null() {
            return Ok(self);
        }
        let coerced = match (kind, self) {
            (AttributeKind::Integer, Value::Integer(i)) => Some(Value::Integer(i)),
            (AttributeKind::Integer, Value::Real(r)) => exact_integer(r).map(Value::Integer),
            (AttributeKind::Integer, Value::Boolean(b)) => Some(Value::Integer(b as i64)),
            (AttributeKind::Integer, Value::Text(s)) => parse_integer(&s).map(Value::Integer),
            (AttributeKind::Real, Value::Real(r)) => Some(Value::Real(r)),
            (AttributeKind::Real, Value::Integer(i)) => Some(Value::Real(i as f64)),
            (AttributeKind::Real, Value::Text(s)) => s.trim().parse().ok().map(Value::Real),
            (AttributeKind::Text, Value::Text(s)) => Some(Value::Text(s)),
            (AttributeKind::Text, Value::Integer(i)) => Some(Value::Text(i.to_string())),
            (AttributeKind::Text, Value::Real(r)) => Some(Value::Text(r.to_string())),
            (AttributeKind::Text, Value::Boolean(b)) => Some(Value::Text(b.to_string())),
            (AttributeKind::Text, Value::Timestamp(t)) => {
                Some(Value::Text(t.format(TIMESTAMP_FORMAT).to_string()))
            }
            (AttributeKind::Boolean, Value::Boolean(b)) => Some(Value::Boolean(b)),
            (AttributeKind::Boolean, Value::Integer(0)) => Some(Value::Boolean(false)),
            (AttributeKind::Boolean, Value::Integer(1)) => Some(Value::Boolean(true)),
            (AttributeKind::Boolean, Value::Text(s)) => match s.trim() {
                "true" | "1" => Some(Value::Boolean(true)),
                "false" | "0" => Some(Value::Boolean(false)),
                _ => None,
            },
            (AttributeKind::Timestamp, Value::Timestamp(t)) => Some(Value::Timestamp(t)),
            (AttributeKind::Timestamp, Value::Text(s)) => parse_timestamp(&s).map(Value::Timestamp),
            (AttributeKind::Extended, Value::Json(json)) if json.is_object() => {
                Some(Value::Json(json))
            }
            (AttributeKind::Extended, Value::Text(s)) => {
                let json: serde_json::Value = serde_json::from_str(&s)?;
                if json.is_object() { Some(Value::Json(json)) } else { None }
            }
            (_, other) => {
                return Err(ObjsqlError::Mapping(format!(
                    "cannot coerce {} value '{}' to {}",
                    other.type_name(),
                    other,
                    kind
                )));
            }
        };
        coerced.ok_or_else(|| ObjsqlError::Mapping(format!("value is not a valid {}", kind)))
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    match s.parse::<i64>() {
        Ok(i) => Some(i),
        Err(_) => s.parse::<f64>().ok().and_then(exact_integer),
    }
}

// Whole numbers inside the i64 range only; `as` would saturate.
fn exact_integer(r: f64) -> Option<i64> {
    if r.fract() == 0.0 && r >= i64::MIN as f64 && r < i64::MAX as f64 {
        Some(r as i64)
    } else {
        None
    }
}

/// Parses canonical timestamp text: `YYYY-MM-DD HH:MM:SS[.fff]`, the `T`
/// separated variant, RFC 3339 (normalised to UTC) or a bare date.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for format in TIMESTAMP_INPUT_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Some(t);
        }
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Value::Json(j) => write!(f, "{}", j),
        }
    }
}

// ------------- Conversions -------------
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}
impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}
impl From<f32> for Value {
    fn from(r: f32) -> Self {
        Value::Real(r as f64)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
impl From<NaiveDateTime> for Value {
    fn from(t: NaiveDateTime) -> Self {
        Value::Timestamp(t)
    }
}
impl From<ExtendedAttributes> for Value {
    fn from(map: ExtendedAttributes) -> Self {
        Value::Json(serde_json::Value::Object(map))
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(option: Option<T>) -> Self {
        match option {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

// Numbers without a fractional part become integers, nested structures stay JSON.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Json(other),
        }
    }
}

impl<'a> From<ValueRef<'a>> for Value {
    fn from(value: ValueRef<'a>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(r) => ToSqlOutput::from(*r),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Boolean(b) => ToSqlOutput::from(*b),
            Value::Timestamp(t) => ToSqlOutput::from(t.format(TIMESTAMP_FORMAT).to_string()),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Json(j) => ToSqlOutput::from(j.to_string()),
        })
    }
}

/// Builds a `Vec<Value>` from heterogeneous literals.
///
/// ```
/// use objsql::{values, Value};
/// let params = values!["Y", 3, 2.5];
/// assert_eq!(params[1], Value::Integer(3));
/// ```
#[macro_export]
macro_rules! values {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}
