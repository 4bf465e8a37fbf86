//! Value caster: stored property values to declared return types
//!
//! A declared type maps to one storage kind through a fixed precedence
//! table. The stored value is fetched as that kind; when the fetched value
//! is not already assignable to the declared type, one of a bounded set of
//! coercions is attempted. Everything else is a [`CoercionError`].

use super::interface::ValueType;
use super::value::Value;
use crate::tree::{Binary, PropertyValue};
use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone, Utc};
use thiserror::Error;

/// A stored value could not be converted to the declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot coerce {from} to {to}")]
pub struct CoercionError {
    pub from: String,
    pub to: String,
}

impl CoercionError {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Abstract storage kind a declared type is fetched as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Boolean,
    Date,
    Double,
    Long,
    Binary,
    Name,
    Path,
    Reference,
    String,
}

impl StorageKind {
    /// Precedence: boolean, date/calendar, floating point, integer, binary
    /// stream, identifier kinds, then generic string.
    pub fn for_type(declared: &ValueType) -> Self {
        match declared {
            ValueType::Boolean => Self::Boolean,
            ValueType::Date | ValueType::Calendar => Self::Date,
            ValueType::Double => Self::Double,
            ValueType::Long => Self::Long,
            ValueType::Stream | ValueType::Bytes => Self::Binary,
            ValueType::Name => Self::Name,
            ValueType::Path => Self::Path,
            ValueType::Reference => Self::Reference,
            ValueType::Array(element) => Self::for_type(element),
            _ => Self::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::Double => "Double",
            Self::Long => "Long",
            Self::Binary => "Binary",
            Self::Name => "Name",
            Self::Path => "Path",
            Self::Reference => "Reference",
            Self::String => "String",
        }
    }
}

/// Cast a stored value to the declared type. An absent value casts to
/// `Value::Null` without any coercion.
pub fn cast(raw: Option<&PropertyValue>, declared: &ValueType) -> Result<Value, CoercionError> {
    let Some(raw) = raw else {
        return Ok(Value::Null);
    };
    match (raw, declared) {
        (_, ValueType::Array(element)) if element.is_array() => {
            Err(CoercionError::new(raw.type_name(), declared.to_string()))
        }
        (PropertyValue::Multi(values), ValueType::Array(element)) => {
            Ok(Value::Array(cast_multiple(values, element)?))
        }
        (single, ValueType::Array(element)) => {
            Ok(Value::Array(vec![cast_single(single, element)?]))
        }
        (PropertyValue::Multi(_), scalar) => Err(CoercionError::new(raw.type_name(), scalar.to_string())),
        (single, scalar) => cast_single(single, scalar),
    }
}

/// Cast every element of a multi-valued property. The result has exactly
/// the source cardinality.
pub fn cast_multiple(raw: &[PropertyValue], element: &ValueType) -> Result<Vec<Value>, CoercionError> {
    let mut values = Vec::with_capacity(raw.len());
    for item in raw {
        values.push(cast_single(item, element)?);
    }
    Ok(values)
}

/// Whether `value` already has the representation `declared` asks for.
pub fn is_assignable(value: &Value, declared: &ValueType) -> bool {
    match (value, declared) {
        (Value::Null, _) => true,
        (Value::Bool(_), ValueType::Boolean) => true,
        (Value::Long(_), ValueType::Long) => true,
        (Value::Double(_), ValueType::Double) => true,
        (
            Value::String(_),
            ValueType::String | ValueType::Name | ValueType::Path | ValueType::Reference,
        ) => true,
        (Value::Calendar(_), ValueType::Calendar) => true,
        (Value::Date(_), ValueType::Date) => true,
        (Value::Binary(_), ValueType::Stream) => true,
        (Value::Bytes(_), ValueType::Bytes) => true,
        (Value::Array(items), ValueType::Array(element)) => {
            items.iter().all(|item| is_assignable(item, element))
        }
        (Value::Resource(_), ValueType::Resource) => true,
        (Value::Children(_), ValueType::Children) => true,
        (Value::Adapter(a), ValueType::Adapter(name)) => a.implements(name),
        _ => false,
    }
}

fn cast_single(raw: &PropertyValue, declared: &ValueType) -> Result<Value, CoercionError> {
    let fetched = fetch(raw, StorageKind::for_type(declared))?;
    if is_assignable(&fetched, declared) {
        return Ok(fetched);
    }
    coerce(fetched, declared)
}

/// The bounded coercion set: calendar to date, string or epoch millis,
/// date back to calendar, and binary stream to a byte buffer.
fn coerce(value: Value, declared: &ValueType) -> Result<Value, CoercionError> {
    match (value, declared) {
        (Value::Calendar(c), ValueType::Date) => Ok(Value::Date(c.with_timezone(&Utc))),
        (Value::Calendar(c), ValueType::String) => {
            Ok(Value::String(c.to_rfc3339_opts(SecondsFormat::Millis, false)))
        }
        (Value::Calendar(c), ValueType::Long) => Ok(Value::Long(c.timestamp_millis())),
        (Value::Date(d), ValueType::Calendar) => Ok(Value::Calendar(d.fixed_offset())),
        (Value::Binary(b), ValueType::Bytes) => Ok(Value::Bytes(b.as_bytes().to_vec())),
        (other, declared) => Err(CoercionError::new(other.type_name(), declared.to_string())),
    }
}

/// Read a stored scalar as `kind`, applying the repository's standard
/// value conversions.
fn fetch(raw: &PropertyValue, kind: StorageKind) -> Result<Value, CoercionError> {
    let fail = || CoercionError::new(raw.type_name(), kind.as_str());
    match kind {
        StorageKind::Boolean => match raw {
            PropertyValue::Boolean(b) => Ok(Value::Bool(*b)),
            PropertyValue::Long(_) | PropertyValue::Double(_) | PropertyValue::Date(_) => Err(fail()),
            other => Ok(Value::Bool(as_text(other).ok_or_else(fail)?.eq_ignore_ascii_case("true"))),
        },
        StorageKind::Date => match raw {
            PropertyValue::Date(d) => Ok(Value::Calendar(*d)),
            PropertyValue::Long(ms) => from_millis(*ms).map(Value::Calendar).ok_or_else(fail),
            PropertyValue::Double(v) => from_millis(*v as i64).map(Value::Calendar).ok_or_else(fail),
            PropertyValue::Boolean(_) => Err(fail()),
            other => {
                let text = as_text(other).ok_or_else(fail)?;
                DateTime::parse_from_rfc3339(text.trim())
                    .map(Value::Calendar)
                    .map_err(|_| fail())
            }
        },
        StorageKind::Double => match raw {
            PropertyValue::Double(v) => Ok(Value::Double(*v)),
            PropertyValue::Long(v) => Ok(Value::Double(*v as f64)),
            PropertyValue::Date(d) => Ok(Value::Double(d.timestamp_millis() as f64)),
            PropertyValue::Boolean(_) => Err(fail()),
            other => as_text(other)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map(Value::Double)
                .ok_or_else(fail),
        },
        StorageKind::Long => match raw {
            PropertyValue::Long(v) => Ok(Value::Long(*v)),
            PropertyValue::Double(v) => Ok(Value::Long(*v as i64)),
            PropertyValue::Date(d) => Ok(Value::Long(d.timestamp_millis())),
            PropertyValue::Boolean(_) => Err(fail()),
            other => as_text(other)
                .and_then(|s| s.trim().parse::<i64>().ok())
                .map(Value::Long)
                .ok_or_else(fail),
        },
        StorageKind::Binary => match raw {
            PropertyValue::Binary(b) => Ok(Value::Binary(b.clone())),
            other => Ok(Value::Binary(Binary::new(to_text(other).ok_or_else(fail)?))),
        },
        StorageKind::Name | StorageKind::Path | StorageKind::Reference | StorageKind::String => {
            to_text(raw).map(Value::String).ok_or_else(fail)
        }
    }
}

fn from_millis(ms: i64) -> Option<DateTime<FixedOffset>> {
    Utc.timestamp_millis_opt(ms).single().map(|d| d.fixed_offset())
}

/// Borrow the text of string-like values, decoding binaries as UTF-8.
fn as_text(raw: &PropertyValue) -> Option<std::borrow::Cow<'_, str>> {
    use std::borrow::Cow;
    match raw {
        PropertyValue::String(s)
        | PropertyValue::Name(s)
        | PropertyValue::Path(s)
        | PropertyValue::Reference(s) => Some(Cow::Borrowed(s.as_str())),
        PropertyValue::Binary(b) => std::str::from_utf8(b.as_bytes()).ok().map(Cow::Borrowed),
        _ => None,
    }
}

/// String form of any scalar.
fn to_text(raw: &PropertyValue) -> Option<String> {
    match raw {
        PropertyValue::Long(v) => Some(v.to_string()),
        PropertyValue::Double(v) => Some(v.to_string()),
        PropertyValue::Boolean(b) => Some(b.to_string()),
        PropertyValue::Date(d) => Some(d.to_rfc3339_opts(SecondsFormat::Millis, false)),
        PropertyValue::Multi(_) => None,
        other => as_text(other).map(|s| s.into_owned()),
    }
}
