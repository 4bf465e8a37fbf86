//! Dispatched values and their conversion into Rust types

use super::cast::CoercionError;
use super::children::Children;
use super::dispatch::Adapter;
use super::error::{AdapterError, AdapterResult};
use crate::tree::{Binary, Resource};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use std::any::Any;
use std::rc::Rc;

/// The result of invoking an adapter method.
///
/// Scalars are typed per the method's declared return type. `Calendar`
/// keeps the recorded offset, `Date` is a bare instant.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
    Calendar(DateTime<FixedOffset>),
    Date(DateTime<Utc>),
    /// Binary stream; every reader starts at the beginning
    Binary(Binary),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Resource(Resource),
    Adapter(Adapter),
    Children(Children),
    /// Provider-specific object produced by `ResourceTree::adapt`
    Object(Rc<dyn Any>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Type name used in diagnostics and coercion errors.
    pub fn type_name(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(_) => "Boolean".to_string(),
            Self::Long(_) => "Long".to_string(),
            Self::Double(_) => "Double".to_string(),
            Self::String(_) => "String".to_string(),
            Self::Calendar(_) => "Calendar".to_string(),
            Self::Date(_) => "Date".to_string(),
            Self::Binary(_) => "Stream".to_string(),
            Self::Bytes(_) => "Bytes".to_string(),
            Self::Array(items) => match items.first() {
                Some(first) => format!("{}[]", first.type_name()),
                None => "[]".to_string(),
            },
            Self::Resource(_) => "Resource".to_string(),
            Self::Adapter(a) => format!("Adapter<{}>", a.interface().name()),
            Self::Children(_) => "Iterator".to_string(),
            Self::Object(_) => "Object".to_string(),
        }
    }

    /// Reference identity for shared values, equality for plain data.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Adapter(a), Self::Adapter(b)) => a.ptr_eq(b),
            (Self::Children(a), Self::Children(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_identical(y))
            }
            _ => self == other,
        }
    }

    /// Borrow a provider object as a concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Self::Object(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }

    fn mismatch(&self, target: &str) -> AdapterError {
        AdapterError::Coercion(CoercionError::new(self.type_name(), target))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Calendar(a), Self::Calendar(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Resource(a), Self::Resource(b)) => a == b,
            (Self::Adapter(a), Self::Adapter(b)) => a == b,
            (Self::Children(a), Self::Children(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({})", b),
            Self::Long(v) => write!(f, "Long({})", v),
            Self::Double(v) => write!(f, "Double({})", v),
            Self::String(s) => write!(f, "String({:?})", s),
            Self::Calendar(d) => write!(f, "Calendar({})", d.to_rfc3339()),
            Self::Date(d) => write!(f, "Date({})", d.to_rfc3339()),
            Self::Binary(b) => write!(f, "{:?}", b),
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Self::Resource(r) => write!(f, "{:?}", r),
            Self::Adapter(a) => write!(f, "{:?}", a),
            Self::Children(_) => f.write_str("Children(..)"),
            Self::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Long(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(s) => f.write_str(s),
            Self::Calendar(d) => f.write_str(&d.to_rfc3339_opts(SecondsFormat::Millis, false)),
            Self::Date(d) => f.write_str(&d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Binary(b) => write!(f, "{:?}", b),
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::Array(items) => {
                f.write_str("[ ")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" , ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(" ]")
            }
            Self::Resource(r) => write!(f, "{}", r),
            // Short form; the full description would recurse through references.
            Self::Adapter(a) => write!(f, "Adapter<{}>({})", a.interface().name(), a.path()),
            Self::Children(_) => f.write_str("Iterator"),
            Self::Object(_) => f.write_str("Object"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Resource> for Value {
    fn from(r: Resource) -> Self {
        Self::Resource(r)
    }
}

impl From<Adapter> for Value {
    fn from(a: Adapter) -> Self {
        Self::Adapter(a)
    }
}

/// Conversion from a dispatched [`Value`] into a concrete Rust type.
///
/// `null` only converts into `Option<T>`; any other mismatch is a
/// coercion error naming both types.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> AdapterResult<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> AdapterResult<Self> {
        Ok(value)
    }
}

macro_rules! from_value_variant {
    ($ty:ty, $variant:ident, $target:literal) => {
        impl FromValue for $ty {
            fn from_value(value: Value) -> AdapterResult<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(other.mismatch($target)),
                }
            }
        }
    };
}

from_value_variant!(String, String, "String");
from_value_variant!(i64, Long, "Long");
from_value_variant!(f64, Double, "Double");
from_value_variant!(bool, Bool, "Boolean");
from_value_variant!(DateTime<Utc>, Date, "Date");
from_value_variant!(DateTime<FixedOffset>, Calendar, "Calendar");
from_value_variant!(Vec<u8>, Bytes, "Bytes");
from_value_variant!(Binary, Binary, "Stream");
from_value_variant!(Resource, Resource, "Resource");
from_value_variant!(Adapter, Adapter, "Adapter");
from_value_variant!(Children, Children, "Iterator");

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> AdapterResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> AdapterResult<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(other.mismatch("Array")),
        }
    }
}
