//! Stored property values as the resource tree holds them

use chrono::{DateTime, FixedOffset};
use std::io::Cursor;
use std::sync::Arc;

/// Immutable binary payload, cheap to clone.
#[derive(Clone, PartialEq, Eq)]
pub struct Binary(Arc<[u8]>);

impl Binary {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A fresh reader positioned at the start of the payload.
    pub fn reader(&self) -> Cursor<Arc<[u8]>> {
        Cursor::new(self.0.clone())
    }
}

impl std::fmt::Debug for Binary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Binary({} bytes)", self.0.len())
    }
}

impl From<&str> for Binary {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// The storage kind of a property, independent of any declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoredKind {
    String,
    Name,
    Path,
    Reference,
    Long,
    Double,
    Boolean,
    Date,
    Binary,
}

impl StoredKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Name => "Name",
            Self::Path => "Path",
            Self::Reference => "Reference",
            Self::Long => "Long",
            Self::Double => "Double",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::Binary => "Binary",
        }
    }
}

impl std::fmt::Display for StoredKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property value as stored on a resource.
///
/// Dates are calendar values: an instant plus the offset it was recorded in.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Name(String),
    Path(String),
    Reference(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Date(DateTime<FixedOffset>),
    Binary(Binary),
    Multi(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Storage kind of this value; multi-valued properties report the kind
    /// of their first element, or `String` when empty.
    pub fn kind(&self) -> StoredKind {
        match self {
            Self::String(_) => StoredKind::String,
            Self::Name(_) => StoredKind::Name,
            Self::Path(_) => StoredKind::Path,
            Self::Reference(_) => StoredKind::Reference,
            Self::Long(_) => StoredKind::Long,
            Self::Double(_) => StoredKind::Double,
            Self::Boolean(_) => StoredKind::Boolean,
            Self::Date(_) => StoredKind::Date,
            Self::Binary(_) => StoredKind::Binary,
            Self::Multi(values) => values.first().map(|v| v.kind()).unwrap_or(StoredKind::String),
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// Type name used in diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Self::Multi(_) => format!("{}[]", self.kind()),
            other => other.kind().to_string(),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<DateTime<FixedOffset>> for PropertyValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::Date(v)
    }
}

impl From<Binary> for PropertyValue {
    fn from(v: Binary) -> Self {
        Self::Binary(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn binary_reader_starts_fresh_each_time() {
        let binary = Binary::from("payload");
        let mut first = String::new();
        binary.reader().read_to_string(&mut first).unwrap();
        let mut second = String::new();
        binary.reader().read_to_string(&mut second).unwrap();
        assert_eq!(first, "payload");
        assert_eq!(second, "payload");
    }

    #[test]
    fn multi_value_reports_element_kind() {
        let value = PropertyValue::Multi(vec![PropertyValue::Long(1), PropertyValue::Long(2)]);
        assert_eq!(value.kind(), StoredKind::Long);
        assert_eq!(value.type_name(), "Long[]");
        assert!(value.is_multiple());
        assert_eq!(PropertyValue::Multi(vec![]).kind(), StoredKind::String);
    }
}
