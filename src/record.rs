//! Typed row values fed into the builder and produced back out by
//! `FrozenStore::to_records` for round-trip testing.

#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Int32(i32),
    Float64(f64),
    Utf8(String),
    Null,
}

impl RecordValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RecordValue::Null)
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            RecordValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RecordValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RecordValue::Utf8(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl From<i32> for RecordValue {
    fn from(v: i32) -> Self {
        RecordValue::Int32(v)
    }
}

impl From<f64> for RecordValue {
    fn from(v: f64) -> Self {
        RecordValue::Float64(v)
    }
}

impl From<&str> for RecordValue {
    fn from(v: &str) -> Self {
        RecordValue::Utf8(v.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(v: String) -> Self {
        RecordValue::Utf8(v)
    }
}

impl<T: Into<RecordValue>> From<Option<T>> for RecordValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => RecordValue::Null,
        }
    }
}

/// A single row, positional against a `Schema`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub values: Vec<RecordValue>,
}

impl Record {
    pub fn new(values: Vec<RecordValue>) -> Self {
        Self { values }
    }
}

impl FromIterator<RecordValue> for Record {
    fn from_iter<T: IntoIterator<Item = RecordValue>>(iter: T) -> Self {
        Record { values: iter.into_iter().collect() }
    }
}
