use crate::{model::record::Record, resolver::ValueClass};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use rust_decimal::Decimal;

/// In-memory field value.
///
/// Sets keep insertion order; the constructors drop duplicates.
///
/// ```rust
/// use dynamodb_model::model::value::Value;
///
/// let tags = Value::set(["a", "b", "a"]);
/// assert_eq!(tags, Value::Set(vec![Value::from("a"), Value::from("b")]));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Text.
    String(String),
    /// Integer.
    Integer(i64),
    /// Binary floating point.
    Float(f64),
    /// Exact decimal.
    Decimal(Decimal),
    /// Boolean.
    Boolean(bool),
    /// Byte sequence.
    Bytes(Vec<u8>),
    /// Naive date and time.
    DateTime(NaiveDateTime),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Ordered list.
    List(Vec<Value>),
    /// Tuple.
    Tuple(Vec<Value>),
    /// Set of unique values.
    Set(Vec<Value>),
    /// Frozen set of unique values.
    FrozenSet(Vec<Value>),
    /// Untyped string-keyed map.
    Map(IndexMap<String, Value>),
    /// Nested record.
    Record(Record),
}

fn unique<I: IntoIterator<Item = Value>>(values: I) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::new();
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

impl Value {
    /// List from anything convertible to values.
    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    /// Tuple from anything convertible to values.
    pub fn tuple<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::Tuple(values.into_iter().map(Into::into).collect())
    }

    /// Set, dropping duplicates.
    pub fn set<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::Set(unique(values.into_iter().map(Into::into)))
    }

    /// Frozen set, dropping duplicates.
    pub fn frozen_set<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::FrozenSet(unique(values.into_iter().map(Into::into)))
    }

    /// Map from key/value pairs.
    pub fn map<I, K, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Whether the value is an explicit null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Runtime class of the value.
    pub fn class(&self) -> ValueClass {
        match self {
            Self::Null => ValueClass::Null,
            Self::String(_) => ValueClass::String,
            Self::Integer(_) => ValueClass::Integer,
            Self::Float(_) => ValueClass::Float,
            Self::Decimal(_) => ValueClass::Decimal,
            Self::Boolean(_) => ValueClass::Boolean,
            Self::Bytes(_) => ValueClass::Bytes,
            Self::DateTime(_) => ValueClass::DateTime,
            Self::Date(_) => ValueClass::Date,
            Self::Time(_) => ValueClass::Time,
            Self::List(_) => ValueClass::List,
            Self::Tuple(_) => ValueClass::Tuple,
            Self::Set(_) => ValueClass::Set,
            Self::FrozenSet(_) => ValueClass::FrozenSet,
            Self::Map(_) => ValueClass::Map,
            Self::Record(record) => ValueClass::Record(record.record_type().name().to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveTime> for Value {
    fn from(value: NaiveTime) -> Self {
        Self::Time(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(value: IndexMap<String, Value>) -> Self {
        Self::Map(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
