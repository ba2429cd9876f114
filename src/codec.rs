use crate::{
    error::{Error, Result},
    model::{
        field::{CollectionKind, FieldKind, FieldType, ScalarKind},
        record::{Record, RecordType},
        value::Value,
    },
};

use aws_sdk_dynamodb::{primitives::Blob, types::AttributeValue};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use indexmap::IndexMap;
use rust_decimal::{Decimal, RoundingStrategy};
use std::{collections, str::FromStr, sync::Arc};

const FLOAT_SCALE: u32 = 10;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATETIME_PARSE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const TIME_PARSE_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

/// Render a float as exact decimal text.
///
/// Rounds half away from zero at 10 fractional digits and strips trailing
/// zeros, so `1.5` becomes `"1.5"` and `0.1 + 0.2` becomes `"0.3"`.
///
/// ```rust
/// use dynamodb_model::codec::format_float;
///
/// assert_eq!(format_float(1.5).unwrap(), "1.5");
/// assert_eq!(format_float(0.0).unwrap(), "0");
/// ```
pub fn format_float(number: f64) -> Result<String> {
    if !number.is_finite() {
        return Err(Error::type_invalid(number, "finite Float"));
    }
    let Some(decimal) = Decimal::from_f64_retain(number) else {
        // beyond the decimal range there is no fractional part left to round
        return Ok(format!("{number:.0}"));
    };
    let rounded = decimal
        .round_dp_with_strategy(FLOAT_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    if rounded.is_zero() {
        return Ok("0".to_string());
    }
    Ok(rounded.to_string())
}

/// ISO-8601 date-time text, with microseconds only when present.
pub fn format_datetime(value: &NaiveDateTime) -> String {
    if value.nanosecond() / 1_000 == 0 {
        value.format(DATETIME_FORMAT).to_string()
    } else {
        value.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// ISO-8601 date text.
pub fn format_date(value: &NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

/// ISO-8601 time text, with microseconds only when present.
pub fn format_time(value: &NaiveTime) -> String {
    if value.nanosecond() / 1_000 == 0 {
        value.format(TIME_FORMAT).to_string()
    } else {
        value.format("%H:%M:%S%.6f").to_string()
    }
}

pub(crate) fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_PARSE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok()
}

pub(crate) fn parse_time(text: &str) -> Option<NaiveTime> {
    TIME_PARSE_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Tag of a wire value, as the store names it.
pub fn wire_tag(value: &AttributeValue) -> &'static str {
    match value {
        AttributeValue::S(_) => "S",
        AttributeValue::N(_) => "N",
        AttributeValue::B(_) => "B",
        AttributeValue::Bool(_) => "BOOL",
        AttributeValue::L(_) => "L",
        AttributeValue::M(_) => "M",
        AttributeValue::Ss(_) => "SS",
        AttributeValue::Ns(_) => "NS",
        AttributeValue::Bs(_) => "BS",
        AttributeValue::Null(_) => "NULL",
        _ => "UNKNOWN",
    }
}

/// Convert one value to its wire representation.
///
/// Sets of text and numbers become native sets; sets of bytes are written
/// as a list of binaries and still come back as a set.
pub fn to_wire(value: &Value) -> Result<AttributeValue> {
    let attribute_value = match value {
        Value::Null => AttributeValue::Null(true),
        Value::String(text) => AttributeValue::S(text.clone()),
        Value::Integer(number) => AttributeValue::N(number.to_string()),
        Value::Float(number) => AttributeValue::N(format_float(*number)?),
        Value::Decimal(number) => AttributeValue::N(number.normalize().to_string()),
        Value::Boolean(flag) => AttributeValue::Bool(*flag),
        Value::Bytes(bytes) => AttributeValue::B(Blob::new(bytes.clone())),
        Value::DateTime(datetime) => AttributeValue::S(format_datetime(datetime)),
        Value::Date(date) => AttributeValue::S(format_date(date)),
        Value::Time(time) => AttributeValue::S(format_time(time)),
        Value::List(values) | Value::Tuple(values) => {
            AttributeValue::L(values.iter().map(to_wire).collect::<Result<_>>()?)
        }
        Value::Set(values) | Value::FrozenSet(values) => set_to_wire(values, false)?,
        Value::Map(map) => AttributeValue::M(
            map.iter()
                .map(|(key, value)| Ok((key.clone(), to_wire(value)?)))
                .collect::<Result<_>>()?,
        ),
        Value::Record(record) => AttributeValue::M(serialize_fields(record)?),
    };
    Ok(attribute_value)
}

/// Native set encoding, used where the store must see a real set (`ADD`).
pub(crate) fn set_to_native_wire(values: &[Value]) -> Result<AttributeValue> {
    set_to_wire(values, true)
}

fn set_to_wire(values: &[Value], native_binary: bool) -> Result<AttributeValue> {
    if values.is_empty() {
        return Ok(AttributeValue::L(Vec::new()));
    }
    let elements = values.iter().map(to_wire).collect::<Result<Vec<_>>>()?;
    if elements.iter().all(AttributeValue::is_s) {
        let strings = elements.into_iter().filter_map(|element| element.as_s().ok().cloned());
        return Ok(AttributeValue::Ss(strings.collect()));
    }
    if elements.iter().all(AttributeValue::is_n) {
        let numbers = elements.into_iter().filter_map(|element| element.as_n().ok().cloned());
        return Ok(AttributeValue::Ns(numbers.collect()));
    }
    if elements.iter().all(AttributeValue::is_b) {
        if native_binary {
            let blobs = elements.into_iter().filter_map(|element| element.as_b().ok().cloned());
            return Ok(AttributeValue::Bs(blobs.collect()));
        }
        return Ok(AttributeValue::L(elements));
    }
    let found: collections::BTreeSet<_> = values.iter().map(Value::class).collect();
    let found: Vec<String> = found.iter().map(ToString::to_string).collect();
    Err(Error::type_invalid(
        format!("Set of {{{}}}", found.join(", ")),
        "{String, Integer, Float, Decimal, Bytes}",
    ))
}

/// Wire item of a record; unset and null fields are left out.
pub fn serialize_fields(record: &Record) -> Result<collections::HashMap<String, AttributeValue>> {
    record
        .fields()
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| Ok((name.clone(), to_wire(value)?)))
        .collect()
}

/// A field that could not be rebuilt with its declared type.
#[derive(Debug)]
pub struct Fallback {
    /// Dotted path of the field.
    pub path: String,
    /// Why the declared type did not fit.
    pub error: Error,
}

/// A record rebuilt from the wire, with the fields that kept their raw value.
#[derive(Debug)]
pub struct Reconstruction {
    /// Rebuilt record.
    pub record: Record,
    /// Fields stored as untyped values because the declared type did not fit.
    pub fallbacks: Vec<Fallback>,
}

impl Reconstruction {
    /// Whether every field matched its declared type.
    pub fn is_complete(&self) -> bool {
        self.fallbacks.is_empty()
    }
}

/// Rebuild a record, falling back to the untyped value for fields whose
/// stored value no longer matches the declared type.
///
/// Attributes the record type does not declare are ignored.
pub fn deserialize_fields(
    record_type: &Arc<RecordType>,
    item: &collections::HashMap<String, AttributeValue>,
) -> Reconstruction {
    let mut fallbacks = Vec::new();
    let record = rebuild_record(record_type, item, "", &mut fallbacks);
    Reconstruction { record, fallbacks }
}

/// Rebuild one wire value against its declared type, failing on mismatch.
pub fn from_wire(name: &str, value: &AttributeValue, field_type: &FieldType) -> Result<Value> {
    let mut fallbacks = Vec::new();
    let value = reconstruct(name, value, field_type, &mut fallbacks)?;
    match fallbacks.into_iter().next() {
        Some(fallback) => Err(fallback.error),
        None => Ok(value),
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn rebuild_record(
    record_type: &Arc<RecordType>,
    item: &collections::HashMap<String, AttributeValue>,
    prefix: &str,
    fallbacks: &mut Vec<Fallback>,
) -> Record {
    let mut fields = IndexMap::with_capacity(item.len());
    for (name, field_type) in record_type.fields() {
        let Some(attribute_value) = item.get(name) else {
            continue;
        };
        let path = join_path(prefix, name);
        let value = match reconstruct(&path, attribute_value, field_type, fallbacks) {
            Ok(value) => value,
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(path = %path, error = %error, "keeping the raw attribute value");
                fallbacks.push(Fallback { path, error });
                untyped(attribute_value)
            }
        };
        fields.insert(name.clone(), value);
    }
    Record::from_fields(record_type, fields)
}

fn reconstruct(
    path: &str,
    value: &AttributeValue,
    field_type: &FieldType,
    fallbacks: &mut Vec<Fallback>,
) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    for alternative in field_type.alternatives() {
        let recorded = fallbacks.len();
        if let Some(value) = reconstruct_as(path, value, alternative, fallbacks) {
            return Ok(value);
        }
        fallbacks.truncate(recorded);
    }
    Err(Error::AttributeDeserialization {
        name: path.to_string(),
        wire_type: wire_tag(value).to_string(),
    })
}

/// `None` when the wire value does not fit this alternative.
fn reconstruct_as(
    path: &str,
    value: &AttributeValue,
    field_type: &FieldType,
    fallbacks: &mut Vec<Fallback>,
) -> Option<Value> {
    match (field_type.kind(), value) {
        (FieldKind::Any, _) => Some(untyped(value)),
        (FieldKind::Scalar(kind), _) => scalar(*kind, value),
        (FieldKind::Collection { kind, element }, _) => {
            let items: Vec<AttributeValue> = match value {
                AttributeValue::L(values) => values.clone(),
                AttributeValue::Ss(values) => values.iter().cloned().map(AttributeValue::S).collect(),
                AttributeValue::Ns(values) => values.iter().cloned().map(AttributeValue::N).collect(),
                AttributeValue::Bs(values) => values.iter().cloned().map(AttributeValue::B).collect(),
                _ => return None,
            };
            let mut values = Vec::with_capacity(items.len());
            for (position, item) in items.iter().enumerate() {
                let path = format!("{path}[{position}]");
                values.push(reconstruct(&path, item, element, fallbacks).ok()?);
            }
            Some(wrap(*kind, values))
        }
        (FieldKind::Map, AttributeValue::M(_)) => Some(untyped(value)),
        (FieldKind::Nested(record_type), AttributeValue::M(item)) => {
            Some(Value::Record(rebuild_record(record_type, item, path, fallbacks)))
        }
        _ => None,
    }
}

fn scalar(kind: ScalarKind, value: &AttributeValue) -> Option<Value> {
    let value = match (kind, value) {
        (ScalarKind::String, AttributeValue::S(text)) => Value::String(text.clone()),
        (ScalarKind::Integer, AttributeValue::N(number)) => Value::Integer(number.parse().ok()?),
        (ScalarKind::Float, AttributeValue::N(number)) => Value::Float(number.parse().ok()?),
        (ScalarKind::Decimal, AttributeValue::N(number)) => Value::Decimal(parse_decimal(number)?),
        (ScalarKind::Boolean, AttributeValue::Bool(flag)) => Value::Boolean(*flag),
        (ScalarKind::Bytes, AttributeValue::B(blob)) => Value::Bytes(blob.as_ref().to_vec()),
        (ScalarKind::DateTime, AttributeValue::S(text)) => Value::DateTime(parse_datetime(text)?),
        (ScalarKind::Date, AttributeValue::S(text)) => Value::Date(parse_date(text)?),
        (ScalarKind::Time, AttributeValue::S(text)) => Value::Time(parse_time(text)?),
        _ => return None,
    };
    Some(value)
}

fn wrap(kind: CollectionKind, values: Vec<Value>) -> Value {
    match kind {
        CollectionKind::List => Value::List(values),
        CollectionKind::Tuple => Value::Tuple(values),
        CollectionKind::Set => Value::set(values),
        CollectionKind::FrozenSet => Value::frozen_set(values),
    }
}

/// Best-effort value for a wire value with no declared type.
///
/// Numbers become integers when they are integral and decimals otherwise.
pub fn untyped(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(text) => Value::String(text.clone()),
        AttributeValue::N(number) => untyped_number(number),
        AttributeValue::B(blob) => Value::Bytes(blob.as_ref().to_vec()),
        AttributeValue::Bool(flag) => Value::Boolean(*flag),
        AttributeValue::L(values) => Value::List(values.iter().map(untyped).collect()),
        AttributeValue::M(map) => Value::Map(
            map.iter()
                .map(|(key, value)| (key.clone(), untyped(value)))
                .collect(),
        ),
        AttributeValue::Ss(values) => Value::set(values.iter().map(String::as_str)),
        AttributeValue::Ns(values) => Value::set(values.iter().map(|number| untyped_number(number))),
        AttributeValue::Bs(values) => Value::set(values.iter().map(|blob| blob.as_ref().to_vec())),
        _ => Value::Null,
    }
}

fn untyped_number(number: &str) -> Value {
    if let Ok(integer) = number.parse::<i64>() {
        return Value::Integer(integer);
    }
    match parse_decimal(number) {
        Some(decimal) => Value::Decimal(decimal),
        None => Value::String(number.to_string()),
    }
}
