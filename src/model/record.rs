use crate::{
    error::{AttributeNullError, Error, Result},
    expression,
    model::{
        field::FieldType,
        index::{SecondaryIndex, Throughput},
        value::Value,
    },
    resolver::{self, WireType},
};

use indexmap::IndexMap;
use std::sync::Arc;

/// Table-level settings of a top-level record type.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSettings {
    /// Table name.
    pub name: String,
    /// Provisioned capacity.
    pub throughput: Throughput,
}

/// Declared record shape.
///
/// Built once through [`RecordType::builder`] and shared behind an `Arc`.
///
/// ```rust
/// use dynamodb_model::model::{field::FieldType, record::RecordType};
///
/// let users = RecordType::builder("User")
///     .table_name("users")
///     .hash_key("id")
///     .field("id", FieldType::string())
///     .field("age", FieldType::integer().optional())
///     .build()
///     .unwrap();
/// assert_eq!(users.hash_key(), Some("id"));
/// ```
#[derive(Debug, PartialEq)]
pub struct RecordType {
    name: String,
    fields: IndexMap<String, FieldType>,
    table: Option<TableSettings>,
    hash_key: Option<String>,
    range_key: Option<String>,
    indexes: Vec<SecondaryIndex>,
}

impl RecordType {
    /// Start declaring a record type.
    pub fn builder(name: &str) -> RecordTypeBuilder {
        RecordTypeBuilder {
            name: name.to_string(),
            fields: IndexMap::new(),
            table_name: None,
            throughput: Throughput::default(),
            hash_key: None,
            range_key: None,
            indexes: Vec::new(),
        }
    }

    /// Record type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &IndexMap<String, FieldType> {
        &self.fields
    }

    /// Declared type of `name`.
    pub fn field(&self, name: &str) -> Result<&FieldType> {
        self.fields
            .get(name)
            .ok_or_else(|| Error::AttributeInvalid(name.to_string()))
    }

    /// Table settings, `None` for records only used nested.
    pub fn table(&self) -> Option<&TableSettings> {
        self.table.as_ref()
    }

    /// Table name or an InvalidState error.
    pub fn table_name(&self) -> Result<&str> {
        self.table
            .as_ref()
            .map(|table| table.name.as_str())
            .ok_or_else(|| Error::InvalidState(format!("{} is not bound to a table", self.name)))
    }

    /// Hash key attribute.
    pub fn hash_key(&self) -> Option<&str> {
        self.hash_key.as_deref()
    }

    /// Hash key attribute or an InvalidState error.
    pub fn require_hash_key(&self) -> Result<&str> {
        self.hash_key()
            .ok_or_else(|| Error::InvalidState(format!("{} has no hash key", self.name)))
    }

    /// Range key attribute.
    pub fn range_key(&self) -> Option<&str> {
        self.range_key.as_deref()
    }

    /// Secondary indexes.
    pub fn indexes(&self) -> &[SecondaryIndex] {
        &self.indexes
    }

    /// Names of the required fields, in declaration order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, field_type)| field_type.is_required())
            .map(|(name, _)| name.as_str())
    }
}

/// Builder for [`RecordType`].
#[derive(Debug)]
pub struct RecordTypeBuilder {
    name: String,
    fields: IndexMap<String, FieldType>,
    table_name: Option<String>,
    throughput: Throughput,
    hash_key: Option<String>,
    range_key: Option<String>,
    indexes: Vec<SecondaryIndex>,
}

impl RecordTypeBuilder {
    /// Declare a field.
    pub fn field(mut self, name: &str, field_type: FieldType) -> Self {
        self.fields.insert(name.to_string(), field_type);
        self
    }

    /// Bind to a table.
    pub fn table_name(mut self, name: &str) -> Self {
        self.table_name = Some(name.to_string());
        self
    }

    /// Table capacity, 1/1 when unset.
    pub fn throughput(mut self, throughput: Throughput) -> Self {
        self.throughput = throughput;
        self
    }

    /// Designate the hash key field.
    pub fn hash_key(mut self, name: &str) -> Self {
        self.hash_key = Some(name.to_string());
        self
    }

    /// Designate the range key field.
    pub fn range_key(mut self, name: &str) -> Self {
        self.range_key = Some(name.to_string());
        self
    }

    /// Declare a secondary index.
    pub fn index(mut self, index: SecondaryIndex) -> Self {
        self.indexes.push(index);
        self
    }

    fn check_key(&self, name: &str) -> Result<()> {
        let field_type = self
            .fields
            .get(name)
            .ok_or_else(|| Error::AttributeInvalid(name.to_string()))?;
        match resolver::wire_type(field_type) {
            WireType::S | WireType::N | WireType::B => Ok(()),
            other => Err(Error::type_invalid(other, "{S, N, B}")),
        }
    }

    /// Validate keys and indexes and freeze the type.
    pub fn build(self) -> Result<Arc<RecordType>> {
        if let Some(hash_key) = &self.hash_key {
            self.check_key(hash_key)?;
        }
        if let Some(range_key) = &self.range_key {
            if self.hash_key.as_ref() == Some(range_key) {
                return Err(Error::InvalidState(format!(
                    "range key {range_key} repeats the hash key"
                )));
            }
            self.check_key(range_key)?;
        }
        for index in &self.indexes {
            for key in index.key_names() {
                self.check_key(key)?;
            }
        }
        let table = self.table_name.map(|name| TableSettings {
            name,
            throughput: self.throughput,
        });
        let record_type = RecordType {
            name: self.name,
            fields: self.fields,
            table,
            hash_key: self.hash_key,
            range_key: self.range_key,
            indexes: self.indexes,
        };
        Ok(Arc::new(record_type))
    }
}

/// A live record: a record type plus its present field values.
///
/// Unset optional fields are absent from the field map.
#[derive(Clone, Debug)]
pub struct Record {
    record_type: Arc<RecordType>,
    fields: IndexMap<String, Value>,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.record_type.name == other.record_type.name && self.fields == other.fields
    }
}

impl Record {
    /// Empty record of the given type.
    pub fn new(record_type: &Arc<RecordType>) -> Self {
        Self {
            record_type: Arc::clone(record_type),
            fields: IndexMap::new(),
        }
    }

    pub(crate) fn from_fields(record_type: &Arc<RecordType>, fields: IndexMap<String, Value>) -> Self {
        Self {
            record_type: Arc::clone(record_type),
            fields,
        }
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Assign a declared field.
    ///
    /// Anything but [`Value::Null`] must be assignable to the field type.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let field_type = self.record_type.field(name)?;
        let value = value.into();
        if !value.is_null() {
            expression::type_check(&value, field_type)?;
        }
        self.fields.insert(name.to_string(), value);
        Ok(())
    }

    /// Check every present field, recursively, against its declared type.
    pub(crate) fn type_check(&self) -> Result<()> {
        for (name, value) in self.fields.iter().filter(|(_, value)| !value.is_null()) {
            expression::type_check(value, self.record_type.field(name)?)?;
            type_check_nested(value)?;
        }
        Ok(())
    }

    /// Unset a field.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    /// Value of a field, `None` when unset.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Record type.
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    /// Present fields.
    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    /// Replace every field with the ones of `other`.
    pub fn replace_fields(&mut self, other: Record) {
        self.fields = other.fields;
    }

    /// Check that every required field, recursively, holds a value.
    pub fn validate(&self) -> Result<(), AttributeNullError> {
        for (name, field_type) in self.record_type.fields() {
            match self.fields.get(name) {
                None | Some(Value::Null) if field_type.is_required() => {
                    return Err(AttributeNullError::new(name.as_str()));
                }
                Some(value) => validate_nested(value).map_err(|mut error| {
                    error.prepend_path(name);
                    error
                })?,
                None => {}
            }
        }
        Ok(())
    }
}

fn validate_nested(value: &Value) -> Result<(), AttributeNullError> {
    match value {
        Value::Record(record) => record.validate(),
        Value::List(values) | Value::Tuple(values) => values.iter().try_for_each(validate_nested),
        _ => Ok(()),
    }
}

fn type_check_nested(value: &Value) -> Result<()> {
    match value {
        Value::Record(record) => record.type_check(),
        Value::List(values) | Value::Tuple(values) => values.iter().try_for_each(type_check_nested),
        _ => Ok(()),
    }
}
