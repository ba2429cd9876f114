use crate::{
    codec, common,
    error::{Error, Result},
    model::{
        field::{FieldKind, FieldType, ScalarKind},
        record::RecordType,
        value::Value,
    },
    resolver::{self, ValueClasses},
};

use aws_sdk_dynamodb::types;
use std::{collections, fmt, sync::Arc};

/// Update action keyword.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Verb {
    /// `SET`
    Set,
    /// `ADD`
    Add,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set => f.write_str("SET"),
            Self::Add => f.write_str("ADD"),
        }
    }
}

/// Right-hand side of an update action.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operand {
    /// `path = :value`
    Assign,
    /// `path = path + :value`
    Increment,
    /// `path = list_append(path, :value)`
    ListAppend,
    /// `path :value`, set union through `ADD`
    SetUnion,
}

/// Start of a path expression, bound to a record type.
///
/// ```rust
/// use dynamodb_model::{
///     expression::Expr,
///     model::{field::FieldType, record::RecordType},
/// };
///
/// let counters = RecordType::builder("Counter")
///     .field("hits", FieldType::integer())
///     .build()
///     .unwrap();
/// let fragment = Expr::new(&counters).field("hits").unwrap().set_add(1).unwrap();
/// assert_eq!(fragment.update_expression(), "SET hits = hits + :hits");
/// ```
#[derive(Clone, Debug)]
pub struct Expr {
    record_type: Arc<RecordType>,
}

impl Expr {
    /// Bind a new expression to `record_type`.
    pub fn new(record_type: &Arc<RecordType>) -> Self {
        Self {
            record_type: Arc::clone(record_type),
        }
    }

    /// First path step: a top-level field.
    pub fn field(&self, name: &str) -> Result<PathExpr> {
        let field_type = self.record_type.field(name)?;
        Ok(PathExpr {
            path: name.to_string(),
            key: name.to_string(),
            target: field_type.clone(),
        })
    }
}

/// A validated path, positioned on a resolved field type.
#[derive(Clone, Debug)]
pub struct PathExpr {
    path: String,
    key: String,
    target: FieldType,
}

impl PathExpr {
    /// Compiled path so far, e.g. `items[1].name`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Field type the path currently resolves to.
    pub fn target(&self) -> &FieldType {
        &self.target
    }

    /// Step into a nested record field, or any key of an untyped map.
    pub fn field(self, name: &str) -> Result<Self> {
        let target = match self.target.nested_record() {
            Some(record_type) if record_type.fields().contains_key(name) => {
                record_type.field(name)?.clone()
            }
            _ if self.is_untyped() => FieldType::any(),
            _ => return Err(Error::AttributeInvalid(name.to_string())),
        };
        Ok(Self {
            path: format!("{}.{name}", self.path),
            key: name.to_string(),
            target,
        })
    }

    /// Step into one element of a collection.
    pub fn index(self, index: impl fmt::Display) -> Result<Self> {
        let index = index.to_string();
        let position: usize = index
            .parse()
            .map_err(|_| Error::AttributeInvalid(index.clone()))?;
        let target = match self.target.collection_alternative() {
            Some((_, element)) => element.clone(),
            None if self.is_untyped() => FieldType::any(),
            None => return Err(Error::AttributeInvalid(index)),
        };
        Ok(Self {
            path: format!("{}[{position}]", self.path),
            key: self.key,
            target,
        })
    }

    fn is_untyped(&self) -> bool {
        self.target
            .alternatives()
            .iter()
            .any(|alternative| matches!(alternative.kind(), FieldKind::Any | FieldKind::Map))
    }

    fn fragment(self, verb: Verb, operand: Operand, value: types::AttributeValue) -> UpdateFragment {
        UpdateFragment {
            verb,
            placeholder: placeholder(&self.key),
            path: self.path,
            operand,
            value,
        }
    }

    /// Assign `value`, type-checked against the resolved field type.
    pub fn set(self, value: impl Into<Value>) -> Result<UpdateFragment> {
        let value = value.into();
        type_check(&value, &self.target)?;
        let wire = codec::to_wire(&value)?;
        Ok(self.fragment(Verb::Set, Operand::Assign, wire))
    }

    /// Increment a numeric field by a number.
    ///
    /// An integer field only takes integer increments.
    pub fn set_add(self, value: impl Into<Value>) -> Result<UpdateFragment> {
        let value = value.into();
        match value {
            Value::Integer(_) | Value::Float(_) | Value::Decimal(_) => {}
            other => return Err(Error::type_invalid(other.class(), "{Integer, Float, Decimal}")),
        }
        let admitted = self
            .target
            .alternatives()
            .into_iter()
            .any(|alternative| match alternative.kind() {
                FieldKind::Any | FieldKind::Map => true,
                FieldKind::Scalar(kind) if kind.is_numeric() => check_scalar(*kind, &value).is_ok(),
                _ => false,
            });
        if !admitted {
            return Err(Error::type_invalid(
                value.class(),
                ValueClasses(resolver::classify(&self.target)),
            ));
        }
        let wire = codec::to_wire(&value)?;
        Ok(self.fragment(Verb::Set, Operand::Increment, wire))
    }

    /// Append a list to a list field, or union a set into a set field.
    ///
    /// Set unions go out as `ADD` with a native set value. Byte sets are
    /// stored as lists of binaries, so a byte-set union only applies to an
    /// attribute written natively by some other client; against an attribute
    /// stored through [`mapper::serialize`](crate::mapper::serialize) the store
    /// rejects it. Assign the whole set with [`PathExpr::set`] instead.
    pub fn set_append(self, value: impl Into<Value>) -> Result<UpdateFragment> {
        let value = value.into();
        let expected = || Error::type_invalid(value.class(), ValueClasses(resolver::classify(&self.target)));
        match &value {
            Value::List(items) => {
                let element = self.collection_element(false).ok_or_else(expected)?;
                for item in items {
                    type_check(item, &element)?;
                }
                let wire = codec::to_wire(&value)?;
                Ok(self.fragment(Verb::Set, Operand::ListAppend, wire))
            }
            Value::Set(items) | Value::FrozenSet(items) => {
                let element = self.collection_element(true).ok_or_else(expected)?;
                for item in items {
                    type_check(item, &element)?;
                }
                let wire = codec::set_to_native_wire(items)?;
                Ok(self.fragment(Verb::Add, Operand::SetUnion, wire))
            }
            _ => Err(expected()),
        }
    }

    fn collection_element(&self, unique: bool) -> Option<FieldType> {
        if self.is_untyped() {
            return Some(FieldType::any());
        }
        self.target
            .alternatives()
            .into_iter()
            .find_map(|alternative| match alternative.kind() {
                FieldKind::Collection { kind, element } if kind.is_unique() == unique => {
                    Some(element.as_ref().clone())
                }
                _ => None,
            })
    }
}

fn placeholder(key: &str) -> String {
    format!(":{}", common::sanitize(key))
}

enum Mismatch {
    Class,
    Format(&'static str),
    Element(Error),
}

/// Check that `value` is assignable to `field_type`.
pub(crate) fn type_check(value: &Value, field_type: &FieldType) -> Result<()> {
    let mut format_error = None;
    let mut element_error = None;
    for alternative in field_type.alternatives() {
        match check_alternative(value, alternative) {
            Ok(()) => return Ok(()),
            Err(Mismatch::Format(format)) => {
                format_error.get_or_insert(format);
            }
            Err(Mismatch::Element(error)) => {
                element_error.get_or_insert(error);
            }
            Err(Mismatch::Class) => {}
        }
    }
    let expected = ValueClasses(resolver::classify(field_type));
    if let Some(format) = format_error {
        return Err(Error::type_invalid(format, expected));
    }
    if let Some(error) = element_error {
        return Err(error);
    }
    Err(Error::type_invalid(value.class(), expected))
}

fn check_alternative(value: &Value, field_type: &FieldType) -> Result<(), Mismatch> {
    if value.is_null() {
        return Err(Mismatch::Class);
    }
    match (field_type.kind(), value) {
        (FieldKind::Any | FieldKind::Map, _) => Ok(()),
        (FieldKind::Scalar(kind), _) => check_scalar(*kind, value),
        (FieldKind::Collection { kind, element }, Value::List(items) | Value::Tuple(items))
            if !kind.is_unique() =>
        {
            check_elements(items, element)
        }
        (FieldKind::Collection { kind, element }, Value::Set(items) | Value::FrozenSet(items))
            if kind.is_unique() =>
        {
            check_elements(items, element)
        }
        (FieldKind::Nested(record_type), Value::Record(record))
            if record.record_type().name() == record_type.name() =>
        {
            Ok(())
        }
        _ => Err(Mismatch::Class),
    }
}

fn check_elements(items: &[Value], element: &FieldType) -> Result<(), Mismatch> {
    items
        .iter()
        .try_for_each(|item| type_check(item, element))
        .map_err(Mismatch::Element)
}

fn check_scalar(kind: ScalarKind, value: &Value) -> Result<(), Mismatch> {
    let accepted = match (kind, value) {
        (ScalarKind::String, Value::String(_)) => true,
        (ScalarKind::Integer, Value::Integer(_)) => true,
        (
            ScalarKind::Float | ScalarKind::Decimal,
            Value::Integer(_) | Value::Float(_) | Value::Decimal(_),
        ) => true,
        (ScalarKind::Boolean, Value::Boolean(_)) => true,
        (ScalarKind::Bytes, Value::Bytes(_)) => true,
        (ScalarKind::DateTime, Value::DateTime(_)) => true,
        (ScalarKind::Date, Value::Date(_)) => true,
        (ScalarKind::Time, Value::Time(_)) => true,
        (ScalarKind::DateTime, Value::String(text)) => {
            return codec::parse_datetime(text).map(|_| ()).ok_or(Mismatch::Format("date-time"));
        }
        (ScalarKind::Date, Value::String(text)) => {
            return codec::parse_date(text).map(|_| ()).ok_or(Mismatch::Format("date"));
        }
        (ScalarKind::Time, Value::String(text)) => {
            return codec::parse_time(text).map(|_| ()).ok_or(Mismatch::Format("time"));
        }
        _ => false,
    };
    if accepted { Ok(()) } else { Err(Mismatch::Class) }
}

/// One compiled single-field update action.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateFragment {
    verb: Verb,
    path: String,
    operand: Operand,
    placeholder: String,
    value: types::AttributeValue,
}

impl UpdateFragment {
    /// Action keyword.
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Compiled attribute path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Value placeholder, e.g. `:my_int`.
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Wire value bound to the placeholder.
    pub fn value(&self) -> &types::AttributeValue {
        &self.value
    }

    fn body(&self, placeholder: &str) -> String {
        let path = &self.path;
        match self.operand {
            Operand::Assign => format!("{path} = {placeholder}"),
            Operand::Increment => format!("{path} = {path} + {placeholder}"),
            Operand::ListAppend => format!("{path} = list_append({path}, {placeholder})"),
            Operand::SetUnion => format!("{path} {placeholder}"),
        }
    }

    /// Action text without the verb, e.g. `my_int = my_int + :my_int`.
    pub fn operand(&self) -> String {
        self.body(&self.placeholder)
    }

    /// Full update expression for this fragment alone.
    pub fn update_expression(&self) -> String {
        format!("{} {}", self.verb, self.operand())
    }

    /// Placeholder bindings of this fragment.
    pub fn expression_attribute_values(&self) -> collections::HashMap<String, types::AttributeValue> {
        collections::HashMap::from([(self.placeholder.clone(), self.value.clone())])
    }
}

/// Several fragments sharing one verb, ready to send as one update.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedUpdate {
    verb: Verb,
    operands: Vec<String>,
    expression_attribute_values: collections::HashMap<String, types::AttributeValue>,
}

impl MergedUpdate {
    /// Shared verb.
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// One operand per fragment, in order.
    pub fn operands(&self) -> &[String] {
        &self.operands
    }

    /// `VERB a, b, ...`
    pub fn update_expression(&self) -> String {
        format!("{} {}", self.verb, self.operands.join(", "))
    }

    /// Every placeholder binding.
    pub fn expression_attribute_values(&self) -> &collections::HashMap<String, types::AttributeValue> {
        &self.expression_attribute_values
    }
}

impl From<MergedUpdate> for common::ExpressionInput {
    fn from(update: MergedUpdate) -> Self {
        Self {
            expression: update.update_expression(),
            expression_attribute_names: collections::HashMap::new(),
            expression_attribute_values: update.expression_attribute_values,
        }
    }
}

/// Merge fragments into one update.
///
/// Every fragment must use the same verb. Placeholders that collide are
/// renamed `:key_1`, `:key_2`, ...
pub fn merge_update_fragments(fragments: Vec<UpdateFragment>) -> Result<MergedUpdate> {
    let Some(verb) = fragments.first().map(UpdateFragment::verb) else {
        return Err(Error::EmptyUpdate);
    };
    let mut operands = Vec::with_capacity(fragments.len());
    let mut expression_attribute_values = collections::HashMap::with_capacity(fragments.len());
    for fragment in fragments {
        if fragment.verb != verb {
            return Err(Error::UpdateConflict {
                expected: verb.to_string(),
                found: fragment.verb.to_string(),
            });
        }
        let mut placeholder = fragment.placeholder.clone();
        let mut suffix = 0;
        while expression_attribute_values.contains_key(&placeholder) {
            suffix += 1;
            placeholder = format!("{}_{suffix}", fragment.placeholder);
        }
        operands.push(fragment.body(&placeholder));
        expression_attribute_values.insert(placeholder, fragment.value);
    }
    Ok(MergedUpdate {
        verb,
        operands,
        expression_attribute_values,
    })
}
