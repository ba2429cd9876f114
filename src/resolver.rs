use crate::{
    error::Result,
    model::{
        field::{CollectionKind, FieldKind, FieldType, ScalarKind},
        record::RecordType,
        value::Value,
    },
};

use aws_sdk_dynamodb::types;
use std::{collections, fmt};

/// Runtime class a value can have.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ValueClass {
    /// Absent value.
    Null,
    /// Text.
    String,
    /// Integer.
    Integer,
    /// Binary float.
    Float,
    /// Exact decimal.
    Decimal,
    /// Boolean.
    Boolean,
    /// Byte sequence.
    Bytes,
    /// Date and time.
    DateTime,
    /// Date.
    Date,
    /// Time.
    Time,
    /// List marker.
    List,
    /// Tuple marker.
    Tuple,
    /// Set marker.
    Set,
    /// Frozen set marker.
    FrozenSet,
    /// Untyped map.
    Map,
    /// Nested record, by record type name.
    Record(String),
}

impl ValueClass {
    fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Decimal)
    }

    fn is_set_marker(&self) -> bool {
        matches!(self, Self::Set | Self::FrozenSet)
    }

    fn is_list_marker(&self) -> bool {
        matches!(self, Self::List | Self::Tuple)
    }

    fn is_map_marker(&self) -> bool {
        matches!(self, Self::Map | Self::Record(_))
    }
}

impl From<ScalarKind> for ValueClass {
    fn from(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::String => Self::String,
            ScalarKind::Integer => Self::Integer,
            ScalarKind::Float => Self::Float,
            ScalarKind::Decimal => Self::Decimal,
            ScalarKind::Boolean => Self::Boolean,
            ScalarKind::Bytes => Self::Bytes,
            ScalarKind::DateTime => Self::DateTime,
            ScalarKind::Date => Self::Date,
            ScalarKind::Time => Self::Time,
        }
    }
}

impl From<CollectionKind> for ValueClass {
    fn from(kind: CollectionKind) -> Self {
        match kind {
            CollectionKind::List => Self::List,
            CollectionKind::Tuple => Self::Tuple,
            CollectionKind::Set => Self::Set,
            CollectionKind::FrozenSet => Self::FrozenSet,
        }
    }
}

impl fmt::Display for ValueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "Null",
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Decimal => "Decimal",
            Self::Boolean => "Boolean",
            Self::Bytes => "Bytes",
            Self::DateTime => "DateTime",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::List => "List",
            Self::Tuple => "Tuple",
            Self::Set => "Set",
            Self::FrozenSet => "FrozenSet",
            Self::Map => "Map",
            Self::Record(name) => name,
        };
        f.write_str(name)
    }
}

/// Admissible classes of a field, rendered as `{A, B}`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ValueClasses(pub collections::BTreeSet<ValueClass>);

impl fmt::Display for ValueClasses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Store-level wire tag.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum WireType {
    /// String.
    S,
    /// Number.
    N,
    /// Binary.
    B,
    /// Boolean.
    Bool,
    /// List.
    L,
    /// Map.
    M,
    /// String set.
    Ss,
    /// Number set.
    Ns,
    /// Binary set.
    Bs,
}

impl WireType {
    /// Key attribute type, only for the scalar tags.
    pub fn scalar_attribute_type(self) -> Option<types::ScalarAttributeType> {
        match self {
            Self::S => Some(types::ScalarAttributeType::S),
            Self::N => Some(types::ScalarAttributeType::N),
            Self::B => Some(types::ScalarAttributeType::B),
            _ => None,
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
            Self::Bool => "BOOL",
            Self::L => "L",
            Self::M => "M",
            Self::Ss => "SS",
            Self::Ns => "NS",
            Self::Bs => "BS",
        };
        f.write_str(tag)
    }
}

/// Every class a value of `field_type` may have at runtime.
///
/// Collections contribute their marker and their element classes, so an
/// optional set of floats yields `{Float, Set}`. Untyped fields yield nothing.
pub fn classify(field_type: &FieldType) -> collections::BTreeSet<ValueClass> {
    let mut classes = collections::BTreeSet::new();
    collect(field_type, &mut classes);
    classes
}

fn collect(field_type: &FieldType, classes: &mut collections::BTreeSet<ValueClass>) {
    match field_type.kind() {
        FieldKind::Any => {}
        FieldKind::Scalar(kind) => {
            classes.insert((*kind).into());
        }
        FieldKind::Collection { kind, element } => {
            classes.insert((*kind).into());
            collect(element, classes);
        }
        FieldKind::Map => {
            classes.insert(ValueClass::Map);
        }
        FieldKind::Nested(record_type) => {
            classes.insert(ValueClass::Record(record_type.name().to_string()));
        }
        FieldKind::Union(alternatives) => {
            for alternative in alternatives {
                collect(alternative, classes);
            }
        }
    }
}

/// Like [`classify`], but untyped fields take the class of `value`.
pub fn classify_with(field_type: &FieldType, value: Option<&Value>) -> collections::BTreeSet<ValueClass> {
    let mut classes = classify(field_type);
    if let (FieldKind::Any, Some(value)) = (field_type.kind(), value) {
        classes.insert(value.class());
    }
    classes
}

/// Wire tag for a set of classes; the first matching rule wins.
pub fn wire_type_of(classes: &collections::BTreeSet<ValueClass>) -> WireType {
    let has = |predicate: fn(&ValueClass) -> bool| classes.iter().any(predicate);
    let is_set = has(ValueClass::is_set_marker);
    if is_set && classes.contains(&ValueClass::String) {
        WireType::Ss
    } else if is_set && classes.contains(&ValueClass::Bytes) {
        WireType::Bs
    } else if is_set && has(ValueClass::is_numeric) {
        WireType::Ns
    } else if has(ValueClass::is_list_marker) {
        WireType::L
    } else if has(ValueClass::is_map_marker) {
        WireType::M
    } else if has(ValueClass::is_numeric) {
        WireType::N
    } else if classes.contains(&ValueClass::Bytes) {
        WireType::B
    } else if classes.contains(&ValueClass::Boolean) {
        WireType::Bool
    } else {
        WireType::S
    }
}

/// Wire tag of a declared field type.
pub fn wire_type(field_type: &FieldType) -> WireType {
    wire_type_of(&classify(field_type))
}

/// Wire tag of a named field of `record_type`.
pub fn field_wire_type(record_type: &RecordType, name: &str) -> Result<WireType> {
    record_type.field(name).map(wire_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use std::sync::Arc;

    fn nested() -> Arc<RecordType> {
        RecordType::builder("Nested")
            .field("sample_field", FieldType::string())
            .build()
            .unwrap()
    }

    #[rstest]
    #[case::string(FieldType::string(), WireType::S)]
    #[case::integer(FieldType::integer(), WireType::N)]
    #[case::float(FieldType::float(), WireType::N)]
    #[case::decimal(FieldType::decimal(), WireType::N)]
    #[case::boolean(FieldType::boolean(), WireType::Bool)]
    #[case::bytes(FieldType::bytes(), WireType::B)]
    #[case::datetime(FieldType::datetime(), WireType::S)]
    #[case::date(FieldType::date(), WireType::S)]
    #[case::time(FieldType::time(), WireType::S)]
    #[case::string_set(FieldType::set(FieldType::string()), WireType::Ss)]
    #[case::frozen_string_set(FieldType::frozen_set(FieldType::string()), WireType::Ss)]
    #[case::bytes_set(FieldType::set(FieldType::bytes()), WireType::Bs)]
    #[case::float_set(FieldType::set(FieldType::float()).optional(), WireType::Ns)]
    #[case::list(FieldType::list(FieldType::integer()), WireType::L)]
    #[case::tuple(FieldType::tuple(FieldType::string()), WireType::L)]
    #[case::map(FieldType::map(), WireType::M)]
    #[case::nested(FieldType::nested(&nested()), WireType::M)]
    #[case::list_of_nested(FieldType::list(FieldType::nested(&nested())), WireType::L)]
    #[case::any(FieldType::any(), WireType::S)]
    #[case::union_numeric(
        FieldType::union(
            vec![
                FieldType::integer(),
                FieldType::float(),
            ]
        ),
        WireType::N
    )]
    fn test_wire_type(#[case] field_type: FieldType, #[case] expected: WireType) {
        assert_eq!(wire_type(&field_type), expected);
    }

    #[rstest]
    #[case::optional_float_set(
        FieldType::set(FieldType::float()).optional(),
        "{Float, Set}"
    )]
    #[case::union(
        FieldType::union(
            vec![
                FieldType::string(),
                FieldType::list(FieldType::integer()),
            ]
        ),
        "{String, Integer, List}"
    )]
    #[case::nested(FieldType::nested(&nested()), "{Nested}")]
    #[case::any(FieldType::any(), "{}")]
    fn test_classify(#[case] field_type: FieldType, #[case] expected: &str) {
        assert_eq!(ValueClasses(classify(&field_type)).to_string(), expected);
    }

    #[test]
    fn test_classify_with_any_uses_value() {
        let classes = classify_with(&FieldType::any(), Some(&Value::from(1.5)));
        assert_eq!(classes, collections::BTreeSet::from([ValueClass::Float]));
        let classes = classify_with(&FieldType::string(), Some(&Value::from(1.5)));
        assert_eq!(classes, collections::BTreeSet::from([ValueClass::String]));
    }

    #[test]
    fn test_field_wire_type_unknown_field() {
        let record_type = nested();
        let error = field_wire_type(&record_type, "doesNotExist").unwrap_err();
        assert_eq!(error.to_string(), "Attribute: [doesNotExist] not allowed.");
        assert_eq!(field_wire_type(&record_type, "sample_field").unwrap(), WireType::S);
    }
}
