use crate::model::record::RecordType;

use std::{fmt, sync::Arc};

/// Scalar kinds a field can be declared with.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ScalarKind {
    /// UTF-8 text.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// Binary floating point, persisted with 10 fractional digits at most.
    Float,
    /// Exact decimal.
    Decimal,
    /// Boolean.
    Boolean,
    /// Byte sequence.
    Bytes,
    /// Naive date and time.
    DateTime,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
}

impl ScalarKind {
    /// Whether the kind is one of the numeric kinds.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Decimal)
    }
}

/// Collection flavours.
///
/// Tuples and frozen sets persist exactly like lists and sets; the flavour is
/// only used to rebuild the same container on the way back.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum CollectionKind {
    /// Ordered, duplicates allowed.
    List,
    /// Fixed ordered sequence.
    Tuple,
    /// Unique elements.
    Set,
    /// Immutable unique elements.
    FrozenSet,
}

impl CollectionKind {
    /// Whether elements are unique (set-like).
    pub fn is_unique(self) -> bool {
        matches!(self, Self::Set | Self::FrozenSet)
    }
}

/// Shape of a declared field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    /// Untyped; classification falls back to the runtime value.
    Any,
    /// Scalar value.
    Scalar(ScalarKind),
    /// Homogeneous collection.
    Collection {
        /// Collection flavour.
        kind: CollectionKind,
        /// Element type.
        element: Box<FieldType>,
    },
    /// String-keyed map of untyped values.
    Map,
    /// Nested record.
    Nested(Arc<RecordType>),
    /// Ordered alternatives; the first one that fits wins.
    Union(Vec<FieldType>),
}

/// Declared type of one field.
///
/// ```rust
/// use dynamodb_model::model::field::FieldType;
///
/// let tags = FieldType::set(FieldType::string()).optional();
/// assert!(!tags.is_required());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct FieldType {
    kind: FieldKind,
    required: bool,
}

impl FieldType {
    /// Required field of the given kind.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: true,
        }
    }

    fn scalar(kind: ScalarKind) -> Self {
        Self::new(FieldKind::Scalar(kind))
    }

    fn collection(kind: CollectionKind, element: FieldType) -> Self {
        Self::new(FieldKind::Collection {
            kind,
            element: Box::new(element),
        })
    }

    /// String field.
    pub fn string() -> Self {
        Self::scalar(ScalarKind::String)
    }

    /// Integer field.
    pub fn integer() -> Self {
        Self::scalar(ScalarKind::Integer)
    }

    /// Float field.
    pub fn float() -> Self {
        Self::scalar(ScalarKind::Float)
    }

    /// Exact decimal field.
    pub fn decimal() -> Self {
        Self::scalar(ScalarKind::Decimal)
    }

    /// Boolean field.
    pub fn boolean() -> Self {
        Self::scalar(ScalarKind::Boolean)
    }

    /// Byte sequence field.
    pub fn bytes() -> Self {
        Self::scalar(ScalarKind::Bytes)
    }

    /// Date-time field.
    pub fn datetime() -> Self {
        Self::scalar(ScalarKind::DateTime)
    }

    /// Date field.
    pub fn date() -> Self {
        Self::scalar(ScalarKind::Date)
    }

    /// Time field.
    pub fn time() -> Self {
        Self::scalar(ScalarKind::Time)
    }

    /// List of `element`.
    pub fn list(element: FieldType) -> Self {
        Self::collection(CollectionKind::List, element)
    }

    /// Tuple of `element`.
    pub fn tuple(element: FieldType) -> Self {
        Self::collection(CollectionKind::Tuple, element)
    }

    /// Set of `element`.
    pub fn set(element: FieldType) -> Self {
        Self::collection(CollectionKind::Set, element)
    }

    /// Frozen set of `element`.
    pub fn frozen_set(element: FieldType) -> Self {
        Self::collection(CollectionKind::FrozenSet, element)
    }

    /// Untyped map.
    pub fn map() -> Self {
        Self::new(FieldKind::Map)
    }

    /// Nested record of the given type.
    pub fn nested(record_type: &Arc<RecordType>) -> Self {
        Self::new(FieldKind::Nested(Arc::clone(record_type)))
    }

    /// Fully dynamic field.
    pub fn any() -> Self {
        Self::new(FieldKind::Any)
    }

    /// Union of alternatives.
    pub fn union(alternatives: Vec<FieldType>) -> Self {
        Self::new(FieldKind::Union(alternatives))
    }

    /// Mark the field optional: absent when unset.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Field kind.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether the field must be present.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Visit this type and, through unions, every alternative.
    pub(crate) fn alternatives(&self) -> Vec<&FieldType> {
        match &self.kind {
            FieldKind::Union(alternatives) => alternatives
                .iter()
                .flat_map(FieldType::alternatives)
                .collect(),
            _ => vec![self],
        }
    }

    /// First nested record type reachable through unions.
    pub(crate) fn nested_record(&self) -> Option<&Arc<RecordType>> {
        self.alternatives()
            .into_iter()
            .find_map(|alternative| match &alternative.kind {
                FieldKind::Nested(record_type) => Some(record_type),
                _ => None,
            })
    }

    /// First collection reachable through unions.
    pub(crate) fn collection_alternative(&self) -> Option<(CollectionKind, &FieldType)> {
        self.alternatives()
            .into_iter()
            .find_map(|alternative| match &alternative.kind {
                FieldKind::Collection { kind, element } => Some((*kind, element.as_ref())),
                _ => None,
            })
    }

    /// Whether a collection alternative matches `predicate`.
    pub(crate) fn admits_collection(&self, predicate: impl Fn(CollectionKind) -> bool) -> bool {
        self.alternatives().into_iter().any(|alternative| {
            matches!(&alternative.kind, FieldKind::Collection { kind, .. } if predicate(*kind))
        })
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Decimal => "Decimal",
            Self::Boolean => "Boolean",
            Self::Bytes => "Bytes",
            Self::DateTime => "DateTime",
            Self::Date => "Date",
            Self::Time => "Time",
        };
        f.write_str(name)
    }
}
