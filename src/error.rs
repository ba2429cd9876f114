use aws_sdk_dynamodb::error::BuildError;
use std::{fmt, result};

/// Result alias used across the crate.
pub type Result<T, E = Error> = result::Result<T, E>;

/// A required attribute resolved to an absent value.
///
/// The path starts at the offending field and grows leftwards as the error
/// bubbles out of nested records.
///
/// ```rust
/// use dynamodb_model::error::AttributeNullError;
///
/// let mut error = AttributeNullError::new("sample_field");
/// error.prepend_path("my_nested_model");
/// assert_eq!(error.path(), "my_nested_model.sample_field");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeNullError {
    path: String,
}

impl AttributeNullError {
    /// Create an error for the given attribute name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { path: name.into() }
    }

    /// Dotted path of the absent attribute.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Prefix the path with a parent attribute name.
    pub fn prepend_path(&mut self, name: &str) {
        self.path = format!("{name}.{}", self.path);
    }
}

impl fmt::Display for AttributeNullError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute '{}' cannot be None", self.path)
    }
}

impl std::error::Error for AttributeNullError {}

/// Why one item of a multi-item transaction was cancelled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CancellationReason {
    /// Cancellation code reported by the store (e.g. `ConditionalCheckFailed`).
    pub code: String,
    /// Optional human-readable message.
    pub message: Option<String>,
}

/// Crate error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A path step or field name does not resolve against the declared shape.
    #[error("Attribute: [{0}] not allowed.")]
    AttributeInvalid(String),

    /// A value is not assignable to the resolved field type.
    #[error("{found} input not compatible with {expected}")]
    AttributeTypeInvalid {
        /// Runtime class (or sub-format) of the offending value.
        found: String,
        /// Admissible classes of the target.
        expected: String,
    },

    /// A wire value cannot be mapped to any admissible class.
    #[error("Cannot deserialize '{name}' attribute from type: {wire_type}")]
    AttributeDeserialization {
        /// Attribute name.
        name: String,
        /// Wire tag of the offending value.
        wire_type: String,
    },

    /// A required attribute is absent.
    #[error(transparent)]
    AttributeNull(#[from] AttributeNullError),

    /// Update fragments with different verbs were merged into one update.
    #[error("All actions must be the same. {found} != {expected}")]
    UpdateConflict {
        /// Verb of the first fragment.
        expected: String,
        /// Verb of the conflicting fragment.
        found: String,
    },

    /// An update was requested without any fragment.
    #[error("Update requires at least one action")]
    EmptyUpdate,

    /// The operation was configured inconsistently with the record type.
    #[error("Operation in invalid state: {0}")]
    InvalidState(String),

    /// The requested item is not in the table.
    #[error("Item does not exist")]
    DoesNotExist,

    /// Put failed.
    #[error("Error putting item: {0}")]
    Put(#[source] Box<aws_sdk_dynamodb::Error>),

    /// Get failed.
    #[error("Error getting item: {0}")]
    Get(#[source] Box<aws_sdk_dynamodb::Error>),

    /// Update failed, including failed preconditions.
    #[error("Error updating item: {0}")]
    Update(#[source] Box<aws_sdk_dynamodb::Error>),

    /// Delete failed.
    #[error("Error deleting item: {0}")]
    Delete(#[source] Box<aws_sdk_dynamodb::Error>),

    /// Query failed.
    #[error("Error performing query: {0}")]
    Query(#[source] Box<aws_sdk_dynamodb::Error>),

    /// Scan failed.
    #[error("Error performing scan: {0}")]
    Scan(#[source] Box<aws_sdk_dynamodb::Error>),

    /// A table lifecycle operation failed.
    #[error("Error performing a table operation: {0}")]
    Table(#[source] Box<aws_sdk_dynamodb::Error>),

    /// Batch get failed.
    #[error("Error performing batch get: {0}")]
    BatchGet(#[source] Box<aws_sdk_dynamodb::Error>),

    /// Batch write failed.
    #[error("Error performing batch write: {0}")]
    BatchWrite(#[source] Box<aws_sdk_dynamodb::Error>),

    /// A batch still had unprocessed requests after its last round.
    #[error("{remaining} requests still unprocessed after {rounds} rounds")]
    Unprocessed {
        /// Rounds sent.
        rounds: usize,
        /// Keys or write requests left.
        remaining: usize,
    },

    /// Transactional get failed.
    #[error("Error performing transact get: {source}")]
    TransactGet {
        /// Store error.
        #[source]
        source: Box<aws_sdk_dynamodb::Error>,
        /// One entry per submitted item, `None` where the item was not a reason.
        cancellation_reasons: Vec<Option<CancellationReason>>,
    },

    /// Transactional write failed.
    #[error("Error performing transact write: {source}")]
    TransactWrite {
        /// Store error.
        #[source]
        source: Box<aws_sdk_dynamodb::Error>,
        /// One entry per submitted item, `None` where the item was not a reason.
        cancellation_reasons: Vec<Option<CancellationReason>>,
    },

    /// A request could not be built.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A raw item could not be converted by serde.
    #[error(transparent)]
    Serde(#[from] serde_dynamo::Error),
}

impl Error {
    pub(crate) fn type_invalid(found: impl fmt::Display, expected: impl fmt::Display) -> Self {
        Self::AttributeTypeInvalid {
            found: found.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Cancellation reasons of a transactional failure, empty for anything else.
    pub fn cancellation_reasons(&self) -> &[Option<CancellationReason>] {
        match self {
            Self::TransactGet {
                cancellation_reasons,
                ..
            }
            | Self::TransactWrite {
                cancellation_reasons,
                ..
            } => cancellation_reasons,
            _ => &[],
        }
    }

    /// Code of the underlying store error, when there is one.
    pub fn cause_code(&self) -> Option<&str> {
        use aws_sdk_dynamodb::error::ProvideErrorMetadata;

        match self {
            Self::Put(source)
            | Self::Get(source)
            | Self::Update(source)
            | Self::Delete(source)
            | Self::Query(source)
            | Self::Scan(source)
            | Self::Table(source)
            | Self::BatchGet(source)
            | Self::BatchWrite(source)
            | Self::TransactGet { source, .. }
            | Self::TransactWrite { source, .. } => source.code(),
            _ => None,
        }
    }
}

/// Collect the positional cancellation reasons of a cancelled transaction.
///
/// The store reports `"None"` for items that did not cause the cancellation.
pub(crate) fn cancellation_reasons(error: &aws_sdk_dynamodb::Error) -> Vec<Option<CancellationReason>> {
    match error {
        aws_sdk_dynamodb::Error::TransactionCanceledException(cancelled) => cancelled
            .cancellation_reasons()
            .iter()
            .map(|reason| match reason.code() {
                None | Some("None") => None,
                Some(code) => Some(CancellationReason {
                    code: code.to_string(),
                    message: reason.message().map(str::to_string),
                }),
            })
            .collect(),
        _ => Vec::new(),
    }
}
