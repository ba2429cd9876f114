use crate::{codec, common::Item, error::Result, model::value::Value};

/// Key component.
///
/// ```rust
/// use dynamodb_model::common::key::Key;
///
/// let key = Key::new("id", "1");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Key {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: Value,
}

impl Key {
    /// Key component from anything convertible to a value.
    pub fn new(name: &str, value: impl Into<Value>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Primary key: partition key and optional sort key.
///
/// ```rust
/// use dynamodb_model::common::key::{Key, Keys};
///
/// let keys = Keys {
///     partition_key: Key::new("id", "1"),
///     sort_key: Some(Key::new("created", 10)),
/// };
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Keys {
    /// Partition (hash) key.
    pub partition_key: Key,
    /// Sort (range) key, for composite primary keys.
    pub sort_key: Option<Key>,
}

impl TryFrom<Keys> for Item {
    type Error = crate::error::Error;

    fn try_from(keys: Keys) -> Result<Self> {
        let partition_key_value = codec::to_wire(&keys.partition_key.value)?;
        let mut item = Self::from([(keys.partition_key.name, partition_key_value)]);
        if let Some(sort_key) = keys.sort_key {
            let sort_key_value = codec::to_wire(&sort_key.value)?;
            item.insert(sort_key.name, sort_key_value);
        }
        Ok(item)
    }
}
