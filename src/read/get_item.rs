use crate::{
    common::Item,
    error::{Error, Result},
    mapper,
    model::{
        record::{Record, RecordType},
        value::Value,
    },
    read,
};

use aws_sdk_dynamodb::{Client, operation, types};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// get item operation
#[derive(Clone, Debug, Default, PartialEq)]
struct GetItemInput {
    keys: Item,
    return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    single_read_operation: read::common::SingleReadInput,
}

/// Get one record by primary key.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_model::{
///     model::{field::FieldType, record::RecordType},
///     read,
/// };
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let users = RecordType::builder("User")
///     .table_name("users")
///     .hash_key("id")
///     .field("id", FieldType::string())
///     .build()?;
/// let user = read::get_item::GetItem::new(&users, "1").send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct GetItem {
    /// Type of the record to read.
    pub record_type: Arc<RecordType>,
    /// Hash key value.
    pub hash_key: Value,
    /// Range key value, for composite keys.
    pub range_key: Option<Value>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Consistency and projection.
    pub single_read_args: read::common::SingleReadArgs,
}

impl GetItem {
    /// Get by hash key.
    pub fn new(record_type: &Arc<RecordType>, hash_key: impl Into<Value>) -> Self {
        Self {
            record_type: Arc::clone(record_type),
            hash_key: hash_key.into(),
            range_key: None,
            return_consumed_capacity: None,
            single_read_args: read::common::SingleReadArgs::default(),
        }
    }

    /// Set the range key value.
    pub fn range_key(mut self, range_key: impl Into<Value>) -> Self {
        self.range_key = Some(range_key.into());
        self
    }
}

impl TryFrom<GetItem> for GetItemInput {
    type Error = Error;

    fn try_from(get_item: GetItem) -> Result<Self> {
        let keys = mapper::key(&get_item.record_type, get_item.hash_key, get_item.range_key)?;
        let single_read_operation = read::common::SingleReadInput::new(
            get_item.single_read_args,
            get_item.record_type.table_name()?,
        );
        let operation = Self {
            keys,
            return_consumed_capacity: get_item.return_consumed_capacity,
            single_read_operation,
        };
        Ok(operation)
    }
}

impl GetItem {
    /// Execute the get item operation and return the raw output.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.get_item", skip(client), err)
    )]
    pub async fn send_output(self, client: &Client) -> Result<operation::get_item::GetItemOutput> {
        let get_item: GetItemInput = self.try_into()?;
        let builder = client
            .get_item()
            .set_key(Some(get_item.keys))
            .set_return_consumed_capacity(get_item.return_consumed_capacity);
        crate::apply_single_read_operation!(builder, get_item.single_read_operation)
            .send()
            .await
            .map_err(|error| Error::Get(Box::new(error.into())))
    }

    async fn send_item(self, client: &Client) -> Result<Item> {
        self.send_output(client)
            .await?
            .item
            .ok_or(Error::DoesNotExist)
    }

    /// Fetch the record; a missing item is [`Error::DoesNotExist`].
    pub async fn send(self, client: &Client) -> Result<Record> {
        let record_type = Arc::clone(&self.record_type);
        let item = self.send_item(client).await?;
        Ok(mapper::deserialize(&record_type, &item).record)
    }

    /// Fetch the raw item into any deserializable type.
    pub async fn send_as<T: DeserializeOwned>(self, client: &Client) -> Result<T> {
        let item = self.send_item(client).await?;
        Ok(serde_dynamo::from_item(item)?)
    }
}
