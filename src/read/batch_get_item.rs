use crate::{
    common::{self, Item},
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
use std::{collections, sync::Arc};

/// Keys sent per request.
pub const BATCH_GET_CHUNK_SIZE: usize = 25;

/// Get many records of one type by key, in chunks of
/// [`BATCH_GET_CHUNK_SIZE`].
///
/// Keys the store leaves unprocessed are sent again, for at most
/// [`BATCH_MAX_ROUNDS`](common::BATCH_MAX_ROUNDS) rounds per chunk.
/// Results are not in key order.
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
/// let batch_get = read::batch_get_item::BatchGetItem {
///     keys: vec![("1".into(), None), ("2".into(), None)],
///     ..read::batch_get_item::BatchGetItem::new(&users)
/// };
/// let found = batch_get.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BatchGetItem {
    /// Type of the records to read.
    pub record_type: Arc<RecordType>,
    /// Hash and optional range key values.
    pub keys: Vec<(Value, Option<Value>)>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Consistency and projection, shared by every key.
    pub single_read_args: read::common::SingleReadArgs,
}

impl BatchGetItem {
    /// Empty batch for `record_type`.
    pub fn new(record_type: &Arc<RecordType>) -> Self {
        Self {
            record_type: Arc::clone(record_type),
            keys: Vec::new(),
            return_consumed_capacity: None,
            single_read_args: read::common::SingleReadArgs::default(),
        }
    }
}

impl TryFrom<BatchGetItem> for Vec<operation::batch_get_item::BatchGetItemInput> {
    type Error = Error;

    fn try_from(batch_get_item: BatchGetItem) -> Result<Self> {
        let record_type = &batch_get_item.record_type;
        let single_operation = read::common::SingleReadInput::new(
            batch_get_item.single_read_args,
            record_type.table_name()?,
        );
        let keys = batch_get_item
            .keys
            .into_iter()
            .map(|(hash, range)| mapper::key(record_type, hash, range))
            .collect::<Result<Vec<Item>>>()?;
        keys.chunks(BATCH_GET_CHUNK_SIZE)
            .map(|chunk| -> Result<_> {
                let keys_and_attributes = types::KeysAndAttributes::builder()
                    .set_consistent_read(single_operation.consistent_read)
                    .set_expression_attribute_names(
                        single_operation.expression_attribute_names.clone(),
                    )
                    .set_keys(Some(chunk.to_vec()))
                    .set_projection_expression(single_operation.projection_expression.clone())
                    .build()?;
                let input = operation::batch_get_item::BatchGetItemInput::builder()
                    .set_request_items(Some(collections::HashMap::from([(
                        single_operation.table_name.clone(),
                        keys_and_attributes,
                    )])))
                    .set_return_consumed_capacity(batch_get_item.return_consumed_capacity.clone())
                    .build()?;
                Ok(input)
            })
            .collect()
    }
}

impl BatchGetItem {
    /// Execute every chunk and return the raw items.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.batch_get_item", skip(client), err)
    )]
    pub async fn send_items(self, client: &Client) -> Result<Vec<Item>> {
        let inputs: Vec<operation::batch_get_item::BatchGetItemInput> = self.try_into()?;
        let mut items = Vec::new();
        for input in inputs {
            let mut request_items = input.request_items;
            let mut round = 0;
            while let Some(requests) = request_items.take().filter(|requests| !requests.is_empty()) {
                let remaining: usize = requests.values().map(|keys| keys.keys().len()).sum();
                common::check_batch_round(round, remaining)?;
                round += 1;
                let output = client
                    .batch_get_item()
                    .set_request_items(Some(requests))
                    .set_return_consumed_capacity(input.return_consumed_capacity.clone())
                    .send()
                    .await
                    .map_err(|error| Error::BatchGet(Box::new(error.into())))?;
                if let Some(responses) = output.responses {
                    items.extend(responses.into_values().flatten());
                }
                request_items = output.unprocessed_keys;
            }
        }
        Ok(items)
    }

    /// Records found; missing keys are skipped.
    pub async fn send(self, client: &Client) -> Result<Vec<Record>> {
        let record_type = Arc::clone(&self.record_type);
        let items = self.send_items(client).await?;
        Ok(read::common::into_records(&record_type, items))
    }

    /// Raw items found, deserialized into any type.
    pub async fn send_as<T: DeserializeOwned>(self, client: &Client) -> Result<Vec<T>> {
        let items = self.send_items(client).await?;
        Ok(serde_dynamo::from_items(items)?)
    }
}
