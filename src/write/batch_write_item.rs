use crate::{
    common,
    error::{Error, Result},
    mapper,
    model::{
        record::{Record, RecordType},
        value::Value,
    },
};

use aws_sdk_dynamodb::{Client, operation, types};
use std::{collections, sync::Arc};

/// Requests sent per call.
pub const BATCH_WRITE_CHUNK_SIZE: usize = 25;

/// A single request within a batch write operation.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchWriteItemRequest {
    /// Create or replace a record.
    PutItem(Record),
    /// Remove a record by key.
    DeleteItem {
        /// Type of the record to delete.
        record_type: Arc<RecordType>,
        /// Hash key value.
        hash_key: Value,
        /// Range key value, for composite keys.
        range_key: Option<Value>,
    },
}

impl BatchWriteItemRequest {
    /// Delete the stored copy of `record`.
    pub fn delete_record(record: &Record) -> Result<Self> {
        let (hash_key, range_key) = mapper::key_values(record)?;
        Ok(Self::DeleteItem {
            record_type: Arc::clone(record.record_type()),
            hash_key,
            range_key,
        })
    }
}

impl TryFrom<BatchWriteItemRequest> for (String, types::WriteRequest) {
    type Error = Error;

    fn try_from(write_request: BatchWriteItemRequest) -> Result<Self> {
        let (table_name, builder) = match write_request {
            BatchWriteItemRequest::PutItem(record) => {
                let item = mapper::serialize(&record)?;
                let put_request = types::PutRequest::builder().set_item(Some(item)).build()?;
                (
                    record.record_type().table_name()?.to_string(),
                    types::WriteRequest::builder().set_put_request(Some(put_request)),
                )
            }
            BatchWriteItemRequest::DeleteItem {
                record_type,
                hash_key,
                range_key,
            } => {
                let keys = mapper::key(&record_type, hash_key, range_key)?;
                let delete_request = types::DeleteRequest::builder().set_key(Some(keys)).build()?;
                (
                    record_type.table_name()?.to_string(),
                    types::WriteRequest::builder().set_delete_request(Some(delete_request)),
                )
            }
        };
        Ok((table_name, builder.build()))
    }
}

/// Write many records, possibly across tables, in chunks of
/// [`BATCH_WRITE_CHUNK_SIZE`] requests.
///
/// Requests the store leaves unprocessed are sent again, for at most
/// [`BATCH_MAX_ROUNDS`](common::BATCH_MAX_ROUNDS) rounds per chunk.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_model::{
///     model::{field::FieldType, record::{Record, RecordType}},
///     write::batch_write_item::{BatchWriteItem, BatchWriteItemRequest},
/// };
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let users = RecordType::builder("User")
///     .table_name("users")
///     .hash_key("id")
///     .field("id", FieldType::string())
///     .build()?;
/// let batch_write = BatchWriteItem {
///     requests: vec![
///         BatchWriteItemRequest::PutItem(Record::new(&users).with("id", "1")?),
///         BatchWriteItemRequest::DeleteItem {
///             record_type: users.clone(),
///             hash_key: "2".into(),
///             range_key: None,
///         },
///     ],
///     ..Default::default()
/// };
/// batch_write.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchWriteItem {
    /// Puts and deletes, in any mix of tables.
    pub requests: Vec<BatchWriteItemRequest>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Whether to return item collection metrics.
    pub return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
}

impl TryFrom<BatchWriteItem> for Vec<operation::batch_write_item::BatchWriteItemInput> {
    type Error = Error;

    fn try_from(batch_write_item: BatchWriteItem) -> Result<Self> {
        let requests = batch_write_item
            .requests
            .into_iter()
            .map(<(String, types::WriteRequest)>::try_from)
            .collect::<Result<Vec<_>>>()?;
        requests
            .chunks(BATCH_WRITE_CHUNK_SIZE)
            .map(|chunk| -> Result<_> {
                let mut request_items: collections::HashMap<String, Vec<types::WriteRequest>> =
                    collections::HashMap::new();
                for (table_name, request) in chunk {
                    request_items
                        .entry(table_name.clone())
                        .or_default()
                        .push(request.clone());
                }
                let input = operation::batch_write_item::BatchWriteItemInput::builder()
                    .set_request_items(Some(request_items))
                    .set_return_consumed_capacity(batch_write_item.return_consumed_capacity.clone())
                    .set_return_item_collection_metrics(
                        batch_write_item.return_item_collection_metrics.clone(),
                    )
                    .build()?;
                Ok(input)
            })
            .collect()
    }
}

impl BatchWriteItem {
    /// Execute every chunk, re-sending unprocessed requests a bounded number of times.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.batch_write_item", skip(client), err)
    )]
    pub async fn send(self, client: &Client) -> Result<()> {
        let inputs: Vec<operation::batch_write_item::BatchWriteItemInput> = self.try_into()?;
        for input in inputs {
            let mut request_items = input.request_items;
            let mut round = 0;
            while let Some(requests) = request_items.take().filter(|requests| !requests.is_empty()) {
                common::check_batch_round(round, requests.values().map(Vec::len).sum())?;
                round += 1;
                let output = client
                    .batch_write_item()
                    .set_request_items(Some(requests))
                    .set_return_consumed_capacity(input.return_consumed_capacity.clone())
                    .set_return_item_collection_metrics(
                        input.return_item_collection_metrics.clone(),
                    )
                    .send()
                    .await
                    .map_err(|error| Error::BatchWrite(Box::new(error.into())))?;
                request_items = output.unprocessed_items;
            }
        }
        Ok(())
    }
}
