use crate::{
    common::{self, condition::ConditionMap},
    error::{self, Error, Result},
    mapper,
    model::{record::RecordType, value::Value},
    read::transact_get_items::TRANSACT_ITEMS_LIMIT,
    write,
};

use aws_sdk_dynamodb::{Client, operation, types};
use std::sync::Arc;

/// A precondition on a record that is not itself written.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionCheck {
    /// Type of the record to check.
    pub record_type: Arc<RecordType>,
    /// Hash key value.
    pub hash_key: Value,
    /// Range key value, for composite keys.
    pub range_key: Option<Value>,
    /// Condition the stored record must satisfy.
    pub condition: ConditionMap,
}

impl TryFrom<ConditionCheck> for types::ConditionCheck {
    type Error = Error;

    fn try_from(condition_check: ConditionCheck) -> Result<Self> {
        let record_type = &condition_check.record_type;
        let keys = mapper::key(record_type, condition_check.hash_key, condition_check.range_key)?;
        let condition: common::ExpressionInput = condition_check.condition.try_into()?;
        let check = Self::builder()
            .set_key(Some(keys))
            .condition_expression(condition.expression)
            .set_expression_attribute_names(
                Some(condition.expression_attribute_names).filter(|names| !names.is_empty()),
            )
            .set_expression_attribute_values(
                Some(condition.expression_attribute_values).filter(|values| !values.is_empty()),
            )
            .table_name(record_type.table_name()?)
            .build()?;
        Ok(check)
    }
}

/// One action inside a write transaction.
#[derive(Clone, Debug, PartialEq)]
pub enum TransactWrite {
    /// Create or replace a record.
    Put(write::put_item::PutItem),
    /// Apply update fragments to a record.
    Update(write::update_item::UpdateItem),
    /// Delete a record.
    Delete(write::delete_item::DeleteItem),
    /// Require a condition on a record without writing it.
    ConditionCheck(ConditionCheck),
}

impl TryFrom<TransactWrite> for types::TransactWriteItem {
    type Error = Error;

    fn try_from(transact_write: TransactWrite) -> Result<Self> {
        let builder = Self::builder();
        let builder = match transact_write {
            TransactWrite::Put(put_item) => builder.put(put_item.try_into()?),
            TransactWrite::Update(update_item) => builder.update(update_item.try_into()?),
            TransactWrite::Delete(delete_item) => builder.delete(delete_item.try_into()?),
            TransactWrite::ConditionCheck(condition_check) => {
                builder.condition_check(condition_check.try_into()?)
            }
        };
        Ok(builder.build())
    }
}

/// Apply up to [`TRANSACT_ITEMS_LIMIT`] writes atomically.
///
/// When the store cancels the transaction the error carries one
/// cancellation reason per submitted action, in order.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_model::{
///     model::{field::FieldType, record::{Record, RecordType}},
///     write::{
///         delete_item::DeleteItem,
///         put_item::PutItem,
///         transact_write_items::{TransactWrite, TransactWriteItems},
///     },
/// };
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let users = RecordType::builder("User")
///     .table_name("users")
///     .hash_key("id")
///     .field("id", FieldType::string())
///     .build()?;
/// TransactWriteItems {
///     items: vec![
///         TransactWrite::Put(PutItem::new(Record::new(&users).with("id", "1")?)),
///         TransactWrite::Delete(DeleteItem::new(&users, "2")),
///     ],
///     ..Default::default()
/// }
/// .send(client)
/// .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransactWriteItems {
    /// Actions, applied all or none.
    pub items: Vec<TransactWrite>,
    /// Idempotency token for retried submissions.
    pub client_request_token: Option<String>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Whether to return item collection metrics.
    pub return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
}

impl TransactWriteItems {
    fn transact_items(&self) -> Result<Vec<types::TransactWriteItem>> {
        if self.items.len() > TRANSACT_ITEMS_LIMIT {
            return Err(Error::InvalidState(format!(
                "{} items exceed the transaction limit of {TRANSACT_ITEMS_LIMIT}",
                self.items.len()
            )));
        }
        self.items
            .iter()
            .cloned()
            .map(types::TransactWriteItem::try_from)
            .collect()
    }

    /// Execute the transaction.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.transact_write_items", skip(client), err)
    )]
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<operation::transact_write_items::TransactWriteItemsOutput> {
        let transact_items = self.transact_items()?;
        client
            .transact_write_items()
            .set_transact_items(Some(transact_items))
            .set_client_request_token(self.client_request_token)
            .set_return_consumed_capacity(self.return_consumed_capacity)
            .set_return_item_collection_metrics(self.return_item_collection_metrics)
            .send()
            .await
            .map_err(|sdk_error| {
                let source: aws_sdk_dynamodb::Error = sdk_error.into();
                Error::TransactWrite {
                    cancellation_reasons: error::cancellation_reasons(&source),
                    source: Box::new(source),
                }
            })
    }
}
