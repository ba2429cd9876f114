use crate::{
    common::Item,
    error::{Error, Result},
    mapper,
    model::{
        record::{Record, RecordType},
        value::Value,
    },
    write,
};

use aws_sdk_dynamodb::{Client, operation, types};
use std::sync::Arc;

/// delete item operation
#[derive(Debug, PartialEq)]
struct DeleteItemInput {
    keys: Item,
    write_operation: write::common::WriteInput,
}

/// Delete a record by key.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_model::{
///     model::{field::FieldType, record::RecordType},
///     write,
/// };
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let users = RecordType::builder("User")
///     .table_name("users")
///     .hash_key("id")
///     .field("id", FieldType::string())
///     .build()?;
/// write::delete_item::DeleteItem::new(&users, "1").send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteItem {
    /// Type of the record to delete.
    pub record_type: Arc<RecordType>,
    /// Hash key value.
    pub hash_key: Value,
    /// Range key value, for composite keys.
    pub range_key: Option<Value>,
    /// Precondition and return settings.
    pub write_args: write::common::WriteArgs,
}

impl DeleteItem {
    /// Delete by hash key.
    pub fn new(record_type: &Arc<RecordType>, hash_key: impl Into<Value>) -> Self {
        Self {
            record_type: Arc::clone(record_type),
            hash_key: hash_key.into(),
            range_key: None,
            write_args: write::common::WriteArgs::default(),
        }
    }

    /// Set the range key value.
    pub fn range_key(mut self, range_key: impl Into<Value>) -> Self {
        self.range_key = Some(range_key.into());
        self
    }

    /// Delete the stored copy of `record`.
    pub fn for_record(record: &Record) -> Result<Self> {
        let (hash_key, range_key) = mapper::key_values(record)?;
        let mut delete_item = Self::new(record.record_type(), hash_key);
        delete_item.range_key = range_key;
        Ok(delete_item)
    }
}

impl TryFrom<DeleteItem> for DeleteItemInput {
    type Error = Error;

    fn try_from(delete_item: DeleteItem) -> Result<Self> {
        let record_type = &delete_item.record_type;
        let keys = mapper::key(record_type, delete_item.hash_key, delete_item.range_key)?;
        let write_operation = write::common::WriteInput::new(
            delete_item.write_args,
            record_type.table_name()?,
            &mut 0,
        )?;
        let operation = Self {
            keys,
            write_operation,
        };
        Ok(operation)
    }
}

impl DeleteItem {
    /// Execute the delete item operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.delete_item", skip(client), err)
    )]
    pub async fn send(self, client: &Client) -> Result<operation::delete_item::DeleteItemOutput> {
        let delete_item: DeleteItemInput = self.try_into()?;
        let builder = client.delete_item().set_key(Some(delete_item.keys));
        crate::apply_write_operation!(builder, delete_item.write_operation)
            .send()
            .await
            .map_err(|error| Error::Delete(Box::new(error.into())))
    }
}

impl TryFrom<DeleteItem> for types::Delete {
    type Error = Error;

    fn try_from(delete_item: DeleteItem) -> Result<Self> {
        let delete_item: DeleteItemInput = delete_item.try_into()?;
        let write_operation = delete_item.write_operation;
        let delete = Self::builder()
            .set_key(Some(delete_item.keys))
            .set_condition_expression(write_operation.condition_expression)
            .set_expression_attribute_names(write_operation.expression_attribute_names)
            .set_expression_attribute_values(write_operation.expression_attribute_values)
            .set_return_values_on_condition_check_failure(
                write_operation.return_values_on_condition_check_failure,
            )
            .table_name(write_operation.table_name)
            .build()?;
        Ok(delete)
    }
}
