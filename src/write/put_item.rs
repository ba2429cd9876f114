use crate::{
    common::Item,
    error::{Error, Result},
    mapper,
    model::record::Record,
    write,
};

use aws_sdk_dynamodb::{Client, operation, types};

/// put item operation
#[derive(Debug, PartialEq)]
struct PutItemInput {
    item: Item,
    write_operation: write::common::WriteInput,
}

/// Create or replace a record.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_model::{
///     model::{field::FieldType, record::{Record, RecordType}},
///     write,
/// };
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let users = RecordType::builder("User")
///     .table_name("users")
///     .hash_key("id")
///     .field("id", FieldType::string())
///     .field("name", FieldType::string().optional())
///     .build()?;
/// let user = Record::new(&users).with("id", "1")?.with("name", "John")?;
/// write::put_item::PutItem::new(user).send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PutItem {
    /// The record to store.
    pub record: Record,
    /// Precondition and return settings.
    pub write_args: write::common::WriteArgs,
}

impl PutItem {
    /// Unconditional put of `record`.
    pub fn new(record: Record) -> Self {
        Self {
            record,
            write_args: write::common::WriteArgs::default(),
        }
    }
}

impl TryFrom<PutItem> for PutItemInput {
    type Error = Error;

    fn try_from(put_item: PutItem) -> Result<Self> {
        let item = mapper::serialize(&put_item.record)?;
        let table_name = put_item.record.record_type().table_name()?;
        let write_operation =
            write::common::WriteInput::new(put_item.write_args, table_name, &mut 0)?;
        let operation = Self {
            item,
            write_operation,
        };
        Ok(operation)
    }
}

impl PutItem {
    /// Execute the put item operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.put_item", skip(client), err)
    )]
    pub async fn send(self, client: &Client) -> Result<operation::put_item::PutItemOutput> {
        let put_item: PutItemInput = self.try_into()?;
        let builder = client.put_item().set_item(Some(put_item.item));
        crate::apply_write_operation!(builder, put_item.write_operation)
            .send()
            .await
            .map_err(|error| Error::Put(Box::new(error.into())))
    }
}

impl TryFrom<PutItem> for types::Put {
    type Error = Error;

    fn try_from(put_item: PutItem) -> Result<Self> {
        let put_item: PutItemInput = put_item.try_into()?;
        let write_operation = put_item.write_operation;
        let put = Self::builder()
            .set_item(Some(put_item.item))
            .set_condition_expression(write_operation.condition_expression)
            .set_expression_attribute_names(write_operation.expression_attribute_names)
            .set_expression_attribute_values(write_operation.expression_attribute_values)
            .set_return_values_on_condition_check_failure(
                write_operation.return_values_on_condition_check_failure,
            )
            .table_name(write_operation.table_name)
            .build()?;
        Ok(put)
    }
}
