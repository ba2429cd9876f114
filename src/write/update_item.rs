use crate::{
    common::{self, Item},
    error::{Error, Result},
    expression::{self, UpdateFragment},
    mapper,
    model::{
        record::{Record, RecordType},
        value::Value,
    },
    write,
};

use aws_sdk_dynamodb::{Client, operation, types};
use std::sync::Arc;

/// update item operation
#[derive(Debug, PartialEq)]
struct UpdateItemInput {
    keys: Item,
    update_expression: String,
    write_operation: write::common::WriteInput,
}

/// Apply update fragments to one stored record.
///
/// Every fragment must share the same verb; they are merged into a single
/// update expression.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_model::{
///     expression::Expr,
///     model::{field::FieldType, record::RecordType},
///     write,
/// };
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let users = RecordType::builder("User")
///     .table_name("users")
///     .hash_key("id")
///     .field("id", FieldType::string())
///     .field("visits", FieldType::integer().optional())
///     .build()?;
/// let visits = Expr::new(&users).field("visits")?.set_add(1)?;
/// write::update_item::UpdateItem::new(&users, "1")
///     .fragment(visits)
///     .send(client)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateItem {
    /// Type of the record to update.
    pub record_type: Arc<RecordType>,
    /// Hash key value.
    pub hash_key: Value,
    /// Range key value, for composite keys.
    pub range_key: Option<Value>,
    /// Mutations to apply.
    pub fragments: Vec<UpdateFragment>,
    /// Precondition and return settings.
    pub write_args: write::common::WriteArgs,
}

impl UpdateItem {
    /// Update by hash key.
    pub fn new(record_type: &Arc<RecordType>, hash_key: impl Into<Value>) -> Self {
        Self {
            record_type: Arc::clone(record_type),
            hash_key: hash_key.into(),
            range_key: None,
            fragments: Vec::new(),
            write_args: write::common::WriteArgs::default(),
        }
    }

    /// Set the range key value.
    pub fn range_key(mut self, range_key: impl Into<Value>) -> Self {
        self.range_key = Some(range_key.into());
        self
    }

    /// Add one mutation.
    pub fn fragment(mut self, fragment: UpdateFragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    /// Update the stored copy of `record`.
    pub fn for_record(record: &Record) -> Result<Self> {
        let (hash_key, range_key) = mapper::key_values(record)?;
        let mut update_item = Self::new(record.record_type(), hash_key);
        update_item.range_key = range_key;
        Ok(update_item)
    }
}

impl TryFrom<UpdateItem> for UpdateItemInput {
    type Error = Error;

    fn try_from(update_item: UpdateItem) -> Result<Self> {
        let record_type = &update_item.record_type;
        let keys = mapper::key(record_type, update_item.hash_key, update_item.range_key)?;
        let update: common::ExpressionInput =
            expression::merge_update_fragments(update_item.fragments)?.into();
        let mut write_operation = write::common::WriteInput::new(
            update_item.write_args,
            record_type.table_name()?,
            &mut 0,
        )?;
        if let Some(values) = &write_operation.expression_attribute_values
            && let Some(placeholder) = update
                .expression_attribute_values
                .keys()
                .find(|placeholder| values.contains_key(*placeholder))
        {
            return Err(Error::InvalidState(format!(
                "placeholder {placeholder} is used by both the update and its condition"
            )));
        }
        let update_expression = write_operation.merge_expression(update);
        let operation = Self {
            keys,
            update_expression,
            write_operation,
        };
        Ok(operation)
    }
}

impl UpdateItem {
    /// Execute the update item operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.update_item", skip(client), err)
    )]
    pub async fn send(self, client: &Client) -> Result<operation::update_item::UpdateItemOutput> {
        let update_item: UpdateItemInput = self.try_into()?;
        let builder = client
            .update_item()
            .set_key(Some(update_item.keys))
            .update_expression(update_item.update_expression);
        crate::apply_write_operation!(builder, update_item.write_operation)
            .send()
            .await
            .map_err(|error| Error::Update(Box::new(error.into())))
    }
}

impl TryFrom<UpdateItem> for types::Update {
    type Error = Error;

    fn try_from(update_item: UpdateItem) -> Result<Self> {
        let update_item: UpdateItemInput = update_item.try_into()?;
        let write_operation = update_item.write_operation;
        let update = Self::builder()
            .set_key(Some(update_item.keys))
            .update_expression(update_item.update_expression)
            .set_condition_expression(write_operation.condition_expression)
            .set_expression_attribute_names(write_operation.expression_attribute_names)
            .set_expression_attribute_values(write_operation.expression_attribute_values)
            .set_return_values_on_condition_check_failure(
                write_operation.return_values_on_condition_check_failure,
            )
            .table_name(write_operation.table_name)
            .build()?;
        Ok(update)
    }
}
