use crate::{
    common::{self, Item},
    error::{self, Error, Result},
    mapper,
    model::{
        record::{Record, RecordType},
        value::Value,
    },
};

use aws_sdk_dynamodb::{Client, types};
use std::sync::Arc;

/// Most items one transaction accepts.
pub const TRANSACT_ITEMS_LIMIT: usize = 100;

/// One key to read inside a transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactGet {
    /// Type of the record.
    pub record_type: Arc<RecordType>,
    /// Hash key value.
    pub hash_key: Value,
    /// Range key value, for composite keys.
    pub range_key: Option<Value>,
    /// Attributes to return, every attribute when `None`.
    pub selection: Option<common::selection::SelectionMap>,
}

impl TransactGet {
    /// Read by hash key.
    pub fn new(record_type: &Arc<RecordType>, hash_key: impl Into<Value>) -> Self {
        Self {
            record_type: Arc::clone(record_type),
            hash_key: hash_key.into(),
            range_key: None,
            selection: None,
        }
    }

    /// Set the range key value.
    pub fn range_key(mut self, range_key: impl Into<Value>) -> Self {
        self.range_key = Some(range_key.into());
        self
    }
}

impl TryFrom<TransactGet> for types::TransactGetItem {
    type Error = Error;

    fn try_from(transact_get: TransactGet) -> Result<Self> {
        let key = mapper::key(
            &transact_get.record_type,
            transact_get.hash_key,
            transact_get.range_key,
        )?;
        let (expression_attribute_names, projection_expression) = match transact_get.selection {
            Some(selection) => {
                let selection = common::ExpressionInput::from(selection);
                (Some(selection.expression_attribute_names), Some(selection.expression))
            }
            None => (None, None),
        };
        let get = types::Get::builder()
            .table_name(transact_get.record_type.table_name()?)
            .set_key(Some(key))
            .set_expression_attribute_names(expression_attribute_names)
            .set_projection_expression(projection_expression)
            .build()?;
        Ok(Self::builder().get(get).build())
    }
}

/// Read up to [`TRANSACT_ITEMS_LIMIT`] records atomically.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_model::{
///     model::{field::FieldType, record::RecordType},
///     read::transact_get_items::{TransactGet, TransactGetItems},
/// };
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let users = RecordType::builder("User")
///     .table_name("users")
///     .hash_key("id")
///     .field("id", FieldType::string())
///     .build()?;
/// let records = TransactGetItems {
///     items: vec![TransactGet::new(&users, "1"), TransactGet::new(&users, "2")],
///     ..Default::default()
/// }
/// .send(client)
/// .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransactGetItems {
    /// Keys to read, answered in the same order.
    pub items: Vec<TransactGet>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
}

impl TransactGetItems {
    fn transact_items(&self) -> Result<Vec<types::TransactGetItem>> {
        if self.items.len() > TRANSACT_ITEMS_LIMIT {
            return Err(Error::InvalidState(format!(
                "{} items exceed the transaction limit of {TRANSACT_ITEMS_LIMIT}",
                self.items.len()
            )));
        }
        self.items.iter().cloned().map(types::TransactGetItem::try_from).collect()
    }

    /// Execute and return one raw item per requested key, `None` when missing.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.transact_get_items", skip(client), err)
    )]
    pub async fn send_items(self, client: &Client) -> Result<Vec<Option<Item>>> {
        let transact_items = self.transact_items()?;
        let output = client
            .transact_get_items()
            .set_transact_items(Some(transact_items))
            .set_return_consumed_capacity(self.return_consumed_capacity)
            .send()
            .await
            .map_err(|sdk_error| {
                let source: aws_sdk_dynamodb::Error = sdk_error.into();
                Error::TransactGet {
                    cancellation_reasons: error::cancellation_reasons(&source),
                    source: Box::new(source),
                }
            })?;
        Ok(output
            .responses
            .unwrap_or_default()
            .into_iter()
            .map(|response| response.item)
            .collect())
    }

    /// Execute and return one record per requested key, `None` when missing.
    pub async fn send(self, client: &Client) -> Result<Vec<Option<Record>>> {
        let record_types: Vec<Arc<RecordType>> = self
            .items
            .iter()
            .map(|item| Arc::clone(&item.record_type))
            .collect();
        let items = self.send_items(client).await?;
        Ok(record_types
            .iter()
            .zip(items)
            .map(|(record_type, item)| item.map(|item| mapper::deserialize(record_type, &item).record))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::field::FieldType;

    use rstest::{fixture, rstest};
    use std::collections;

    #[fixture]
    fn users() -> Arc<RecordType> {
        RecordType::builder("User")
            .table_name("users")
            .hash_key("id")
            .field("id", FieldType::string())
            .field("name", FieldType::string().optional())
            .build()
            .unwrap()
    }

    #[rstest]
    fn test_transact_get_item(users: Arc<RecordType>) {
        let transact_get = TransactGet {
            selection: Some(common::selection::SelectionMap::from_names(["name"])),
            ..TransactGet::new(&users, "1")
        };
        let actual: types::TransactGetItem = transact_get.try_into().unwrap();
        let expected = types::TransactGetItem::builder()
            .get(
                types::Get::builder()
                    .table_name("users")
                    .set_key(
                        Some(
                            collections::HashMap::from(
                                [(
                                    "id".to_string(),
                                    types::AttributeValue::S(
                                        "1".to_string()
                                    ),
                                )]
                            )
                        )
                    )
                    .set_expression_attribute_names(
                        Some(
                            collections::HashMap::from(
                                [
                                    ("#name".to_string(), "name".to_string()),
                                ]
                            )
                        )
                    )
                    .set_projection_expression(
                        Some(
                            "#name".to_string()
                        )
                    )
                    .build()
                    .unwrap()
            )
            .build();
        assert_eq!(actual, expected);
    }

    #[rstest]
    fn test_transact_get_items_limit(users: Arc<RecordType>) {
        let transact = TransactGetItems {
            items: (0..=TRANSACT_ITEMS_LIMIT)
                .map(|index| TransactGet::new(&users, index.to_string()))
                .collect(),
            ..Default::default()
        };
        let error = transact.transact_items().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Operation in invalid state: 101 items exceed the transaction limit of 100"
        );
    }
}
