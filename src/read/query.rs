use crate::{
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

/// query operation
#[derive(Clone, Debug, Default, PartialEq)]
struct QueryInput {
    key_condition_expression: String,
    multiple_read_operation: read::common::MultipleReadInput,
    return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    scan_index_forward: Option<bool>,
}

/// Query records sharing a hash key value, following every page.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_model::{
///     common::condition::Condition,
///     mapper::QueryArgs,
///     model::{field::FieldType, record::RecordType},
///     read,
/// };
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let events = RecordType::builder("Event")
///     .table_name("events")
///     .hash_key("user")
///     .range_key("at")
///     .field("user", FieldType::string())
///     .field("at", FieldType::integer())
///     .build()?;
/// let query = read::query::Query {
///     query_args: QueryArgs {
///         range_key_condition: Some(Condition::GreaterThan(100.into())),
///         ..Default::default()
///     },
///     ..read::query::Query::new(&events, "u1")
/// };
/// let recent = query.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    /// Type of the records to read.
    pub record_type: Arc<RecordType>,
    /// Hash key value of the table, or of the index when one is given.
    pub hash_value: Value,
    /// Index, range key condition, filter and projection.
    pub query_args: mapper::QueryArgs,
    /// Paging and consistency.
    pub multiple_read_args: read::common::MultipleReadArgs,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Ascending range key order unless `Some(false)`.
    pub scan_index_forward: Option<bool>,
}

impl Query {
    /// Query every record with this hash key value.
    pub fn new(record_type: &Arc<RecordType>, hash_value: impl Into<Value>) -> Self {
        Self {
            record_type: Arc::clone(record_type),
            hash_value: hash_value.into(),
            query_args: mapper::QueryArgs::default(),
            multiple_read_args: read::common::MultipleReadArgs::default(),
            return_consumed_capacity: None,
            scan_index_forward: None,
        }
    }
}

impl TryFrom<Query> for QueryInput {
    type Error = Error;

    fn try_from(query: Query) -> Result<Self> {
        let params = mapper::prepare_query(&query.record_type, query.hash_value, query.query_args)?;
        let (multiple_read_operation, key_condition_expression) =
            read::common::MultipleReadInput::new(params, query.multiple_read_args);
        let key_condition_expression = key_condition_expression
            .ok_or_else(|| Error::InvalidState("query without a key condition".to_string()))?;
        let operation = Self {
            key_condition_expression,
            multiple_read_operation,
            return_consumed_capacity: query.return_consumed_capacity,
            scan_index_forward: query.scan_index_forward,
        };
        Ok(operation)
    }
}

impl Query {
    /// Execute the query over every page and return the merged output.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.query", skip(client), err)
    )]
    pub async fn send_output(self, client: &Client) -> Result<operation::query::QueryOutput> {
        let query: QueryInput = self.try_into()?;
        let builder = client
            .query()
            .key_condition_expression(query.key_condition_expression)
            .set_return_consumed_capacity(query.return_consumed_capacity)
            .set_scan_index_forward(query.scan_index_forward);
        let mut paginator =
            crate::apply_multiple_read_operation!(builder, query.multiple_read_operation)
                .into_paginator()
                .send();
        crate::get_paginated_output!(paginator, operation::query::QueryOutput, Error::Query)
    }

    /// Matching records.
    pub async fn send(self, client: &Client) -> Result<Vec<Record>> {
        let record_type = Arc::clone(&self.record_type);
        let items = self.send_output(client).await?.items.unwrap_or_default();
        Ok(read::common::into_records(&record_type, items))
    }

    /// Matching raw items, deserialized into any type.
    pub async fn send_as<T: DeserializeOwned>(self, client: &Client) -> Result<Vec<T>> {
        let items = self.send_output(client).await?.items.unwrap_or_default();
        Ok(serde_dynamo::from_items(items)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        common::condition::Condition,
        model::{field::FieldType, index::SecondaryIndex},
    };

    use rstest::{fixture, rstest};
    use std::collections;

    #[fixture]
    fn by_status() -> SecondaryIndex {
        SecondaryIndex::global("by-status", "status", None)
    }

    #[fixture]
    fn events(by_status: SecondaryIndex) -> Arc<RecordType> {
        RecordType::builder("Event")
            .table_name("a")
            .hash_key("b")
            .range_key("d")
            .field("b", FieldType::string())
            .field("d", FieldType::integer())
            .field("status", FieldType::string().optional())
            .index(by_status)
            .build()
            .unwrap()
    }

    #[rstest]
    fn test_query_empty(events: Arc<RecordType>) {
        let actual: QueryInput = Query::new(&events, "c").try_into().unwrap();
        let expected = QueryInput {
            key_condition_expression: "#b = :b_eq0".to_string(),
            multiple_read_operation: read::common::MultipleReadInput {
                expression_attribute_names: Some(
                    collections::HashMap::from(
                        [
                            ("#b".to_string(), "b".to_string()),
                        ]
                    )
                ),
                expression_attribute_values: Some(
                    collections::HashMap::from(
                        [
                            (
                                ":b_eq0".to_string(),
                                types::AttributeValue::S(
                                    "c".to_string()
                                )
                            ),
                        ]
                    )
                ),
                table_name: "a".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(actual, expected);
    }

    #[rstest]
    fn test_query_full(events: Arc<RecordType>, by_status: SecondaryIndex) {
        let query = Query {
            query_args: mapper::QueryArgs {
                index: Some(by_status),
                filter: Some(Condition::LessThanOrEqual(Value::from(5)).on("d").into()),
                attributes_to_get: Some(vec!["status".to_string()]),
                ..Default::default()
            },
            multiple_read_args: read::common::MultipleReadArgs {
                consistent_read: Some(false),
                limit: Some(10),
                ..Default::default()
            },
            return_consumed_capacity: Some(types::ReturnConsumedCapacity::Total),
            scan_index_forward: Some(false),
            ..Query::new(&events, "open")
        };
        let actual: QueryInput = query.try_into().unwrap();
        let expected = QueryInput {
            key_condition_expression: "#status = :status_eq0".to_string(),
            multiple_read_operation: read::common::MultipleReadInput {
                consistent_read: Some(false),
                expression_attribute_names: Some(
                    collections::HashMap::from(
                        [
                            ("#status".to_string(), "status".to_string()),
                            ("#d".to_string(), "d".to_string()),
                            ("#b".to_string(), "b".to_string()),
                        ]
                    )
                ),
                expression_attribute_values: Some(
                    collections::HashMap::from(
                        [
                            (
                                ":status_eq0".to_string(),
                                types::AttributeValue::S(
                                    "open".to_string()
                                )
                            ),
                            (
                                ":d_lte1".to_string(),
                                types::AttributeValue::N(
                                    "5".to_string()
                                )
                            ),
                        ]
                    )
                ),
                filter_expression: Some("#d <= :d_lte1".to_string()),
                index_name: Some("by-status".to_string()),
                limit: Some(10),
                projection_expression: Some("#b, #d, #status".to_string()),
                select: Some(types::Select::SpecificAttributes),
                table_name: "a".to_string(),
                ..Default::default()
            },
            return_consumed_capacity: Some(types::ReturnConsumedCapacity::Total),
            scan_index_forward: Some(false),
        };
        assert_eq!(actual, expected);
    }
}
