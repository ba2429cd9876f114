use crate::{
    error::{Error, Result},
    mapper,
    model::record::{Record, RecordType},
    read,
};

use aws_sdk_dynamodb::{Client, operation, types};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// scan operation
#[derive(Clone, Debug, Default, PartialEq)]
struct ScanInput {
    multiple_read_operation: read::common::MultipleReadInput,
    return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    segment: Option<i32>,
    total_segments: Option<i32>,
}

/// Scan a table or index, following every page.
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
/// let everyone = read::scan::Scan::new(&users).send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Scan {
    /// Type of the records to read.
    pub record_type: Arc<RecordType>,
    /// Index, filter and projection.
    pub scan_args: mapper::ScanArgs,
    /// Paging and consistency.
    pub multiple_read_args: read::common::MultipleReadArgs,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Segment of a parallel scan, 0-indexed.
    pub segment: Option<i32>,
    /// Number of segments of a parallel scan.
    pub total_segments: Option<i32>,
}

impl Scan {
    /// Scan every record of the type's table.
    pub fn new(record_type: &Arc<RecordType>) -> Self {
        Self {
            record_type: Arc::clone(record_type),
            scan_args: mapper::ScanArgs::default(),
            multiple_read_args: read::common::MultipleReadArgs::default(),
            return_consumed_capacity: None,
            segment: None,
            total_segments: None,
        }
    }
}

impl TryFrom<Scan> for ScanInput {
    type Error = Error;

    fn try_from(scan: Scan) -> Result<Self> {
        let params = mapper::prepare_scan(&scan.record_type, scan.scan_args)?;
        let (multiple_read_operation, _) =
            read::common::MultipleReadInput::new(params, scan.multiple_read_args);
        let operation = Self {
            multiple_read_operation,
            return_consumed_capacity: scan.return_consumed_capacity,
            segment: scan.segment,
            total_segments: scan.total_segments,
        };
        Ok(operation)
    }
}

impl Scan {
    /// Execute the scan over every page and return the merged output.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.scan", skip(client), err)
    )]
    pub async fn send_output(self, client: &Client) -> Result<operation::scan::ScanOutput> {
        let scan: ScanInput = self.try_into()?;
        let builder = client
            .scan()
            .set_return_consumed_capacity(scan.return_consumed_capacity)
            .set_segment(scan.segment)
            .set_total_segments(scan.total_segments);
        let mut paginator =
            crate::apply_multiple_read_operation!(builder, scan.multiple_read_operation)
                .into_paginator()
                .send();
        crate::get_paginated_output!(paginator, operation::scan::ScanOutput, Error::Scan)
    }

    /// Every matching record.
    pub async fn send(self, client: &Client) -> Result<Vec<Record>> {
        let record_type = Arc::clone(&self.record_type);
        let items = self.send_output(client).await?.items.unwrap_or_default();
        Ok(read::common::into_records(&record_type, items))
    }

    /// Every matching raw item, deserialized into any type.
    pub async fn send_as<T: DeserializeOwned>(self, client: &Client) -> Result<Vec<T>> {
        let items = self.send_output(client).await?.items.unwrap_or_default();
        Ok(serde_dynamo::from_items(items)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        common::condition::{Condition, ConditionMap, LogicalOperator},
        model::{field::FieldType, value::Value},
    };

    use rstest::{fixture, rstest};
    use std::collections;

    #[fixture]
    fn users() -> Arc<RecordType> {
        RecordType::builder("User")
            .table_name("a")
            .hash_key("id")
            .field("id", FieldType::string())
            .field("age", FieldType::integer().optional())
            .build()
            .unwrap()
    }

    #[rstest]
    fn test_scan_empty(users: Arc<RecordType>) {
        let actual: ScanInput = Scan::new(&users).try_into().unwrap();
        let expected = ScanInput {
            multiple_read_operation: read::common::MultipleReadInput {
                table_name: "a".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(actual, expected);
    }

    #[rstest]
    fn test_scan_full(users: Arc<RecordType>) {
        let scan = Scan {
            scan_args: mapper::ScanArgs {
                filter: Some(ConditionMap::Leaves(
                    LogicalOperator::Or,
                    vec![
                        Condition::GreaterThan(Value::from(30)).on("age"),
                        Condition::Null.on("age"),
                    ],
                )),
                ..Default::default()
            },
            segment: Some(0),
            total_segments: Some(2),
            ..Scan::new(&users)
        };
        let actual: ScanInput = scan.try_into().unwrap();
        let expected = ScanInput {
            multiple_read_operation: read::common::MultipleReadInput {
                expression_attribute_names: Some(
                    collections::HashMap::from(
                        [
                            ("#age".to_string(), "age".to_string()),
                        ]
                    )
                ),
                expression_attribute_values: Some(
                    collections::HashMap::from(
                        [
                            (
                                ":age_gt0".to_string(),
                                types::AttributeValue::N(
                                    "30".to_string()
                                )
                            ),
                        ]
                    )
                ),
                filter_expression: Some("#age > :age_gt0 OR attribute_not_exists(#age)".to_string()),
                table_name: "a".to_string(),
                ..Default::default()
            },
            segment: Some(0),
            total_segments: Some(2),
            ..Default::default()
        };
        assert_eq!(actual, expected);
    }
}
