use crate::{
    common::{self, Item},
    error::Result,
};

use aws_sdk_dynamodb::types;
use std::collections;

/// Write arguments compiled for one table.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WriteInput {
    pub(crate) condition_expression: Option<String>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values: Option<Item>,
    pub(crate) return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    pub(crate) return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
    pub(crate) return_values: Option<types::ReturnValue>,
    pub(crate) return_values_on_condition_check_failure:
        Option<types::ReturnValuesOnConditionCheckFailure>,
    pub(crate) table_name: String,
}

impl WriteInput {
    /// Compile `write_args` against `table_name`.
    ///
    /// Condition placeholders are numbered from `index`, so callers that
    /// already used some can continue the sequence.
    pub(crate) fn new(write_args: WriteArgs, table_name: &str, index: &mut usize) -> Result<Self> {
        let mut operation = Self {
            return_consumed_capacity: write_args.return_consumed_capacity,
            return_item_collection_metrics: write_args.return_item_collection_metrics,
            return_values: write_args.return_values,
            return_values_on_condition_check_failure: write_args
                .return_values_on_condition_check_failure,
            table_name: table_name.to_string(),
            ..Default::default()
        };
        if let Some(condition) = write_args.condition {
            let condition = condition.into_expression_input(index)?;
            operation.condition_expression = Some(operation.merge_expression(condition));
        }
        Ok(operation)
    }

    /// Merge the names and values of an expression, returning its text.
    pub(crate) fn merge_expression(&mut self, operation: common::ExpressionInput) -> String {
        operation.merge_into(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
        )
    }
}

/// Arguments shared by put, update and delete.
///
/// The table name comes from the record type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteArgs {
    /// Precondition on the stored item.
    ///
    /// When it evaluates to false the store rejects the write.
    pub condition: Option<common::condition::ConditionMap>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Whether to return item collection metrics.
    pub return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
    /// Which item attributes to return in the response.
    pub return_values: Option<types::ReturnValue>,
    /// Which item attributes to return if the precondition fails.
    pub return_values_on_condition_check_failure:
        Option<types::ReturnValuesOnConditionCheckFailure>,
}

impl WriteArgs {
    /// Arguments with only a precondition.
    pub fn with_condition(condition: impl Into<common::condition::ConditionMap>) -> Self {
        Self {
            condition: Some(condition.into()),
            ..Default::default()
        }
    }
}

/// apply common write operation settings to a builder
#[macro_export]
macro_rules! apply_write_operation {
    ($builder:expr, $write_operation:expr) => {
        $builder
            .set_condition_expression($write_operation.condition_expression)
            .set_expression_attribute_names($write_operation.expression_attribute_names)
            .set_expression_attribute_values($write_operation.expression_attribute_values)
            .set_return_consumed_capacity($write_operation.return_consumed_capacity)
            .set_return_item_collection_metrics($write_operation.return_item_collection_metrics)
            .set_return_values($write_operation.return_values)
            .set_return_values_on_condition_check_failure(
                $write_operation.return_values_on_condition_check_failure,
            )
            .table_name($write_operation.table_name)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{common::condition::Condition, model::value::Value};

    use rstest::rstest;

    #[rstest]
    fn test_write_input_empty() {
        let actual = WriteInput::new(WriteArgs::default(), "a", &mut 0).unwrap();
        let expected = WriteInput {
            table_name: "a".to_string(),
            ..Default::default()
        };
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case::first(0, ":b_eq0")]
    #[case::continued(3, ":b_eq3")]
    fn test_write_input_condition_numbering(#[case] start: usize, #[case] placeholder: &str) {
        let write_args = WriteArgs::with_condition(Condition::Equals(Value::from("c")).on("b"));
        let mut index = start;
        let actual = WriteInput::new(write_args, "a", &mut index).unwrap();
        let expected = WriteInput {
            condition_expression: Some(
                format!("#b = {placeholder}")
            ),
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
                            placeholder.to_string(),
                            types::AttributeValue::S(
                                "c".to_string()
                            )
                        ),
                    ]
                )
            ),
            table_name: "a".to_string(),
            ..Default::default()
        };
        assert_eq!(actual, expected);
        assert_eq!(index, start + 1);
    }
}
