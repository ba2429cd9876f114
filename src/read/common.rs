use crate::{
    common::{self, Item},
    mapper,
    model::record::{Record, RecordType},
};

use aws_sdk_dynamodb::types;
use std::{collections, sync::Arc};

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct SingleReadInput {
    pub(crate) consistent_read: Option<bool>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) projection_expression: Option<String>,
    pub(crate) table_name: String,
}

/// Arguments of single-item reads.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SingleReadArgs {
    /// Strongly consistent read when `Some(true)`.
    pub consistent_read: Option<bool>,
    /// Attributes to return, every attribute when `None`.
    ///
    /// [`SelectionMap::Node`](common::selection::SelectionMap::Node) projects
    /// attributes nested under map attributes.
    pub selection: Option<common::selection::SelectionMap>,
}

impl SingleReadInput {
    pub(crate) fn new(args: SingleReadArgs, table_name: &str) -> Self {
        let (expression_attribute_names, projection_expression) = match args.selection {
            Some(selection) => {
                let selection_operation = common::ExpressionInput::from(selection);
                (
                    Some(selection_operation.expression_attribute_names),
                    Some(selection_operation.expression),
                )
            }
            None => (None, None),
        };
        Self {
            consistent_read: args.consistent_read,
            expression_attribute_names,
            projection_expression,
            table_name: table_name.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct MultipleReadInput {
    pub(crate) consistent_read: Option<bool>,
    pub(crate) exclusive_start_key: Option<Item>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values: Option<Item>,
    pub(crate) filter_expression: Option<String>,
    pub(crate) index_name: Option<String>,
    pub(crate) limit: Option<i32>,
    pub(crate) projection_expression: Option<String>,
    pub(crate) select: Option<types::Select>,
    pub(crate) table_name: String,
}

/// Paging and consistency arguments of queries and scans.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultipleReadArgs {
    /// Strongly consistent read when `Some(true)`.
    pub consistent_read: Option<bool>,
    /// Resume after this key, usually a previous `last_evaluated_key`.
    pub exclusive_start_key: Option<Item>,
    /// Items evaluated per page.
    pub limit: Option<i32>,
    /// What to return. A projection implies `SpecificAttributes`.
    pub select: Option<types::Select>,
}

impl MultipleReadInput {
    /// Combine prepared parameters with paging arguments; the key condition
    /// is left to the caller.
    pub(crate) fn new(params: mapper::ReadParams, args: MultipleReadArgs) -> (Self, Option<String>) {
        let select = match (&args.select, &params.projection_expression) {
            (None, Some(_)) => Some(types::Select::SpecificAttributes),
            _ => args.select,
        };
        let input = Self {
            consistent_read: args.consistent_read,
            exclusive_start_key: args.exclusive_start_key,
            expression_attribute_names: params.expression_attribute_names,
            expression_attribute_values: params.expression_attribute_values,
            filter_expression: params.filter_expression,
            index_name: params.index_name,
            limit: args.limit,
            projection_expression: params.projection_expression,
            select,
            table_name: params.table_name,
        };
        (input, params.key_condition_expression)
    }
}

/// Drain a paginator into one output, mapping page errors into the given
/// crate error variant.
#[macro_export]
macro_rules! get_paginated_output {
    ($paginator:expr, $output_type:ty, $variant:path) => {{
        let mut outputs = Vec::new();
        while let Some(page) = $paginator.next().await {
            outputs.push(page.map_err(|error| $variant(Box::new(error.into())))?);
        }
        let (items, count, scanned, capacities) = outputs.into_iter().fold(
            (Vec::new(), 0, 0, Vec::new()),
            |(mut items, count, scanned, mut caps), output| {
                if let Some(other_items) = output.items {
                    items.extend(other_items);
                }
                if let Some(cap) = output.consumed_capacity {
                    caps.push(cap);
                }
                (
                    items,
                    count + output.count,
                    scanned + output.scanned_count,
                    caps,
                )
            },
        );
        let aggregated_capacity = $crate::read::common::aggregate_capacity(capacities);
        let output = <$output_type>::builder()
            .set_items(Some(items))
            .set_count(Some(count))
            .set_scanned_count(Some(scanned))
            .set_consumed_capacity(Some(aggregated_capacity))
            .build();
        Ok(output)
    }};
}

pub(crate) fn aggregate_capacity(
    capacities: Vec<types::ConsumedCapacity>,
) -> types::ConsumedCapacity {
    let (cap, read, write, table) = capacities.into_iter().fold(
        (0.0, 0.0, 0.0, None),
        |(cap, read, write, table), capacity| {
            (
                cap + capacity.capacity_units.unwrap_or(0.0),
                read + capacity.read_capacity_units.unwrap_or(0.0),
                write + capacity.write_capacity_units.unwrap_or(0.0),
                table.or(capacity.table_name),
            )
        },
    );
    types::ConsumedCapacity::builder()
        .set_table_name(table)
        .set_capacity_units(Some(cap))
        .set_read_capacity_units(Some(read))
        .set_write_capacity_units(Some(write))
        .build()
}

/// Rebuild records from raw items.
pub(crate) fn into_records(record_type: &Arc<RecordType>, items: Vec<Item>) -> Vec<Record> {
    items
        .iter()
        .map(|item| mapper::deserialize(record_type, item).record)
        .collect()
}

/// apply common single read operation settings to a builder
#[macro_export]
macro_rules! apply_single_read_operation {
    ($builder:expr, $single_read_operation:expr) => {
        $builder
            .set_consistent_read($single_read_operation.consistent_read)
            .set_expression_attribute_names($single_read_operation.expression_attribute_names)
            .set_projection_expression($single_read_operation.projection_expression)
            .table_name($single_read_operation.table_name)
    };
}

/// apply common multiple read operation settings to a builder
#[macro_export]
macro_rules! apply_multiple_read_operation {
    ($builder:expr, $multiple_read_operation:expr) => {
        $builder
            .set_consistent_read($multiple_read_operation.consistent_read)
            .set_exclusive_start_key($multiple_read_operation.exclusive_start_key)
            .set_expression_attribute_names($multiple_read_operation.expression_attribute_names)
            .set_expression_attribute_values($multiple_read_operation.expression_attribute_values)
            .set_filter_expression($multiple_read_operation.filter_expression)
            .set_index_name($multiple_read_operation.index_name)
            .set_limit($multiple_read_operation.limit)
            .set_projection_expression($multiple_read_operation.projection_expression)
            .set_select($multiple_read_operation.select)
            .table_name($multiple_read_operation.table_name)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::no_projection(
        mapper::ReadParams {
            table_name: "a".to_string(),
            key_condition_expression: Some("#b = :b_eq0".to_string()),
            ..Default::default()
        },
        MultipleReadArgs {
            limit: Some(10),
            ..Default::default()
        },
        MultipleReadInput {
            limit: Some(10),
            table_name: "a".to_string(),
            ..Default::default()
        },
        Some("#b = :b_eq0")
    )]
    #[case::projection_selects_specific_attributes(
        mapper::ReadParams {
            table_name: "a".to_string(),
            projection_expression: Some("#c".to_string()),
            expression_attribute_names: Some(
                collections::HashMap::from(
                    [
                        ("#c".to_string(), "c".to_string()),
                    ]
                )
            ),
            ..Default::default()
        },
        MultipleReadArgs {
            consistent_read: Some(true),
            ..Default::default()
        },
        MultipleReadInput {
            consistent_read: Some(true),
            expression_attribute_names: Some(
                collections::HashMap::from(
                    [
                        ("#c".to_string(), "c".to_string()),
                    ]
                )
            ),
            projection_expression: Some("#c".to_string()),
            select: Some(types::Select::SpecificAttributes),
            table_name: "a".to_string(),
            ..Default::default()
        },
        None
    )]
    fn test_multiple_read_input(
        #[case] params: mapper::ReadParams,
        #[case] args: MultipleReadArgs,
        #[case] expected: MultipleReadInput,
        #[case] expected_key_condition: Option<&str>,
    ) {
        let (actual, key_condition) = MultipleReadInput::new(params, args);
        assert_eq!(actual, expected);
        assert_eq!(key_condition.as_deref(), expected_key_condition);
    }

    #[test]
    fn test_single_read_input() {
        let input = SingleReadInput::new(
            SingleReadArgs {
                selection: Some(common::selection::SelectionMap::from_names(["e", "f"])),
                ..Default::default()
            },
            "g",
        );
        assert_eq!(
            input,
            SingleReadInput {
                expression_attribute_names: Some(collections::HashMap::from([
                    ("#e".to_string(), "e".to_string()),
                    ("#f".to_string(), "f".to_string()),
                ])),
                projection_expression: Some("#e, #f".to_string()),
                table_name: "g".to_string(),
                ..Default::default()
            }
        );
    }
}
