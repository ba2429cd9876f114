//! Pieces shared by the read and write requests.
//!
//! Keys, conditions and projections all compile into an [`ExpressionInput`]:
//! an expression string plus the name and value placeholders it refers to.

/// Conditions for range keys, filters and preconditions.
pub mod condition;

/// Primary key mappings.
pub mod key;

/// Projections.
pub mod selection;

use crate::error::{Error, Result};

use aws_sdk_dynamodb::types;
use std::collections;

/// Wire item: attribute name to tagged wire value.
pub type Item = collections::HashMap<String, types::AttributeValue>;

/// Rounds a batch operation sends for one chunk before giving up on the
/// requests the store leaves unprocessed.
pub const BATCH_MAX_ROUNDS: usize = 10;

/// Fail once `round` exhausts [`BATCH_MAX_ROUNDS`] with requests left.
pub(crate) fn check_batch_round(round: usize, remaining: usize) -> Result<()> {
    if round >= BATCH_MAX_ROUNDS {
        return Err(Error::Unprocessed {
            rounds: round,
            remaining,
        });
    }
    #[cfg(feature = "tracing")]
    if round > 0 {
        tracing::debug!(round, remaining, "re-sending unprocessed requests");
    }
    Ok(())
}

/// Placeholder-safe form of an attribute name.
pub(crate) fn sanitize(identifier: &str) -> String {
    identifier
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() || character == '_' {
                character
            } else {
                '_'
            }
        })
        .collect()
}

pub(crate) fn add_placeholder(keys: &[String], identifier: &str) -> (String, Vec<String>) {
    let placeholder = format!("#{}", sanitize(identifier));
    let mut new_keys = Vec::with_capacity(keys.len() + 1);
    new_keys.extend_from_slice(keys);
    new_keys.push(placeholder.clone());
    (placeholder, new_keys)
}

fn get_expression(left: String, operator: &str, right: String) -> String {
    if left.is_empty() {
        right
    } else if right.is_empty() {
        left
    } else {
        format!("{left}{operator}{right}")
    }
}

/// Compiled expression with its placeholders.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ExpressionInput {
    pub(crate) expression: String,
    pub(crate) expression_attribute_names: collections::HashMap<String, String>,
    pub(crate) expression_attribute_values: Item,
}

impl ExpressionInput {
    pub(crate) fn merge(operator: &str, items: Vec<Self>) -> Self {
        let mut operation = Self::default();
        for item in items {
            operation
                .expression_attribute_names
                .extend(item.expression_attribute_names);
            operation
                .expression_attribute_values
                .extend(item.expression_attribute_values);
            operation.expression = get_expression(operation.expression, operator, item.expression);
        }
        operation
    }

    /// Move the placeholders into a request's maps and return the expression.
    pub(crate) fn merge_into(
        self,
        names: &mut Option<collections::HashMap<String, String>>,
        values: &mut Option<Item>,
    ) -> String {
        if !self.expression_attribute_names.is_empty() {
            names
                .get_or_insert_with(collections::HashMap::new)
                .extend(self.expression_attribute_names);
        }
        if !self.expression_attribute_values.is_empty() {
            values
                .get_or_insert_with(collections::HashMap::new)
                .extend(self.expression_attribute_values);
        }
        self.expression
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::plain("my_int", "my_int")]
    #[case::dashes("my-attr", "my_attr")]
    #[case::dots("a.b", "a_b")]
    fn test_sanitize(#[case] identifier: &str, #[case] expected: &str) {
        assert_eq!(sanitize(identifier), expected);
    }

    #[rstest]
    #[case::first_round(0)]
    #[case::last_round(BATCH_MAX_ROUNDS - 1)]
    fn test_check_batch_round_allows(#[case] round: usize) {
        assert!(check_batch_round(round, 3).is_ok());
    }

    #[test]
    fn test_check_batch_round_exhausted() {
        let error = check_batch_round(BATCH_MAX_ROUNDS, 3).unwrap_err();
        assert!(matches!(&error, Error::Unprocessed { rounds: BATCH_MAX_ROUNDS, remaining: 3 }));
        assert_eq!(error.to_string(), "3 requests still unprocessed after 10 rounds");
    }

    #[test]
    fn test_merge_into_skips_empty_maps() {
        let mut names = None;
        let mut values = None;
        let operation = ExpressionInput {
            expression: "#a".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [("#a".to_string(), "a".to_string())]
            ),
            ..Default::default()
        };
        let expression = operation.merge_into(&mut names, &mut values);
        assert_eq!(expression, "#a");
        assert_eq!(names.map(|names| names.len()), Some(1));
        assert!(values.is_none());
    }
}
