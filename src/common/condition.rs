use crate::{
    codec, common,
    error::{Error, Result},
    model::value::Value,
};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use std::{collections, ops};

/// Logical operator for combining conditions.
#[derive(Clone, Debug, PartialEq)]
pub enum LogicalOperator {
    /// Every condition must hold.
    And,
    /// At least one condition must hold.
    Or,
}

impl ops::Deref for LogicalOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// Comparison against one attribute.
///
/// Operand values go through the value codec, so a float compares as its
/// decimal text and a date-time as its ISO string.
///
/// ```rust
/// use dynamodb_model::common::condition::Condition;
///
/// let eq = Condition::Equals("value".into());
/// let gt = Condition::GreaterThan(100.into());
/// let missing = Condition::Null;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// `begins_with(attr, prefix)`.
    BeginsWith(String),
    /// `attr BETWEEN low AND high`, inclusive.
    Between(Value, Value),
    /// `contains(attr, value)`.
    Contains(Value),
    /// `attr = value`.
    Equals(Value),
    /// `attr > value`.
    GreaterThan(Value),
    /// `attr >= value`.
    GreaterThanOrEqual(Value),
    /// `attr IN (values)`.
    In(Vec<Value>),
    /// `attr < value`.
    LessThan(Value),
    /// `attr <= value`.
    LessThanOrEqual(Value),
    /// `NOT contains(attr, value)`.
    NotContains(Value),
    /// `attr <> value`.
    NotEqual(Value),
    /// `attribute_exists(attr)`.
    NotNull,
    /// `attribute_not_exists(attr)`.
    Null,
}

fn bind(
    values: &mut collections::HashMap<String, types::AttributeValue>,
    placeholder: String,
    value: &Value,
) -> Result<String> {
    values.insert(placeholder.clone(), codec::to_wire(value)?);
    Ok(placeholder)
}

impl Condition {
    /// Attach the condition to an attribute.
    pub fn on(self, name: &str) -> KeyCondition {
        KeyCondition {
            condition: self,
            name: name.to_string(),
        }
    }

    fn get_expression(
        self,
        key: &str,
        key_placeholder: &str,
        index: &mut usize,
    ) -> Result<(String, collections::HashMap<String, types::AttributeValue>)> {
        let key = common::sanitize(key);
        let mut values = collections::HashMap::new();
        let mut next = |suffix: &str| {
            let placeholder = format!(":{key}_{suffix}{index}");
            *index += 1;
            placeholder
        };
        let expression = match self {
            Self::BeginsWith(prefix) => {
                let placeholder = bind(&mut values, next("begins_with"), &Value::String(prefix))?;
                format!("begins_with({key_placeholder}, {placeholder})")
            }
            Self::Between(low, high) => {
                let low = bind(&mut values, next("between"), &low)?;
                let high = bind(&mut values, next("between"), &high)?;
                format!("{key_placeholder} BETWEEN {low} AND {high}")
            }
            Self::Contains(value) => {
                let placeholder = bind(&mut values, next("contains"), &value)?;
                format!("contains({key_placeholder}, {placeholder})")
            }
            Self::Equals(value) => {
                let placeholder = bind(&mut values, next("eq"), &value)?;
                format!("{key_placeholder} = {placeholder}")
            }
            Self::GreaterThan(value) => {
                let placeholder = bind(&mut values, next("gt"), &value)?;
                format!("{key_placeholder} > {placeholder}")
            }
            Self::GreaterThanOrEqual(value) => {
                let placeholder = bind(&mut values, next("gte"), &value)?;
                format!("{key_placeholder} >= {placeholder}")
            }
            Self::In(candidates) => {
                if candidates.is_empty() {
                    return Err(Error::InvalidState(format!("IN on {key} needs at least one value")));
                }
                let mut placeholders = Vec::with_capacity(candidates.len());
                for (position, candidate) in candidates.iter().enumerate() {
                    let placeholder = next(&format!("in{position}_"));
                    placeholders.push(bind(&mut values, placeholder, candidate)?);
                }
                format!("{key_placeholder} IN ({})", placeholders.join(", "))
            }
            Self::LessThan(value) => {
                let placeholder = bind(&mut values, next("lt"), &value)?;
                format!("{key_placeholder} < {placeholder}")
            }
            Self::LessThanOrEqual(value) => {
                let placeholder = bind(&mut values, next("lte"), &value)?;
                format!("{key_placeholder} <= {placeholder}")
            }
            Self::NotContains(value) => {
                let placeholder = bind(&mut values, next("not_contains"), &value)?;
                format!("NOT contains({key_placeholder}, {placeholder})")
            }
            Self::NotEqual(value) => {
                let placeholder = bind(&mut values, next("ne"), &value)?;
                format!("{key_placeholder} <> {placeholder}")
            }
            Self::NotNull => format!("attribute_exists({key_placeholder})"),
            Self::Null => format!("attribute_not_exists({key_placeholder})"),
        };
        Ok((expression, values))
    }
}

/// Condition applied to a named attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCondition {
    /// The comparison.
    pub condition: Condition,
    /// Attribute the comparison applies to.
    pub name: String,
}

impl KeyCondition {
    /// AND the conditions together, numbering value placeholders from `index`.
    pub(crate) fn get_expression_operation(
        keys: Vec<Self>,
        index: &mut usize,
    ) -> Result<common::ExpressionInput> {
        let mut operations = Vec::with_capacity(keys.len());
        for key in keys {
            let (placeholder, _) = common::add_placeholder(&[], &key.name);
            let (expression, expression_attribute_values) =
                key.condition.get_expression(&key.name, &placeholder, index)?;
            operations.push(common::ExpressionInput {
                expression,
                expression_attribute_names: collections::HashMap::from([(placeholder, key.name)]),
                expression_attribute_values,
            });
        }
        Ok(common::ExpressionInput::merge(&LogicalOperator::And, operations))
    }
}

/// Tree of conditions joined by logical operators.
///
/// `Node` keys are map attributes: a leaf under `Node({"a": ...})` compares
/// `a.<leaf>`.
///
/// ```rust
/// use dynamodb_model::common::condition::{Condition, ConditionMap, LogicalOperator};
///
/// let map = ConditionMap::Leaves(
///     LogicalOperator::And,
///     vec![Condition::Equals("active".into()).on("status")],
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionMap {
    /// Flat conditions combined with the operator.
    Leaves(LogicalOperator, Vec<KeyCondition>),
    /// Conditions on nested attribute paths.
    Node(LogicalOperator, IndexMap<String, ConditionMap>),
}

impl From<KeyCondition> for ConditionMap {
    fn from(condition: KeyCondition) -> Self {
        Self::Leaves(LogicalOperator::And, vec![condition])
    }
}

impl TryFrom<ConditionMap> for common::ExpressionInput {
    type Error = Error;

    fn try_from(condition_map: ConditionMap) -> Result<Self> {
        condition_map.into_expression_input(&mut 0)
    }
}

impl ConditionMap {
    /// Compile, numbering value placeholders from `index`.
    pub(crate) fn into_expression_input(self, index: &mut usize) -> Result<common::ExpressionInput> {
        self.get_expression_operation_recursive(&[], index, false)
    }

    fn is_composite(&self, is_nested: bool) -> bool {
        match self {
            Self::Leaves(_, leaves) => is_nested && leaves.len() > 1,
            Self::Node(_, map) => {
                let has_multiple_keys = map.len() > 1;
                let child_is_nested = is_nested || has_multiple_keys;
                // a composite child is wrapped on its own
                if map.values().any(|value| value.is_composite(child_is_nested)) {
                    return false;
                }
                is_nested && has_multiple_keys
            }
        }
    }

    fn get_expression_operation_recursive(
        self,
        keys: &[String],
        index: &mut usize,
        mut is_nested: bool,
    ) -> Result<common::ExpressionInput> {
        let mut operations = Vec::new();
        let is_composite = self.is_composite(is_nested);
        let operator = match self {
            Self::Leaves(operator, key_conditions) => {
                for key_condition in key_conditions {
                    let (placeholder, new_keys) =
                        common::add_placeholder(keys, &key_condition.name);
                    let key_placeholder = new_keys.join(".");
                    let (expression, expression_attribute_values) = key_condition
                        .condition
                        .get_expression(&key_condition.name, &key_placeholder, index)?;
                    operations.push(common::ExpressionInput {
                        expression,
                        expression_attribute_names: collections::HashMap::from([(
                            placeholder,
                            key_condition.name,
                        )]),
                        expression_attribute_values,
                    });
                }
                operator
            }
            Self::Node(operator, map) => {
                operations.reserve(map.len());
                is_nested = is_nested || map.len() > 1;
                for (key, value) in map {
                    let (placeholder, new_keys) = common::add_placeholder(keys, &key);
                    let mut operation =
                        value.get_expression_operation_recursive(&new_keys, index, is_nested)?;
                    operation.expression_attribute_names.insert(placeholder, key);
                    operations.push(operation);
                }
                operator
            }
        };
        let mut operation = common::ExpressionInput::merge(&operator, operations);
        if is_composite {
            operation.expression = format!("({})", operation.expression);
        }
        Ok(operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use rstest::rstest;

    #[rstest]
    #[case::leaves_single_condition(
        ConditionMap::Leaves(
            LogicalOperator::And,
            vec![
                KeyCondition {
                    name: "a".to_string(),
                    condition: Condition::Equals(
                        Value::from(1)
                    ),
                },
            ]
        ),
        common::ExpressionInput {
            expression: "#a = :a_eq0".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [(
                    "#a".to_string(),
                    "a".to_string(),
                )]
            ),
            expression_attribute_values: collections::HashMap::from(
                [(
                    ":a_eq0".to_string(),
                    types::AttributeValue::N(
                        "1".to_string()
                    ),
                )]
            ),
        }
    )]
    #[case::leaves_float_and_date(
        ConditionMap::Leaves(
            LogicalOperator::And,
            vec![
                Condition::GreaterThanOrEqual(Value::from(1.5)).on("price"),
                Condition::LessThan(
                    Value::from(
                        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
                    )
                ).on("created"),
            ]
        ),
        common::ExpressionInput {
            expression: "#price >= :price_gte0 AND #created < :created_lt1".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#price".to_string(), "price".to_string()),
                    ("#created".to_string(), "created".to_string()),
                ]
            ),
            expression_attribute_values: collections::HashMap::from(
                [
                    (
                        ":price_gte0".to_string(),
                        types::AttributeValue::N(
                            "1.5".to_string()
                        )
                    ),
                    (
                        ":created_lt1".to_string(),
                        types::AttributeValue::S(
                            "2024-01-31".to_string()
                        )
                    ),
                ]
            ),
        }
    )]
    #[case::leaves_multiple_conditions_or(
        ConditionMap::Leaves(
            LogicalOperator::Or,
            vec![
                KeyCondition {
                    name: "a".to_string(),
                    condition: Condition::Between(
                        Value::from(1),
                        Value::from(10),
                    ),
                },
                KeyCondition {
                    name: "b".to_string(),
                    condition: Condition::BeginsWith(
                        "c".to_string()
                    ),
                },
            ]
        ),
        common::ExpressionInput {
            expression: "#a BETWEEN :a_between0 AND :a_between1 OR begins_with(#b, :b_begins_with2)".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#a".to_string(), "a".to_string()),
                    ("#b".to_string(), "b".to_string()),
                ]
            ),
            expression_attribute_values: collections::HashMap::from(
                [
                    (
                        ":a_between0".to_string(),
                        types::AttributeValue::N(
                            "1".to_string()
                        )
                    ),
                    (
                        ":a_between1".to_string(),
                        types::AttributeValue::N(
                            "10".to_string()
                        )
                    ),
                    (
                        ":b_begins_with2".to_string(),
                        types::AttributeValue::S(
                            "c".to_string()
                        )
                    ),
                ]
            ),
        }
    )]
    #[case::leaves_in_and_exists(
        ConditionMap::Leaves(
            LogicalOperator::And,
            vec![
                Condition::In(
                    vec![
                        Value::from("x"),
                        Value::from("y"),
                    ]
                ).on("status"),
                Condition::NotNull.on("owner"),
            ]
        ),
        common::ExpressionInput {
            expression: "#status IN (:status_in0_0, :status_in1_1) AND attribute_exists(#owner)".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#status".to_string(), "status".to_string()),
                    ("#owner".to_string(), "owner".to_string()),
                ]
            ),
            expression_attribute_values: collections::HashMap::from(
                [
                    (
                        ":status_in0_0".to_string(),
                        types::AttributeValue::S(
                            "x".to_string()
                        )
                    ),
                    (
                        ":status_in1_1".to_string(),
                        types::AttributeValue::S(
                            "y".to_string()
                        )
                    ),
                ]
            ),
        }
    )]
    #[case::node_nested(
        ConditionMap::Node(
            LogicalOperator::And,
            IndexMap::from(
                [
                    (
                        "a".to_string(),
                        ConditionMap::Node(
                            LogicalOperator::And,
                            IndexMap::from(
                                [
                                    (
                                        "b".to_string(),
                                        ConditionMap::Leaves(
                                            LogicalOperator::And,
                                            vec![
                                                Condition::Equals(Value::from("d")).on("c"),
                                                Condition::Equals(Value::from("f")).on("e"),
                                            ]
                                        )
                                    )
                                ]
                            )
                        )
                    ),
                    (
                        "b".to_string(),
                        ConditionMap::Leaves(
                            LogicalOperator::Or,
                            vec![
                                Condition::Equals(Value::from("h")).on("g"),
                                Condition::NotEqual(Value::from("j")).on("i"),
                            ]
                        )
                    )
                ]
            )
        ),
        common::ExpressionInput {
            expression: "(#a.#b.#c = :c_eq0 AND #a.#b.#e = :e_eq1) AND (#b.#g = :g_eq2 OR #b.#i <> :i_ne3)".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [
                    ("#a".to_string(), "a".to_string()),
                    ("#b".to_string(), "b".to_string()),
                    ("#c".to_string(), "c".to_string()),
                    ("#e".to_string(), "e".to_string()),
                    ("#g".to_string(), "g".to_string()),
                    ("#i".to_string(), "i".to_string()),
                ]
            ),
            expression_attribute_values: collections::HashMap::from(
                [
                    (
                        ":c_eq0".to_string(),
                        types::AttributeValue::S(
                            "d".to_string()
                        )
                    ),
                    (
                        ":e_eq1".to_string(),
                        types::AttributeValue::S(
                            "f".to_string()
                        )
                    ),
                    (
                        ":g_eq2".to_string(),
                        types::AttributeValue::S(
                            "h".to_string()
                        )
                    ),
                    (
                        ":i_ne3".to_string(),
                        types::AttributeValue::S(
                            "j".to_string()
                        )
                    ),
                ]
            ),
        }
    )]
    #[case::leaves_same_key_or(
        ConditionMap::Leaves(
            LogicalOperator::Or,
            vec![
                Condition::GreaterThan(Value::from(5)).on("a"),
                Condition::LessThan(Value::from(3)).on("a"),
            ]
        ),
        common::ExpressionInput {
            expression: "#a > :a_gt0 OR #a < :a_lt1".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [(
                    "#a".to_string(),
                    "a".to_string(),
                )]
            ),
            expression_attribute_values: collections::HashMap::from(
                [
                    (
                        ":a_gt0".to_string(),
                        types::AttributeValue::N(
                            "5".to_string()
                        )
                    ),
                    (
                        ":a_lt1".to_string(),
                        types::AttributeValue::N(
                            "3".to_string()
                        )
                    ),
                ]
            ),
        }
    )]
    #[case::sanitized_name(
        ConditionMap::from(
            Condition::Null.on("my-attr")
        ),
        common::ExpressionInput {
            expression: "attribute_not_exists(#my_attr)".to_string(),
            expression_attribute_names: collections::HashMap::from(
                [(
                    "#my_attr".to_string(),
                    "my-attr".to_string(),
                )]
            ),
            ..Default::default()
        }
    )]
    fn test_condition_map_to_expression_input(
        #[case] condition_map: ConditionMap,
        #[case] expected: common::ExpressionInput,
    ) {
        let actual: common::ExpressionInput = condition_map.try_into().unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_key_conditions_continue_numbering() {
        let mut index = 0;
        let keys = KeyCondition::get_expression_operation(
            vec![
                Condition::Equals(Value::from("u1")).on("h"),
                Condition::BeginsWith("2024".to_string()).on("r"),
            ],
            &mut index,
        )
        .unwrap();
        assert_eq!(keys.expression, "#h = :h_eq0 AND begins_with(#r, :r_begins_with1)");
        let filter = ConditionMap::from(Condition::Equals(Value::from(1)).on("h"))
            .into_expression_input(&mut index)
            .unwrap();
        assert_eq!(filter.expression, "#h = :h_eq2");
    }

    #[rstest]
    #[case::empty_in(Condition::In(Vec::new()), "Operation in invalid state: IN on a needs at least one value")]
    #[case::nan(Condition::Equals(Value::from(f64::NAN)), "NaN input not compatible with finite Float")]
    fn test_condition_errors(#[case] condition: Condition, #[case] expected: &str) {
        let error = common::ExpressionInput::try_from(ConditionMap::from(condition.on("a"))).unwrap_err();
        assert_eq!(error.to_string(), expected);
    }
}
