use crate::common;

use indexmap::IndexMap;
use std::collections;

/// Attributes a read returns.
///
/// ```rust
/// use dynamodb_model::common::selection::SelectionMap;
///
/// let selection = SelectionMap::from_names(["id", "name", "id"]);
/// assert_eq!(selection, SelectionMap::Leaves(vec!["id".to_string(), "name".to_string()]));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SelectionMap {
    /// Top-level attribute names.
    Leaves(Vec<String>),
    /// Attributes nested under map attributes.
    Node(IndexMap<String, SelectionMap>),
}

impl SelectionMap {
    /// Flat selection keeping the first occurrence of each name.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut leaves: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !leaves.contains(&name) {
                leaves.push(name);
            }
        }
        Self::Leaves(leaves)
    }

    /// Selected paths, dotted, in expression order.
    pub fn paths(&self) -> Vec<String> {
        match self {
            Self::Leaves(leaves) => leaves.clone(),
            Self::Node(map) => map
                .iter()
                .flat_map(|(key, value)| {
                    value
                        .paths()
                        .into_iter()
                        .map(move |path| format!("{key}.{path}"))
                })
                .collect(),
        }
    }

    fn get_selection_operation_recursive(self, keys: &[String]) -> common::ExpressionInput {
        let operations: Vec<_> = match self {
            Self::Leaves(leaves) => leaves
                .into_iter()
                .map(|leaf| {
                    let (placeholder, new_keys) = common::add_placeholder(keys, &leaf);
                    common::ExpressionInput {
                        expression: new_keys.join("."),
                        expression_attribute_names: collections::HashMap::from([(placeholder, leaf)]),
                        ..Default::default()
                    }
                })
                .collect(),
            Self::Node(map) => map
                .into_iter()
                .map(|(key, value)| {
                    let (placeholder, new_keys) = common::add_placeholder(keys, &key);
                    let mut operation = value.get_selection_operation_recursive(&new_keys);
                    operation.expression_attribute_names.insert(placeholder, key);
                    operation
                })
                .collect(),
        };
        common::ExpressionInput::merge(", ", operations)
    }
}

impl From<SelectionMap> for common::ExpressionInput {
    fn from(selection_map: SelectionMap) -> Self {
        selection_map.get_selection_operation_recursive(&[])
    }
}
