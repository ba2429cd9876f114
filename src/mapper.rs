//! Whole-record mapping between records and the requests of the store.
//!
//! Everything here is pure: it reads the record type, converts values through
//! the [`codec`](crate::codec) and returns request parameters. Sending them is
//! left to the [`read`](crate::read) and [`write`](crate::write) operations.

use crate::{
    codec::{self, Reconstruction},
    common::{
        self,
        condition::{Condition, ConditionMap, KeyCondition},
        key::{Key, Keys},
        selection::SelectionMap,
        Item,
    },
    error::{AttributeNullError, Error, Result},
    expression,
    model::{
        index::{IndexKind, SecondaryIndex},
        record::{Record, RecordType},
        value::Value,
    },
    resolver,
};

use aws_sdk_dynamodb::types;
use std::{collections, sync::Arc};

/// Wire item of a record.
///
/// Fails when a required field, at any depth, has no value, or when a field
/// holds a value its declared type does not admit. A record read back with
/// [`Reconstruction::fallbacks`] has to be fixed before it can be stored again.
pub fn serialize(record: &Record) -> Result<Item> {
    record.validate()?;
    record.type_check()?;
    codec::serialize_fields(record)
}

/// Record rebuilt from a wire item.
///
/// Fields whose stored value no longer fits the declared type keep the raw
/// value and are listed in [`Reconstruction::fallbacks`].
pub fn deserialize(record_type: &Arc<RecordType>, item: &Item) -> Reconstruction {
    let reconstruction = codec::deserialize_fields(record_type, item);
    #[cfg(feature = "tracing")]
    for fallback in &reconstruction.fallbacks {
        tracing::warn!(
            record_type = record_type.name(),
            path = %fallback.path,
            error = %fallback.error,
            "stored value does not match the declared type, keeping it untyped"
        );
    }
    reconstruction
}

fn key_component(record_type: &RecordType, name: &str, value: Value) -> Result<Key> {
    if value.is_null() {
        return Err(AttributeNullError::new(name).into());
    }
    expression::type_check(&value, record_type.field(name)?)?;
    Ok(Key {
        name: name.to_string(),
        value,
    })
}

/// Key item from raw key values.
///
/// ```rust
/// use dynamodb_model::{
///     mapper,
///     model::{field::FieldType, record::RecordType},
/// };
///
/// let users = RecordType::builder("User")
///     .table_name("users")
///     .hash_key("id")
///     .field("id", FieldType::string())
///     .build()
///     .unwrap();
/// let key = mapper::key(&users, "u1", None).unwrap();
/// assert_eq!(key.len(), 1);
/// ```
pub fn key(record_type: &RecordType, hash: impl Into<Value>, range: Option<Value>) -> Result<Item> {
    let hash_key = record_type.require_hash_key()?;
    let partition_key = key_component(record_type, hash_key, hash.into())?;
    let sort_key = match (record_type.range_key(), range) {
        (Some(range_key), Some(range)) => Some(key_component(record_type, range_key, range)?),
        (Some(range_key), None) => return Err(AttributeNullError::new(range_key).into()),
        (None, Some(_)) => {
            return Err(Error::InvalidState(format!(
                "{} has no range key",
                record_type.name()
            )));
        }
        (None, None) => None,
    };
    Keys {
        partition_key,
        sort_key,
    }
    .try_into()
}

/// Hash and range key values of a record, `Null` where unset.
pub(crate) fn key_values(record: &Record) -> Result<(Value, Option<Value>)> {
    let record_type = record.record_type();
    let value_of = |name: &str| record.get(name).cloned().unwrap_or(Value::Null);
    let hash = value_of(record_type.require_hash_key()?);
    let range = record_type.range_key().map(value_of);
    Ok((hash, range))
}

/// Key item of a record.
pub fn primary_key(record: &Record) -> Result<Item> {
    let (hash, range) = key_values(record)?;
    key(record.record_type(), hash, range)
}

/// Query options beyond the hash key value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryArgs {
    /// Index to query instead of the table; must be declared on the record type.
    pub index: Option<SecondaryIndex>,
    /// Condition on the range key of the table or index.
    pub range_key_condition: Option<Condition>,
    /// Filter applied after the key condition.
    pub filter: Option<ConditionMap>,
    /// Attributes to return. Keys and required fields are always added.
    pub attributes_to_get: Option<Vec<String>>,
}

/// Scan options.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanArgs {
    /// Index to scan instead of the table; must be declared on the record type.
    pub index: Option<SecondaryIndex>,
    /// Filter applied to every item.
    pub filter: Option<ConditionMap>,
    /// Attributes to return. Keys and required fields are always added.
    pub attributes_to_get: Option<Vec<String>>,
}

/// Request parameters of a query or scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadParams {
    /// Table name.
    pub table_name: String,
    /// Index name.
    pub index_name: Option<String>,
    /// Key condition, queries only.
    pub key_condition_expression: Option<String>,
    /// Filter expression.
    pub filter_expression: Option<String>,
    /// Projection expression.
    pub projection_expression: Option<String>,
    /// Attribute names of the projection, in expression order.
    pub projected_attributes: Vec<String>,
    /// Name placeholders.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Value placeholders.
    pub expression_attribute_values: Option<Item>,
}

fn resolve_index<'a>(
    record_type: &'a RecordType,
    index: Option<&SecondaryIndex>,
) -> Result<Option<&'a SecondaryIndex>> {
    let Some(index) = index else {
        return Ok(None);
    };
    record_type
        .indexes()
        .iter()
        .find(|declared| *declared == index)
        .map(Some)
        .ok_or_else(|| Error::InvalidState("Index provided but index does not exist for model.".to_string()))
}

fn read_params(
    record_type: &RecordType,
    index: Option<&SecondaryIndex>,
    key_condition: Option<common::ExpressionInput>,
    filter: Option<ConditionMap>,
    attributes_to_get: Option<Vec<String>>,
    placeholder_index: &mut usize,
) -> Result<ReadParams> {
    let mut params = ReadParams {
        table_name: record_type.table_name()?.to_string(),
        index_name: index.map(|index| index.name().to_string()),
        ..Default::default()
    };
    if let Some(key_condition) = key_condition {
        params.key_condition_expression = Some(key_condition.merge_into(
            &mut params.expression_attribute_names,
            &mut params.expression_attribute_values,
        ));
    }
    if let Some(filter) = filter {
        let filter = filter.into_expression_input(placeholder_index)?;
        params.filter_expression = Some(filter.merge_into(
            &mut params.expression_attribute_names,
            &mut params.expression_attribute_values,
        ));
    }
    if let Some(attributes) = attributes_to_get.filter(|attributes| !attributes.is_empty()) {
        let names = record_type
            .hash_key()
            .into_iter()
            .chain(record_type.range_key())
            .chain(record_type.required_fields())
            .map(str::to_string)
            .chain(attributes);
        let selection = SelectionMap::from_names(names);
        params.projected_attributes = selection.paths();
        let projection = common::ExpressionInput::from(selection);
        params.projection_expression = Some(projection.merge_into(
            &mut params.expression_attribute_names,
            &mut params.expression_attribute_values,
        ));
    }
    Ok(params)
}

/// Query parameters for `hash_value`.
///
/// The key condition is equality on the hash key of the table, or of
/// `args.index`, ANDed with the optional range key condition.
pub fn prepare_query(
    record_type: &RecordType,
    hash_value: impl Into<Value>,
    args: QueryArgs,
) -> Result<ReadParams> {
    let index = resolve_index(record_type, args.index.as_ref())?;
    let (hash_key, range_key) = match index {
        Some(index) => (index.hash_key(), index.range_key()),
        None => (record_type.require_hash_key()?, record_type.range_key()),
    };
    let mut keys = vec![key_component(record_type, hash_key, hash_value.into()).map(
        |key| KeyCondition {
            condition: Condition::Equals(key.value),
            name: key.name,
        },
    )?];
    if let Some(condition) = args.range_key_condition {
        let range_key = range_key.ok_or_else(|| {
            Error::InvalidState(format!("range key condition on {} without a range key", record_type.name()))
        })?;
        keys.push(condition.on(range_key));
    }
    let mut placeholder_index = 0;
    let key_condition = KeyCondition::get_expression_operation(keys, &mut placeholder_index)?;
    read_params(
        record_type,
        index,
        Some(key_condition),
        args.filter,
        args.attributes_to_get,
        &mut placeholder_index,
    )
}

/// Scan parameters.
pub fn prepare_scan(record_type: &RecordType, args: ScanArgs) -> Result<ReadParams> {
    let index = resolve_index(record_type, args.index.as_ref())?;
    read_params(
        record_type,
        index,
        None,
        args.filter,
        args.attributes_to_get,
        &mut 0,
    )
}

fn key_schema_of(hash_key: &str, range_key: Option<&str>) -> Result<Vec<types::KeySchemaElement>> {
    let mut key_schema = vec![
        types::KeySchemaElement::builder()
            .attribute_name(hash_key)
            .key_type(types::KeyType::Hash)
            .build()?,
    ];
    if let Some(range_key) = range_key {
        key_schema.push(
            types::KeySchemaElement::builder()
                .attribute_name(range_key)
                .key_type(types::KeyType::Range)
                .build()?,
        );
    }
    Ok(key_schema)
}

/// Table key schema: hash key, then range key.
pub fn key_schema(record_type: &RecordType) -> Result<Vec<types::KeySchemaElement>> {
    key_schema_of(record_type.require_hash_key()?, record_type.range_key())
}

/// One definition per key attribute of the table and of every index.
pub fn attribute_definitions(record_type: &RecordType) -> Result<Vec<types::AttributeDefinition>> {
    let mut names: Vec<&str> = Vec::new();
    let table_keys = std::iter::once(record_type.require_hash_key()?).chain(record_type.range_key());
    let index_keys = record_type.indexes().iter().flat_map(SecondaryIndex::key_names);
    for name in table_keys.chain(index_keys) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
        .into_iter()
        .map(|name| -> Result<_> {
            let wire_type = resolver::field_wire_type(record_type, name)?;
            let attribute_type = wire_type
                .scalar_attribute_type()
                .ok_or_else(|| Error::type_invalid(wire_type, "{S, N, B}"))?;
            Ok(types::AttributeDefinition::builder()
                .attribute_name(name)
                .attribute_type(attribute_type)
                .build()?)
        })
        .collect()
}

fn provisioned_throughput(
    throughput: crate::model::index::Throughput,
) -> Result<types::ProvisionedThroughput> {
    Ok(types::ProvisionedThroughput::builder()
        .read_capacity_units(throughput.read_capacity_units)
        .write_capacity_units(throughput.write_capacity_units)
        .build()?)
}

/// Table capacity.
pub fn table_throughput(record_type: &RecordType) -> Result<types::ProvisionedThroughput> {
    let throughput = record_type
        .table()
        .map(|table| table.throughput)
        .ok_or_else(|| Error::InvalidState(format!("{} is not bound to a table", record_type.name())))?;
    provisioned_throughput(throughput)
}

fn projection(index: &SecondaryIndex) -> types::Projection {
    types::Projection::builder()
        .projection_type(index.projection().into())
        .build()
}

/// Global secondary index definitions.
pub fn global_secondary_indexes(record_type: &RecordType) -> Result<Vec<types::GlobalSecondaryIndex>> {
    record_type
        .indexes()
        .iter()
        .filter_map(|index| match index.kind() {
            IndexKind::Global(throughput) => Some((index, throughput)),
            IndexKind::Local => None,
        })
        .map(|(index, throughput)| -> Result<_> {
            Ok(types::GlobalSecondaryIndex::builder()
                .index_name(index.name())
                .set_key_schema(Some(key_schema_of(index.hash_key(), index.range_key())?))
                .projection(projection(index))
                .provisioned_throughput(provisioned_throughput(throughput)?)
                .build()?)
        })
        .collect()
}

/// Local secondary index definitions.
pub fn local_secondary_indexes(record_type: &RecordType) -> Result<Vec<types::LocalSecondaryIndex>> {
    record_type
        .indexes()
        .iter()
        .filter(|index| index.kind() == IndexKind::Local)
        .map(|index| -> Result<_> {
            Ok(types::LocalSecondaryIndex::builder()
                .index_name(index.name())
                .set_key_schema(Some(key_schema_of(index.hash_key(), index.range_key())?))
                .projection(projection(index))
                .build()?)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{field::FieldType, index::ProjectionMode};

    use rstest::{fixture, rstest};

    #[fixture]
    fn by_email() -> SecondaryIndex {
        SecondaryIndex::global("by-email", "email", Some("r"))
    }

    #[fixture]
    fn by_score() -> SecondaryIndex {
        SecondaryIndex::local("by-score", "h", Some("score")).with_projection(ProjectionMode::KeysOnly)
    }

    #[fixture]
    fn events(by_email: SecondaryIndex, by_score: SecondaryIndex) -> Arc<RecordType> {
        RecordType::builder("Event")
            .table_name("events")
            .hash_key("h")
            .range_key("r")
            .field("h", FieldType::string())
            .field("r", FieldType::integer())
            .field("req", FieldType::string())
            .field("a", FieldType::float().optional())
            .field("b", FieldType::string().optional())
            .field("email", FieldType::string().optional())
            .field("score", FieldType::decimal().optional())
            .index(by_email)
            .index(by_score)
            .build()
            .unwrap()
    }

    #[fixture]
    fn event(events: Arc<RecordType>) -> Record {
        Record::new(&events)
            .with("h", "u1")
            .unwrap()
            .with("r", 7)
            .unwrap()
            .with("req", "x")
            .unwrap()
            .with("a", 0.5)
            .unwrap()
    }

    #[rstest]
    fn test_serialize_skips_unset(event: Record) {
        let item = serialize(&event).unwrap();
        assert_eq!(
            item,
            Item::from([
                ("h".to_string(), types::AttributeValue::S("u1".to_string())),
                ("r".to_string(), types::AttributeValue::N("7".to_string())),
                ("req".to_string(), types::AttributeValue::S("x".to_string())),
                ("a".to_string(), types::AttributeValue::N("0.5".to_string())),
            ])
        );
    }

    #[rstest]
    fn test_serialize_requires_required_fields(events: Arc<RecordType>) {
        let record = Record::new(&events).with("h", "u1").unwrap();
        let error = serialize(&record).unwrap_err();
        assert_eq!(error.to_string(), "Attribute 'r' cannot be None");
    }

    #[rstest]
    fn test_serialize_rejects_stored_fallback(events: Arc<RecordType>, event: Record) {
        let mut item = serialize(&event).unwrap();
        item.insert("a".to_string(), types::AttributeValue::S("not a number".to_string()));
        let reconstruction = deserialize(&events, &item);
        assert!(!reconstruction.is_complete());
        let error = serialize(&reconstruction.record).unwrap_err();
        assert_eq!(error.to_string(), "String input not compatible with {Float}");
    }

    #[rstest]
    fn test_deserialize_round_trip(events: Arc<RecordType>, event: Record) {
        let item = serialize(&event).unwrap();
        let reconstruction = deserialize(&events, &item);
        assert!(reconstruction.is_complete());
        assert_eq!(reconstruction.record, event);
    }

    #[rstest]
    fn test_primary_key(event: Record) {
        assert_eq!(
            primary_key(&event).unwrap(),
            Item::from([
                ("h".to_string(), types::AttributeValue::S("u1".to_string())),
                ("r".to_string(), types::AttributeValue::N("7".to_string())),
            ])
        );
    }

    #[rstest]
    #[case::missing_range(Value::from("u1"), None, "Attribute 'r' cannot be None")]
    #[case::null_hash(Value::Null, Some(Value::from(1)), "Attribute 'h' cannot be None")]
    #[case::wrong_hash_type(Value::from(1), Some(Value::from(1)), "Integer input not compatible with {String}")]
    fn test_key_errors(
        events: Arc<RecordType>,
        #[case] hash: Value,
        #[case] range: Option<Value>,
        #[case] expected: &str,
    ) {
        let error = key(&events, hash, range).unwrap_err();
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    fn test_prepare_query_key_condition(events: Arc<RecordType>) {
        let params = prepare_query(
            &events,
            "u1",
            QueryArgs {
                range_key_condition: Some(Condition::GreaterThan(Value::from(3))),
                filter: Some(Condition::Equals(Value::from("y")).on("b").into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(
            params,
            ReadParams {
                table_name: "events".to_string(),
                key_condition_expression: Some("#h = :h_eq0 AND #r > :r_gt1".to_string()),
                filter_expression: Some("#b = :b_eq2".to_string()),
                expression_attribute_names: Some(collections::HashMap::from([
                    ("#h".to_string(), "h".to_string()),
                    ("#r".to_string(), "r".to_string()),
                    ("#b".to_string(), "b".to_string()),
                ])),
                expression_attribute_values: Some(Item::from([
                    (":h_eq0".to_string(), types::AttributeValue::S("u1".to_string())),
                    (":r_gt1".to_string(), types::AttributeValue::N("3".to_string())),
                    (":b_eq2".to_string(), types::AttributeValue::S("y".to_string())),
                ])),
                ..Default::default()
            }
        );
    }

    #[rstest]
    fn test_prepare_query_projection_union(events: Arc<RecordType>) {
        let params = prepare_query(
            &events,
            "u1",
            QueryArgs {
                attributes_to_get: Some(vec!["a".to_string(), "h".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();
        let mut projected = params.projected_attributes.clone();
        projected.sort();
        assert_eq!(projected, vec!["a", "h", "r", "req"]);
        assert_eq!(params.projection_expression.as_deref(), Some("#h, #r, #req, #a"));
        let names = params.expression_attribute_names.unwrap();
        assert_eq!(names.get("#req").map(String::as_str), Some("req"));
    }

    #[rstest]
    fn test_prepare_query_on_index(events: Arc<RecordType>, by_email: SecondaryIndex) {
        let params = prepare_query(
            &events,
            "someone@example.com",
            QueryArgs {
                index: Some(by_email),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(params.index_name.as_deref(), Some("by-email"));
        assert_eq!(params.key_condition_expression.as_deref(), Some("#email = :email_eq0"));
    }

    #[rstest]
    fn test_prepare_query_unknown_index(events: Arc<RecordType>) {
        let error = prepare_query(
            &events,
            "u1",
            QueryArgs {
                index: Some(SecondaryIndex::global("other", "email", None)),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Operation in invalid state: Index provided but index does not exist for model."
        );
    }

    #[rstest]
    fn test_prepare_scan_has_no_key_condition(events: Arc<RecordType>) {
        let params = prepare_scan(
            &events,
            ScanArgs {
                filter: Some(Condition::NotNull.on("email").into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(params.key_condition_expression, None);
        assert_eq!(params.filter_expression.as_deref(), Some("attribute_exists(#email)"));
        assert_eq!(params.expression_attribute_values, None);
    }

    #[rstest]
    fn test_attribute_definitions(events: Arc<RecordType>) {
        let definitions: Vec<(String, types::ScalarAttributeType)> = attribute_definitions(&events)
            .unwrap()
            .into_iter()
            .map(|definition| {
                (
                    definition.attribute_name().to_string(),
                    definition.attribute_type().clone(),
                )
            })
            .collect();
        assert_eq!(
            definitions,
            vec![
                ("h".to_string(), types::ScalarAttributeType::S),
                ("r".to_string(), types::ScalarAttributeType::N),
                ("email".to_string(), types::ScalarAttributeType::S),
                ("score".to_string(), types::ScalarAttributeType::N),
            ]
        );
    }

    #[rstest]
    fn test_secondary_indexes(events: Arc<RecordType>) {
        let global = global_secondary_indexes(&events).unwrap();
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].index_name(), "by-email");
        let local = local_secondary_indexes(&events).unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(
            local[0].projection().and_then(|projection| projection.projection_type()),
            Some(&types::ProjectionType::KeysOnly)
        );
        assert_eq!(key_schema(&events).unwrap().len(), 2);
    }
}
