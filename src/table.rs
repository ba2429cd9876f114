//! Record-level façade over one table.
//!
//! A [`Table`] pairs a client with a record type and forwards to the
//! [`read`](crate::read) and [`write`](crate::write) operations, keeping the
//! in-memory record in step with the store where it can.

use crate::{
    error::{Error, Result},
    expression::UpdateFragment,
    mapper::{self, QueryArgs, ScanArgs},
    model::{
        record::{Record, RecordType},
        value::Value,
    },
    read, write,
};

use aws_sdk_dynamodb::{Client, operation};
use std::sync::Arc;

/// Operations on the table a record type is bound to.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_model::{
///     expression::Expr,
///     model::{field::FieldType, record::{Record, RecordType}},
///     table::Table,
///     write::common::WriteArgs,
/// };
///
/// # async fn example(client: Client) -> Result<(), Box<dyn std::error::Error>> {
/// let users = RecordType::builder("User")
///     .table_name("users")
///     .hash_key("id")
///     .field("id", FieldType::string())
///     .field("visits", FieldType::integer().optional())
///     .build()?;
/// let table = Table::new(client, &users);
/// if !table.table_exists().await? {
///     table.create_table().await?;
/// }
/// let mut user = Record::new(&users).with("id", "1")?.with("visits", 0)?;
/// table.save(&mut user, WriteArgs::default()).await?;
/// let visit = Expr::new(&users).field("visits")?.set_add(1)?;
/// table.update(&mut user, vec![visit], WriteArgs::default()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Table {
    client: Client,
    record_type: Arc<RecordType>,
}

impl Table {
    /// Table of `record_type`, reached through `client`.
    pub fn new(client: Client, record_type: &Arc<RecordType>) -> Self {
        Self {
            client,
            record_type: Arc::clone(record_type),
        }
    }

    /// Record type stored in this table.
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    fn check_record(&self, record: &Record) -> Result<()> {
        if record.record_type().name() != self.record_type.name() {
            return Err(Error::InvalidState(format!(
                "{} record given to a {} table",
                record.record_type().name(),
                self.record_type.name()
            )));
        }
        Ok(())
    }

    /// Resync `record` after a failed write, keeping the write error.
    async fn resync(&self, record: &mut Record, error: Error) -> Error {
        if let Err(refresh_error) = self.refresh(record).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                record_type = self.record_type.name(),
                error = %refresh_error,
                "refresh after a failed write also failed"
            );
            #[cfg(not(feature = "tracing"))]
            drop(refresh_error);
        }
        error
    }

    /// Store `record`, replacing any item with the same key.
    ///
    /// On failure the record is refreshed from the store before the error is
    /// returned.
    pub async fn save(&self, record: &mut Record, write_args: write::common::WriteArgs) -> Result<()> {
        self.check_record(record)?;
        let put_item = write::put_item::PutItem {
            record: record.clone(),
            write_args,
        };
        match put_item.send(&self.client).await {
            Ok(_) => Ok(()),
            Err(error @ Error::Put(_)) => Err(self.resync(record, error).await),
            Err(error) => Err(error),
        }
    }

    /// Record stored under the given key.
    pub async fn get(&self, hash_key: impl Into<Value>, range_key: Option<Value>) -> Result<Record> {
        let get_item = read::get_item::GetItem {
            range_key,
            ..read::get_item::GetItem::new(&self.record_type, hash_key)
        };
        get_item.send(&self.client).await
    }

    /// Apply `fragments` to the stored copy of `record`, then refresh it.
    ///
    /// On failure the record is refreshed from the store before the error is
    /// returned.
    pub async fn update(
        &self,
        record: &mut Record,
        fragments: Vec<UpdateFragment>,
        write_args: write::common::WriteArgs,
    ) -> Result<()> {
        self.check_record(record)?;
        let update_item = write::update_item::UpdateItem {
            fragments,
            write_args,
            ..write::update_item::UpdateItem::for_record(record)?
        };
        match update_item.send(&self.client).await {
            Ok(_) => self.refresh(record).await,
            Err(error @ Error::Update(_)) => Err(self.resync(record, error).await),
            Err(error) => Err(error),
        }
    }

    /// Delete the stored copy of `record`.
    pub async fn delete(&self, record: &Record, write_args: write::common::WriteArgs) -> Result<()> {
        self.check_record(record)?;
        let delete_item = write::delete_item::DeleteItem {
            write_args,
            ..write::delete_item::DeleteItem::for_record(record)?
        };
        delete_item.send(&self.client).await?;
        Ok(())
    }

    /// Replace the fields of `record` with its stored copy, read consistently.
    pub async fn refresh(&self, record: &mut Record) -> Result<()> {
        self.check_record(record)?;
        let (hash_key, range_key) = mapper::key_values(record)?;
        let get_item = read::get_item::GetItem {
            range_key,
            single_read_args: read::common::SingleReadArgs {
                consistent_read: Some(true),
                ..Default::default()
            },
            ..read::get_item::GetItem::new(&self.record_type, hash_key)
        };
        let stored = get_item.send(&self.client).await?;
        record.replace_fields(stored);
        Ok(())
    }

    /// Records under one hash key, following every page.
    pub async fn query(&self, hash_value: impl Into<Value>, query_args: QueryArgs) -> Result<Vec<Record>> {
        let query = read::query::Query {
            query_args,
            ..read::query::Query::new(&self.record_type, hash_value)
        };
        query.send(&self.client).await
    }

    /// Every record matching `scan_args`, following every page.
    pub async fn scan(&self, scan_args: ScanArgs) -> Result<Vec<Record>> {
        let scan = read::scan::Scan {
            scan_args,
            ..read::scan::Scan::new(&self.record_type)
        };
        scan.send(&self.client).await
    }

    /// Create the table with its keys, capacity and secondary indexes.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_model.create_table",
            skip(self),
            fields(record_type = self.record_type.name()),
            err
        )
    )]
    pub async fn create_table(&self) -> Result<()> {
        let input = create_table_input(&self.record_type)?;
        self.client
            .create_table()
            .set_table_name(input.table_name)
            .set_key_schema(input.key_schema)
            .set_attribute_definitions(input.attribute_definitions)
            .set_provisioned_throughput(input.provisioned_throughput)
            .set_global_secondary_indexes(input.global_secondary_indexes)
            .set_local_secondary_indexes(input.local_secondary_indexes)
            .send()
            .await
            .map_err(|error| Error::Table(Box::new(error.into())))?;
        Ok(())
    }

    /// Delete the table and every item in it.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_model.delete_table",
            skip(self),
            fields(record_type = self.record_type.name()),
            err
        )
    )]
    pub async fn delete_table(&self) -> Result<()> {
        self.client
            .delete_table()
            .table_name(self.record_type.table_name()?)
            .send()
            .await
            .map_err(|error| Error::Table(Box::new(error.into())))?;
        Ok(())
    }

    /// Whether the table exists.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_model.table_exists",
            skip(self),
            fields(record_type = self.record_type.name()),
            err
        )
    )]
    pub async fn table_exists(&self) -> Result<bool> {
        let output = self
            .client
            .describe_table()
            .table_name(self.record_type.table_name()?)
            .send()
            .await;
        match output.map_err(aws_sdk_dynamodb::Error::from) {
            Ok(_) => Ok(true),
            Err(aws_sdk_dynamodb::Error::ResourceNotFoundException(_)) => Ok(false),
            Err(error) => Err(Error::Table(Box::new(error))),
        }
    }
}

/// Create table request for `record_type`.
fn create_table_input(record_type: &RecordType) -> Result<operation::create_table::CreateTableInput> {
    let global_secondary_indexes = mapper::global_secondary_indexes(record_type)?;
    let local_secondary_indexes = mapper::local_secondary_indexes(record_type)?;
    let input = operation::create_table::CreateTableInput::builder()
        .table_name(record_type.table_name()?)
        .set_key_schema(Some(mapper::key_schema(record_type)?))
        .set_attribute_definitions(Some(mapper::attribute_definitions(record_type)?))
        .provisioned_throughput(mapper::table_throughput(record_type)?)
        .set_global_secondary_indexes(
            Some(global_secondary_indexes).filter(|indexes| !indexes.is_empty()),
        )
        .set_local_secondary_indexes(
            Some(local_secondary_indexes).filter(|indexes| !indexes.is_empty()),
        )
        .build()?;
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{
        field::FieldType,
        index::{SecondaryIndex, Throughput},
    };

    use aws_sdk_dynamodb::types;
    use rstest::{fixture, rstest};

    #[fixture]
    fn users() -> Arc<RecordType> {
        RecordType::builder("User")
            .table_name("users")
            .hash_key("id")
            .field("id", FieldType::string())
            .field("email", FieldType::string().optional())
            .throughput(Throughput {
                read_capacity_units: 5,
                write_capacity_units: 2,
            })
            .index(SecondaryIndex::global("by-email", "email", None))
            .build()
            .unwrap()
    }

    fn client() -> Client {
        Client::from_conf(
            aws_sdk_dynamodb::config::Config::builder()
                .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
                .build(),
        )
    }

    #[rstest]
    fn test_create_table_input(users: Arc<RecordType>) {
        let actual = create_table_input(&users).unwrap();
        let expected = operation::create_table::CreateTableInput::builder()
            .table_name("users")
            .set_key_schema(
                Some(
                    vec![
                        types::KeySchemaElement::builder()
                            .attribute_name("id")
                            .key_type(types::KeyType::Hash)
                            .build()
                            .unwrap(),
                    ]
                )
            )
            .set_attribute_definitions(
                Some(
                    vec![
                        types::AttributeDefinition::builder()
                            .attribute_name("id")
                            .attribute_type(types::ScalarAttributeType::S)
                            .build()
                            .unwrap(),
                        types::AttributeDefinition::builder()
                            .attribute_name("email")
                            .attribute_type(types::ScalarAttributeType::S)
                            .build()
                            .unwrap(),
                    ]
                )
            )
            .provisioned_throughput(
                types::ProvisionedThroughput::builder()
                    .read_capacity_units(5)
                    .write_capacity_units(2)
                    .build()
                    .unwrap()
            )
            .global_secondary_indexes(
                types::GlobalSecondaryIndex::builder()
                    .index_name("by-email")
                    .key_schema(
                        types::KeySchemaElement::builder()
                            .attribute_name("email")
                            .key_type(types::KeyType::Hash)
                            .build()
                            .unwrap()
                    )
                    .projection(
                        types::Projection::builder()
                            .projection_type(types::ProjectionType::All)
                            .build()
                    )
                    .provisioned_throughput(
                        types::ProvisionedThroughput::builder()
                            .read_capacity_units(1)
                            .write_capacity_units(1)
                            .build()
                            .unwrap()
                    )
                    .build()
                    .unwrap()
            )
            .build()
            .unwrap();
        assert_eq!(actual, expected);
    }

    #[rstest]
    fn test_create_table_input_unbound() {
        let unbound = RecordType::builder("Address")
            .field("street", FieldType::string())
            .build()
            .unwrap();
        assert!(create_table_input(&unbound).is_err());
    }

    #[rstest]
    fn test_check_record(users: Arc<RecordType>) {
        let orders = RecordType::builder("Order")
            .table_name("orders")
            .hash_key("id")
            .field("id", FieldType::string())
            .build()
            .unwrap();
        let table = Table::new(client(), &users);
        assert!(table.check_record(&Record::new(&users)).is_ok());
        let error = table.check_record(&Record::new(&orders)).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Operation in invalid state: Order record given to a User table"
        );
    }
}
