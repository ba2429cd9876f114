#![deny(missing_docs)]

//! # DynamoDB Model
//!
//! Typed records for Amazon DynamoDB.
//!
//! ## Overview
//!
//! Declare a [`RecordType`](model::record::RecordType) once, then:
//! - store and load [`Record`](model::record::Record)s, with every field converted to and
//!   from the store's wire values by the [`codec`]
//! - build type-checked update expressions with [`Expr`](expression::Expr)
//! - query, scan, batch and transact through the [`read`] and [`write`] operations, or
//!   through a [`Table`](table::Table)
//!
//! ## Quick Example
//!
//! ```no_run
//! use aws_sdk_dynamodb::Client;
//! use dynamodb_model::{
//!     expression::Expr,
//!     model::{field::FieldType, record::{Record, RecordType}},
//!     write,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let client = Client::from_conf(aws_sdk_dynamodb::config::Config::builder().build());
//! let users = RecordType::builder("User")
//!     .table_name("users")
//!     .hash_key("id")
//!     .field("id", FieldType::string())
//!     .field("age", FieldType::integer().optional())
//!     .field("tags", FieldType::set(FieldType::string()).optional())
//!     .build()?;
//!
//! let user = Record::new(&users).with("id", "1")?.with("age", 41)?;
//! write::put_item::PutItem::new(user).send(&client).await?;
//!
//! // SET age = age + :age
//! let birthday = Expr::new(&users).field("age")?.set_add(1)?;
//! write::update_item::UpdateItem::new(&users, "1")
//!     .fragment(birthday)
//!     .send(&client)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@model`] - Record types, field types and values
//! - [`mod@resolver`] - Wire type and admissible classes of a field type
//! - [`mod@codec`] - Values to and from wire values
//! - [`mod@expression`] - Type-checked update expressions
//! - [`mod@mapper`] - Whole records to and from request parameters
//! - [`mod@common`] - Keys, conditions and projections
//! - [`mod@read`] - Get, query, scan, batch get and transactional get
//! - [`mod@write`] - Put, update, delete, batch write and transactional write
//! - [`mod@table`] - Record-level operations on one table

/// Values to and from wire values.
pub mod codec;

/// Keys, conditions and projections shared by the operations.
pub mod common;

/// Crate error.
pub mod error;

/// Type-checked update expressions.
pub mod expression;

/// Whole records to and from request parameters.
pub mod mapper;

/// Record types, field types and values.
pub mod model;

/// Read operations.
pub mod read;

/// Wire type and admissible classes of a field type.
pub mod resolver;

/// Record-level operations on one table.
pub mod table;

/// Write operations.
pub mod write;

pub use error::{Error, Result};
