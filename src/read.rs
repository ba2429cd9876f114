//! Read operations.
//!
//! Every operation is a plain struct that compiles into an SDK request and is
//! sent with `send(client)`. Record-returning `send` sits next to `send_as`,
//! which deserializes the raw items into any serde type.

/// Get many records by key, chunked.
pub mod batch_get_item;

/// Arguments shared by the read operations.
pub mod common;

/// Get one record by key.
pub mod get_item;

/// Query records by hash key.
pub mod query;

/// Scan a table or index.
pub mod scan;

/// Get several records in one transaction.
pub mod transact_get_items;
