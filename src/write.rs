//! Write operations.
//!
//! Put, update and delete accept an optional precondition through
//! [`common::WriteArgs`]; a failed precondition surfaces as the store's
//! conditional-check error wrapped in the operation's error variant.

/// Put and delete many records, chunked.
pub mod batch_write_item;

/// Arguments shared by the write operations.
pub mod common;

/// Delete one record by key.
pub mod delete_item;

/// Create or replace one record.
pub mod put_item;

/// Write several records in one transaction.
pub mod transact_write_items;

/// Apply update fragments to one record.
pub mod update_item;
