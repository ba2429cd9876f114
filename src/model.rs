//! Declared record shapes and in-memory record values.
//!
//! A [`record::RecordType`] is built once, when the model is declared, and is
//! shared read-only (behind an `Arc`) by every codec, resolver and expression
//! call afterwards.

/// Field type descriptors.
pub mod field;

/// Secondary index declarations.
pub mod index;

/// Record types and record instances.
pub mod record;

/// Dynamic field values.
pub mod value;
