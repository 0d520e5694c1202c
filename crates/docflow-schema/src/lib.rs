//! Declarative field schemas for docflow.
//!
//! This crate is the foundation of the docflow object-document mapper.
//! It describes how application data is shaped, validated, and converted
//! to and from store records. Every other docflow crate depends on it.
//!
//! # Key Types
//!
//! - [`ValueType`] — Validation and wire-conversion rule for one slot
//! - [`FieldSpec`] — A declared, typed, immutable field description
//! - [`Schema`] — Ordered set of field specs with a single primary key
//! - [`FieldContainer`] — Schema-aware bag of declared and undeclared fields
//! - [`Record`] — Order-preserving wire representation of a container
//! - [`Revision`] — Store-side revision token for conflict detection
//!
//! # Design Rules
//!
//! 1. Field specs are immutable once a schema is built.
//! 2. Declared fields are validated on every set; undeclared fields are
//!    unconstrained and pass through serialization unchanged.
//! 3. A container remembers which fields were touched (dirty tracking),
//!    so persistence layers can write minimal patches.
//! 4. `to_record` followed by `from_record` reproduces an equal container.

pub mod container;
pub mod error;
pub mod field;
pub mod record;
pub mod schema;
pub mod value_type;

// Re-export primary types at crate root for ergonomic imports.
pub use container::{FieldContainer, Which};
pub use error::{SchemaError, SchemaResult};
pub use field::FieldSpec;
pub use record::{Record, Revision};
pub use schema::{Schema, SchemaBuilder};
pub use value_type::ValueType;

/// Wire value model. Store records are JSON-shaped.
pub use serde_json::Value;
