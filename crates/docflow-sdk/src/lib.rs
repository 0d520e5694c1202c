//! High-level SDK for docflow.
//!
//! Ties a store connection and a class registry into one [`Session`]:
//! register classes, initialize their tables, then create, load, query,
//! and follow documents without wiring the lower crates by hand. This is
//! the main entry point for applications embedding docflow.

pub mod config;
pub mod error;
pub mod session;

pub use config::SessionConfig;
pub use error::{SdkError, SdkResult};
pub use session::Session;

// Re-export key types
pub use docflow_document::{
    DocState, Document, DocumentClass, DocumentFeed, LazyRef, Registry,
};
pub use docflow_schema::{FieldSpec, Record, Revision, Value, ValueType};
pub use docflow_store::{MemoryStore, Query, Store};
