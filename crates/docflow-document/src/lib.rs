//! Documents: the persistable unit of the docflow mapper.
//!
//! A [`Document`] binds a [`FieldContainer`] to one record in a store
//! table. It carries identity (the primary key), a dirty/lifecycle state
//! machine, and the store revision it was loaded at. A [`Registry`] maps
//! store-facing class names to [`DocumentClass`] descriptors so raw
//! records — query results and change feed payloads — can be
//! reconstructed into typed instances without the caller naming a type.
//!
//! # Lifecycle
//!
//! ```text
//! NEW (no key, unsaved) --save--> SAVED (key, clean)
//! SAVED --mutation--> MODIFIED --save--> SAVED
//! any --delete--> DELETED (terminal)
//! ```
//!
//! [`FieldContainer`]: docflow_schema::FieldContainer

pub mod class;
pub mod document;
pub mod error;
pub mod feed;
pub mod lazy;
pub mod registry;

// Re-export primary types at crate root for ergonomic imports.
pub use class::{DocumentClass, DocumentClassBuilder};
pub use document::{DocState, Document};
pub use error::{DocumentError, DocumentResult};
pub use feed::{DocumentChange, DocumentFeed};
pub use lazy::LazyRef;
pub use registry::Registry;
