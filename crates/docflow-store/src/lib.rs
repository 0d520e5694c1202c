//! Store boundary for the docflow object-document mapper.
//!
//! Records cross this boundary as order-preserving name→value mappings
//! ([`docflow_schema::Record`]), keyed by a primary key field whose value
//! the store generates when the caller leaves it unset. The mapper layers
//! above never see driver internals; they talk to the [`Store`] trait.
//!
//! # Backends
//!
//! - [`MemoryStore`] — `HashMap`-based backend for tests and embedding,
//!   with per-record revisions and live change feeds.
//!
//! # Design Rules
//!
//! 1. Every write bumps the record's [`Revision`]; updates may pass an
//!    expected revision and fail with a conflict on mismatch.
//! 2. Every mutation is published to the table's change feed before the
//!    store call returns.
//! 3. The store never interprets field values beyond the primary key.
//! 4. Driver errors are surfaced, never retried or masked, at this layer.
//!
//! [`Revision`]: docflow_schema::Revision

pub mod error;
pub mod feed;
pub mod memory;
pub mod query;
pub mod table;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use feed::{ChangeEvent, ChangeFeed};
pub use memory::MemoryStore;
pub use query::Query;
pub use table::TableSpec;
pub use traits::Store;
