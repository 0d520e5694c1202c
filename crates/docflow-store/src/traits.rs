use async_trait::async_trait;
use docflow_schema::{Record, Revision, Value};

use crate::error::StoreResult;
use crate::feed::ChangeFeed;
use crate::query::Query;
use crate::table::TableSpec;

/// Record store for the docflow mapper.
///
/// All implementations must satisfy these invariants:
/// - `insert` generates a primary key when the record carries none under
///   the table's primary key name, and returns the effective key.
/// - Every successful write bumps the record's revision; `update` with
///   `expected = Some(rev)` fails with a conflict when `rev` is stale.
/// - Every mutation reaches the table's change feeds before the call
///   returns.
/// - Backend failures are propagated, never retried at this layer.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read a record by primary key.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn get(&self, table: &str, key: &Value) -> StoreResult<Option<(Record, Revision)>>;

    /// Insert a new record, generating a primary key if the record has
    /// none. Returns the effective key and the initial revision.
    async fn insert(&self, table: &str, record: Record) -> StoreResult<(Value, Revision)>;

    /// Overlay `patch` onto an existing record.
    ///
    /// When `expected` is set, the write only succeeds if the stored
    /// revision still matches; otherwise it fails with
    /// [`StoreError::Conflict`]. Returns the new revision.
    ///
    /// [`StoreError::Conflict`]: crate::StoreError::Conflict
    async fn update(
        &self,
        table: &str,
        key: &Value,
        patch: Record,
        expected: Option<Revision>,
    ) -> StoreResult<Revision>;

    /// Delete a record by primary key. Returns `true` if it existed.
    async fn delete(&self, table: &str, key: &Value) -> StoreResult<bool>;

    /// Run an equality-filter query and return all matching records.
    async fn query(&self, query: &Query) -> StoreResult<Vec<(Record, Revision)>>;

    /// Subscribe to the table's changes, optionally scoped to a single
    /// primary key. Dropping the returned feed releases the cursor.
    async fn changes(&self, table: &str, key: Option<Value>) -> StoreResult<ChangeFeed>;

    /// Create a table. Fails with [`StoreError::TableExists`] when the
    /// table is already there.
    ///
    /// [`StoreError::TableExists`]: crate::StoreError::TableExists
    async fn create_table(&self, spec: &TableSpec) -> StoreResult<()>;

    /// Check whether a table exists.
    async fn table_exists(&self, table: &str) -> StoreResult<bool>;

    /// Sorted names of all tables.
    async fn list_tables(&self) -> StoreResult<Vec<String>>;
}
