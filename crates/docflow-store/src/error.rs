use docflow_schema::Revision;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("no record with key {key} in table `{table}`")]
    NotFound { table: String, key: String },

    /// A write carried a stale revision: the record changed underneath
    /// the caller.
    #[error("revision conflict in table `{table}` for key {key}: expected {expected}, found {found}")]
    Conflict {
        table: String,
        key: String,
        expected: Revision,
        found: Revision,
    },

    /// An insert reused an existing primary key.
    #[error("duplicate primary key {key} in table `{table}`")]
    DuplicateKey { table: String, key: String },

    /// The table already exists.
    #[error("table `{0}` already exists")]
    TableExists(String),

    /// The table has not been created.
    #[error("unknown table `{0}`")]
    UnknownTable(String),

    /// A change feed consumer fell behind and missed events. The feed is
    /// still usable after resubscribing.
    #[error("change feed lagged, skipped {0} events; resubscribe to resynchronize")]
    FeedLagged(u64),

    /// Connectivity or query failure in the underlying driver.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
