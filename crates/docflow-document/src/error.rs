use docflow_schema::SchemaError;
use docflow_store::StoreError;

/// Errors from document operations.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// A class with this store-facing name is already registered.
    #[error("a document class named `{0}` is already registered")]
    DuplicateRegistration(String),

    /// No class with this store-facing name is registered.
    #[error("no document class named `{0}` is registered")]
    UnknownType(String),

    /// The named field is not declared as a reference.
    #[error("field `{0}` is not a reference field")]
    NotReference(String),

    /// A lazy reference was read before it was resolved.
    #[error("lazy reference to `{0}` has not been resolved yet")]
    NotLoaded(String),

    /// The operation is not valid in the document's current lifecycle
    /// state.
    #[error("illegal document state: {0}")]
    IllegalState(String),

    /// Field validation or schema misuse.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Pass-through store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;
