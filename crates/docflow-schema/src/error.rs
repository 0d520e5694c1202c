/// Errors from schema declaration and field validation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A value did not satisfy its field's type or constraint.
    #[error("validation failed for field `{field}`: {reason}")]
    Validation { field: String, reason: String },

    /// A field spec is contradictory or otherwise unusable.
    #[error("illegal field spec: {0}")]
    IllegalSpec(String),

    /// An undeclared field name collides with a declared field's wire name.
    #[error("field name `{0}` is reserved by a declared field's wire name")]
    WireNameCollision(String),
}

impl SchemaError {
    /// Shorthand constructor for validation failures.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
