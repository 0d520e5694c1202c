use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("schema error: {0}")]
    Schema(#[from] docflow_schema::SchemaError),

    #[error("store error: {0}")]
    Store(#[from] docflow_store::StoreError),

    #[error("document error: {0}")]
    Document(#[from] docflow_document::DocumentError),
}

pub type SdkResult<T> = Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_errors_convert_into_their_variant() {
        let err: SdkError = docflow_schema::SchemaError::validation("f", "bad").into();
        assert!(matches!(err, SdkError::Schema(_)));

        let err: SdkError = docflow_store::StoreError::UnknownTable("t".into()).into();
        assert!(matches!(err, SdkError::Store(_)));

        let err: SdkError = docflow_document::DocumentError::UnknownType("T".into()).into();
        assert!(matches!(err, SdkError::Document(_)));
    }
}
