use docchat_core::DocChatError;
use thiserror::Error;

/// Errors raised by the ingestion and retrieval collaborators.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("Failed to read PDF: {0}")]
    Pdf(String),

    #[error("No extractable text found in {0}")]
    EmptyDocument(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Language model request failed: {0}")]
    Llm(String),

    #[error("Collection '{0}' does not exist")]
    CollectionNotFound(String),

    #[error("Collection storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<lopdf::Error> for RagError {
    fn from(err: lopdf::Error) -> Self {
        RagError::Pdf(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RagError {
    fn from(err: tokio::task::JoinError) -> Self {
        RagError::Storage(format!("Background task failed: {}", err))
    }
}

impl From<RagError> for DocChatError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Pdf(_) | RagError::EmptyDocument(_) => DocChatError::Ingestion(err.to_string()),
            RagError::Embedding(msg) => DocChatError::Embedding(msg),
            RagError::Llm(msg) => DocChatError::Llm(msg),
            RagError::CollectionNotFound(_) => DocChatError::Retrieval(err.to_string()),
            RagError::Storage(msg) => DocChatError::Storage(msg),
            RagError::Io(e) => DocChatError::Io(e),
            RagError::Serialization(e) => DocChatError::Serialization(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_not_found_message() {
        let err = RagError::CollectionNotFound("ab12cd34".to_string());
        assert_eq!(err.to_string(), "Collection 'ab12cd34' does not exist");
    }

    #[test]
    fn test_conversion_into_top_level_error() {
        let err: DocChatError = RagError::Llm("connection refused".to_string()).into();
        assert_eq!(err.to_string(), "Language model error: connection refused");

        let err: DocChatError = RagError::EmptyDocument("scan.pdf".to_string()).into();
        assert!(matches!(err, DocChatError::Ingestion(_)));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DocChatError = RagError::from(io).into();
        assert!(matches!(err, DocChatError::Io(_)));
    }
}
