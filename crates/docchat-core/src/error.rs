use thiserror::Error;

/// Top-level error type for docchat.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for DocChatError` so that `?` works across crate
/// boundaries (e.g. in the binary's composition root).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for DocChatError {
    fn from(err: toml::de::Error) -> Self {
        DocChatError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DocChatError {
    fn from(err: toml::ser::Error) -> Self {
        DocChatError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DocChatError {
    fn from(err: serde_json::Error) -> Self {
        DocChatError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for docchat operations.
pub type Result<T> = std::result::Result<T, DocChatError>;
