//! Error types for chat dispatch.

use docchat_calc::CalcError;
use docchat_core::DocChatError;
use docchat_rag::RagError;

/// Errors from handling one chat message.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Could not evaluate expression '{expression}': {source}")]
    Evaluation {
        expression: String,
        #[source]
        source: CalcError,
    },
    #[error("Session/doc_id not found. Upload a PDF first via /upload_pdf.")]
    SessionNotFound(String),
    #[error("{0}")]
    Retrieval(#[from] RagError),
    #[error("Retrieval timed out after {0} seconds")]
    Timeout(u64),
}

impl From<ChatError> for DocChatError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Retrieval(rag) => rag.into(),
            other => DocChatError::Api(other.to_string()),
        }
    }
}
