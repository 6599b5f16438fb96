//! docchat RAG crate: PDF ingestion and conversational retrieval.
//!
//! Loads PDFs page by page, splits pages into overlapping chunks, embeds
//! them into a per-document vector collection persisted on disk, and
//! answers questions against a collection with a chat model, condensing
//! follow-up questions using the conversation history first.

use std::path::Path;

use async_trait::async_trait;

use docchat_core::{RetrievalOutput, Turn};

pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod loader;
pub mod manager;
pub mod splitter;

pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding, OllamaEmbedding};
#[cfg(feature = "onnx")]
pub use embedding::OnnxEmbeddingService;
pub use error::RagError;
pub use index::{SearchHit, VectorIndex};
pub use llm::{ChatMessage, ChatModel, OllamaChat, Role};
pub use manager::RagManager;
pub use splitter::RecursiveCharacterSplitter;

/// Turns an uploaded PDF into a searchable collection.
#[async_trait]
pub trait DocumentIngestor: Send + Sync {
    /// Index the PDF at `path` under `collection`, replacing any previous
    /// collection of that name. Returns the number of chunks stored.
    async fn ingest_pdf(&self, path: &Path, collection: &str) -> Result<usize, RagError>;
}

/// Answers a question against one collection, given the prior turns.
#[async_trait]
pub trait ConversationalRetriever: Send + Sync {
    async fn chat(
        &self,
        collection: &str,
        question: &str,
        history: &[Turn],
    ) -> Result<RetrievalOutput, RagError>;
}
