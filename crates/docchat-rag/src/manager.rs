//! Ingestion and retrieval over per-document collections.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use docchat_core::config::RetrievalConfig;
use docchat_core::{RetrievalOutput, SourceDocument, Turn};

use crate::embedding::DynEmbeddingService;
use crate::error::RagError;
use crate::index::VectorIndex;
use crate::llm::{ChatMessage, ChatModel};
use crate::loader::load_pdf;
use crate::splitter::RecursiveCharacterSplitter;
use crate::{ConversationalRetriever, DocumentIngestor};

/// Owns the embedding service, the chat model and the collection cache.
///
/// Collections live under `<persist_dir>/<name>/` and are loaded lazily on
/// first use. Ingesting under an existing name replaces both the files and
/// the cached copy.
pub struct RagManager {
    embedder: Arc<dyn DynEmbeddingService>,
    llm: Arc<dyn ChatModel>,
    splitter: RecursiveCharacterSplitter,
    persist_dir: PathBuf,
    top_k: usize,
    collections: RwLock<HashMap<String, VectorIndex>>,
}

impl RagManager {
    /// Create a manager, creating `persist_dir` if it does not exist.
    pub fn new(
        embedder: Arc<dyn DynEmbeddingService>,
        llm: Arc<dyn ChatModel>,
        persist_dir: impl Into<PathBuf>,
        retrieval: &RetrievalConfig,
    ) -> Result<Self, RagError> {
        let persist_dir = persist_dir.into();
        std::fs::create_dir_all(&persist_dir)?;
        let splitter =
            RecursiveCharacterSplitter::new(retrieval.chunk_size, retrieval.chunk_overlap)?;
        Ok(Self {
            embedder,
            llm,
            splitter,
            persist_dir,
            top_k: retrieval.top_k,
            collections: RwLock::new(HashMap::new()),
        })
    }

    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    /// Number of collections currently held in memory.
    pub fn cached_collections(&self) -> usize {
        self.collections.read().map(|c| c.len()).unwrap_or(0)
    }

    fn collection_dir(&self, name: &str) -> PathBuf {
        self.persist_dir.join(name)
    }

    /// Return the named collection, loading it from disk on a cache miss.
    async fn collection(&self, name: &str) -> Result<VectorIndex, RagError> {
        if !is_valid_collection_name(name) {
            return Err(RagError::CollectionNotFound(name.to_string()));
        }

        {
            let cache = self
                .collections
                .read()
                .map_err(|e| RagError::Storage(format!("Lock poisoned: {}", e)))?;
            if let Some(index) = cache.get(name) {
                return Ok(index.clone());
            }
        }

        let dir = self.collection_dir(name);
        let owned_name = name.to_string();
        let index = tokio::task::spawn_blocking(move || VectorIndex::load(&dir, &owned_name)).await??;
        debug!(collection = name, chunks = index.len(), "Collection loaded from disk");

        let mut cache = self
            .collections
            .write()
            .map_err(|e| RagError::Storage(format!("Lock poisoned: {}", e)))?;
        Ok(cache.entry(name.to_string()).or_insert(index).clone())
    }

    async fn condense_question(&self, history: &[Turn], question: &str) -> Result<String, RagError> {
        let prompt = condense_question_prompt(history, question);
        let condensed = self.llm.complete(&[ChatMessage::user(prompt)]).await?;
        let condensed = condensed.trim();
        if condensed.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(condensed.to_string())
        }
    }
}

#[async_trait]
impl DocumentIngestor for RagManager {
    async fn ingest_pdf(&self, path: &Path, collection: &str) -> Result<usize, RagError> {
        if !is_valid_collection_name(collection) {
            return Err(RagError::Storage(format!(
                "Invalid collection name '{}'",
                collection
            )));
        }

        let pdf_path = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || load_pdf(&pdf_path)).await??;
        let chunks = self.splitter.split_documents(&pages);
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument(path.display().to_string()));
        }

        let index = VectorIndex::new(collection);
        for chunk in chunks {
            let embedding = self.embedder.embed_boxed(&chunk.page_content).await?;
            index.insert(Uuid::new_v4(), embedding, chunk)?;
        }

        let dir = self.collection_dir(collection);
        let to_save = index.clone();
        tokio::task::spawn_blocking(move || to_save.save(&dir)).await??;

        let stored = index.len();
        {
            let mut cache = self
                .collections
                .write()
                .map_err(|e| RagError::Storage(format!("Lock poisoned: {}", e)))?;
            cache.insert(collection.to_string(), index);
        }

        info!(
            collection,
            source = %path.display(),
            pages = pages.len(),
            chunks = stored,
            "Document ingested"
        );
        Ok(stored)
    }
}

#[async_trait]
impl ConversationalRetriever for RagManager {
    async fn chat(
        &self,
        collection: &str,
        question: &str,
        history: &[Turn],
    ) -> Result<RetrievalOutput, RagError> {
        let index = self.collection(collection).await?;

        let standalone = if history.is_empty() {
            question.to_string()
        } else {
            self.condense_question(history, question).await?
        };
        debug!(collection, question = %standalone, turns = history.len(), "Retrieving");

        let query = self.embedder.embed_boxed(&standalone).await?;
        let documents: Vec<SourceDocument> = index
            .search(&query, self.top_k)?
            .into_iter()
            .map(|hit| hit.document)
            .collect();

        let messages = [
            ChatMessage::system(answer_system_prompt(&documents)),
            ChatMessage::user(standalone.clone()),
        ];
        let answer = self.llm.complete(&messages).await?;

        Ok(RetrievalOutput {
            answer: Some(answer),
            result: None,
            generated_question: Some(standalone),
            source_documents: documents,
        })
    }
}

/// Collection names become directory names, so only `[A-Za-z0-9_-]` is allowed.
fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Render prior turns as alternating `Human:` / `Assistant:` lines.
pub fn format_history(history: &[Turn]) -> String {
    history
        .iter()
        .map(|turn| format!("\nHuman: {}\nAssistant: {}", turn.message, turn.answer))
        .collect()
}

/// Prompt asking the model to rewrite a follow-up as a standalone question.
pub fn condense_question_prompt(history: &[Turn], question: &str) -> String {
    format!(
        "Given the following conversation and a follow up question, rephrase the follow up \
         question to be a standalone question, in its original language.\n\n\
         Chat History:\n{}\nFollow Up Input: {}\nStandalone question:",
        format_history(history),
        question
    )
}

/// System prompt carrying the retrieved chunks as answering context.
pub fn answer_system_prompt(documents: &[SourceDocument]) -> String {
    let context = documents
        .iter()
        .map(|doc| doc.page_content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Use the following pieces of context to answer the user's question. \n\
         If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
         ----------------\n{}",
        context
    )
}
