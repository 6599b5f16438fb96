//! Application state shared across all route handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use docchat_chat::{ChatDispatcher, SessionStore};
use docchat_core::DocChatConfig;
use docchat_rag::{ConversationalRetriever, DocumentIngestor};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. The
/// dispatcher and the upload handler share one [`SessionStore`].
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<DocChatConfig>,
    /// Open sessions, one per successfully ingested document.
    pub sessions: Arc<SessionStore>,
    /// Indexes uploaded PDFs.
    pub ingestor: Arc<dyn DocumentIngestor>,
    /// Routes chat messages to the calculator or to retrieval.
    pub dispatcher: Arc<ChatDispatcher>,
    /// Directory uploaded files are written to.
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(
        config: DocChatConfig,
        ingestor: Arc<dyn DocumentIngestor>,
        retriever: Arc<dyn ConversationalRetriever>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new());
        let dispatcher = ChatDispatcher::new(
            Arc::clone(&sessions),
            retriever,
            Duration::from_secs(config.retrieval.timeout_secs),
        );
        Self {
            upload_dir: PathBuf::from(&config.storage.upload_dir),
            config: Arc::new(config),
            sessions,
            ingestor,
            dispatcher: Arc::new(dispatcher),
        }
    }
}
