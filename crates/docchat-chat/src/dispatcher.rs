//! Routes a chat message to the calculator or to document retrieval.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use docchat_core::{SourceSnippet, Turn};
use docchat_rag::ConversationalRetriever;

use crate::classify::{classify, MessageKind};
use crate::error::ChatError;
use crate::session::SessionStore;

/// Answer returned when the calculate keyword has nothing after it.
pub const EMPTY_EXPRESSION_PROMPT: &str =
    "Please provide an expression, e.g. 'calculate 12 * (3 + 4)'.";

/// Reply body for `/chat`. Calculator replies carry no `sources` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceSnippet>>,
}

impl ChatReply {
    fn answer_only(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: None,
        }
    }
}

pub struct ChatDispatcher {
    sessions: Arc<SessionStore>,
    retriever: Arc<dyn ConversationalRetriever>,
    retrieval_timeout: Duration,
}

impl ChatDispatcher {
    pub fn new(
        sessions: Arc<SessionStore>,
        retriever: Arc<dyn ConversationalRetriever>,
        retrieval_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            retriever,
            retrieval_timeout,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle one message. Both inputs are trimmed before use.
    pub async fn handle_chat(&self, session_id: &str, message: &str) -> Result<ChatReply, ChatError> {
        let session_id = session_id.trim();
        let message = message.trim();

        match classify(message) {
            MessageKind::Arithmetic { expression: None } => {
                debug!(session_id, "Calculate keyword without expression");
                Ok(ChatReply::answer_only(EMPTY_EXPRESSION_PROMPT))
            }
            MessageKind::Arithmetic {
                expression: Some(expression),
            } => {
                debug!(session_id, expression = %expression, "Routing to calculator");
                self.calculate(session_id, message, expression).await
            }
            MessageKind::Conversational => {
                debug!(session_id, "Routing to retrieval");
                self.converse(session_id, message).await
            }
        }
    }

    async fn calculate(
        &self,
        session_id: &str,
        message: &str,
        expression: String,
    ) -> Result<ChatReply, ChatError> {
        let value = match docchat_calc::evaluate(&expression) {
            Ok(value) => value,
            Err(source) => return Err(ChatError::Evaluation { expression, source }),
        };
        let rendered = value.to_string();

        // Calculator turns are recorded only for sessions that already exist.
        match self.sessions.append(session_id, Turn::new(message, rendered.as_str())).await {
            Ok(()) | Err(ChatError::SessionNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        Ok(ChatReply::answer_only(format!("Result: {}", rendered)))
    }

    async fn converse(&self, session_id: &str, message: &str) -> Result<ChatReply, ChatError> {
        let mut session = self.sessions.lock(session_id).await?;

        let output = tokio::time::timeout(
            self.retrieval_timeout,
            self.retriever.chat(session_id, message, session.turns()),
        )
        .await
        .map_err(|_| {
            warn!(session_id, timeout_secs = self.retrieval_timeout.as_secs(), "Retrieval timed out");
            ChatError::Timeout(self.retrieval_timeout.as_secs())
        })??;

        let answer = output.answer_text();
        session.push(Turn::new(message, answer.as_str()));

        let sources = output
            .source_documents
            .iter()
            .map(SourceSnippet::from)
            .collect();

        Ok(ChatReply {
            answer,
            sources: Some(sources),
        })
    }
}
