use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum length, in characters, of a source excerpt returned to clients.
pub const MAX_SNIPPET_CHARS: usize = 500;

/// Result fields consulted, in order, when extracting an answer from a
/// retrieval output.
pub const ANSWER_FIELDS: [&str; 2] = ["answer", "result"];

/// Free-form metadata attached to a document chunk (`source`, `page`, ...).
pub type Metadata = Map<String, Value>;

// =============================================================================
// Conversation
// =============================================================================

/// One (message, answer) exchange within a session's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub message: String,
    pub answer: String,
}

impl Turn {
    pub fn new(message: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            answer: answer.into(),
        }
    }
}

// =============================================================================
// Retrieval
// =============================================================================

/// A chunk of a document, as stored in a collection and returned by retrieval.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    #[serde(default)]
    pub metadata: Metadata,
    pub page_content: String,
}

impl SourceDocument {
    pub fn new(page_content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            metadata,
            page_content: page_content.into(),
        }
    }
}

/// Structured result of one conversational retrieval call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Standalone question produced from the follow-up and the history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_question: Option<String>,
    /// Retrieved chunks, best match first.
    #[serde(default)]
    pub source_documents: Vec<SourceDocument>,
}

impl RetrievalOutput {
    /// Look up a textual result field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "answer" => self.answer.as_deref(),
            "result" => self.result.as_deref(),
            "generated_question" => self.generated_question.as_deref(),
            _ => None,
        }
    }

    /// The answer text: the first non-empty field of [`ANSWER_FIELDS`], or the
    /// rendering of the whole output when none is set.
    pub fn answer_text(&self) -> String {
        ANSWER_FIELDS
            .iter()
            .filter_map(|name| self.field(name))
            .find(|text| !text.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for RetrievalOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

/// Client-facing projection of a [`SourceDocument`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceSnippet {
    pub metadata: Metadata,
    /// At most [`MAX_SNIPPET_CHARS`] characters of the chunk text.
    pub text_snippet: String,
}

impl From<&SourceDocument> for SourceSnippet {
    fn from(doc: &SourceDocument) -> Self {
        Self {
            metadata: doc.metadata.clone(),
            text_snippet: doc.page_content.chars().take(MAX_SNIPPET_CHARS).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(page: u64) -> Metadata {
        let mut m = Metadata::new();
        m.insert("source".to_string(), json!("uploads/abc_report.pdf"));
        m.insert("page".to_string(), json!(page));
        m
    }

    #[test]
    fn test_answer_field_wins() {
        let out = RetrievalOutput {
            answer: Some("forty-two".to_string()),
            result: Some("ignored".to_string()),
            ..Default::default()
        };
        assert_eq!(out.answer_text(), "forty-two");
    }

    #[test]
    fn test_result_field_used_when_answer_missing_or_empty() {
        let out = RetrievalOutput {
            answer: Some(String::new()),
            result: Some("from result".to_string()),
            ..Default::default()
        };
        assert_eq!(out.answer_text(), "from result");

        let out = RetrievalOutput {
            result: Some("only result".to_string()),
            ..Default::default()
        };
        assert_eq!(out.answer_text(), "only result");
    }

    #[test]
    fn test_whole_output_rendered_as_last_resort() {
        let out = RetrievalOutput {
            generated_question: Some("what is x?".to_string()),
            ..Default::default()
        };
        let text = out.answer_text();
        assert!(text.contains("what is x?"));
        assert!(text.contains("source_documents"));
    }

    #[test]
    fn test_unknown_field_is_none() {
        let out = RetrievalOutput::default();
        assert_eq!(out.field("chat_history"), None);
    }

    #[test]
    fn test_snippet_truncates_to_500_chars() {
        let doc = SourceDocument::new("x".repeat(2000), meta(3));
        let snippet = SourceSnippet::from(&doc);
        assert_eq!(snippet.text_snippet.chars().count(), MAX_SNIPPET_CHARS);
        assert_eq!(snippet.metadata["page"], json!(3));
    }

    #[test]
    fn test_snippet_truncation_respects_char_boundaries() {
        let doc = SourceDocument::new("é".repeat(600), Metadata::new());
        let snippet = SourceSnippet::from(&doc);
        assert_eq!(snippet.text_snippet.chars().count(), MAX_SNIPPET_CHARS);
    }

    #[test]
    fn test_short_snippet_kept_whole() {
        let doc = SourceDocument::new("short text", meta(0));
        assert_eq!(SourceSnippet::from(&doc).text_snippet, "short text");
    }

    #[test]
    fn test_snippet_serialization_shape() {
        let snippet = SourceSnippet::from(&SourceDocument::new("abc", meta(1)));
        let value = serde_json::to_value(&snippet).unwrap();
        assert_eq!(value["text_snippet"], "abc");
        assert_eq!(value["metadata"]["source"], "uploads/abc_report.pdf");
    }
}
