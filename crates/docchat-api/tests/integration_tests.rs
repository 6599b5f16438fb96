//! Integration tests for the docchat HTTP API.
//!
//! Each test builds its own router over a temporary upload directory and
//! scripted collaborators, then drives it with `oneshot` requests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use docchat_api::handlers::UploadResponse;
use docchat_api::{create_router, AppState};
use docchat_core::config::RetrievalConfig;
use docchat_core::{DocChatConfig, Metadata, RetrievalOutput, SourceDocument, Turn};
use docchat_rag::{
    ChatMessage, ChatModel, ConversationalRetriever, DocumentIngestor, MockEmbedding, RagError,
    RagManager,
};

// =============================================================================
// Collaborators
// =============================================================================

/// Records ingested paths. Fails for files whose name ends in `broken.pdf`.
#[derive(Default)]
struct RecordingIngestor {
    calls: Mutex<Vec<(PathBuf, String)>>,
}

#[async_trait]
impl DocumentIngestor for RecordingIngestor {
    async fn ingest_pdf(&self, path: &Path, collection: &str) -> Result<usize, RagError> {
        assert!(path.exists(), "upload must be on disk before ingestion");
        if path.to_string_lossy().ends_with("broken.pdf") {
            return Err(RagError::Pdf("invalid file header".to_string()));
        }
        self.calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), collection.to_string()));
        Ok(3)
    }
}

/// Returns a canned answer with two sources, optionally after a delay.
struct CannedRetriever {
    delay: Duration,
}

#[async_trait]
impl ConversationalRetriever for CannedRetriever {
    async fn chat(
        &self,
        _collection: &str,
        question: &str,
        history: &[Turn],
    ) -> Result<RetrievalOutput, RagError> {
        if question.contains("explode") {
            return Err(RagError::Llm("connection refused".to_string()));
        }
        tokio::time::sleep(self.delay).await;
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!("uploads/report.pdf"));
        metadata.insert("page".to_string(), json!(0));
        Ok(RetrievalOutput {
            answer: Some(format!("answer #{}", history.len() + 1)),
            source_documents: vec![
                SourceDocument::new("z".repeat(1200), metadata),
                SourceDocument::new("a short chunk", Metadata::new()),
            ],
            ..Default::default()
        })
    }
}

/// Chat model that always gives the same reply.
struct FixedModel(&'static str);

#[async_trait]
impl ChatModel for FixedModel {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, RagError> {
        Ok(self.0.to_string())
    }
}

// =============================================================================
// Helpers
// =============================================================================

struct TestApp {
    state: AppState,
    ingestor: Arc<RecordingIngestor>,
    _dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        Self::with_retriever(Duration::ZERO, 180)
    }

    fn with_retriever(delay: Duration, timeout_secs: u64) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = DocChatConfig::default();
        config.storage.upload_dir = dir.path().to_string_lossy().to_string();
        config.retrieval.timeout_secs = timeout_secs;

        let ingestor = Arc::new(RecordingIngestor::default());
        let retriever = Arc::new(CannedRetriever { delay });
        let state = AppState::new(config, ingestor.clone(), retriever);
        Self {
            state,
            ingestor,
            _dir: dir,
        }
    }

    fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }
}

const BOUNDARY: &str = "docchat-test-boundary";

fn multipart_request(field: &str, filename: Option<&str>, contents: &[u8]) -> Request<Body> {
    let disposition = match filename {
        Some(name) => format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n",
            field, name
        ),
        None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", field),
    };
    let mut body = format!("--{}\r\n{}\r\n", BOUNDARY, disposition).into_bytes();
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::post("/upload_pdf")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn chat_request(session_id: &str, message: &str) -> Request<Body> {
    let body = json!({"session_id": session_id, "message": message});
    Request::post("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read full response body bytes.
async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(resp: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

async fn upload(app: &TestApp, filename: &str) -> UploadResponse {
    let resp = app
        .router()
        .oneshot(multipart_request("file", Some(filename), b"%PDF-1.5 fake"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

// =============================================================================
// POST /upload_pdf
// =============================================================================

#[tokio::test]
async fn test_upload_creates_session_and_stores_file() {
    let app = TestApp::new();
    let uploaded = upload(&app, "report.pdf").await;

    assert_eq!(uploaded.doc_id.len(), 8);
    assert_eq!(uploaded.filename, "report.pdf");
    assert!(app.state.sessions.exists(&uploaded.doc_id));

    let stored = app
        .state
        .upload_dir
        .join(format!("{}_report.pdf", uploaded.doc_id));
    assert_eq!(std::fs::read(&stored).unwrap(), b"%PDF-1.5 fake");

    let calls = app.ingestor.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, stored);
    assert_eq!(calls[0].1, uploaded.doc_id);
}

#[tokio::test]
async fn test_upload_strips_directory_components() {
    let app = TestApp::new();
    let uploaded = upload(&app, "../../outside.pdf").await;

    assert_eq!(uploaded.filename, "../../outside.pdf");
    let stored = app
        .state
        .upload_dir
        .join(format!("{}_outside.pdf", uploaded.doc_id));
    assert!(stored.exists());
}

#[tokio::test]
async fn test_each_upload_gets_a_new_session() {
    let app = TestApp::new();
    let first = upload(&app, "a.pdf").await;
    let second = upload(&app, "a.pdf").await;
    assert_ne!(first.doc_id, second.doc_id);
    assert_eq!(app.state.sessions.len(), 2);
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(multipart_request("document", Some("report.pdf"), b"%PDF"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert!(body["detail"].as_str().unwrap().contains("'file'"));
    assert!(app.state.sessions.is_empty());
}

#[tokio::test]
async fn test_upload_plain_field_is_rejected() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(multipart_request("file", None, b"just text"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_upload_requires_multipart_body() {
    let app = TestApp::new();
    let req = Request::post("/upload_pdf")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let resp = app.router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_json(resp).await["detail"].is_string());
}

#[tokio::test]
async fn test_upload_ingestion_failure() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(multipart_request("file", Some("broken.pdf"), b"garbage"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert_eq!(body, json!({"detail": "Failed to read PDF: invalid file header"}));
    assert!(app.state.sessions.is_empty());
}

// =============================================================================
// POST /chat - calculator
// =============================================================================

#[tokio::test]
async fn test_chat_calculation() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(chat_request("whatever", "calculate 12 * (3 + 4)"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"answer": "Result: 84"}));
}

#[tokio::test]
async fn test_chat_bare_arithmetic() {
    let app = TestApp::new();
    let resp = app.router().oneshot(chat_request("x", "7+3")).await.unwrap();
    assert_eq!(body_json(resp).await, json!({"answer": "Result: 10"}));

    let resp = app.router().oneshot(chat_request("x", "2 ** 10")).await.unwrap();
    assert_eq!(body_json(resp).await, json!({"answer": "Result: 1024"}));
}

#[tokio::test]
async fn test_chat_empty_expression_prompt() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(chat_request("x", "please calculate   "))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({"answer": "Please provide an expression, e.g. 'calculate 12 * (3 + 4)'."})
    );
}

#[tokio::test]
async fn test_chat_rejected_expression() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(chat_request("x", "calculate open('secrets')"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let detail = body_json(resp).await["detail"].as_str().unwrap().to_string();
    assert!(detail.starts_with("Could not evaluate expression 'open('secrets')': "));
}

#[tokio::test]
async fn test_chat_division_by_zero() {
    let app = TestApp::new();
    let resp = app.router().oneshot(chat_request("x", "1/0")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({"detail": "Could not evaluate expression '1/0': division by zero"})
    );
}

#[tokio::test]
async fn test_calculation_recorded_in_existing_session() {
    let app = TestApp::new();
    let uploaded = upload(&app, "report.pdf").await;
    app.router()
        .oneshot(chat_request(&uploaded.doc_id, "  5 % 3 "))
        .await
        .unwrap();

    let history = app.state.sessions.get_history(&uploaded.doc_id).await.unwrap();
    assert_eq!(history, vec![Turn::new("5 % 3", "2")]);
}

// =============================================================================
// POST /chat - retrieval
// =============================================================================

#[tokio::test]
async fn test_chat_unknown_session() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(chat_request("deadbeef", "What is this about?"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(resp).await,
        json!({"detail": "Session/doc_id not found. Upload a PDF first via /upload_pdf."})
    );
}

#[tokio::test]
async fn test_upload_then_chat_returns_sources() {
    let app = TestApp::new();
    let uploaded = upload(&app, "report.pdf").await;

    let resp = app
        .router()
        .oneshot(chat_request(&uploaded.doc_id, "What is this about?"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["answer"], "answer #1");
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["metadata"]["page"], 0);
    assert_eq!(sources[0]["text_snippet"].as_str().unwrap().chars().count(), 500);
    assert_eq!(sources[1]["text_snippet"], "a short chunk");
    assert!(sources
        .iter()
        .all(|s| s["text_snippet"].as_str().unwrap().chars().count() <= 500));
}

#[tokio::test]
async fn test_history_accumulates_in_order() {
    let app = TestApp::new();
    let uploaded = upload(&app, "report.pdf").await;

    for i in 1..=3 {
        let resp = app
            .router()
            .oneshot(chat_request(&uploaded.doc_id, &format!("question {}", i)))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["answer"], format!("answer #{}", i));
    }

    let history = app.state.sessions.get_history(&uploaded.doc_id).await.unwrap();
    assert_eq!(history.len(), 3);
    for (i, turn) in history.iter().enumerate() {
        assert_eq!(turn.message, format!("question {}", i + 1));
        assert_eq!(turn.answer, format!("answer #{}", i + 1));
    }
}

#[tokio::test]
async fn test_chat_retrieval_failure() {
    let app = TestApp::new();
    let uploaded = upload(&app, "report.pdf").await;
    let resp = app
        .router()
        .oneshot(chat_request(&uploaded.doc_id, "please explode"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_json(resp).await["detail"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
    assert!(app
        .state
        .sessions
        .get_history(&uploaded.doc_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_chat_retrieval_timeout() {
    let app = TestApp::with_retriever(Duration::from_secs(5), 0);
    let uploaded = upload(&app, "report.pdf").await;
    let resp = app
        .router()
        .oneshot(chat_request(&uploaded.doc_id, "slow question"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(body_json(resp).await["detail"].is_string());
}

#[tokio::test]
async fn test_chat_malformed_body() {
    let app = TestApp::new();
    let req = Request::post("/chat")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"session_id": "x"}"#))
        .unwrap();
    let resp = app.router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_json(resp).await["detail"].is_string());
}

// =============================================================================
// Middleware
// =============================================================================

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = TestApp::new();
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/chat")
        .header("origin", "http://frontend.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();
    let resp = app.router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new();
    let resp = app
        .router()
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// End to end with the real manager
// =============================================================================

#[tokio::test]
async fn test_end_to_end_with_rag_manager() {
    let uploads = TempDir::new().unwrap();
    let collections = TempDir::new().unwrap();

    let mut config = DocChatConfig::default();
    config.storage.upload_dir = uploads.path().to_string_lossy().to_string();

    let manager = Arc::new(
        RagManager::new(
            Arc::new(MockEmbedding::new()),
            Arc::new(FixedModel("The report covers Rust adoption.")),
            collections.path(),
            &RetrievalConfig::default(),
        )
        .unwrap(),
    );
    let state = AppState::new(config, manager.clone(), manager.clone());

    let pdf_path = uploads.path().join("source.pdf");
    docchat_rag::loader::write_text_pdf(
        &pdf_path,
        &["Rust adoption grew in 2024.", "Teams cited memory safety."],
    )
    .unwrap();
    let pdf = std::fs::read(&pdf_path).unwrap();

    let resp = create_router(state.clone())
        .oneshot(multipart_request("file", Some("report.pdf"), &pdf))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let uploaded: UploadResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(collections
        .path()
        .join(&uploaded.doc_id)
        .join("collection.json")
        .exists());

    let resp = create_router(state.clone())
        .oneshot(chat_request(&uploaded.doc_id, "What does the report cover?"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["answer"], "The report covers Rust adoption.");
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert!(sources
        .iter()
        .all(|s| s["metadata"]["source"].as_str().unwrap().ends_with("_report.pdf")));

    let resp = create_router(state)
        .oneshot(chat_request(&uploaded.doc_id, "And the second page?"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
