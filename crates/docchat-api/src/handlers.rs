//! Route handler functions for all API endpoints.

use std::path::PathBuf;

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use docchat_chat::ChatReply;

use crate::error::ApiError;
use crate::state::AppState;

/// Multipart field carrying the uploaded PDF.
pub const FILE_FIELD: &str = "file";

// =============================================================================
// Request and response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub doc_id: String,
    /// The file name as sent by the client.
    pub filename: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /upload_pdf - store the PDF, index it and open a session for it.
pub async fn upload_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::UnprocessableEntity(e.body_text()))?;

    let (filename, contents) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Internal(e.body_text()))?;
        let Some(field) = field else {
            return Err(ApiError::UnprocessableEntity(format!(
                "Missing required multipart field '{}'",
                FILE_FIELD
            )));
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            return Err(ApiError::UnprocessableEntity(format!(
                "Multipart field '{}' must be a file upload",
                FILE_FIELD
            )));
        };
        let contents = field
            .bytes()
            .await
            .map_err(|e| ApiError::Internal(e.body_text()))?;
        break (filename, contents);
    };

    let doc_id = state.sessions.allocate_id();
    let path = upload_path(&state, &doc_id, &filename);

    tokio::fs::write(&path, &contents).await.map_err(|e| {
        error!(path = %path.display(), "Failed to store upload: {}", e);
        ApiError::Internal(e.to_string())
    })?;

    let chunks = state.ingestor.ingest_pdf(&path, &doc_id).await?;
    state.sessions.create(&doc_id);

    info!(doc_id = %doc_id, filename = %filename, bytes = contents.len(), chunks, "Document uploaded");

    Ok(Json(UploadResponse { doc_id, filename }))
}

/// POST /chat - answer a message within a session.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::UnprocessableEntity(e.body_text()))?;
    let reply = state.dispatcher.handle_chat(&req.session_id, &req.message).await?;
    Ok(Json(reply))
}

// =============================================================================
// Helpers
// =============================================================================

fn upload_path(state: &AppState, doc_id: &str, filename: &str) -> PathBuf {
    state
        .upload_dir
        .join(format!("{}_{}", doc_id, sanitize_filename(filename)))
}

/// Strip any directory components from a client-supplied file name.
pub fn sanitize_filename(filename: &str) -> &str {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    match base {
        "" | "." | ".." => "upload.pdf",
        name => name,
    }
}
