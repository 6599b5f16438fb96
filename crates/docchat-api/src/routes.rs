//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use docchat_core::{DocChatConfig, DocChatError};

use crate::error::ApiError;
use crate::handlers;
use crate::state::AppState;

/// Body limit for `/chat`.
const CHAT_BODY_LIMIT: usize = 64 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Any origin, method and header.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload = state.config.server.max_upload_bytes;

    Router::new()
        .route(
            "/upload_pdf",
            post(handlers::upload_pdf).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route(
            "/chat",
            post(handlers::chat).layer(DefaultBodyLimit::max(CHAT_BODY_LIMIT)),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %message, "Handler panicked");
    ApiError::Internal("Internal server error".to_string()).into_response()
}

/// Start the HTTP server on the configured address.
pub async fn start_server(config: &DocChatConfig, state: AppState) -> Result<(), DocChatError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DocChatError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| DocChatError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
