//! docchat application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Create the upload and collection directories
//! 3. Build the embedding service, chat model and RAG manager
//! 4. Start the axum REST API server

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use docchat_api::{routes, AppState};
use docchat_core::config::EmbeddingBackend;
use docchat_core::{DocChatConfig, DocChatError};
use docchat_rag::{DynEmbeddingService, MockEmbedding, OllamaChat, OllamaEmbedding, RagManager};

use cli::CliArgs;

fn build_embedder(config: &DocChatConfig) -> Result<Arc<dyn DynEmbeddingService>, DocChatError> {
    let timeout = Duration::from_secs(config.llm.request_timeout_secs);
    match config.embedding.backend {
        EmbeddingBackend::Ollama => {
            let embedder =
                OllamaEmbedding::new(&config.llm.base_url, &config.embedding.model, timeout)?;
            tracing::info!(model = %config.embedding.model, "Using Ollama embeddings");
            Ok(Arc::new(embedder))
        }
        EmbeddingBackend::Onnx => build_onnx_embedder(Path::new(&config.embedding.model_dir)),
        EmbeddingBackend::Mock => {
            tracing::warn!("Using mock embeddings; retrieval results will not be meaningful");
            Ok(Arc::new(MockEmbedding::new()))
        }
    }
}

#[cfg(feature = "onnx")]
fn build_onnx_embedder(model_dir: &Path) -> Result<Arc<dyn DynEmbeddingService>, DocChatError> {
    let embedder = docchat_rag::OnnxEmbeddingService::from_directory(model_dir)?;
    tracing::info!(dir = %model_dir.display(), "Using ONNX embeddings");
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "onnx"))]
fn build_onnx_embedder(_model_dir: &Path) -> Result<Arc<dyn DynEmbeddingService>, DocChatError> {
    Err(DocChatError::Config(
        "embedding.backend = \"onnx\" requires building with --features onnx".to_string(),
    ))
}

fn create_dir(path: &str, what: &str) -> Result<(), DocChatError> {
    if let Err(e) = std::fs::create_dir_all(path) {
        tracing::error!(path = %path, error = %e, "Failed to create {} directory", what);
        return Err(e.into());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Load errors are reported once logging is up.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = if config_file.exists() {
        match DocChatConfig::load(&config_file) {
            Ok(config) => (config, None),
            Err(e) => (DocChatConfig::default(), Some(e)),
        }
    } else {
        (DocChatConfig::default(), None)
    };
    args.apply(&mut config);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    tracing::info!("Starting docchat v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            "Failed to load config: {}. Using defaults.",
            e
        ),
        None if config_file.exists() => {
            tracing::info!(path = %config_file.display(), "Configuration loaded")
        }
        None => tracing::info!(path = %config_file.display(), "No config file, using defaults"),
    }
    config.validate()?;

    // Storage.
    create_dir(&config.storage.upload_dir, "upload")?;
    create_dir(&config.storage.persist_dir, "collection")?;

    // Collaborators.
    let embedder = build_embedder(&config)?;
    let llm = OllamaChat::new(
        &config.llm.base_url,
        &config.llm.model,
        config.llm.temperature,
        Duration::from_secs(config.llm.request_timeout_secs),
    )?;
    tracing::info!(model = %llm.model(), base_url = %config.llm.base_url, "Chat model configured");

    let manager = Arc::new(RagManager::new(
        embedder,
        Arc::new(llm),
        &config.storage.persist_dir,
        &config.retrieval,
    )?);
    tracing::info!(
        persist_dir = %config.storage.persist_dir,
        chunk_size = config.retrieval.chunk_size,
        chunk_overlap = config.retrieval.chunk_overlap,
        top_k = config.retrieval.top_k,
        "RAG manager ready"
    );

    // === API server ===

    let state = AppState::new(config.clone(), manager.clone(), manager);
    routes::start_server(&config, state).await?;

    Ok(())
}
