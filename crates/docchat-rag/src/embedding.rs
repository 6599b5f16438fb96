//! Embedding service trait and implementations.
//!
//! - `OllamaEmbedding` asks a local Ollama server for sentence embeddings
//!   (the `all-minilm` model by default). This is the default backend.
//! - `OnnxEmbeddingService` (feature `onnx`) runs an all-MiniLM-L6-v2 ONNX
//!   export in-process via ort and the HuggingFace tokenizers crate.
//! - `MockEmbedding` provides deterministic hash-based vectors for testing.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RagError;

/// Output width of the all-MiniLM-L6-v2 family.
pub const MINILM_DIMENSIONS: usize = 384;

/// Service for generating text embeddings.
///
/// Used both when a document is indexed and when a question is turned into
/// a query vector, so both sides must come from the same implementation.
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, RagError>> + Send;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// `EmbeddingService::embed` returns `impl Future`, which is not
/// object-safe. This trait boxes the future so that
/// `Arc<dyn DynEmbeddingService>` can be picked at startup from config.
pub trait DynEmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

fn l2_normalize(values: &mut [f32]) {
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in values.iter_mut() {
            *val /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// OllamaEmbedding - HTTP client for a local Ollama server
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embeddings served by Ollama's `/api/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaEmbedding {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedding {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Embedding(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimensions: MINILM_DIMENSIONS,
        })
    }

    /// Override the advertised vector width for models other than MiniLM.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }
}

impl EmbeddingService for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        if text.is_empty() {
            return Err(RagError::Embedding("Cannot embed empty text".to_string()));
        }

        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&OllamaEmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("Ollama HTTP error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let parsed: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("Ollama JSON parse error: {}", e)))?;

        if parsed.embedding.is_empty() {
            return Err(RagError::Embedding(format!(
                "Ollama returned an empty embedding for model '{}'",
                self.model
            )));
        }

        debug!(model = %self.model, dims = parsed.embedding.len(), "Embedding received");
        Ok(parsed.embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// OnnxEmbeddingService - in-process ONNX Runtime inference
// ---------------------------------------------------------------------------

#[cfg(feature = "onnx")]
pub use onnx::OnnxEmbeddingService;

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use ort::session::Session;
    use ort::value::TensorRef;
    use tokenizers::Tokenizer;
    use tracing::info;

    use super::{l2_normalize, EmbeddingService, MINILM_DIMENSIONS};
    use crate::error::RagError;

    /// ONNX Runtime-backed sentence-transformer.
    ///
    /// Expects a model directory containing `model.onnx` and
    /// `tokenizer.json`. The model takes `input_ids`, `attention_mask` and
    /// `token_type_ids` and produces token embeddings, which are mean-pooled
    /// under the attention mask and L2-normalized.
    pub struct OnnxEmbeddingService {
        session: Arc<Mutex<Session>>,
        tokenizer: Arc<Tokenizer>,
        dimensions: usize,
    }

    // ort::Session is Send + Sync internally (uses Arc<SharedSessionInner>).
    unsafe impl Send for OnnxEmbeddingService {}
    unsafe impl Sync for OnnxEmbeddingService {}

    impl std::fmt::Debug for OnnxEmbeddingService {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("OnnxEmbeddingService")
                .field("dimensions", &self.dimensions)
                .finish()
        }
    }

    fn onnx_err(context: &str, err: impl std::fmt::Display) -> RagError {
        RagError::Embedding(format!("{}: {}", context, err))
    }

    impl OnnxEmbeddingService {
        /// Load a model from a directory holding `model.onnx` and `tokenizer.json`.
        pub fn from_directory(model_dir: &Path) -> Result<Self, RagError> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");
            for path in [&model_path, &tokenizer_path] {
                if !path.exists() {
                    return Err(RagError::Embedding(format!(
                        "Model file not found at {}",
                        path.display()
                    )));
                }
            }

            let session = Session::builder()
                .map_err(|e| onnx_err("ONNX session builder", e))?
                .with_intra_threads(1)
                .map_err(|e| onnx_err("ONNX set threads", e))?
                .commit_from_file(&model_path)
                .map_err(|e| onnx_err("ONNX load model", e))?;

            // Output is [batch, seq_len, hidden_dim].
            let dimensions = session
                .outputs()
                .first()
                .and_then(|out| out.dtype().tensor_shape())
                .and_then(|shape| shape.last().copied())
                .filter(|d| *d > 0)
                .map(|d| d as usize)
                .unwrap_or(MINILM_DIMENSIONS);

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| onnx_err("Failed to load tokenizer", e))?;

            info!(model = %model_path.display(), dimensions, "Loaded ONNX embedding model");

            Ok(Self {
                session: Arc::new(Mutex::new(session)),
                tokenizer: Arc::new(tokenizer),
                dimensions,
            })
        }

        fn embed_sync(
            session: &Mutex<Session>,
            tokenizer: &Tokenizer,
            text: &str,
        ) -> Result<Vec<f32>, RagError> {
            let encoding = tokenizer
                .encode(text, true)
                .map_err(|e| onnx_err("Tokenization failed", e))?;

            let to_i64 = |values: &[u32]| values.iter().map(|&v| v as i64).collect::<Vec<i64>>();
            let input_ids = to_i64(encoding.get_ids());
            let attention_mask = to_i64(encoding.get_attention_mask());
            let token_type_ids = to_i64(encoding.get_type_ids());
            let seq_len = input_ids.len();

            let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids)
                .map_err(|e| onnx_err("input_ids array", e))?;
            let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask.clone())
                .map_err(|e| onnx_err("attention_mask array", e))?;
            let type_array = ndarray::Array2::from_shape_vec((1, seq_len), token_type_ids)
                .map_err(|e| onnx_err("token_type_ids array", e))?;

            let ids_ref = TensorRef::from_array_view(&ids_array)
                .map_err(|e| onnx_err("TensorRef input_ids", e))?;
            let mask_ref = TensorRef::from_array_view(&mask_array)
                .map_err(|e| onnx_err("TensorRef attention_mask", e))?;
            let type_ref = TensorRef::from_array_view(&type_array)
                .map_err(|e| onnx_err("TensorRef token_type_ids", e))?;

            let mut session = session
                .lock()
                .map_err(|e| onnx_err("Session lock poisoned", e))?;
            let outputs = session
                .run(ort::inputs![ids_ref, mask_ref, type_ref])
                .map_err(|e| onnx_err("ONNX inference failed", e))?;

            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| onnx_err("Extract embeddings", e))?;

            let hidden_dim = match shape.iter().copied().collect::<Vec<i64>>().as_slice() {
                [_, .., last] => *last as usize,
                other => {
                    return Err(RagError::Embedding(format!(
                        "Unexpected output shape: {:?}",
                        other
                    )))
                }
            };

            let mut pooled = vec![0.0f32; hidden_dim];
            let mut count = 0.0f32;
            for (tok_idx, &mask_val) in attention_mask.iter().enumerate() {
                if mask_val > 0 {
                    let offset = tok_idx * hidden_dim;
                    for (dim, slot) in pooled.iter_mut().enumerate() {
                        *slot += data[offset + dim];
                    }
                    count += 1.0;
                }
            }
            if count > 0.0 {
                for val in &mut pooled {
                    *val /= count;
                }
            }

            l2_normalize(&mut pooled);
            Ok(pooled)
        }
    }

    impl EmbeddingService for OnnxEmbeddingService {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
            if text.is_empty() {
                return Err(RagError::Embedding("Cannot embed empty text".to_string()));
            }
            // Inference is CPU-bound; keep it off the async workers.
            let session = Arc::clone(&self.session);
            let tokenizer = Arc::clone(&self.tokenizer);
            let text = text.to_string();
            tokio::task::spawn_blocking(move || Self::embed_sync(&session, &tokenizer, &text)).await?
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }

}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Mock embedding service that returns deterministic 384-dimensional vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs, which is enough to exercise indexing
/// and exact-match retrieval without a model.
#[derive(Debug, Clone, Default)]
pub struct MockEmbedding;

impl MockEmbedding {
    pub fn new() -> Self {
        Self
    }

    fn hash_to_vector(text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(MINILM_DIMENSIONS);
        for i in 0..MINILM_DIMENSIONS {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }
        l2_normalize(&mut result);
        result
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        if text.is_empty() {
            return Err(RagError::Embedding("Cannot embed empty text".to_string()));
        }
        Ok(Self::hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        MINILM_DIMENSIONS
    }
}
