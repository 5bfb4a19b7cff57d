//! Local Embedding Provider
//!
//! fastembed-backed ONNX inference, no external API calls. The model is a
//! process-wide singleton because initialization downloads and loads the
//! ONNX graph once.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Mutex, OnceLock};

use super::{EmbeddingError, EmbeddingProvider};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Dimensions produced by the default model
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Maximum text length for embedding (truncated if longer)
pub const MAX_TEXT_LENGTH: usize = 8192;

// ============================================================================
// GLOBAL MODEL
// ============================================================================

static EMBEDDING_MODEL: OnceLock<Result<Mutex<TextEmbedding>, String>> = OnceLock::new();

/// Cache directory for downloaded model files
fn cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("ENGRAM_MODEL_CACHE") {
        return std::path::PathBuf::from(path);
    }
    if let Some(proj_dirs) = directories::ProjectDirs::from("dev", "engram", "core") {
        return proj_dirs.cache_dir().join("fastembed");
    }
    std::path::PathBuf::from(".fastembed_cache")
}

fn model() -> Result<std::sync::MutexGuard<'static, TextEmbedding>, EmbeddingError> {
    let result = EMBEDDING_MODEL.get_or_init(|| {
        let cache = cache_dir();
        if let Err(e) = std::fs::create_dir_all(&cache) {
            tracing::warn!("failed to create model cache dir {:?}: {}", cache, e);
        }

        let options = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
            .with_show_download_progress(false)
            .with_cache_dir(cache);

        TextEmbedding::try_new(options)
            .map(Mutex::new)
            .map_err(|e| format!("failed to initialize embedding model: {e}"))
    });

    match result {
        Ok(model) => model
            .lock()
            .map_err(|e| EmbeddingError::ModelInit(format!("model lock poisoned: {e}"))),
        Err(err) => Err(EmbeddingError::ModelInit(err.clone())),
    }
}

// ============================================================================
// PROVIDER
// ============================================================================

/// Embedding provider backed by a local fastembed model
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalEmbedder;

impl LocalEmbedder {
    pub fn new() -> Self {
        Self
    }

    /// Check whether the model can be initialized
    pub fn is_ready(&self) -> bool {
        model().is_ok()
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }
        let truncated: String = trimmed.chars().take(MAX_TEXT_LENGTH).collect();

        let mut guard = model()?;
        let mut vectors = guard
            .embed(vec![truncated], None)
            .map_err(|e| EmbeddingError::Failed(e.to_string()))?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Failed("model returned no vector".to_string()))
    }
}
