use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{EmbedderKind, Settings};
use crate::error::{RagError, Result};
use crate::providers::gemini::gemini::GeminiEmbedder;
use crate::providers::openai::openai::OpenAIEmbedder;

/// Converts text to a fixed-length vector. The same provider and model must
/// be used to build the index and to embed queries against it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn model_id(&self) -> &str;
}

/// Builds the configured embedder. Missing credentials are fatal: nothing in
/// the retrieval core works without embeddings.
pub fn embedder_from_settings(settings: &Settings) -> Result<Arc<dyn EmbeddingProvider>> {
    match settings.embedder {
        EmbedderKind::Gemini => {
            let api_key = settings.gemini_api_key.clone().ok_or_else(|| {
                RagError::Configuration(
                    "GEMINI_API_KEY (or GOOGLE_API_KEY) must be set to embed text".to_string(),
                )
            })?;
            Ok(Arc::new(GeminiEmbedder::new(
                api_key,
                settings.embedding_model.clone(),
            )))
        }
        EmbedderKind::OpenAI => {
            let api_key = settings.openai_api_key.clone().ok_or_else(|| {
                RagError::Configuration("OPENAI_API_KEY must be set to embed text".to_string())
            })?;
            Ok(Arc::new(OpenAIEmbedder::new(
                api_key,
                settings.embedding_model.clone(),
            )))
        }
    }
}
