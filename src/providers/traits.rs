use async_trait::async_trait;

use crate::error::Result;
use crate::llm::semantic_search::SearchHit;

/// Everything a backend may need for one answer: the built prompt plus the
/// question and hits it was rendered from.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub question: &'a str,
    pub hits: &'a [SearchHit],
    pub prompt: &'a str,
}

/// A text-generation provider in the answer fallback chain.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Stable identifier reported back as provenance.
    fn name(&self) -> &str;

    /// Returns the answer text. An empty string counts as no answer.
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String>;
}
