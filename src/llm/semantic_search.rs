use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::database::index_store::{IndexEntry, IndexPair};
use crate::error::{RagError, Result};
use crate::llm::embeddings::EmbeddingProvider;

/// A metadata row with its raw distance. Smaller `score` means closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub entry: IndexEntry,
    pub score: f32,
}

impl SearchHit {
    pub fn relevance(&self) -> f32 {
        relevance(self.score)
    }
}

/// Presentational confidence in `(0, 1]`: `1 / (1 + distance)`.
/// Negative and non-finite distances map to zero.
pub fn relevance(score: f32) -> f32 {
    if score.is_finite() && score >= 0.0 {
        1.0 / (1.0 + score)
    } else {
        0.0
    }
}

/// Embeds questions and looks them up in a loaded index pair.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder }
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    pub async fn search(
        &self,
        pair: &IndexPair,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        if pair.is_empty() {
            return Err(RagError::IndexNotLoaded);
        }

        let query = self.embedder.embed(question).await?;
        if query.len() != pair.dimension() {
            return Err(RagError::DataIntegrity(format!(
                "query embedding from {} has {} dims but the index has {}",
                self.embedder.model_id(),
                query.len(),
                pair.dimension()
            )));
        }

        let neighbours = pair.index().search(&query, top_k)?;
        tracing::debug!("Retrieved {} hits for question", neighbours.len());

        neighbours
            .into_iter()
            .map(|(row, score)| {
                let entry = pair.metadata().get(row).cloned().ok_or_else(|| {
                    RagError::DataIntegrity(format!("no metadata row for vector {}", row))
                })?;
                Ok(SearchHit { entry, score })
            })
            .collect()
    }
}
