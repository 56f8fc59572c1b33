use parking_lot::RwLock;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Settings;
use crate::database::index_store::IndexPair;
use crate::error::{RagError, Result};
use crate::llm::embeddings::{embedder_from_settings, EmbeddingProvider};
use crate::llm::orchestrator::{AnswerOrchestrator, AnswerResult, OrchestratorConfig};
use crate::llm::semantic_search::{Retriever, SearchHit};
use crate::providers::backends_from_settings;

/// What a load produced; equal across repeated loads of the same pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub embedding_dim: usize,
    pub chunks: usize,
}

/// An answer together with the hits it was built from.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub answer: AnswerResult,
    pub hits: Vec<SearchHit>,
}

/// The query-time pipeline. Built once at startup and shared behind an `Arc`.
pub struct RagEngine {
    retriever: Retriever,
    orchestrator: AnswerOrchestrator,
    index_dir: PathBuf,
    top_k: usize,
    pair: RwLock<Option<Arc<IndexPair>>>,
}

impl RagEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        orchestrator: AnswerOrchestrator,
        index_dir: impl Into<PathBuf>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever: Retriever::new(embedder),
            orchestrator,
            index_dir: index_dir.into(),
            top_k,
            pair: RwLock::new(None),
        }
    }

    /// Wires the configured embedder and backend chain. Fails only when the
    /// embedder has no credentials.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder = embedder_from_settings(settings)?;
        let orchestrator = AnswerOrchestrator::new(
            backends_from_settings(settings),
            OrchestratorConfig {
                backend_timeout: settings.backend_timeout,
                failure_threshold: settings.failure_threshold,
                cooldown: settings.cooldown,
                prompt_warn_chars: settings.prompt_warn_chars,
            },
        );
        tracing::info!(
            "Backend chain: {} -> extractive-only",
            orchestrator.backend_names().join(" -> ")
        );
        Ok(Self::new(
            embedder,
            orchestrator,
            settings.index_dir.clone(),
            settings.top_k,
        ))
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn orchestrator(&self) -> &AnswerOrchestrator {
        &self.orchestrator
    }

    /// Loads (or reloads) the index pair from `index_dir`. A missing or
    /// corrupt pair is an error and leaves any previous pair in place.
    pub fn load_documents(&self) -> Result<LoadSummary> {
        let pair = IndexPair::load(&self.index_dir)?;
        Ok(self.install(pair))
    }

    /// Startup hook: consumes the engine and hands it back only once a valid
    /// pair is loaded.
    pub fn loaded(self) -> Result<Self> {
        self.load_documents()?;
        Ok(self)
    }

    /// Installs an already built pair.
    pub fn install(&self, pair: IndexPair) -> LoadSummary {
        let summary = LoadSummary {
            embedding_dim: pair.dimension(),
            chunks: pair.len(),
        };
        *self.pair.write() = Some(Arc::new(pair));
        tracing::info!(
            "Index loaded with {} chunks (dim {}) for embedder {}",
            summary.chunks,
            summary.embedding_dim,
            self.retriever.model_id()
        );
        summary
    }

    pub fn is_loaded(&self) -> bool {
        self.pair.read().is_some()
    }

    pub fn embedding_dim(&self) -> Option<usize> {
        self.pair.read().as_ref().map(|p| p.dimension())
    }

    fn loaded_pair(&self) -> Result<Arc<IndexPair>> {
        self.pair.read().clone().ok_or(RagError::IndexNotLoaded)
    }

    pub async fn search(&self, question: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let pair = self.loaded_pair()?;
        self.retriever.search(&pair, question, top_k).await
    }

    /// Never fails: retrieval errors become the sentinel answer.
    pub async fn answer(&self, question: &str) -> AnswerResult {
        self.query(question).await.answer
    }

    pub async fn query(&self, question: &str) -> QueryOutcome {
        match self.search(question, self.top_k).await {
            Ok(hits) => {
                let answer = self.orchestrator.run(question, &hits).await;
                QueryOutcome { answer, hits }
            }
            Err(e) => {
                tracing::error!("Retrieval failed: {}", e);
                QueryOutcome {
                    answer: AnswerResult::unanswerable(),
                    hits: Vec::new(),
                }
            }
        }
    }
}
