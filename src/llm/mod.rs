pub mod embeddings;
pub mod engine;
pub mod indexer;
pub mod orchestrator;
pub mod prompt;
pub mod semantic_search;

pub use embeddings::EmbeddingProvider;
pub use engine::{LoadSummary, QueryOutcome, RagEngine};
pub use indexer::{IndexReport, Indexer};
pub use orchestrator::{AnswerOrchestrator, AnswerResult, OrchestratorConfig};
pub use semantic_search::{Retriever, SearchHit};
