use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use policy_rag::database::{ChunkStore, IndexPair};
use policy_rag::document::{Chunker, ChunkerConfig, RiskLevel, SourceDocument};
use policy_rag::error::{RagError, Result};
use policy_rag::llm::{
    AnswerOrchestrator, EmbeddingProvider, Indexer, OrchestratorConfig, RagEngine,
};
use policy_rag::providers::traits::{GenerationBackend, GenerationRequest};

const KEYWORDS: [&str; 4] = ["leave", "salary", "termination", "laptop"];

/// Counts keyword occurrences, so texts about the same topic land close together.
struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lowered = text.to_lowercase();
        Ok(KEYWORDS
            .iter()
            .map(|k| lowered.matches(k).count().min(3) as f32)
            .collect())
    }

    fn model_id(&self) -> &str {
        "keyword"
    }
}

struct FailingBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl GenerationBackend for FailingBackend {
    fn name(&self) -> &str {
        "always-down"
    }

    async fn generate(&self, _request: GenerationRequest<'_>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RagError::external("always-down", "503 service unavailable"))
    }
}

struct EchoBackend;

#[async_trait]
impl GenerationBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String> {
        let first = request.hits.first().map(|h| h.entry.heading.as_str()).unwrap_or("");
        Ok(format!("See the {} section.", first))
    }
}

fn section(heading: &str, topic: &str, words: usize) -> String {
    let filler = vec!["policy"; words].join(" ");
    format!("## {}\nThis section covers {} rules. {}\n", heading, topic, filler)
}

fn handbook() -> Vec<SourceDocument> {
    vec![
        SourceDocument::new(
            "people.md",
            "handbook/people.md",
            format!(
                "{}{}",
                section("Annual Leave", "leave leave leave", 200),
                section("Termination", "termination termination", 200)
            ),
        ),
        SourceDocument::new(
            "pay.md",
            "handbook/pay.md",
            section("Salary Bands", "salary salary salary", 250),
        ),
        SourceDocument::new(
            "it.md",
            "handbook/it.md",
            section("Equipment", "laptop laptop", 180),
        ),
    ]
}

fn engine(dir: &std::path::Path, backends: Vec<Arc<dyn GenerationBackend>>) -> RagEngine {
    RagEngine::new(
        Arc::new(KeywordEmbedder),
        AnswerOrchestrator::new(
            backends,
            OrchestratorConfig {
                backend_timeout: Duration::from_secs(1),
                ..OrchestratorConfig::default()
            },
        ),
        dir,
        3,
    )
}

/// Chunks the handbook into a chunk store, indexes it and saves the pair.
async fn build_index(root: &std::path::Path) -> std::path::PathBuf {
    let store = ChunkStore::new(root.join("chunks"));
    let mut chunker = Chunker::new(ChunkerConfig::default());
    for doc in handbook() {
        for chunk in chunker.chunk_document(&doc) {
            store.write(&chunk).unwrap();
        }
    }

    let chunks = store.read_all().unwrap();
    assert_eq!(chunks.len(), 4);
    assert_eq!(chunks[1].risk_level, RiskLevel::High);

    let (pair, report) = Indexer::new(Arc::new(KeywordEmbedder))
        .with_delay(Duration::ZERO)
        .build(chunks)
        .await
        .unwrap();
    assert_eq!(report.embedded, 4);

    let index_dir = root.join("index");
    pair.save(&index_dir).unwrap();
    index_dir
}

#[tokio::test]
async fn test_search_before_load_is_index_not_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path(), Vec::new());

    assert!(!engine.is_loaded());
    let result = engine.search("How much leave?", 3).await;
    assert!(matches!(result, Err(RagError::IndexNotLoaded)));

    let answer = engine.answer("How much leave?").await;
    assert!(answer.is_unanswerable());
    assert!(!answer.answer_text.is_empty());
}

#[tokio::test]
async fn test_load_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = build_index(dir.path()).await;
    let engine = engine(&index_dir, Vec::new());

    let first = engine.load_documents().unwrap();
    let second = engine.load_documents().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.embedding_dim, KEYWORDS.len());
    assert_eq!(first.chunks, 4);
}

#[tokio::test]
async fn test_missing_index_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("nowhere"), Vec::new());
    assert!(engine.load_documents().is_err());
    assert!(!engine.is_loaded());
}

#[tokio::test]
async fn test_search_ranks_by_distance() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = build_index(dir.path()).await;
    let engine = engine(&index_dir, Vec::new());
    engine.load_documents().unwrap();

    let hits = engine.search("What is my salary band?", 3).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].entry.heading, "Salary Bands");
    assert!(hits.windows(2).all(|w| w[0].score <= w[1].score));
    assert!(hits.iter().all(|h| h.relevance() > 0.0 && h.relevance() <= 1.0));

    let all = engine.search("leave", 50).await.unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn test_answer_uses_first_working_backend() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = build_index(dir.path()).await;
    let failing = Arc::new(FailingBackend {
        calls: AtomicUsize::new(0),
    });
    let chain: Vec<Arc<dyn GenerationBackend>> = vec![
        failing.clone() as Arc<dyn GenerationBackend>,
        Arc::new(EchoBackend),
    ];
    let engine = engine(&index_dir, chain);
    engine.load_documents().unwrap();

    let answer = engine.answer("How many days of leave do I get?").await;
    assert_eq!(answer.backend_name, "echo");
    assert_eq!(answer.answer_text, "See the Annual Leave section.");
    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_all_backends_down_still_answers() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = build_index(dir.path()).await;
    let failing = Arc::new(FailingBackend {
        calls: AtomicUsize::new(0),
    });
    let chain: Vec<Arc<dyn GenerationBackend>> = vec![failing as Arc<dyn GenerationBackend>];
    let engine = engine(&index_dir, chain);
    engine.load_documents().unwrap();

    let outcome = engine.query("What happens on termination?").await;
    assert_eq!(outcome.answer.backend_name, "extractive-only");
    assert!(outcome
        .answer
        .answer_text
        .starts_with("Based on the policy documents:"));
    assert!(outcome.answer.answer_text.contains("termination"));
    assert_eq!(outcome.hits.len(), 3);
}

#[tokio::test]
async fn test_saved_pair_matches_built_rows() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = build_index(dir.path()).await;

    let pair = IndexPair::load(&index_dir).unwrap();
    assert_eq!(pair.len(), pair.index().len());
    let ids: Vec<&str> = pair.metadata().iter().map(|m| m.chunk_id.as_str()).collect();
    assert_eq!(ids, ["chunk_000001", "chunk_000002", "chunk_000003", "chunk_000004"]);
}

#[tokio::test]
async fn test_startup_refuses_a_corrupt_index() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = build_index(dir.path()).await;

    let pair = IndexPair::load(&index_dir).unwrap();
    let mut shifted = pair.metadata().to_vec();
    shifted.rotate_left(1);
    std::fs::write(
        index_dir.join("metadata.json"),
        serde_json::to_vec_pretty(&shifted).unwrap(),
    )
    .unwrap();

    let result = engine(&index_dir, Vec::new()).loaded();
    assert!(matches!(result, Err(RagError::DataIntegrity(_))));

    std::fs::remove_file(index_dir.join("vectors.json")).unwrap();
    let result = engine(&index_dir, Vec::new()).loaded();
    assert!(matches!(result, Err(RagError::Io(_))));
}
