use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

use crate::database::index_store::{IndexEntry, IndexPair};
use crate::database::vector_index::FlatL2Index;
use crate::document::chunker::Chunk;
use crate::error::{RagError, Result};
use crate::llm::embeddings::EmbeddingProvider;

/// Outcome counters of one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub embedded: usize,
    pub skipped: usize,
}

/// Embeds chunks one by one into an index pair.
pub struct Indexer {
    embedder: Arc<dyn EmbeddingProvider>,
    delay: Duration,
    show_progress: bool,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            delay: Duration::from_millis(50),
            show_progress: false,
        }
    }

    /// Pause between consecutive embedding calls.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Builds the pair. A chunk whose embedding fails is skipped and leaves
    /// no row behind; a vector whose dimension disagrees with the first
    /// success aborts the build.
    pub async fn build<I>(&self, chunks: I) -> Result<(IndexPair, IndexReport)>
    where
        I: IntoIterator<Item = Chunk>,
        I::IntoIter: ExactSizeIterator,
    {
        let chunks = chunks.into_iter();
        let progress = self.progress_bar(chunks.len() as u64);

        let mut dimension: Option<usize> = None;
        let mut vectors: Vec<Vec<f32>> = Vec::new();
        let mut metadata = Vec::new();
        let mut report = IndexReport::default();

        for (position, chunk) in chunks.enumerate() {
            if position > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            progress.inc(1);

            let vector = match self.embedder.embed(&chunk.text).await {
                Ok(vector) => vector,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", chunk.chunk_id, e);
                    report.skipped += 1;
                    continue;
                }
            };

            let expected = *dimension.get_or_insert(vector.len());
            if vector.len() != expected {
                progress.abandon();
                return Err(RagError::DataIntegrity(format!(
                    "{} embedded to {} dims, index was started with {}",
                    chunk.chunk_id,
                    vector.len(),
                    expected
                )));
            }

            vectors.push(vector);
            metadata.push(IndexEntry::from(&chunk));
            report.embedded += 1;
        }

        progress.finish_and_clear();

        let dimension = dimension.ok_or(RagError::EmptyIndex)?;
        let mut index = FlatL2Index::new(dimension)?;
        for vector in &vectors {
            index.add(vector)?;
        }

        tracing::info!(
            "Built index with {} vectors (dim {}), skipped {}",
            report.embedded,
            dimension,
            report.skipped
        );
        Ok((IndexPair::new(index, metadata)?, report))
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner} Embedding [{bar:40}] {pos}/{len} ({eta})",
        ) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }
}
