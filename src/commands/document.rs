use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::database::ChunkStore;
use crate::document::source::{filter_noise, source_file_name, split_compiled};
use crate::document::{Chunker, ChunkerConfig, SourceDocument};
use crate::llm::embeddings::embedder_from_settings;
use crate::llm::Indexer;

/// Splits a compiled handbook dump into one filtered source file per document.
pub fn prepare(input: &Path, out_dir: &Path) -> Result<usize> {
    let compiled = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    println!("📄 Preparing sources from: {}", input.display().to_string().bright_yellow());

    let mut written = 0;
    let mut dropped = 0;
    for doc in split_compiled(&compiled) {
        let Some(body) = filter_noise(&doc.body) else {
            tracing::debug!("Dropping {}: too little content after filtering", doc.source);
            dropped += 1;
            continue;
        };
        written += 1;
        let filtered = SourceDocument::new(doc.source, doc.path, body);
        let path = out_dir.join(source_file_name(written, &filtered.source));
        fs::write(&path, filtered.render())
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    println!(
        "✅ Wrote {} sources to {} ({} dropped)",
        written.to_string().cyan(),
        out_dir.display(),
        dropped
    );
    Ok(written)
}

/// Chunks every source file under `sources_dir` in sorted order. Without
/// `append` the chunk store is emptied first.
pub fn chunk(sources_dir: &Path, settings: &Settings, append: bool) -> Result<usize> {
    let store = ChunkStore::new(&settings.chunks_dir);
    let start_id = if append && store.dir().exists() {
        store.max_id().context("Failed to read existing chunks")? + 1
    } else {
        // A full re-chunk replaces the store; stale chunks must not reach the index.
        let removed = store
            .clear()
            .with_context(|| format!("Failed to clear {}", store.dir().display()))?;
        if removed > 0 {
            println!("🧹 Removed {} chunks from the previous run", removed);
        }
        1
    };

    let mut chunker = Chunker::new(ChunkerConfig::default()).with_start_id(start_id);
    let mut written = 0;

    for path in source_files(sources_dir)? {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let Some(doc) = SourceDocument::parse(&raw) else {
            tracing::warn!("Skipping {}: no content after header", path.display());
            continue;
        };
        for chunk in chunker.chunk_document(&doc) {
            store
                .write(&chunk)
                .with_context(|| format!("Failed to write {}", chunk.chunk_id))?;
            written += 1;
        }
    }

    println!(
        "✅ Wrote {} chunks to {} (next id {})",
        written.to_string().cyan(),
        store.dir().display(),
        chunker.next_id()
    );
    Ok(written)
}

/// Embeds the stored chunks and writes the index pair.
pub async fn index(settings: &Settings) -> Result<()> {
    let store = ChunkStore::new(&settings.chunks_dir);
    let chunks = store
        .read_all()
        .with_context(|| format!("Failed to read chunks from {}", store.dir().display()))?;
    println!("🧮 Embedding {} chunks", chunks.len().to_string().cyan());

    let embedder = embedder_from_settings(settings)?;
    let (pair, report) = Indexer::new(embedder)
        .with_delay(settings.embed_delay)
        .with_progress(true)
        .build(chunks)
        .await
        .context("Index build failed")?;

    pair.save(&settings.index_dir)
        .with_context(|| format!("Failed to save index to {}", settings.index_dir.display()))?;

    println!(
        "✅ Indexed {} chunks (dim {}), skipped {} → {}",
        report.embedded.to_string().green(),
        pair.dimension(),
        report.skipped.to_string().yellow(),
        settings.index_dir.display()
    );
    Ok(())
}

fn source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .map_or(false, |ext| ext == "txt" || ext == "md")
        })
        .collect();
    files.sort();
    Ok(files)
}
