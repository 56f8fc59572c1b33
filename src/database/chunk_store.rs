use std::fs;
use std::path::{Path, PathBuf};

use crate::document::chunker::Chunk;
use crate::error::Result;

/// Directory of chunks, one pretty-printed JSON file per chunk named after its id.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    dir: PathBuf,
}

impl ChunkStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, chunk: &Chunk) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", chunk.chunk_id));
        fs::write(&path, serde_json::to_vec_pretty(chunk)?)?;
        Ok(path)
    }

    /// Reads every chunk in numeric id order. Unreadable files are logged
    /// and skipped.
    pub fn read_all(&self) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for path in self.json_files()? {
            let parsed = fs::read(&path)
                .map_err(crate::error::RagError::from)
                .and_then(|bytes| Ok(serde_json::from_slice::<Chunk>(&bytes)?));
            match parsed {
                Ok(chunk) => chunks.push(chunk),
                Err(e) => tracing::warn!("Skipping unreadable chunk {}: {}", path.display(), e),
            }
        }
        // Ids outgrow the zero padding past chunk_999999, so names alone do not sort.
        chunks.sort_by(|a, b| {
            numeric_id(&a.chunk_id)
                .cmp(&numeric_id(&b.chunk_id))
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        Ok(chunks)
    }

    /// Highest numeric id present, so a later run can continue the sequence.
    pub fn max_id(&self) -> Result<u64> {
        Ok(self
            .read_all()?
            .iter()
            .filter_map(|c| numeric_id(&c.chunk_id))
            .max()
            .unwrap_or(0))
    }

    /// Removes every stored chunk. A missing directory counts as empty.
    pub fn clear(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let files: Vec<PathBuf> = self
            .json_files()?
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with("chunk_"))
            })
            .collect();
        for path in &files {
            fs::remove_file(path)?;
        }
        tracing::info!("Removed {} chunks from {}", files.len(), self.dir.display());
        Ok(files.len())
    }

    fn json_files(&self) -> Result<Vec<PathBuf>> {
        Ok(fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
            .collect())
    }
}

fn numeric_id(chunk_id: &str) -> Option<u64> {
    chunk_id.strip_prefix("chunk_")?.parse().ok()
}
