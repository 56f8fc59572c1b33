use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::vector_index::FlatL2Index;
use crate::document::chunker::Chunk;
use crate::error::{RagError, Result};

pub const VECTORS_FILE: &str = "vectors.json";
pub const METADATA_FILE: &str = "metadata.json";

/// One metadata row. Row `i` describes vector `i` of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk_id: String,
    pub source: String,
    pub path: String,
    pub heading: String,
    pub text: String,
}

impl From<&Chunk> for IndexEntry {
    fn from(chunk: &Chunk) -> Self {
        Self {
            chunk_id: chunk.chunk_id.clone(),
            source: chunk.source.clone(),
            path: chunk.path.clone(),
            heading: chunk.heading.clone(),
            text: chunk.text.clone(),
        }
    }
}

/// The vector index and its metadata table. Built, saved and loaded together.
#[derive(Debug, Clone)]
pub struct IndexPair {
    index: FlatL2Index,
    metadata: Vec<IndexEntry>,
}

impl IndexPair {
    pub fn new(index: FlatL2Index, metadata: Vec<IndexEntry>) -> Result<Self> {
        index.validate()?;
        if index.len() != metadata.len() {
            return Err(RagError::DataIntegrity(format!(
                "index holds {} vectors but metadata has {} rows",
                index.len(),
                metadata.len()
            )));
        }
        Ok(Self { index, metadata })
    }

    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    pub fn metadata(&self) -> &[IndexEntry] {
        &self.metadata
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Writes both files through temporaries and renames them into place,
    /// metadata first. `vectors.json` carries the SHA-256 of the metadata file
    /// it was written with, so a reader catching the two renames halfway, or
    /// a pair mixed from two builds, fails to load instead of mismatching rows.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let (vectors_path, metadata_path) = pair_paths(dir);
        let vectors_tmp = vectors_path.with_extension("json.tmp");
        let metadata_tmp = metadata_path.with_extension("json.tmp");

        let metadata_bytes = serde_json::to_vec_pretty(&self.metadata)?;
        let checksum = sha256_hex(&metadata_bytes);
        let vectors = StoredVectorsRef {
            metadata_sha256: &checksum,
            index: &self.index,
        };

        fs::write(&metadata_tmp, &metadata_bytes)?;
        fs::write(&vectors_tmp, serde_json::to_vec(&vectors)?)?;
        fs::rename(&metadata_tmp, &metadata_path)?;
        fs::rename(&vectors_tmp, &vectors_path)?;

        tracing::info!(
            "Saved index pair to {} ({} vectors, dim {})",
            dir.display(),
            self.len(),
            self.dimension()
        );
        Ok(())
    }

    /// Loads both files; a missing, corrupt, mismatched or mixed pair is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let (vectors_path, metadata_path) = pair_paths(dir);
        let vectors: StoredVectors = serde_json::from_slice(&read_bytes(&vectors_path)?)?;
        let metadata_bytes = read_bytes(&metadata_path)?;
        let metadata: Vec<IndexEntry> = serde_json::from_slice(&metadata_bytes)?;

        let checksum = sha256_hex(&metadata_bytes);
        if checksum != vectors.metadata_sha256 {
            return Err(RagError::DataIntegrity(format!(
                "{} does not belong to {} (checksum {} != {})",
                metadata_path.display(),
                vectors_path.display(),
                checksum,
                vectors.metadata_sha256
            )));
        }
        Self::new(vectors.index, metadata)
    }
}

/// On-disk layout of `vectors.json`.
#[derive(Serialize)]
struct StoredVectorsRef<'a> {
    metadata_sha256: &'a str,
    #[serde(flatten)]
    index: &'a FlatL2Index,
}

#[derive(Deserialize)]
struct StoredVectors {
    metadata_sha256: String,
    #[serde(flatten)]
    index: FlatL2Index,
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

pub fn pair_paths(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join(VECTORS_FILE), dir.join(METADATA_FILE))
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        RagError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}
