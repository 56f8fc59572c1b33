use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Exact nearest-neighbour index over fixed-dimension vectors.
///
/// Distances are squared Euclidean distances, smaller is closer. Vectors are
/// stored row-major in a single buffer; row `i` is the `i`-th vector added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatL2Index {
    dimension: usize,
    count: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::DataIntegrity(
                "vector index dimension must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            count: 0,
            data: Vec::new(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        self.check_dimension(vector.len())?;
        self.data.extend_from_slice(vector);
        self.count += 1;
        Ok(self.count - 1)
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.count {
            return None;
        }
        let start = index * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    /// Returns up to `k` `(row, distance)` pairs sorted by ascending distance.
    /// Equal distances keep row order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        self.check_dimension(query.len())?;

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, vector)| (row, squared_l2(query, vector)))
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    /// Checks the internal buffer after deserialization.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(RagError::DataIntegrity(
                "vector index has zero dimension".to_string(),
            ));
        }
        if self.data.len() != self.count * self.dimension {
            return Err(RagError::DataIntegrity(format!(
                "vector buffer holds {} floats, expected {} rows x {} dims",
                self.data.len(),
                self.count,
                self.dimension
            )));
        }
        Ok(())
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimension {
            return Err(RagError::DataIntegrity(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimension, actual
            )));
        }
        Ok(())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
