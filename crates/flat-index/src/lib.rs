//! Exact (brute-force) inner-product vector index.
//!
//! Vectors are expected to be L2-normalized by the caller, which makes the
//! inner product equal to cosine similarity. The index is append-only: each
//! added vector receives the id equal to the index's prior count, and ids
//! are never reused or reassigned.

mod blob;

pub use blob::{IndexBlobWriter, BLOB_HEADER_SIZE, BLOB_MAGIC};

use std::path::Path;

use core_types::DocId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid index blob: bad magic bytes")]
    BadMagic,

    #[error("invalid index blob: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Minimal search seam between the engine and the index backend.
///
/// The brute-force [`FlatIndex`] is the only shipped implementation; the
/// trait exists so a different exact or approximate backend can be slotted
/// in without touching the build/query pipelines.
pub trait SimilaritySearch {
    /// Fixed vector dimension `D` of this index.
    fn dim(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors in order; the id of each appended vector is the
    /// index's count before the append.
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError>;

    /// Exact top-`k` by descending inner product, ties broken by ascending
    /// id. Returns `min(k, len)` entries.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, DocId)>, IndexError>;
}

/// Flat in-memory index: all vectors in one contiguous `f32` buffer,
/// scanned in full on every search. No approximation, no pruning.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index of fixed dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    /// Load an index blob from disk. See [`blob`] for the format.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        blob::read(path)
    }

    /// Persist the index to `path` as a versioned binary blob.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let mut writer = IndexBlobWriter::create(path, self.dim)?;
        for row in self.data.chunks_exact(self.dim.max(1)) {
            writer.write_vector(row)?;
        }
        writer.finish()?;
        Ok(())
    }

    /// Borrow the vector stored at `id`, if present.
    pub fn vector(&self, id: DocId) -> Option<&[f32]> {
        let start = id.as_usize().checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    pub(crate) fn from_parts(dim: usize, data: Vec<f32>) -> Self {
        debug_assert!(dim == 0 || data.len() % dim == 0);
        Self { dim, data }
    }
}

impl SimilaritySearch for FlatIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        // Validate the whole batch before touching the buffer so a failed
        // add leaves the index unchanged.
        for v in vectors {
            if v.len() != self.dim {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dim,
                    actual: v.len(),
                });
            }
        }
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(f32, DocId)>, IndexError> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(f32, DocId)> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(i, row)| (dot(query, row), DocId::from_usize(i)))
            .collect();

        // Descending score; equal scores rank the earlier-inserted vector
        // first to keep results deterministic.
        scored.sort_unstable_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored.truncate(k);
        Ok(scored)
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
