//! Text embedding capability.
//!
//! The [`Embedder`] trait is the only contract the pipelines know about:
//! one batched `encode` operation producing unit-normalized vectors of a
//! fixed dimension. An embedder is constructed once and passed by reference
//! into the build and query pipelines; there is no process-global model.
//!
//! The bundled backend is [`HashEmbedder`], a deterministic feature-hashing
//! embedder that needs no model files or hardware, so index builds and
//! queries work (and stay reproducible) fully offline. A model-backed
//! implementation plugs in behind the same trait.

use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("unknown device: {0:?} (expected \"cpu\" or \"cuda\")")]
    UnknownDevice(String),

    #[error("embedding backend failed: {0}")]
    Backend(String),
}

/// Compute device selector, carried for parity with GPU-capable backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

impl FromStr for Device {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda),
            other => Err(EmbedError::UnknownDevice(other.to_string())),
        }
    }
}

/// Maps text to fixed-dimension, L2-normalized vectors.
///
/// Contract: one output per input, every output of length [`dim`](Self::dim)
/// with unit Euclidean norm, and identical text always producing identical
/// vectors. Partitioning the input into batches of any size must not change
/// the outputs; batch size is purely a performance knob.
pub trait Embedder {
    /// Fixed output dimension `D`.
    fn dim(&self) -> usize;

    /// Embed a batch of texts, one vector per text.
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// Deterministic feature-hashing embedder.
///
/// Tokenizes on non-alphanumeric boundaries, lowercases, and hashes each
/// token (FNV-1a) into one of `dim` signed buckets; the accumulated vector
/// is L2-normalized. Not a semantic model, but it satisfies every property
/// the pipelines rely on: fixed dimension, unit norm, determinism, and
/// batch-size invariance. Identical texts therefore embed to identical
/// vectors with self-similarity 1.0.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

/// Default output dimension for [`HashEmbedder`].
pub const DEFAULT_DIM: usize = 256;

impl HashEmbedder {
    pub fn new(dim: usize, device: Device) -> Self {
        if device != Device::Cpu {
            tracing::debug!(?device, "hashing backend runs on CPU; device selector ignored");
        }
        Self { dim }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        let mut tokens = 0usize;

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let h = fnv1a(token);
            let bucket = (h % self.dim as u64) as usize;
            // One hash bit picks the sign so unrelated tokens cancel rather
            // than pile up in the positive orthant.
            let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
            tokens += 1;
        }

        if tokens == 0 {
            // No tokens to hash; fall back to a fixed basis vector so the
            // unit-norm invariant holds for every emitted vector.
            v[0] = 1.0;
            return v;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        } else {
            v[0] = 1.0;
        }
        v
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM, Device::Cpu)
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts
            .iter()
            .map(|t| self.embed_one(&t.to_lowercase()))
            .collect())
    }
}

fn fnv1a(token: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in token.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h
}
