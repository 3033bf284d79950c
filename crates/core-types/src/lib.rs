//! Core identifiers and shared lightweight types for semsearch.
//!
//! These types intentionally avoid heavy dependencies and aim to be
//! serialization-friendly for the bincode metadata blob and CLI output.

use serde::{Deserialize, Serialize};

/// Positional identifier of a document: the zero-based slot at which its
/// vector was appended to the index. Assigned in strict insertion order,
/// never reused, never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub const fn from_usize(i: usize) -> Self {
        DocId(i as u32)
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One corpus record: a labeled, titled piece of text. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub label: String,
    pub title: String,
    pub text: String,
}

impl Document {
    /// The exact text submitted to the embedder for this document.
    ///
    /// Single-space join of title and body; re-builds must reproduce this
    /// rule byte-for-byte for embeddings to stay comparable.
    pub fn embedding_input(&self) -> String {
        format!("{} {}", self.title, self.text)
    }
}

/// One ranked query result, shaped for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// 1-based rank within the surviving result list.
    pub rank: usize,
    /// Inner-product similarity against the query vector.
    pub score: f32,
    /// Document title with newlines collapsed to spaces.
    pub title: String,
    /// Document text, newline-collapsed and truncated to 240 characters
    /// with a trailing `...` when truncated.
    pub snippet: String,
}
