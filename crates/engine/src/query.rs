//! Query pipeline: embed → overshoot search → threshold filter → rank.

use std::path::Path;

use core_types::SearchHit;
use embedder::{EmbedError, Embedder};
use flat_index::{FlatIndex, SimilaritySearch};
use meta_store::MetaStore;

use crate::EngineError;

/// Maximum snippet length in characters before the `...` marker.
pub const SNIPPET_CHARS: usize = 240;

/// Result of one query.
///
/// `NoMatches` means `k > 0` was requested and nothing survived filtering;
/// it is structurally distinct from `Ranked(vec![])`, which only arises
/// from `k == 0`.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Ranked(Vec<SearchHit>),
    NoMatches,
}

/// Read-only view over a persisted index/metadata pair.
///
/// Both blobs are immutable after [`load`](Self::load); `query` takes
/// `&self`, so any number of queries may run concurrently over one engine.
#[derive(Debug)]
pub struct QueryEngine {
    index: FlatIndex,
    meta: MetaStore,
}

impl QueryEngine {
    /// Load both blobs and verify they are positionally aligned. The
    /// consistency check runs here, before any query can be served.
    pub fn load(index_path: &Path, meta_path: &Path) -> Result<Self, EngineError> {
        let index = FlatIndex::load(index_path)?;
        let meta = MetaStore::load(meta_path)?;

        if index.len() != meta.len() {
            return Err(EngineError::Consistency {
                vectors: index.len(),
                records: meta.len(),
            });
        }

        tracing::info!(docs = index.len(), dim = index.dim(), "query engine loaded");
        Ok(Self { index, meta })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Answer one free-text query.
    ///
    /// Retrieves `max(k * 10, k)` candidates to leave room for the
    /// `min_score` filter, then keeps the first `k` survivors in
    /// descending-score order. The overshoot is a fixed multiplier: if the
    /// threshold eliminates more than 90% of the candidates, fewer than `k`
    /// results come back and no wider re-query is attempted. That recall
    /// cap is intentional, inherited behavior.
    pub fn query<E: Embedder>(
        &self,
        embedder: &E,
        text: &str,
        k: usize,
        min_score: f32,
    ) -> Result<QueryOutcome, EngineError> {
        if k == 0 {
            return Ok(QueryOutcome::Ranked(Vec::new()));
        }

        let q = embed_one(embedder, text)?;
        let overshoot = k.saturating_mul(10).max(k);
        let candidates = self.index.search(&q, overshoot)?;
        tracing::debug!(candidates = candidates.len(), overshoot, "search returned");

        let mut hits = Vec::new();
        for (score, id) in candidates {
            // The flat scan only yields real ids, but an id the store cannot
            // resolve is still skipped rather than surfaced.
            let Some(doc) = self.meta.get(id) else {
                tracing::warn!(%id, "candidate id missing from metadata store; skipped");
                continue;
            };
            if score < min_score {
                continue;
            }

            hits.push(SearchHit {
                rank: hits.len() + 1,
                score,
                title: collapse_newlines(&doc.title),
                snippet: make_snippet(&doc.text),
            });
            if hits.len() >= k {
                break;
            }
        }

        if hits.is_empty() {
            Ok(QueryOutcome::NoMatches)
        } else {
            Ok(QueryOutcome::Ranked(hits))
        }
    }
}

fn embed_one<E: Embedder>(embedder: &E, text: &str) -> Result<Vec<f32>, EngineError> {
    let mut out = embedder.encode(&[text])?;
    if out.len() != 1 {
        return Err(EngineError::Embed(EmbedError::Backend(format!(
            "expected 1 vector for 1 text, got {}",
            out.len()
        ))));
    }
    Ok(out.remove(0))
}

fn collapse_newlines(s: &str) -> String {
    s.replace('\n', " ")
}

/// Newline-collapsed text, truncated to [`SNIPPET_CHARS`] characters with a
/// trailing `...` when anything was cut.
fn make_snippet(text: &str) -> String {
    let flat = collapse_newlines(text);
    match flat.char_indices().nth(SNIPPET_CHARS) {
        Some((byte_end, _)) => format!("{}...", &flat[..byte_end]),
        None => flat,
    }
}
