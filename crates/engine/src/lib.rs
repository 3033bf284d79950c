//! Build and query pipelines.
//!
//! [`build`] turns a raw corpus into an aligned index/metadata blob pair;
//! [`query`] answers a single free-text query against a loaded pair. Both
//! are single-threaded and synchronous; the only internal parallelism is
//! whatever an [`embedder::Embedder`] backend performs inside one blocking
//! `encode` call.

pub mod build;
pub mod query;

pub use build::{BuildParams, BuildReport, IndexBuilder};
pub use query::{QueryEngine, QueryOutcome, SNIPPET_CHARS};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Corpus(#[from] corpus::CorpusError),

    #[error(transparent)]
    Index(#[from] flat_index::IndexError),

    #[error(transparent)]
    Meta(#[from] meta_store::MetaError),

    #[error(transparent)]
    Embed(#[from] embedder::EmbedError),

    #[error("index/metadata mismatch: {vectors} vectors but {records} metadata records")]
    Consistency { vectors: usize, records: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
