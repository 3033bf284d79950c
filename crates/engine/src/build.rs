//! Corpus ingestion: read → embed in batches → append aligned → persist.

use std::path::{Path, PathBuf};

use core_types::Document;
use corpus::CorpusReader;
use embedder::Embedder;
use flat_index::{FlatIndex, SimilaritySearch};
use indicatif::{ProgressBar, ProgressStyle};
use meta_store::MetaStore;
use tempfile::NamedTempFile;

use crate::EngineError;

#[derive(Debug, Clone)]
pub struct BuildParams {
    pub input: PathBuf,
    pub index_out: PathBuf,
    pub meta_out: PathBuf,
    /// Embedding batch size; a performance knob only, never affects the
    /// produced vectors.
    pub batch_size: usize,
    /// Stop after this many corpus records; `0` means read everything.
    pub max_docs: usize,
    /// Draw a progress bar on stderr while embedding.
    pub progress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    pub docs: usize,
    pub dim: usize,
}

/// Populates the vector index and metadata store from a raw corpus and
/// persists both blobs together.
pub struct IndexBuilder<'a, E: Embedder> {
    embedder: &'a E,
}

impl<'a, E: Embedder> IndexBuilder<'a, E> {
    pub fn new(embedder: &'a E) -> Self {
        Self { embedder }
    }

    pub fn build(&self, params: &BuildParams) -> Result<BuildReport, EngineError> {
        let docs = read_corpus(&params.input, params.max_docs)?;
        tracing::info!(docs = docs.len(), input = %params.input.display(), "corpus read");

        let dim = self.embedder.dim();
        let mut index = FlatIndex::new(dim);
        let mut meta = MetaStore::new();

        let bar = embed_progress(params.progress, docs.len());
        let batch_size = params.batch_size.max(1);
        for chunk in docs.chunks(batch_size) {
            let inputs: Vec<String> = chunk.iter().map(Document::embedding_input).collect();
            let refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
            let vectors = self.embedder.encode(&refs)?;
            index.add(&vectors)?;
            for doc in chunk {
                meta.push(doc.clone());
            }
            bar.inc(chunk.len() as u64);
        }
        bar.finish_and_clear();

        debug_assert_eq!(index.len(), meta.len());
        persist_pair(&index, &meta, &params.index_out, &params.meta_out)?;
        tracing::info!(
            docs = meta.len(),
            dim,
            index = %params.index_out.display(),
            meta = %params.meta_out.display(),
            "index built"
        );

        Ok(BuildReport { docs: meta.len(), dim })
    }
}

/// First `max_docs` records in corpus order (`0` = all).
fn read_corpus(path: &Path, max_docs: usize) -> Result<Vec<Document>, EngineError> {
    let reader = CorpusReader::open(path)?;
    let mut docs = Vec::new();
    for record in reader {
        docs.push(record?);
        if max_docs > 0 && docs.len() >= max_docs {
            break;
        }
    }
    Ok(docs)
}

/// Write both blobs to temp files next to their destinations, then rename
/// both into place only after both writes succeed. A failed build never
/// leaves a half-written or mismatched pair behind.
fn persist_pair(
    index: &FlatIndex,
    meta: &MetaStore,
    index_out: &Path,
    meta_out: &Path,
) -> Result<(), EngineError> {
    let index_tmp = NamedTempFile::new_in(staging_dir(index_out))?;
    let meta_tmp = NamedTempFile::new_in(staging_dir(meta_out))?;

    index.save(index_tmp.path())?;
    meta.save(meta_tmp.path())?;

    index_tmp.persist(index_out).map_err(|e| e.error)?;
    meta_tmp.persist(meta_out).map_err(|e| e.error)?;
    Ok(())
}

fn staging_dir(out: &Path) -> &Path {
    match out.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn embed_progress(enabled: bool, total: usize) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} docs embedded ({eta})")
    {
        bar.set_style(style);
    }
    bar
}
