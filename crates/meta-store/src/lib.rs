//! Ordered document metadata, positionally aligned with the vector index.
//!
//! `MetaStore` is the sibling artifact of the index blob: record `i`
//! describes the document whose vector occupies id `i`. It is append-only
//! during a build and read-only afterwards.
//!
//! On-disk layout: 8-byte magic `SSMETA01` (name + format version) followed
//! by a bincode-encoded `Vec<Document>`. A magic mismatch is reported as a
//! distinct error instead of letting bincode misread a foreign payload.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use core_types::{DocId, Document};
use thiserror::Error;

/// Magic bytes identifying a metadata blob.
pub const META_MAGIC: [u8; 8] = *b"SSMETA01";

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("invalid metadata blob: bad magic bytes")]
    BadMagic,

    #[error("metadata decode failed: {0}")]
    Decode(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only, ordered collection of [`Document`] records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaStore {
    records: Vec<Document>,
}

impl MetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record; its position is the id of the matching vector.
    pub fn push(&mut self, doc: Document) {
        self.records.push(doc);
    }

    /// Record for `id`, or `None` when `id` falls outside the store.
    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.records.get(id.as_usize())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Persist as a versioned bincode blob.
    pub fn save(&self, path: &Path) -> Result<(), MetaError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&META_MAGIC)?;
        bincode::serialize_into(&mut writer, &self.records)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a blob written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self, MetaError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if magic != META_MAGIC {
            return Err(MetaError::BadMagic);
        }

        let records: Vec<Document> = bincode::deserialize_from(&mut reader)?;
        tracing::debug!(records = records.len(), path = %path.display(), "loaded metadata blob");
        Ok(Self { records })
    }
}
