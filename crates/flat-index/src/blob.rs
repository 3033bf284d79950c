//! Index blob format.
//!
//! ```text
//! Offset   Size        Type      Description
//! ──────────────────────────────────────────────
//! 0x00     8           [u8; 8]   Magic: "SSIDX001" (name + format version)
//! 0x08     4           u32 LE    N: number of vectors
//! 0x0C     4           u32 LE    D: vector dimension
//! 0x10     N*D*4       f32 LE    vector data, row-major
//! ```
//!
//! A reader that sees a different magic (older/newer writer, or not an
//! index blob at all) fails with [`IndexError::BadMagic`] instead of
//! misreading the payload.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::{FlatIndex, IndexError};

/// Magic bytes identifying an index blob: format name plus version.
pub const BLOB_MAGIC: [u8; 8] = *b"SSIDX001";

/// Header size in bytes: 8 (magic) + 4 (count) + 4 (dim).
pub const BLOB_HEADER_SIZE: usize = 16;

/// Streaming writer for index blobs.
///
/// The header is written with a zero count up front and patched with the
/// real count in [`finish`](Self::finish), so an interrupted write never
/// looks like a complete blob with the wrong length.
pub struct IndexBlobWriter {
    writer: BufWriter<File>,
    dim: usize,
    count: u32,
}

impl IndexBlobWriter {
    pub fn create(path: &Path, dim: usize) -> Result<Self, IndexError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&BLOB_MAGIC)?;
        writer.write_all(&0u32.to_le_bytes())?;
        writer.write_all(&(dim as u32).to_le_bytes())?;
        Ok(Self { writer, dim, count: 0 })
    }

    pub fn write_vector(&mut self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        for &val in vector {
            self.writer.write_all(&val.to_le_bytes())?;
        }
        self.count += 1;
        Ok(())
    }

    /// Flush, patch the count into the header, and sync. Returns the number
    /// of vectors written.
    pub fn finish(mut self) -> Result<u32, IndexError> {
        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.seek(SeekFrom::Start(8))?;
        file.write_all(&self.count.to_le_bytes())?;
        file.sync_all()?;
        Ok(self.count)
    }
}

/// Read a full index blob back into memory.
pub(crate) fn read(path: &Path) -> Result<FlatIndex, IndexError> {
    let file = File::open(path)?;
    // SAFETY: blobs are written once and never mutated afterwards; mapping
    // an immutable file is sound.
    let mmap = unsafe { Mmap::map(&file)? };
    let bytes: &[u8] = &mmap;

    if bytes.len() < BLOB_HEADER_SIZE {
        return Err(IndexError::Truncated {
            expected: BLOB_HEADER_SIZE,
            actual: bytes.len(),
        });
    }
    if bytes[0..8] != BLOB_MAGIC {
        return Err(IndexError::BadMagic);
    }

    let count = u32::from_le_bytes(bytes[8..12].try_into().map_err(to_io)?) as usize;
    let dim = u32::from_le_bytes(bytes[12..16].try_into().map_err(to_io)?) as usize;

    let expected = BLOB_HEADER_SIZE + count * dim * std::mem::size_of::<f32>();
    if bytes.len() < expected {
        return Err(IndexError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }

    // The mmap offset is not f32-aligned, so decode by copy; this also
    // fixes the endianness on big-endian hosts.
    let mut data = Vec::with_capacity(count * dim);
    for chunk in bytes[BLOB_HEADER_SIZE..expected].chunks_exact(4) {
        data.push(f32::from_le_bytes(chunk.try_into().map_err(to_io)?));
    }

    tracing::debug!(count, dim, path = %path.display(), "loaded index blob");
    Ok(FlatIndex::from_parts(dim, data))
}

fn to_io(_: std::array::TryFromSliceError) -> IndexError {
    IndexError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "short slice"))
}
