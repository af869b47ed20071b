use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::error::{ChunkError, Result};
use super::sizing::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use super::types::Chunk;

/// Sequential, restartable chunk producer for a single file.
///
/// A `Chunker` owns one open read handle and an internal read buffer of
/// `chunk_size` bytes. Each call to [`Chunker::next`] fills the buffer, hashes
/// exactly the bytes read, and copies them into a fresh [`bytes::Bytes`] —
/// never a view into the reused buffer, so chunks handed to different callers
/// never alias each other's storage.
pub struct Chunker {
    path: PathBuf,
    file: Option<File>,
    chunk_size: usize,
    total_size: u64,
    bytes_read: u64,
    sequence_number: u32,
    buf: Vec<u8>,
}

impl Chunker {
    pub async fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            return Err(ChunkError::InvalidChunkSize(format!(
                "{chunk_size} outside [{MIN_CHUNK_SIZE}, {MAX_CHUNK_SIZE}]"
            )));
        }
        let file = File::open(&path).await?;
        let metadata = file.metadata().await?;
        if metadata.is_dir() {
            return Err(ChunkError::IsDirectory(path.display().to_string()));
        }
        Ok(Self {
            path,
            total_size: metadata.len(),
            file: Some(file),
            chunk_size,
            bytes_read: 0,
            sequence_number: 0,
            buf: vec![0u8; chunk_size],
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Returns the next chunk, or `Ok(None)` once every byte has been read.
    pub async fn next(&mut self) -> Result<Option<Chunk>> {
        if self.bytes_read >= self.total_size {
            return Ok(None);
        }
        let file = self.file.as_mut().ok_or(ChunkError::Closed)?;

        let mut filled = 0usize;
        while filled < self.buf.len() {
            let n = file.read(&mut self.buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }

        let payload = self.buf[..filled].to_vec();
        let mut hasher = Sha256::new();
        hasher.update(&payload);
        let hash = hex::encode(hasher.finalize());
        crate::metrics::record_chunk_hashed(filled);

        self.bytes_read += filled as u64;
        self.sequence_number += 1;
        let is_last = self.bytes_read >= self.total_size;

        Ok(Some(Chunk {
            sequence_number: self.sequence_number,
            size: payload.len(),
            data: bytes::Bytes::from(payload),
            hash,
            is_last,
        }))
    }

    pub fn close(&mut self) {
        self.file = None;
    }
}
