use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One chunk of a file's byte stream.
///
/// `data` is always an owned copy: two chunks produced by the same
/// [`super::chunker::Chunker`] never alias the same backing storage, even
/// though the chunker reuses an internal read buffer between calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub sequence_number: u32,
    pub data: Bytes,
    /// Hex-encoded SHA-256 digest of `data`.
    pub hash: String,
    pub is_last: bool,
    pub size: usize,
}
