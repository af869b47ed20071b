use thiserror::Error;

/// Aggregate error type returned by every public engine operation.
///
/// Sub-module errors convert in via `#[from]`, mirroring how the coordinator
/// error enum in the original codebase aggregated its collaborators.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("transfer not found: {0}")]
    TransferNotFound(String),

    #[error("transfer already exists: {0}")]
    TransferAlreadyExists(String),

    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("transfer cancelled: {0}")]
    TransferCancelled(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session already exists: {0}")]
    SessionAlreadyExists(String),

    #[error("max concurrent transfers exceeded")]
    MaxTransfersExceeded,

    #[error("engine busy")]
    Busy,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("path is a directory: {0}")]
    IsDirectory(String),

    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("file limit exceeded (max {0})")]
    FileLimitExceeded(usize),

    #[error(transparent)]
    Codec(#[from] crate::codec::CodecError),

    #[error(transparent)]
    Discovery(#[from] crate::discovery::DiscoveryError),

    #[error(transparent)]
    Chunk(#[from] crate::chunk::ChunkError),

    #[error(transparent)]
    Index(#[from] crate::index::IndexError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
