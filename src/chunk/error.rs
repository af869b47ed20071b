use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("path is a directory, not a file: {0}")]
    IsDirectory(String),

    #[error("chunker is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ChunkError>;
