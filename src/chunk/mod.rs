pub mod chunker;
pub mod error;
pub mod sizing;
pub mod types;

pub use chunker::Chunker;
pub use error::{ChunkError, Result};
pub use sizing::{select_chunk_size, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use types::Chunk;
