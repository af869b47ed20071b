pub const MIN_CHUNK_SIZE: usize = 4 * 1024;
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
pub const MAX_CHUNK_SIZE: usize = 256 * 1024;

const LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Picks a chunk size for a file of the given byte size, following the
/// piecewise table: files smaller than [`MIN_CHUNK_SIZE`] get exactly their
/// own size (no point chunking at all), mid-sized files get the minimum, the
/// common case gets the default, and large files get double the default
/// (capped at the max).
pub fn select_chunk_size(file_size: u64) -> usize {
    if file_size < MIN_CHUNK_SIZE as u64 {
        file_size as usize
    } else if file_size < DEFAULT_CHUNK_SIZE as u64 {
        MIN_CHUNK_SIZE
    } else if file_size <= LARGE_FILE_THRESHOLD {
        DEFAULT_CHUNK_SIZE
    } else {
        (DEFAULT_CHUNK_SIZE * 2).min(MAX_CHUNK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiny_file_gets_its_own_size() {
        assert_eq!(select_chunk_size(100), 100);
    }

    #[test]
    fn mid_file_gets_minimum() {
        assert_eq!(select_chunk_size(10_000), MIN_CHUNK_SIZE);
    }

    #[test]
    fn common_file_gets_default() {
        assert_eq!(select_chunk_size(10 * 1024 * 1024), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn large_file_gets_doubled_default_capped_at_max() {
        assert_eq!(select_chunk_size(200 * 1024 * 1024), MAX_CHUNK_SIZE);
    }
}
