use lanshare_engine::chunk::{select_chunk_size, Chunker, MIN_CHUNK_SIZE};
use tempfile::TempDir;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("═══════════════════════════════════════════════════════════");
    println!("  lanshare-engine - Chunker demo");
    println!("═══════════════════════════════════════════════════════════\n");

    let temp_dir = TempDir::new()?;
    let test_file = temp_dir.path().join("demo_file.bin");

    println!("Creating test file (1 MiB)...");
    let mut file = File::create(&test_file).await?;
    let data: Vec<u8> = (0..1024 * 1024).map(|i| (i % 256) as u8).collect();
    file.write_all(&data).await?;
    println!("   file: {:?}\n", test_file);

    let chunk_size = select_chunk_size(data.len() as u64).max(MIN_CHUNK_SIZE);
    println!("Selected chunk size: {} KiB", chunk_size / 1024);

    let mut chunker = Chunker::open(&test_file, chunk_size).await?;
    println!("Opened chunker, total size: {} bytes\n", chunker.total_size());

    let mut chunks = Vec::new();
    while let Some(chunk) = chunker.next().await? {
        chunks.push(chunk);
    }
    chunker.close();

    println!("Produced {} chunks:", chunks.len());
    for chunk in chunks.iter().take(5) {
        println!(
            "   #{:>3} | {:>6} bytes | last={:<5} | sha256={}",
            chunk.sequence_number,
            chunk.size,
            chunk.is_last,
            &chunk.hash[..16]
        );
    }
    if chunks.len() > 5 {
        println!("   ... and {} more chunks", chunks.len() - 5);
    }

    let reconstructed: Vec<u8> = chunks.iter().flat_map(|c| c.data.to_vec()).collect();
    assert_eq!(reconstructed, data, "reconstructed bytes must match the original file");
    println!("\nReconstructed stream matches the original file byte-for-byte.");

    println!("\nAdaptive chunk sizing across file sizes:");
    for size in [500u64, 10 * 1024, 10 * 1024 * 1024, 200 * 1024 * 1024] {
        println!("   {:>12} bytes -> {} KiB", size, select_chunk_size(size) / 1024);
    }

    Ok(())
}
