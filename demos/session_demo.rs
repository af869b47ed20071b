use lanshare_engine::index::FileNode;
use lanshare_engine::{Config, Engine};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

async fn write_file(dir: &TempDir, name: &str, size: usize) -> FileNode {
    let path = dir.path().join(name);
    let data: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
    let mut file = tokio::fs::File::create(&path).await.unwrap();
    file.write_all(&data).await.unwrap();
    FileNode::file(path.to_string_lossy().to_string(), name, size as u64)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("lanshare-engine - Engine session demo");
    println!("======================================\n");

    let dir = TempDir::new()?;
    let engine = Engine::new(Config::default())?;

    println!("Session: {}", engine.session_id());

    let doc = write_file(&dir, "document.pdf", 20 * 1024).await;
    let video = write_file(&dir, "video.mp4", 100 * 1024).await;
    let archive = write_file(&dir, "archive.zip", 50 * 1024).await;

    engine.add_file(doc.clone()).await?;
    engine.add_file(video.clone()).await?;
    engine.add_file(archive.clone()).await?;

    let session = engine.get_session_status();
    println!(
        "\nAdmitted {} files, {} bytes total",
        session.total_files, session.total_bytes
    );

    println!("\nTransferring document.pdf...");
    engine.start_transfer(&doc.path)?;
    engine.update_progress(&doc.path, doc.size / 2)?;
    engine.update_progress(&doc.path, doc.size)?;
    engine.complete_transfer(&doc.path)?;
    println!("   completed, progress now {:.1}%", engine.get_session_status().overall_percent);

    println!("\nTransferring video.mp4, then losing the connection...");
    engine.start_transfer(&video.path)?;
    engine.update_progress(&video.path, video.size / 3)?;
    engine.fail_transfer(&video.path, "connection reset by peer")?;

    let video_status = engine.get_file_status(&video.path)?;
    println!("   state: {:?}, last error: {:?}", video_status.state, video_status.last_error);

    println!("\nRemaining pending file: {:?}", engine.get_next_pending_file());

    println!("\nTransferring archive.zip with a pause/resume...");
    engine.start_transfer(&archive.path)?;
    engine.update_progress(&archive.path, archive.size / 4)?;
    engine.pause_transfer(&archive.path)?;
    println!("   paused at {:?}", engine.get_file_status(&archive.path)?.state);
    engine.resume_transfer(&archive.path)?;
    engine.update_progress(&archive.path, archive.size)?;
    engine.complete_transfer(&archive.path)?;

    let session = engine.get_session_status();
    println!("\nFinal session status:");
    println!("   total:     {}", session.total_files);
    println!("   completed: {}", session.completed_files);
    println!("   failed:    {}", session.failed_files);
    println!("   pending:   {}", session.pending_files);
    println!("   state:     {:?}", session.state);
    println!("   progress:  {:.1}%", session.overall_percent);

    engine.close();
    Ok(())
}
