use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lanshare_engine::engine::StatusListener;
use lanshare_engine::index::FileNode;
use lanshare_engine::retry::{FailFn, RestartFn, RetryPolicy, RetryScheduler};
use lanshare_engine::status::TransferStatus;
use lanshare_engine::{Config, Engine};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

struct PrintingListener;

impl StatusListener for PrintingListener {
    fn id(&self) -> String {
        "printing-listener".into()
    }

    fn on_file_status_changed(
        &self,
        path: &str,
        _old: Option<TransferStatus>,
        new: TransferStatus,
    ) {
        println!("   [listener] {path}: {:?}", new.state);
    }
}

async fn write_file(dir: &TempDir, name: &str, size: usize) -> FileNode {
    let path = dir.path().join(name);
    let data: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
    let mut file = tokio::fs::File::create(&path).await.unwrap();
    file.write_all(&data).await.unwrap();
    FileNode::file(path.to_string_lossy().to_string(), name, size as u64)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("lanshare-engine - engine + retry scheduler demo");
    println!("================================================\n");

    let dir = TempDir::new()?;
    let engine = Arc::new(Engine::new(Config::default())?);
    engine.add_status_listener(Arc::new(PrintingListener));

    let a = write_file(&dir, "a.bin", 4 * 1024).await;
    let b = write_file(&dir, "b.bin", 4 * 1024).await;
    engine.add_file(a.clone()).await?;
    engine.add_file(b.clone()).await?;

    println!("Transferring {} end to end...", a.path);
    engine.start_transfer(&a.path)?;
    engine.update_progress(&a.path, a.size)?;
    engine.complete_transfer(&a.path)?;

    println!("\nTransferring {} with a pause...", b.path);
    engine.start_transfer(&b.path)?;
    engine.pause_transfer(&b.path)?;
    engine.resume_transfer(&b.path)?;
    engine.update_progress(&b.path, b.size)?;
    engine.complete_transfer(&b.path)?;

    let session = engine.get_session_status();
    println!(
        "\nSession after both files: completed={} state={:?}",
        session.completed_files, session.state
    );

    println!("\nDemonstrating the retry scheduler against a flaky send that succeeds on its third attempt...");
    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_for_restart = attempts.clone();
    let restart: RestartFn = Arc::new(move |path| {
        let attempts = attempts_for_restart.clone();
        Box::pin(async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt < 3 {
                println!("   [retry] attempt {attempt} for {path} failed");
                Err(lanshare_engine::EngineError::Busy)
            } else {
                println!("   [retry] attempt {attempt} for {path} succeeded");
                Ok(())
            }
        })
    });

    let fail: FailFn = Arc::new(move |path, message| {
        Box::pin(async move {
            println!("   [retry] giving up on {path}: {message}");
        })
    });

    let mut policy = RetryPolicy::default();
    policy.initial_delay = Duration::from_millis(10);
    policy.max_delay = Duration::from_millis(10);
    let scheduler = RetryScheduler::new(policy, restart, fail);

    scheduler.schedule("b.bin".into(), "connection timeout".into(), 0);
    tokio::time::sleep(Duration::from_millis(200)).await;
    println!("\nTotal restart attempts observed: {}", attempts.load(Ordering::SeqCst));

    scheduler.stop();
    engine.close();
    Ok(())
}
