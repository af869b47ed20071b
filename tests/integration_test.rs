use lanshare_engine::chunk::Chunker;
use lanshare_engine::codec::{decode, encode, Envelope, MessageType, SessionDescriptor};
use lanshare_engine::index::FileNode;
use lanshare_engine::status::{FileState, SessionState};
use lanshare_engine::{Config, Engine};
use tempfile::TempDir;
use tokio::fs;

async fn write_file(dir: &TempDir, name: &str, size: usize) -> FileNode {
    let path = dir.path().join(name);
    let data: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
    fs::write(&path, &data).await.unwrap();
    FileNode::file(path.to_string_lossy().to_string(), name, size as u64)
}

/// Exercises a whole session end to end: three files admitted, one completed,
/// one failed, one left pending, then checks that the engine's own chunker
/// output round-trips through the wire codec.
#[tokio::test]
async fn full_session_workflow_with_mixed_outcomes() {
    let dir = TempDir::new().unwrap();
    let doc = write_file(&dir, "document.pdf", 20 * 1024).await;
    let video = write_file(&dir, "video.mp4", 4 * 1024).await;
    let archive = write_file(&dir, "archive.zip", 1024).await;

    let engine = Engine::new(Config::default()).unwrap();
    engine.add_file(doc.clone()).await.unwrap();
    engine.add_file(video.clone()).await.unwrap();
    engine.add_file(archive.clone()).await.unwrap();

    let session = engine.get_session_status();
    assert_eq!(session.total_files, 3);
    assert_eq!(session.pending_files, 3);

    engine.start_transfer(&doc.path).unwrap();
    engine.update_progress(&doc.path, doc.size).unwrap();
    engine.complete_transfer(&doc.path).unwrap();

    engine.start_transfer(&video.path).unwrap();
    engine.fail_transfer(&video.path, "connection reset by peer").unwrap();

    let next_pending = engine.get_next_pending_file().unwrap();
    assert_eq!(next_pending, archive.path);

    let session = engine.get_session_status();
    assert_eq!(session.completed_files, 1);
    assert_eq!(session.failed_files, 1);
    assert_eq!(session.pending_files, 1);
    assert_eq!(session.bytes_completed, doc.size);
    assert_eq!(session.state, SessionState::Active);

    let doc_status = engine.get_file_status(&doc.path).unwrap();
    assert_eq!(doc_status.state, FileState::Completed);

    engine.start_transfer(&archive.path).unwrap();
    engine.update_progress(&archive.path, archive.size).unwrap();
    engine.complete_transfer(&archive.path).unwrap();

    let session = engine.get_session_status();
    assert_eq!(session.state, SessionState::Completed);
    assert!(session.completion_time.is_some());

    engine.close();
}

/// The chunker's own output, encoded as `ChunkData` envelopes and decoded
/// back, must reproduce the exact bytes and hash for every chunk.
#[tokio::test]
async fn chunk_stream_round_trips_through_wire_codec() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("payload.bin");
    let data: Vec<u8> = (0..12 * 1024).map(|i| (i * 7 % 256) as u8).collect();
    fs::write(&path, &data).await.unwrap();

    let mut chunker = Chunker::open(&path, 4 * 1024).await.unwrap();
    let session = SessionDescriptor {
        service_id: "svc-1".into(),
        session_id: "sess-1".into(),
        session_create_at: 0,
    };

    let mut reconstructed = Vec::new();
    while let Some(chunk) = chunker.next().await.unwrap() {
        let envelope = Envelope {
            message_type: MessageType::ChunkData,
            session: session.clone(),
            file_id: "payload".into(),
            file_name: "payload.bin".into(),
            sequence_no: chunk.sequence_number,
            offset: None,
            data: Some(chunk.data.to_vec()),
            chunk_hash: Some(chunk.hash.clone()),
            total_size: None,
            expected_hash: None,
            error_message: None,
        };

        let wire = encode(&envelope).unwrap();
        let decoded = decode(&wire).unwrap();

        let decoded_data = decoded.data.expect("chunk data must survive the wire");
        assert_eq!(decoded_data, chunk.data.to_vec());
        assert_eq!(decoded.chunk_hash.unwrap(), chunk.hash);
        reconstructed.extend_from_slice(&decoded_data);
    }

    assert_eq!(reconstructed, data);
}

/// Concurrent `complete_transfer`/`mark_file_completed` calls on the same
/// path must not deadlock and must leave consistent final state, regardless
/// of which one observes the queue transition.
#[tokio::test]
async fn concurrent_queue_transitions_settle_without_deadlock() {
    use std::sync::Arc;

    let dir = TempDir::new().unwrap();
    let node = write_file(&dir, "race.bin", 2048).await;

    let engine = Arc::new(Engine::new(Config::default()).unwrap());
    engine.add_file(node.clone()).await.unwrap();
    engine.start_transfer(&node.path).unwrap();

    let e1 = engine.clone();
    let p1 = node.path.clone();
    let e2 = engine.clone();
    let p2 = node.path.clone();

    let result = tokio::time::timeout(std::time::Duration::from_secs(5), async move {
        let h1 = tokio::task::spawn_blocking(move || e1.complete_transfer(&p1));
        let h2 = tokio::task::spawn_blocking(move || e2.mark_file_completed(&p2));
        let _ = h1.await;
        let _ = h2.await;
    })
    .await;

    assert!(result.is_ok(), "concurrent queue transitions deadlocked");
    let session = engine.get_session_status();
    assert_eq!(session.completed_files, 1);
}

/// Racing `complete_transfer` against a `mark_file_failed` for the *same*
/// path with *different* targets must still leave `completed_files +
/// failed_files + pending_files == total_files`: whichever call loses the
/// race must derive its count delta from the queue's actual prior state
/// instead of assuming the path was still pending.
#[tokio::test]
async fn racing_different_targets_keeps_counts_reconciled() {
    use std::sync::Arc;

    let dir = TempDir::new().unwrap();
    let node = write_file(&dir, "race2.bin", 2048).await;

    let engine = Arc::new(Engine::new(Config::default()).unwrap());
    engine.add_file(node.clone()).await.unwrap();
    engine.start_transfer(&node.path).unwrap();

    let e1 = engine.clone();
    let p1 = node.path.clone();
    let e2 = engine.clone();
    let p2 = node.path.clone();

    let result = tokio::time::timeout(std::time::Duration::from_secs(5), async move {
        let h1 = tokio::task::spawn_blocking(move || e1.complete_transfer(&p1));
        let h2 = tokio::task::spawn_blocking(move || e2.mark_file_failed(&p2));
        let _ = h1.await;
        let _ = h2.await;
    })
    .await;

    assert!(result.is_ok(), "racing different targets deadlocked");
    let session = engine.get_session_status();
    assert_eq!(
        session.completed_files + session.failed_files + session.pending_files,
        session.total_files
    );
}
