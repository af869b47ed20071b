pub mod admission;
pub mod listeners;
pub mod queue;

pub use listeners::StatusListener;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::chunk::{select_chunk_size, Chunker};
use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::index::{FileNode, FileStructureIndex};
use crate::status::{FileState, SessionState, SessionStatus, TransferStatus};

use listeners::ListenerEntry;
use queue::{QueueState, SetKind};

/// Hard cap on the number of files a single engine instance will admit.
pub const MAX_SUPPORTED_FILES: usize = 1_000_000;

struct StatusInner {
    session: SessionStatus,
    current: Option<TransferStatus>,
}

/// The transfer engine: a single session's worth of queue, status, chunker,
/// and listener coordination.
///
/// Every public method acquires the engine's locks in the declared order
/// `files -> queue -> status -> events` and never re-enters another public
/// method while holding one of them — operations that touch both the queue
/// and the session status inline the queue move instead of calling back into
/// `mark_file_completed`/`mark_file_failed`.
pub struct Engine {
    config: Config,
    index: FileStructureIndex,
    chunkers: RwLock<HashMap<String, Chunker>>,
    queue: RwLock<QueueState>,
    status: RwLock<StatusInner>,
    listeners: RwLock<Vec<ListenerEntry>>,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        crate::metrics::init_metrics();
        let session_id = uuid::Uuid::new_v4().to_string();
        Ok(Self {
            config,
            index: FileStructureIndex::new(),
            chunkers: RwLock::new(HashMap::new()),
            queue: RwLock::new(QueueState::default()),
            status: RwLock::new(StatusInner {
                session: SessionStatus::new(session_id),
                current: None,
            }),
            listeners: RwLock::new(Vec::new()),
        })
    }

    pub fn session_id(&self) -> String {
        self.status.read().session.session_id.clone()
    }

    /// Admits `node` — a single file or a whole directory subtree — into the
    /// index and queue. Each leaf file gets its own chunker opened eagerly,
    /// following [`crate::chunk::select_chunk_size`] for its size.
    ///
    /// Leaves of a directory subtree are admitted concurrently, bounded by
    /// [`admission::admission_concurrency_for_directory`] so that admitting a
    /// directory with thousands of small files doesn't open that many file
    /// handles at once.
    pub async fn add_file(&self, node: FileNode) -> Result<()> {
        self.index.add_node(node.clone())?;

        let mut leaves = Vec::new();
        collect_leaf_files(&node, &mut leaves);

        let limit = if node.is_directory {
            admission::admission_concurrency_for_directory(
                admission::base_admission_concurrency(),
                node.children.len(),
            )
        } else {
            1
        };
        let semaphore = Arc::new(tokio::sync::Semaphore::new(limit));

        let mut tasks = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            let semaphore = semaphore.clone();
            tasks.push(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                self.admit_leaf(leaf).await
            });
        }
        for result in futures::future::join_all(tasks).await {
            result?;
        }
        Ok(())
    }

    async fn admit_leaf(&self, leaf: FileNode) -> Result<()> {
        if self.index.file_count() > MAX_SUPPORTED_FILES {
            return Err(EngineError::FileLimitExceeded(MAX_SUPPORTED_FILES));
        }
        {
            let queue = self.queue.read();
            if queue.kind_of(&leaf.path).is_some() {
                return Err(EngineError::TransferAlreadyExists(leaf.path));
            }
        }

        let chunk_size = select_chunk_size(leaf.size);
        let chunker = Chunker::open(&leaf.path, chunk_size.max(crate::chunk::MIN_CHUNK_SIZE)).await;
        let chunker = match chunker {
            Ok(c) => c,
            Err(err) => return Err(err.into()),
        };

        self.chunkers.write().insert(leaf.path.clone(), chunker);
        self.queue.write().insert_pending(&leaf.path);

        let new_status = {
            let mut status = self.status.write();
            status.session.total_files += 1;
            status.session.pending_files += 1;
            status.session.total_bytes += leaf.size;
            status.session.recompute_percent();
            status.session.last_update = Utc::now();
            status.session.current_file = status.current.clone();
            Self::record_queue_depths(&status.session);
            status.session.clone()
        };

        let mut synthesized = TransferStatus::new(&leaf.path, self.session_id(), leaf.size);
        synthesized.checksum = leaf.checksum.clone();
        self.emit_file_changed(&leaf.path, None, synthesized);
        self.emit_session_changed_from(new_status);
        Ok(())
    }

    /// Moves `path` from pending to active and makes it the session's
    /// current file. Also permitted from `paused` (resume).
    pub fn start_transfer(&self, path: &str) -> Result<()> {
        {
            let queue = self.queue.read();
            match queue.kind_of(path) {
                Some(SetKind::Pending) => {}
                Some(_) => {
                    return Err(EngineError::InvalidStateTransition(format!(
                        "{path} is not pending"
                    )))
                }
                None => return Err(EngineError::TransferNotFound(path.to_string())),
            }
        }

        let file = self
            .index
            .get_file(path)
            .ok_or_else(|| EngineError::TransferNotFound(path.to_string()))?;

        let (old, new) = {
            let mut status = self.status.write();
            if let Some(cur) = &status.current {
                if cur.path == path && cur.state == FileState::Paused {
                    let old = cur.clone();
                    let mut new = old.clone();
                    new.state = FileState::Active;
                    new.last_update = Some(Utc::now());
                    status.current = Some(new.clone());
                    return self.finish_transition(old, new);
                }
                if cur.state == FileState::Active {
                    return Err(EngineError::Busy);
                }
            }
            let old_status = TransferStatus::new(path, self.session_id(), file.size);
            let mut new_status = old_status.clone();
            new_status.state = FileState::Active;
            new_status.start_time = Some(Utc::now());
            new_status.last_update = new_status.start_time;
            new_status.checksum = file.checksum.clone();
            status.current = Some(new_status.clone());
            (old_status, new_status)
        };

        self.emit_file_changed(path, Some(old), new);
        Ok(())
    }

    fn finish_transition(&self, old: TransferStatus, new: TransferStatus) -> Result<()> {
        self.emit_file_changed(&new.path.clone(), Some(old), new);
        Ok(())
    }

    /// Updates the current file's progress. Only valid while `path` is the
    /// session's current file.
    ///
    /// `bytes_sent` is not clamped to the file's total size, nor required to
    /// be monotonically increasing — this matches an explicit design
    /// decision to leave that unenforced (see `DESIGN.md`).
    pub fn update_progress(&self, path: &str, bytes_sent: u64) -> Result<()> {
        let (old, new) = {
            let mut status = self.status.write();
            let cur = status
                .current
                .as_mut()
                .filter(|c| c.path == path)
                .ok_or_else(|| EngineError::TransferNotFound(path.to_string()))?;
            let old = cur.clone();

            cur.bytes_sent = bytes_sent;
            let now = Utc::now();
            if let Some(start) = cur.start_time {
                let elapsed = (now - start).num_milliseconds().max(1) as f64 / 1000.0;
                cur.transfer_rate = bytes_sent as f64 / elapsed;
                if cur.transfer_rate > 0.0 && cur.total_bytes > bytes_sent {
                    cur.eta_seconds =
                        Some((cur.total_bytes - bytes_sent) as f64 / cur.transfer_rate);
                } else {
                    cur.eta_seconds = Some(0.0);
                }
            }
            cur.last_update = Some(now);
            (old, cur.clone())
        };
        self.emit_file_changed(path, Some(old), new);
        Ok(())
    }

    /// Marks the current file completed and closes out the session if it
    /// was the last outstanding file.
    pub fn complete_transfer(&self, path: &str) -> Result<()> {
        let (old_file, mut new_file) = {
            let status = self.status.read();
            let cur = status
                .current
                .as_ref()
                .filter(|c| c.path == path)
                .cloned()
                .ok_or_else(|| EngineError::TransferNotFound(path.to_string()))?;
            (cur.clone(), cur)
        };
        new_file.state = FileState::Completed;
        new_file.completion_time = Some(Utc::now());
        new_file.bytes_sent = new_file.total_bytes;

        let previous = self.queue.write().move_to(path, SetKind::Completed);
        let moved = previous != Some(SetKind::Completed);

        let new_session = {
            let mut status = self.status.write();
            if moved {
                match previous {
                    Some(SetKind::Pending) | None => {
                        status.session.pending_files =
                            status.session.pending_files.saturating_sub(1);
                    }
                    Some(SetKind::Failed) => {
                        status.session.failed_files =
                            status.session.failed_files.saturating_sub(1);
                    }
                    Some(SetKind::Completed) => unreachable!("excluded by moved"),
                }
                status.session.completed_files += 1;
                status.session.bytes_completed += new_file.total_bytes;
                status.session.recompute_percent();
                crate::metrics::record_file_completed();
            }
            status.current = None;
            status.session.last_update = Utc::now();
            self.close_session_if_done(&mut status.session);
            status.session.current_file = None;
            Self::record_queue_depths(&status.session);
            status.session.clone()
        };

        self.emit_file_changed(path, Some(old_file), new_file);
        self.emit_session_changed_from(new_session);
        Ok(())
    }

    /// Marks the current file failed with `error_message` and closes out the
    /// session if it was the last outstanding file.
    pub fn fail_transfer(&self, path: &str, error_message: impl Into<String>) -> Result<()> {
        let error_message = error_message.into();
        let (old_file, mut new_file) = {
            let status = self.status.read();
            let cur = status
                .current
                .as_ref()
                .filter(|c| c.path == path)
                .cloned()
                .ok_or_else(|| EngineError::TransferNotFound(path.to_string()))?;
            (cur.clone(), cur)
        };
        new_file.state = FileState::Failed;
        new_file.last_error = Some(error_message);

        let previous = self.queue.write().move_to(path, SetKind::Failed);
        let moved = previous != Some(SetKind::Failed);

        let new_session = {
            let mut status = self.status.write();
            if moved {
                match previous {
                    Some(SetKind::Pending) | None => {
                        status.session.pending_files =
                            status.session.pending_files.saturating_sub(1);
                    }
                    Some(SetKind::Completed) => {
                        status.session.completed_files =
                            status.session.completed_files.saturating_sub(1);
                    }
                    Some(SetKind::Failed) => unreachable!("excluded by moved"),
                }
                status.session.failed_files += 1;
                crate::metrics::record_file_failed();
            }
            status.current = None;
            status.session.last_update = Utc::now();
            self.close_session_if_done(&mut status.session);
            status.session.current_file = None;
            Self::record_queue_depths(&status.session);
            status.session.clone()
        };

        self.emit_file_changed(path, Some(old_file), new_file);
        self.emit_session_changed_from(new_session);
        Ok(())
    }

    fn record_queue_depths(session: &SessionStatus) {
        crate::metrics::set_queue_depth("pending", session.pending_files);
        crate::metrics::set_queue_depth("completed", session.completed_files);
        crate::metrics::set_queue_depth("failed", session.failed_files);
    }

    fn close_session_if_done(&self, session: &mut SessionStatus) {
        if session.is_closed() {
            session.completion_time = Some(Utc::now());
            session.state = if session.failed_files >= session.total_files {
                SessionState::Failed
            } else {
                SessionState::Completed
            };
        }
    }

    /// Pauses the current file. Only valid while `path` is current and active.
    pub fn pause_transfer(&self, path: &str) -> Result<()> {
        self.transition_current(path, FileState::Active, FileState::Paused)
    }

    /// Resumes the current file from paused back to active.
    pub fn resume_transfer(&self, path: &str) -> Result<()> {
        self.transition_current(path, FileState::Paused, FileState::Active)
    }

    fn transition_current(&self, path: &str, from: FileState, to: FileState) -> Result<()> {
        let (old, new) = {
            let mut status = self.status.write();
            let cur = status
                .current
                .as_mut()
                .filter(|c| c.path == path)
                .ok_or_else(|| EngineError::TransferNotFound(path.to_string()))?;
            if cur.state != from {
                return Err(EngineError::InvalidStateTransition(format!(
                    "{path}: cannot move from {:?} to {:?}",
                    cur.state, to
                )));
            }
            let old = cur.clone();
            cur.state = to;
            cur.last_update = Some(Utc::now());
            (old, cur.clone())
        };
        self.emit_file_changed(path, Some(old), new);
        Ok(())
    }

    /// Returns the live status if `path` is the current file, otherwise
    /// synthesizes a snapshot from queue membership and the index.
    pub fn get_file_status(&self, path: &str) -> Result<TransferStatus> {
        {
            let status = self.status.read();
            if let Some(cur) = &status.current {
                if cur.path == path {
                    return Ok(cur.clone());
                }
            }
        }

        let file = self
            .index
            .get_file(path)
            .ok_or_else(|| EngineError::TransferNotFound(path.to_string()))?;

        let kind = self
            .queue
            .read()
            .kind_of(path)
            .ok_or_else(|| EngineError::TransferNotFound(path.to_string()))?;

        let mut synthesized = TransferStatus::new(path, self.session_id(), file.size);
        synthesized.checksum = file.checksum.clone();
        synthesized.state = match kind {
            SetKind::Pending => FileState::Pending,
            SetKind::Completed => {
                synthesized.bytes_sent = file.size;
                let session = self.status.read();
                synthesized.completion_time = session.session.completion_time;
                if session.session.total_bytes > 0 {
                    let elapsed = (session.session.last_update - session.session.start_time)
                        .num_milliseconds()
                        .max(1) as f64
                        / 1000.0;
                    synthesized.transfer_rate = session.session.bytes_completed as f64 / elapsed;
                }
                FileState::Completed
            }
            SetKind::Failed => FileState::Failed,
        };
        Ok(synthesized)
    }

    pub fn get_session_status(&self) -> SessionStatus {
        let status = self.status.read();
        let mut session = status.session.clone();
        session.current_file = status.current.clone();
        session
    }

    /// Queue-only transition: moves `path` into the completed set from any
    /// other set (including unknown, which adds it directly). Idempotent.
    pub fn mark_file_completed(&self, path: &str) -> Result<()> {
        self.mark_file(path, SetKind::Completed)
    }

    /// Queue-only transition: moves `path` into the failed set.
    pub fn mark_file_failed(&self, path: &str) -> Result<()> {
        self.mark_file(path, SetKind::Failed)
    }

    fn mark_file(&self, path: &str, target: SetKind) -> Result<()> {
        let previous = self.queue.write().move_to(path, target);
        let moved = previous != Some(target);

        let new_session = {
            let mut status = self.status.write();
            if moved {
                match previous {
                    Some(SetKind::Pending) | None => {
                        status.session.pending_files =
                            status.session.pending_files.saturating_sub(1);
                    }
                    Some(SetKind::Completed) => {
                        status.session.completed_files =
                            status.session.completed_files.saturating_sub(1);
                    }
                    Some(SetKind::Failed) => {
                        status.session.failed_files =
                            status.session.failed_files.saturating_sub(1);
                    }
                }
                match target {
                    SetKind::Completed => {
                        status.session.completed_files += 1;
                        crate::metrics::record_file_completed();
                    }
                    SetKind::Failed => {
                        status.session.failed_files += 1;
                        crate::metrics::record_file_failed();
                    }
                    SetKind::Pending => status.session.pending_files += 1,
                }
                if status
                    .current
                    .as_ref()
                    .map(|c| c.path == path)
                    .unwrap_or(false)
                {
                    status.current = None;
                }
                status.session.last_update = Utc::now();
                self.close_session_if_done(&mut status.session);
                Self::record_queue_depths(&status.session);
            }
            status.session.current_file = status.current.clone();
            status.session.clone()
        };

        if moved {
            self.emit_session_changed_from(new_session);
        }
        Ok(())
    }

    /// Returns an arbitrary pending path, or `None` if the pending set is
    /// empty. Order is unspecified.
    pub fn get_next_pending_file(&self) -> Option<String> {
        self.queue.read().pending.iter().next().cloned()
    }

    pub fn add_status_listener(&self, listener: Arc<dyn StatusListener>) {
        self.listeners.write().push(ListenerEntry { listener });
    }

    pub fn remove_status_listener(&self, id: &str) {
        self.listeners.write().retain(|entry| entry.listener.id() != id);
    }

    /// Closes every open chunker and clears all engine state.
    pub fn close(&self) {
        let mut chunkers = self.chunkers.write();
        for (_, chunker) in chunkers.iter_mut() {
            chunker.close();
        }
        chunkers.clear();
        self.index.clear();
        self.queue.write().clear();
    }

    fn emit_file_changed(&self, path: &str, old: Option<TransferStatus>, new: TransferStatus) {
        let listeners = self.listeners.read().clone();
        if !listeners.is_empty() {
            listeners::notify_file_changed(listeners, path.to_string(), old, new);
        }
    }

    fn emit_session_changed_from(&self, new: SessionStatus) {
        let listeners = self.listeners.read().clone();
        if listeners.is_empty() {
            return;
        }
        listeners::notify_session_changed(listeners, new.clone(), new);
    }
}

fn collect_leaf_files(node: &FileNode, out: &mut Vec<FileNode>) {
    if node.is_directory {
        for child in &node.children {
            collect_leaf_files(child, out);
        }
    } else {
        out.push(node.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    async fn write_file(dir: &TempDir, name: &str, size: usize) -> FileNode {
        let path = dir.path().join(name);
        let data: Vec<u8> = (0..size).map(|i| (i % 256) as u8).collect();
        tokio::fs::write(&path, &data).await.unwrap();
        FileNode::file(path.to_string_lossy().to_string(), name, size as u64)
    }

    #[tokio::test]
    async fn empty_file_completes_with_zero_bytes() {
        let dir = TempDir::new().unwrap();
        let node = write_file(&dir, "empty.bin", 0).await;
        let engine = Engine::new(Config::default()).unwrap();
        engine.add_file(node.clone()).await.unwrap();

        engine.start_transfer(&node.path).unwrap();
        engine.complete_transfer(&node.path).unwrap();

        let session = engine.get_session_status();
        assert_eq!(session.bytes_completed, 0);
        assert_eq!(session.state, SessionState::Completed);
    }

    #[tokio::test]
    async fn session_status_reports_current_file_mid_transfer() {
        let dir = TempDir::new().unwrap();
        let node = write_file(&dir, "current.bin", 50).await;
        let engine = Engine::new(Config::default()).unwrap();
        engine.add_file(node.clone()).await.unwrap();

        assert!(engine.get_session_status().current_file.is_none());

        engine.start_transfer(&node.path).unwrap();
        let session = engine.get_session_status();
        let current = session.current_file.expect("current file must be set mid-transfer");
        assert_eq!(current.path, node.path);
        assert_eq!(current.state, FileState::Active);

        engine.complete_transfer(&node.path).unwrap();
        assert!(engine.get_session_status().current_file.is_none());
    }

    #[tokio::test]
    async fn three_file_session_mixed_outcomes() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.bin", 100).await;
        let b = write_file(&dir, "b.bin", 200).await;
        let c = write_file(&dir, "c.bin", 300).await;

        let engine = Engine::new(Config::default()).unwrap();
        engine.add_file(a.clone()).await.unwrap();
        engine.add_file(b.clone()).await.unwrap();
        engine.add_file(c.clone()).await.unwrap();

        engine.start_transfer(&a.path).unwrap();
        engine.update_progress(&a.path, 100).unwrap();
        engine.complete_transfer(&a.path).unwrap();

        engine.start_transfer(&b.path).unwrap();
        engine.fail_transfer(&b.path, "connection reset").unwrap();

        let session = engine.get_session_status();
        assert_eq!(session.total_files, 3);
        assert_eq!(session.completed_files, 1);
        assert_eq!(session.failed_files, 1);
        assert_eq!(session.pending_files, 1);
        assert_eq!(session.bytes_completed, 100);

        let status_a = engine.get_file_status(&a.path).unwrap();
        assert_eq!(status_a.state, FileState::Completed);
        assert_eq!(status_a.bytes_sent, 100);

        let status_b = engine.get_file_status(&b.path).unwrap();
        assert_eq!(status_b.state, FileState::Failed);
        assert_eq!(status_b.bytes_sent, 0);

        let status_c = engine.get_file_status(&c.path).unwrap();
        assert_eq!(status_c.state, FileState::Pending);
    }

    #[tokio::test]
    async fn queue_set_membership_is_exclusive_after_transitions() {
        let dir = TempDir::new().unwrap();
        let node = write_file(&dir, "f.bin", 10).await;
        let engine = Engine::new(Config::default()).unwrap();
        engine.add_file(node.clone()).await.unwrap();
        engine.start_transfer(&node.path).unwrap();
        engine.complete_transfer(&node.path).unwrap();

        let kind = engine.queue.read().kind_of(&node.path);
        assert_eq!(kind, Some(SetKind::Completed));
    }

    #[tokio::test]
    async fn concurrent_complete_and_mark_completed_do_not_deadlock() {
        let dir = TempDir::new().unwrap();
        let node = write_file(&dir, "race.bin", 10).await;
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

        assert!(result.is_ok(), "completeTransfer/markFileCompleted race deadlocked");
        assert_eq!(engine.queue.read().kind_of(&node.path), Some(SetKind::Completed));
        let session = engine.get_session_status();
        assert_eq!(session.completed_files, 1);
    }

    #[tokio::test]
    async fn chunks_from_different_files_are_independent() {
        let dir = TempDir::new().unwrap();
        let node = write_file(&dir, "chunked.bin", 12 * 1024).await;
        let engine = Engine::new(Config::default()).unwrap();
        engine.add_file(node.clone()).await.unwrap();

        let mut chunkers = engine.chunkers.write();
        let chunker = chunkers.get_mut(&node.path).unwrap();
        let c1 = chunker.next().await.unwrap().unwrap();
        let c2 = chunker.next().await.unwrap().unwrap();
        assert_ne!(c1.data, c2.data);
    }

    struct RecordingListener {
        count: Arc<AtomicUsize>,
    }

    impl StatusListener for RecordingListener {
        fn id(&self) -> String {
            "recorder".into()
        }

        fn on_file_status_changed(
            &self,
            _path: &str,
            _old: Option<TransferStatus>,
            _new: TransferStatus,
        ) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn listener_receives_file_status_events() {
        let dir = TempDir::new().unwrap();
        let node = write_file(&dir, "listened.bin", 10).await;
        let engine = Engine::new(Config::default()).unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        engine.add_status_listener(Arc::new(RecordingListener {
            count: count.clone(),
        }));

        engine.add_file(node.clone()).await.unwrap();
        engine.start_transfer(&node.path).unwrap();
        engine.complete_transfer(&node.path).unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(count.load(Ordering::SeqCst) >= 3);
    }
}
