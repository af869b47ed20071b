use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileState {
    Pending,
    Active,
    Paused,
    Completed,
    Failed,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Active,
    Paused,
    Completed,
    Failed,
    Canceled,
}

/// Per-file status snapshot. Always handed to callers and listeners as an
/// owned copy, never a reference into live engine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferStatus {
    pub path: String,
    pub session_id: String,
    pub state: FileState,
    pub bytes_sent: u64,
    pub total_bytes: u64,
    pub chunks_sent: u32,
    pub total_chunks: u32,
    pub transfer_rate: f64,
    pub eta_seconds: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub last_update: Option<DateTime<Utc>>,
    pub completion_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub checksum: String,
}

impl TransferStatus {
    pub fn new(path: impl Into<String>, session_id: impl Into<String>, total_bytes: u64) -> Self {
        Self {
            path: path.into(),
            session_id: session_id.into(),
            state: FileState::Pending,
            bytes_sent: 0,
            total_bytes,
            chunks_sent: 0,
            total_chunks: 0,
            transfer_rate: 0.0,
            eta_seconds: None,
            start_time: None,
            last_update: None,
            completion_time: None,
            last_error: None,
            retry_count: 0,
            max_retries: 0,
            checksum: String::new(),
        }
    }
}

/// Session-wide status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub total_files: usize,
    pub completed_files: usize,
    pub failed_files: usize,
    pub pending_files: usize,
    pub total_bytes: u64,
    pub bytes_completed: u64,
    pub overall_percent: f64,
    pub current_file: Option<TransferStatus>,
    pub start_time: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub completion_time: Option<DateTime<Utc>>,
    pub state: SessionState,
}

impl SessionStatus {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            total_files: 0,
            completed_files: 0,
            failed_files: 0,
            pending_files: 0,
            total_bytes: 0,
            bytes_completed: 0,
            overall_percent: 0.0,
            current_file: None,
            start_time: now,
            last_update: now,
            completion_time: None,
            state: SessionState::Active,
        }
    }

    pub fn recompute_percent(&mut self) {
        self.overall_percent = if self.total_bytes == 0 {
            0.0
        } else {
            (self.bytes_completed as f64 / self.total_bytes as f64) * 100.0
        };
    }

    pub fn is_closed(&self) -> bool {
        self.completed_files + self.failed_files >= self.total_files && self.total_files > 0
    }
}
