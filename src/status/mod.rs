pub mod types;

pub use types::{FileState, SessionState, SessionStatus, TransferStatus};
