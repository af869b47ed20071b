use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetryError {
    #[error("no retry task scheduled for {0}")]
    NotScheduled(String),
}

pub type Result<T> = std::result::Result<T, RetryError>;
