use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("node must not be null")]
    NullNode,
}

pub type Result<T> = std::result::Result<T, IndexError>;
