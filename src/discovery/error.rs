use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("mdns daemon error: {0}")]
    Daemon(String),

    #[error("invalid service record: {0}")]
    InvalidRecord(String),
}

impl From<mdns_sd::Error> for DiscoveryError {
    fn from(err: mdns_sd::Error) -> Self {
        DiscoveryError::Daemon(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
